//! Stack safety for deep recursion in Lox programs.
//!
//! Every user-level call re-enters the evaluator through several native
//! frames, so recursion in a script maps onto recursion here.  Calls are run
//! through [`ensure_sufficient_stack`], which grows the native stack on demand
//! with `stacker`; the interpreter separately caps the call depth so runaway
//! recursion ends in a runtime error instead of exhausting memory.

/// Deepest chain of active Lox calls before a "Stack overflow." error.
pub const MAX_CALL_DEPTH: usize = 10_000;

/// Run `f`, first growing the stack if less than the red zone is left.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (128KB red zone).
    const RED_ZONE: usize = 128 * 1024;

    /// Stack space to allocate when growing (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
