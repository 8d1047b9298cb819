//! Scan → parse → resolve → interpret, as one call per chunk of source.

use log::{debug, info};

use crate::error::Reporter;
use crate::interpreter::{Interpreter, OutputHook};
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Outcome of one [`Session::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    /// Lexical, syntax or semantic error; nothing was executed.
    StaticError,
    /// Execution stopped at a runtime error.
    RuntimeError,
}

impl RunStatus {
    /// Conventional process exit code (sysexits `EX_DATAERR` / `EX_SOFTWARE`).
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Ok => 0,
            RunStatus::StaticError => 65,
            RunStatus::RuntimeError => 70,
        }
    }
}

/// One interpreter kept across runs, so globals defined by one chunk are
/// visible to the next (REPL lines).
pub struct Session {
    interpreter: Interpreter,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    pub fn with_output(output: OutputHook) -> Self {
        Self {
            interpreter: Interpreter::with_output(output),
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn run(&mut self, source: &str, reporter: &mut dyn Reporter) -> RunStatus {
        info!("Running {} byte(s) of source", source.len());

        let (tokens, had_lex_error) = Scanner::new(source.as_bytes()).scan_tokens(reporter);

        let (statements, had_syntax_error) = Parser::new(tokens, reporter).parse();

        if had_lex_error || had_syntax_error {
            debug!("Static errors before resolution; not executing");

            return RunStatus::StaticError;
        }

        if Resolver::new(&mut self.interpreter, reporter).resolve(&statements) {
            debug!("Semantic errors; not executing");

            return RunStatus::StaticError;
        }

        if self.interpreter.interpret(&statements, reporter) {
            RunStatus::RuntimeError
        } else {
            RunStatus::Ok
        }
    }
}
