use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use rox::error::LoxError;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::runner::{RunStatus, Session};
use rox::scanner::Scanner;

type Output = Rc<RefCell<Vec<String>>>;

fn capturing_session() -> (Session, Output) {
    let output: Output = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&output);
    let session = Session::with_output(Box::new(move |text: &str| {
        sink.borrow_mut().push(text.to_string())
    }));
    (session, output)
}

struct Run {
    status: RunStatus,
    output: Vec<String>,
    errors: Vec<LoxError>,
}

fn run(source: &str) -> Run {
    let (mut session, output) = capturing_session();
    let mut errors: Vec<LoxError> = Vec::new();
    let status = session.run(source, &mut errors);
    let output = output.borrow().clone();
    Run {
        status,
        output,
        errors,
    }
}

/// Run a program expected to succeed and return what it printed.
fn output_of(source: &str) -> Vec<String> {
    let run = run(source);
    assert_eq!(
        run.status,
        RunStatus::Ok,
        "errors: {:?}",
        run.errors.iter().map(ToString::to_string).collect::<Vec<_>>()
    );
    run.output
}

/// Run a program expected to fail at runtime; returns output and message.
fn runtime_failure(source: &str) -> (Vec<String>, String) {
    let run = run(source);
    assert_eq!(run.status, RunStatus::RuntimeError);
    assert_eq!(run.errors.len(), 1, "runtime errors are reported once");
    assert!(run.errors[0].is_runtime());
    (run.output, run.errors[0].message())
}

#[test]
fn stringify_rules() {
    assert_eq!(
        output_of(
            r#"
            print nil;
            print true;
            print 3;
            print 2.5;
            print -0.5;
            print "verbatim";
            fun f() {}
            print f;
            class C {}
            print C;
            print C();
            print clock;
            "#
        ),
        vec![
            "nil",
            "true",
            "3",
            "2.5",
            "-0.5",
            "verbatim",
            "<fn f>",
            "C",
            "C instance",
            "<native fn>",
        ]
    );
}

#[test]
fn truthiness_and_equality() {
    assert_eq!(
        output_of(
            r#"
            if (0) print "0 is truthy";
            if ("") print "empty string is truthy";
            if (nil) print "unreachable"; else print "nil is falsy";
            print !false;
            print nil == nil;
            print nil == false;
            print 1 == 1;
            print "a" == "a";
            print 1 == "1";
            print 1 != 2;
            "#
        ),
        vec![
            "0 is truthy",
            "empty string is truthy",
            "nil is falsy",
            "true",
            "true",
            "false",
            "true",
            "true",
            "false",
            "true",
        ]
    );
}

#[test]
fn arithmetic_and_concatenation() {
    assert_eq!(
        output_of(r#"print 1 + 2 * 3; print (1 + 2) * 3; print 7 / 2; print -(4 - 6); print "1" + "x"; print 3 >= 3; print 2 < 1; print 1 / 0;"#),
        vec!["7", "9", "3.5", "2", "1x", "true", "false", "inf"]
    );
}

#[test]
fn type_errors_name_their_operator() {
    let (_, message) = runtime_failure(r#"1 + "x";"#);
    assert_eq!(message, "Operands must be two numbers or two strings.");

    let (_, message) = runtime_failure(r#"print -"x";"#);
    assert_eq!(message, "Operand must be a number.");

    let run = run(r#"print 1 < "2";"#);
    assert_eq!(run.status, RunStatus::RuntimeError);
    assert!(matches!(
        &run.errors[0],
        LoxError::Runtime { lexeme, message, .. }
            if lexeme == "<" && message == "Operands must be numbers."
    ));
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(
        output_of(
            r#"
            var calls = 0;
            fun touch() { calls = calls + 1; return true; }
            print false and touch();
            print true or touch();
            print calls;
            print nil or "fallback";
            print 1 and 2;
            print true and touch();
            print calls;
            "#
        ),
        vec!["false", "true", "0", "fallback", "2", "true", "1"]
    );
}

#[test]
fn block_shadowing_never_leaks_out() {
    assert_eq!(
        output_of(
            r#"
            var a = "global";
            {
                var a = "outer";
                {
                    var a = "inner";
                    print a;
                }
                print a;
            }
            print a;
            "#
        ),
        vec!["inner", "outer", "global"]
    );
}

#[test]
fn shadowing_initializer_reads_enclosing_binding_when_unresolved() {
    // Without the resolver every lookup walks the frame chain, so the
    // initializer sees the outer `a`.  The resolver rejects this program.
    let mut errors: Vec<LoxError> = Vec::new();
    let (tokens, _) = Scanner::new(b"var a = 1; { var a = a + 1; print a; } print a;")
        .scan_tokens(&mut errors);
    let (statements, had_error) = Parser::new(tokens, &mut errors).parse();
    assert!(!had_error);

    let output = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&output);
    let mut interpreter =
        Interpreter::with_output(Box::new(move |text: &str| sink.borrow_mut().push(text.to_string())));

    assert!(!interpreter.interpret(&statements, &mut errors));
    assert_eq!(*output.borrow(), vec!["2".to_string(), "1".to_string()]);

    let run = run("var a = 1; { var a = a + 1; print a; } print a;");
    assert_eq!(run.status, RunStatus::StaticError);
    assert!(run.output.is_empty());
}

#[test]
fn control_flow() {
    assert_eq!(
        output_of(
            r#"
            var i = 0;
            while (i < 3) { print i; i = i + 1; }
            for (var j = 0; j < 2; j = j + 1) print "j" + "!";
            if (i == 3) print "three"; else print "other";
            "#
        ),
        vec!["0", "1", "2", "j!", "j!", "three"]
    );
}

#[test]
fn return_unwinds_through_loops_and_blocks() {
    assert_eq!(
        output_of(
            r#"
            fun find() {
                for (var i = 0; i < 10; i = i + 1) {
                    {
                        if (i == 4) return i;
                    }
                }
                return -1;
            }
            print find();
            fun f() { return; }
            print f();
            fun g() {}
            print g();
            "#
        ),
        vec!["4", "nil", "nil"]
    );
}

#[test]
fn recursion() {
    assert_eq!(
        output_of(
            r#"
            fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
            print fib(15);
            "#
        ),
        vec!["610"]
    );
}

#[test]
fn closures_keep_their_defining_frame_alive() {
    assert_eq!(
        output_of(
            r#"
            fun makeCounter() {
                var count = 0;
                fun increment() { count = count + 1; return count; }
                return increment;
            }
            var a = makeCounter();
            var b = makeCounter();
            print a();
            print a();
            print b();
            print a();
            "#
        ),
        vec!["1", "2", "1", "3"]
    );
}

#[test]
fn globals_are_late_bound() {
    assert_eq!(
        output_of(
            r#"
            fun show() { print later; }
            var later = "defined after use";
            show();
            later = "reassigned";
            show();
            "#
        ),
        vec!["defined after use", "reassigned"]
    );
}

#[test]
fn unresolved_names_walk_the_frame_chain_at_call_time() {
    // `a` is not yet declared in the block when `show` is resolved, so the
    // read is left to the runtime, which searches outward from the call.
    assert_eq!(
        output_of(
            r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
            "#
        ),
        vec!["global", "block"]
    );
}

#[test]
fn arity_mismatch_does_not_run_the_body() {
    let (output, message) = runtime_failure(
        r#"
        fun add(a, b) { print "ran"; return a + b; }
        add(1, 2, 3);
        "#,
    );
    assert!(output.is_empty());
    assert_eq!(message, "Expected 2 arguments but got 3.");
}

#[test]
fn calling_a_non_callable() {
    let (_, message) = runtime_failure(r#""text"();"#);
    assert_eq!(message, "Can only call functions and classes.");
}

#[test]
fn undefined_variables_fail_at_runtime() {
    let (_, message) = runtime_failure("print missing;");
    assert_eq!(message, "Undefined variable 'missing'.");

    let (_, message) = runtime_failure("missing = 1;");
    assert_eq!(message, "Undefined variable 'missing'.");
}

#[test]
fn runtime_error_aborts_the_rest_of_the_run_only() {
    let (mut session, output) = capturing_session();
    let mut errors: Vec<LoxError> = Vec::new();

    let status = session.run(r#"print "before"; nil(); print "after";"#, &mut errors);
    assert_eq!(status, RunStatus::RuntimeError);
    assert_eq!(errors[0].to_string(), "Can only call functions and classes.\n[line 1]");

    // The next run in the same session is unaffected, and sees earlier globals.
    let status = session.run(r#"var x = "next"; print x;"#, &mut errors);
    assert_eq!(status, RunStatus::Ok);
    assert_eq!(*output.borrow(), vec!["before".to_string(), "next".to_string()]);
}

#[test]
fn runtime_error_inside_a_block_restores_the_enclosing_frame() {
    let (mut session, output) = capturing_session();
    let mut errors: Vec<LoxError> = Vec::new();

    let status = session.run(r#"var a = "g"; { var a = "block"; nil(); }"#, &mut errors);
    assert_eq!(status, RunStatus::RuntimeError);

    let status = session.run("print a;", &mut errors);
    assert_eq!(status, RunStatus::Ok);
    assert_eq!(*output.borrow(), vec!["g".to_string()]);
}

#[test]
fn runtime_error_inside_a_function_restores_the_caller_frame() {
    let (mut session, output) = capturing_session();
    let mut errors: Vec<LoxError> = Vec::new();

    let status = session.run(
        r#"
        var b = "g";
        fun boom() { var b = "local"; { nil(); } }
        boom();
        "#,
        &mut errors,
    );
    assert_eq!(status, RunStatus::RuntimeError);
    assert_eq!(errors.len(), 1);

    let status = session.run("print b; b = \"set\"; print b;", &mut errors);
    assert_eq!(status, RunStatus::Ok);
    assert_eq!(
        *output.borrow(),
        vec!["g".to_string(), "set".to_string()]
    );
}

#[test]
fn deep_recursion_within_the_limit_completes() {
    assert_eq!(
        output_of(
            r#"
            fun depth(n) { if (n == 0) return 0; return depth(n - 1) + 1; }
            print depth(2000);
            "#
        ),
        vec!["2000"]
    );
}

#[test]
fn runaway_recursion_is_a_runtime_error() {
    let (mut session, output) = capturing_session();
    let mut errors: Vec<LoxError> = Vec::new();

    let status = session.run("fun f() { f(); } f();", &mut errors);
    assert_eq!(status, RunStatus::RuntimeError);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message(), "Stack overflow.");

    // The depth count unwinds with the error; the session keeps working.
    let status = session.run(
        "fun g(n) { if (n == 0) return \"done\"; return g(n - 1); } print g(100);",
        &mut errors,
    );
    assert_eq!(status, RunStatus::Ok);
    assert_eq!(*output.borrow(), vec!["done".to_string()]);
}

#[test]
fn static_errors_prevent_execution() {
    let run = run(r#"print "never"; print ;"#);
    assert_eq!(run.status, RunStatus::StaticError);
    assert!(run.output.is_empty());
    assert_eq!(run.status.exit_code(), 65);
}

#[test]
fn classes_fields_and_methods() {
    assert_eq!(
        output_of(
            r#"
            class Point {
                init(x, y) { this.x = x; this.y = y; }
                sum() { return this.x + this.y; }
            }
            var p = Point(1, 2);
            print p.sum();
            p.x = 10;
            print p.sum();
            var m = p.sum;
            print m();
            "#
        ),
        vec!["3", "12", "12"]
    );
}

#[test]
fn initializer_always_yields_the_instance() {
    assert_eq!(
        output_of(
            r#"
            class C { init(x) { this.x = x; return; } }
            var c = C(1);
            print c;
            print C(1).x == 1;
            print c.init(5);
            print c.x;
            "#
        ),
        vec!["C instance", "true", "C instance", "5"]
    );
}

#[test]
fn class_arity_follows_init() {
    let (_, message) = runtime_failure("class C { init(a) {} } C();");
    assert_eq!(message, "Expected 1 arguments but got 0.");

    let (_, message) = runtime_failure("class D {} D(1);");
    assert_eq!(message, "Expected 0 arguments but got 1.");
}

#[test]
fn fields_shadow_methods() {
    assert_eq!(
        output_of(
            r#"
            class C { m() { return "method"; } }
            var c = C();
            print c.m();
            c.m = "field";
            print c.m;
            "#
        ),
        vec!["method", "field"]
    );
}

#[test]
fn bound_methods_remember_their_instance() {
    assert_eq!(
        output_of(
            r#"
            class Greeter {
                init(name) { this.name = name; }
                greet() { return "hi " + this.name; }
            }
            var a = Greeter("a");
            var b = Greeter("b");
            var greet = a.greet;
            b.greet = greet;
            print b.greet();
            print a.greet == a.greet;
            print a == a;
            print a == b;
            "#
        ),
        vec!["hi a", "false", "true", "false"]
    );
}

#[test]
fn methods_close_over_the_class_declaration_scope() {
    assert_eq!(
        output_of(
            r##"
            fun make(prefix) {
                class Tag { show(x) { return prefix + x; } }
                return Tag;
            }
            var T = make("#");
            print T().show("1");
            "##
        ),
        vec!["#1"]
    );
}

#[test]
fn property_errors() {
    let (_, message) = runtime_failure("class C {} print C().nope;");
    assert_eq!(message, "Undefined property 'nope'.");

    let (_, message) = runtime_failure("var n = 1; print n.x;");
    assert_eq!(message, "Only instances have properties.");

    let (_, message) = runtime_failure("var n = 1; n.x = 2;");
    assert_eq!(message, "Only instances have fields.");
}

#[test]
fn deterministic_output() {
    let source = r#"
        fun counter() { var n = 0; fun inc() { n = n + 1; return n; } return inc; }
        var c = counter();
        for (var i = 0; i < 5; i = i + 1) print c() * i;
    "#;

    assert_eq!(output_of(source), output_of(source));
}
