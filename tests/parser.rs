use pretty_assertions::assert_eq;

use rox::ast::{Expr, LiteralValue, Stmt};
use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::parser::Parser;
use rox::scanner::Scanner;

fn parse(source: &str) -> (Vec<Stmt>, bool, Vec<LoxError>) {
    let mut errors: Vec<LoxError> = Vec::new();
    let (tokens, had_lex_error) = Scanner::new(source.as_bytes()).scan_tokens(&mut errors);
    assert!(!had_lex_error, "unexpected lex errors: {:?}", errors);

    let (statements, had_error) = Parser::new(tokens, &mut errors).parse();
    (statements, had_error, errors)
}

fn printed(source: &str) -> Vec<String> {
    let (statements, had_error, errors) = parse(source);
    assert!(!had_error, "unexpected parse errors: {:?}", errors);

    statements.iter().map(AstPrinter::print_stmt).collect()
}

fn messages(errors: &[LoxError]) -> Vec<String> {
    errors.iter().map(LoxError::message).collect()
}

#[test]
fn precedence_climbs_from_assignment_to_primary() {
    assert_eq!(
        printed("1 + 2 * 3 - -4 / (5);"),
        vec!["(; (- (+ 1.0 (* 2.0 3.0)) (/ (- 4.0) (group 5.0))))"]
    );
    assert_eq!(
        printed("a = b or c and d == e < f;"),
        vec!["(; (= a (or b (and c (== d (< e f))))))"]
    );
    assert_eq!(printed("!!true;"), vec!["(; (! (! true)))"]);
}

#[test]
fn logical_operators_stay_logical() {
    let (statements, had_error, _) = parse("a or b;");
    assert!(!had_error);

    let Stmt::Expression(Expr::Logical { operator, .. }) = &statements[0] else {
        panic!("expected a logical expression, got {:?}", statements[0]);
    };
    assert_eq!(operator.lexeme, "or");
}

#[test]
fn calls_and_property_access_chain_left_to_right() {
    assert_eq!(
        printed("a.b(1, 2).c = 3;"),
        vec!["(; (= (. (call (. a b) 1.0 2.0) c) 3.0))"]
    );
    assert_eq!(printed("this.x;"), vec!["(; (. this x))"]);
}

#[test]
fn declarations() {
    assert_eq!(
        printed("var a; var b = 1; fun f(x, y) { return x; } class C { m() { print this; } }"),
        vec![
            "(var a)",
            "(var b 1.0)",
            "(fun f (x y) (return x))",
            "(class C (fun m () (print this)))",
        ]
    );
}

#[test]
fn for_loop_desugars_into_while() {
    assert_eq!(
        printed("for (var i = 0; i < 3; i = i + 1) print i;"),
        vec!["(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"]
    );

    // Every clause optional: the condition defaults to `true`.
    let (statements, had_error, _) = parse("for (;;) print 1;");
    assert!(!had_error);
    let Stmt::While { condition, .. } = &statements[0] else {
        panic!("expected a bare while, got {:?}", statements[0]);
    };
    assert_eq!(*condition, Expr::Literal(LiteralValue::True));
}

#[test]
fn invalid_assignment_target_is_reported_without_aborting() {
    let (statements, had_error, errors) = parse("1 = 2; print 3;");

    assert!(had_error);
    assert_eq!(messages(&errors), vec!["Invalid assignment target."]);
    assert_eq!(statements.len(), 2);
    assert_eq!(errors[0].to_string(), "[line 1] Error at '=': Invalid assignment target.");
}

#[test]
fn synchronize_recovers_and_reports_every_error() {
    let source = "var = 1;\nprint 2;\nvar b = ;\nfun f( { }\nprint 5;";
    let (statements, had_error, errors) = parse(source);

    assert!(had_error);
    assert_eq!(errors.len(), 3, "{:?}", errors);
    assert_eq!(
        statements.iter().map(AstPrinter::print_stmt).collect::<Vec<_>>(),
        vec!["(print 2.0)", "(print 5.0)"]
    );
}

#[test]
fn error_at_end_of_input() {
    let (_, had_error, errors) = parse("print 1");

    assert!(had_error);
    assert_eq!(
        errors[0].to_string(),
        "[line 1] Error at end: Expected ';' after value"
    );
}

#[test]
fn too_many_arguments_is_reported_but_parsed() {
    let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
    let source = format!("f({});", args.join(", "));
    let (statements, had_error, errors) = parse(&source);

    assert!(had_error);
    assert_eq!(messages(&errors), vec!["Can't have more than 255 arguments."]);

    let Stmt::Expression(Expr::Call { arguments, .. }) = &statements[0] else {
        panic!("expected a call, got {:?}", statements[0]);
    };
    assert_eq!(arguments.len(), 256);
}

#[test]
fn too_many_parameters_is_reported() {
    let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
    let source = format!("fun f({}) {{}}", params.join(", "));
    let (statements, had_error, errors) = parse(&source);

    assert!(had_error);
    assert_eq!(messages(&errors), vec!["Can't have more than 255 parameters."]);
    assert_eq!(statements.len(), 1);
}
