//! Surface syntax tests: precedence, associativity, sugar, and errors.

use relat::ast::{ComprehensionStyle, Constant, ExpressionKind, UnaryOp};
use relat::parser::parse;

fn sexpr(source: &str) -> String {
    parse(source)
        .unwrap_or_else(|e| panic!("failed to parse {source:?}: {e}"))
        .to_string()
}

// ============================================================================
// Atoms
// ============================================================================

#[test]
fn test_constants() {
    assert_eq!(sexpr("100"), "100");
    assert_eq!(sexpr("'str'"), "\"str\"");
    assert_eq!(sexpr("\"double\""), "\"double\"");
}

#[test]
fn test_string_escapes() {
    let expr = parse(r"'it\'s'").unwrap();
    assert_eq!(expr.kind, ExpressionKind::Constant(Constant::Str("it's".to_string())));
}

#[test]
fn test_formula_is_raw() {
    let expr = parse("`x * 3`").unwrap();
    assert_eq!(expr.kind, ExpressionKind::Formula("x * 3".to_string()));
}

#[test]
fn test_parentheses() {
    assert_eq!(sexpr("(x ; y) & z"), "(& (; x y) z)");
    assert_eq!(sexpr("x ; (y & z)"), "(; x (& y z))");
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_join_then_application() {
    assert_eq!(sexpr("x.y[z]"), "([] (. x y) z)");
    assert_eq!(sexpr("x[y].z"), "(. ([] x y) z)");
}

#[test]
fn test_count_binds_looser_than_join() {
    assert_eq!(sexpr("#x > y"), "(> (# x) y)");
    assert_eq!(sexpr("#x.y"), "(# (. x y))");
    assert_eq!(sexpr("#x.y > #x.y.z"), "(> (# (. x y)) (# (. (. x y) z)))");
}

#[test]
fn test_closure_binds_tighter_than_join() {
    assert_eq!(sexpr("*x.y"), "(. (* x) y)");
    assert_eq!(sexpr("^x.y"), "(. (^ x) y)");
    assert_eq!(sexpr("~x.y"), "(. (~ x) y)");
    assert_eq!(sexpr("*x;y"), "(; (* x) y)");
}

#[test]
fn test_quantifiers() {
    assert_eq!(sexpr("some x & y"), "(& (some x) y)");
    assert_eq!(sexpr("some not x"), "(some (not x))");
    assert_eq!(sexpr("not some x.y"), "(not (some (. x y)))");
}

#[test]
fn test_sum_spellings() {
    assert_eq!(sexpr("Σ x.y"), "(sum (. x y))");
    assert_eq!(sexpr("sum x.y"), "(sum (. x y))");
    assert_eq!(sexpr("min x"), "(min x)");
    assert_eq!(sexpr("max x"), "(max x)");
}

#[test]
fn test_set_operators_left_associative() {
    assert_eq!(sexpr("x-y-z"), "(- (- x y) z)");
    assert_eq!(sexpr("x ; y ; z"), "(; (; x y) z)");
    assert_eq!(sexpr("x & y - z"), "(- (& x y) z)");
}

#[test]
fn test_product_binds_tighter_than_set_operators() {
    assert_eq!(sexpr("a, b ; c"), "(; (, a b) c)");
    assert_eq!(sexpr("a & b, c"), "(& a (, b c))");
}

#[test]
fn test_restrictions() {
    assert_eq!(sexpr("x.y <: z"), "(<: (. x y) z)");
    assert_eq!(sexpr("x :> y"), "(:> x y)");
}

#[test]
fn test_wildcard_application() {
    assert_eq!(sexpr("x[_][y]"), "([] ([_] x) y)");
    assert_eq!(sexpr("x._"), "(. x _)");
}

#[test]
fn test_application_takes_full_expression() {
    assert_eq!(sexpr("rel[100, 1]"), "([] rel (, 100 1))");
    assert_eq!(sexpr("rel[150; 200]"), "([] rel (; 150 200))");
}

#[test]
fn test_comparisons_and_arithmetic() {
    assert_eq!(sexpr("x =< y"), "(<= x y)");
    assert_eq!(sexpr("x <= y"), "(<= x y)");
    assert_eq!(sexpr("x != y"), "(!= x y)");
    assert_eq!(sexpr("a + b * c"), "(+ a (* b c))");
    assert_eq!(sexpr("a * b > c + 1"), "(> (* a b) (+ c 1))");
}

#[test]
fn test_minus_is_difference_outside_formulas() {
    assert_eq!(sexpr("a + b - c"), "(- (+ a b) c)");
    assert_eq!(sexpr("x : rel -> `x - 1`"), "(from (x) rel `x - 1`)");
    let expr = parse("`x - 1`").unwrap();
    assert_eq!(expr.kind, ExpressionKind::Formula("x - 1".to_string()));
}

#[test]
fn test_index_and_concat() {
    assert_eq!(sexpr("index x.y"), "(index (. x y))");
    assert_eq!(sexpr("concat x"), "(concat x)");
}

// ============================================================================
// Binding forms
// ============================================================================

#[test]
fn test_comprehension() {
    assert_eq!(sexpr("x : rel | x > 150"), "(for (x) rel (> x 150))");
    assert_eq!(
        sexpr("x : isPerson | some (y : x.hasChild | not y.isHappy)"),
        "(for (x) isPerson (some (for (y) (. x hasChild) (not (. y isHappy)))))"
    );
}

#[test]
fn test_multi_variable_comprehension() {
    let expr = parse("a, b : edge | b.edge").unwrap();
    let ExpressionKind::Comprehension { variables, style, .. } = &expr.kind else {
        panic!("expected comprehension, got {expr}");
    };
    assert_eq!(variables, &["a".to_string(), "b".to_string()]);
    assert_eq!(*style, ComprehensionStyle::For);
}

#[test]
fn test_from_comprehension() {
    assert_eq!(sexpr("x : rel -> x.other"), "(from (x) rel (. x other))");
}

#[test]
fn test_comprehension_body_extends_right() {
    assert_eq!(
        sexpr("x : rel | let y = `x * 3` | y > 450"),
        "(for (x) rel (let y `x * 3` (> y 450)))"
    );
}

#[test]
fn test_let() {
    assert_eq!(sexpr("let x = a ; b | x.c"), "(let x (; a b) (. x c))");
}

#[test]
fn test_property_desugars_to_wildcard_application() {
    let expr = parse("<name>").unwrap();
    let ExpressionKind::Unary { op, operand } = &expr.kind else {
        panic!("expected unary, got {expr}");
    };
    assert_eq!(*op, UnaryOp::WildcardApply);
    assert_eq!(operand.to_string(), "name");
}

// ============================================================================
// Ranges
// ============================================================================

#[test]
fn test_subexpression_ranges() {
    let source = "x : isPerson | some x.hasChild";
    let expr = parse(source).unwrap();
    assert_eq!(expr.text(), source);
    let ExpressionKind::Comprehension { constraint, body, .. } = &expr.kind else {
        panic!("expected comprehension");
    };
    assert_eq!(constraint.text(), "isPerson");
    assert_eq!(body.text(), "some x.hasChild");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unbalanced_parenthesis() {
    let err = parse("(x ; y").unwrap_err();
    assert_eq!(err.location.start.line, 1);
    assert!(err.location.start.offset >= 6);
    assert_eq!(err.found, "end of input");
}

#[test]
fn test_error_location_on_later_line() {
    let err = parse("x ;\n  ; y").unwrap_err();
    assert_eq!(err.location.start.line, 2);
    assert!(err.to_string().starts_with("Syntax error at line 2"));
}

#[test]
fn test_number_literals_are_32_bit() {
    assert_eq!(sexpr("2147483647"), "2147483647");
    let err = parse("x : rel | x > 3000000000").unwrap_err();
    assert_eq!(err.expected, vec!["number that fits in 32 bits".to_string()]);
    assert_eq!(err.location.start.column, 15);
    assert_eq!(err.found, "'3'");
}

#[test]
fn test_trailing_garbage() {
    assert!(parse("x y").is_err());
    assert!(parse("").is_err());
}

#[test]
fn test_braced_comprehension_is_rejected() {
    assert!(parse("{x : rel | x}").is_err());
}
