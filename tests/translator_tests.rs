//! Translator tests: result signatures, emitted program shape, and errors.
//!
//! Nothing here runs a Datalog engine; see `scenario_tests.rs` for that.

use std::collections::BTreeSet;

use proptest::prelude::*;

use relat::assembler::translation_result_to_full_program;
use relat::parser::parse;
use relat::translator::{
    translate, translate_with_options, Environment, TranslateOptions, TranslationError,
    TranslationErrorKind, TranslationResult,
};
use relat::value::Type;

const N: Type = Type::Number;
const S: Type = Type::Symbol;

fn env() -> Environment {
    Environment::with_inputs([
        ("rel", &[N, N][..]),
        ("nums", &[N][..]),
        ("names", &[N, S][..]),
        ("words", &[S][..]),
        ("isPerson", &[N][..]),
        ("hasChild", &[N, N][..]),
        ("isHappy", &[N][..]),
        ("flag", &[][..]),
    ])
    .unwrap()
}

fn ok(source: &str) -> TranslationResult {
    let expr = parse(source).unwrap_or_else(|e| panic!("failed to parse {source:?}: {e}"));
    translate(&expr, &env()).unwrap_or_else(|e| panic!("failed to translate {source:?}: {e}"))
}

fn err(source: &str) -> TranslationError {
    let expr = parse(source).unwrap_or_else(|e| panic!("failed to parse {source:?}: {e}"));
    match translate(&expr, &env()) {
        Ok(result) => panic!("expected {source:?} to fail, got\n{}", result.program),
        Err(e) => e,
    }
}

fn types(source: &str) -> Vec<Type> {
    ok(source).relation.types()
}

/// Checks every translation should satisfy
fn assert_well_formed(result: &TranslationResult) {
    let full = translation_result_to_full_program(result, &env()).unwrap();
    assert!(
        full.undeclared_uses().is_empty(),
        "used before declared: {:?}\n{full}",
        full.undeclared_uses()
    );
    for rule in full.rules() {
        assert!(
            rule.is_safe(),
            "unsafe rule `{rule}` (unbound: {:?})",
            rule.unbound_variables()
        );
    }
    let mut names = BTreeSet::new();
    for decl in full.decls() {
        assert!(names.insert(decl.relation.clone()), "{} declared twice", decl.relation);
    }
}

// ============================================================================
// Result signatures per operator
// ============================================================================

#[test]
fn test_constant_signatures() {
    assert_eq!(types("100"), vec![N]);
    assert_eq!(types("'str'"), vec![S]);
    assert_eq!(types("`3 * 4`"), vec![N]);
}

#[test]
fn test_identifier_is_shared() {
    let result = ok("rel");
    assert_eq!(result.name(), "rel");
    assert!(result.program.is_empty());
}

#[test]
fn test_join_signatures() {
    assert_eq!(types("rel.rel"), vec![N, N]);
    assert_eq!(types("rel.names"), vec![N, S]);
    assert_eq!(types("nums.rel"), vec![N]);
    assert_eq!(types("nums.nums"), Vec::<Type>::new());
    assert_eq!(types("names._"), vec![N]);
    assert_eq!(types("_.names"), vec![S]);
}

#[test]
fn test_product_and_application_signatures() {
    assert_eq!(types("nums, names"), vec![N, N, S]);
    assert_eq!(types("rel[100]"), vec![N]);
    assert_eq!(types("rel[100, 1]"), Vec::<Type>::new());
    assert_eq!(types("rel[100][1]"), Vec::<Type>::new());
    assert_eq!(types("names[_]"), vec![S]);
    assert_eq!(types("<names>"), vec![S]);
}

#[test]
fn test_restriction_signatures() {
    assert_eq!(types("nums <: names"), vec![N, S]);
    assert_eq!(types("names :> words"), vec![N, S]);
}

#[test]
fn test_set_operation_signatures() {
    assert_eq!(types("rel ; rel"), vec![N, N]);
    assert_eq!(types("nums & isHappy"), vec![N]);
    assert_eq!(types("isPerson - isHappy"), vec![N]);
}

#[test]
fn test_unary_signatures() {
    assert_eq!(types("some rel"), Vec::<Type>::new());
    assert_eq!(types("not rel"), Vec::<Type>::new());
    assert_eq!(types("^rel"), vec![N, N]);
    assert_eq!(types("~names"), vec![S, N]);
    assert_eq!(types("#names"), vec![N]);
    assert_eq!(types("min rel"), vec![N]);
    assert_eq!(types("Σ nums"), vec![N]);
    assert_eq!(types("index names"), vec![N, N, S]);
    assert_eq!(types("concat names"), vec![S]);
}

#[test]
fn test_scalar_signatures() {
    assert_eq!(types("#nums > 3"), Vec::<Type>::new());
    assert_eq!(types("'a' = 'b'"), Vec::<Type>::new());
    assert_eq!(types("#nums + 1"), vec![N]);
    assert_eq!(types("2 * 3"), vec![N]);
}

#[test]
fn test_comprehension_signatures() {
    assert_eq!(types("x : nums | x > 150"), vec![N]);
    assert_eq!(types("x : nums | `x * 3`"), vec![N, N]);
    assert_eq!(types("x : nums | x.names"), vec![N, S]);
    assert_eq!(types("a, b : names | some a.nums"), vec![N, S]);
    assert_eq!(types("x : nums -> x.names"), vec![S]);
    assert_eq!(types("a, b : rel -> b, a"), vec![N, N]);
}

#[test]
fn test_let_signature() {
    assert_eq!(types("let n = names | n._"), vec![N]);
    let result = ok("let n = names | n");
    assert_eq!(result.name(), "names");
}

// ============================================================================
// Program shape
// ============================================================================

#[test]
fn test_constant_program() {
    let text = ok("100").program.to_string();
    assert!(text.contains("// R1: 100 (literal)"), "{text}");
    assert!(text.contains(".decl R1(val_0: number)"), "{text}");
    assert!(text.contains(":- val_"), "{text}");
}

#[test]
fn test_comments_can_be_disabled() {
    let expr = parse("rel ; rel").unwrap();
    let options = TranslateOptions { emit_comments: false };
    let text = translate_with_options(&expr, &env(), options)
        .unwrap()
        .program
        .to_string();
    assert!(!text.contains("//"));
    assert!(text.starts_with(".decl R1("));
}

#[test]
fn test_closure_is_recursive() {
    let result = ok("^rel");
    let rules = result.program.rules();
    assert_eq!(rules.len(), 2);
    assert!(!rules[0].is_recursive());
    assert!(rules[1].is_recursive());
}

#[test]
fn test_union_has_one_rule_per_side() {
    assert_eq!(ok("nums ; isHappy").program.rules().len(), 2);
}

#[test]
fn test_index_declares_choice_domains() {
    let text = ok("index names").program.to_string();
    assert!(text.contains("choice-domain"), "{text}");
}

#[test]
fn test_concat_defines_helper_relations() {
    let result = ok("concat names");
    // index, accumulator, top index, result
    assert_eq!(result.program.decls().len(), 4);
    assert!(result.program.to_string().contains("cat("));
}

#[test]
fn test_comprehension_carries_external_slots() {
    let text = ok("x : isPerson | some x.hasChild").program.to_string();
    assert!(text.contains("x_e"), "{text}");
}

#[test]
fn test_formula_references_scalars() {
    let text = ok("x : nums | `x * 3`").program.to_string();
    assert!(text.contains("(x_e * 3)"), "{text}");
}

#[test]
fn test_generated_names_avoid_inputs() {
    let env = Environment::with_inputs([("R1", &[N][..]), ("R2", &[N][..])]).unwrap();
    let result = translate(&parse("R1 ; R2").unwrap(), &env).unwrap();
    assert_eq!(result.name(), "R3");
}

#[test]
fn test_programs_are_well_formed() {
    for source in [
        "100",
        "rel.rel.rel",
        "names._",
        "_.names",
        "rel[150; 200]",
        "nums <: names",
        "names :> words",
        "isPerson - isHappy",
        "^rel",
        "~rel",
        "#names",
        "max nums",
        "index names",
        "concat names",
        "flag ; some nums",
        "x : isPerson | some x.hasChild",
        "x : isPerson | some (y : x.hasChild | not y.isHappy)",
        "x : isPerson | (some x.hasChild) & (not some (y : x.hasChild | not y.isHappy))",
        "x : isPerson | some (x.hasChild - isHappy)",
        "x : nums | let y = `x * 3` | y > 450",
        "x : isPerson | #x.hasChild",
        "x : isPerson | concat (y : x.hasChild | y.names)",
        "x : isPerson | y : x.hasChild | x + y",
        "x : isPerson | index x.hasChild",
        "x : isPerson | x.hasChild ; 7",
        "a, b : names -> b, a",
    ] {
        assert_well_formed(&ok(source));
    }
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_identifier() {
    let e = err("rel.missing");
    assert_eq!(e.cause, TranslationErrorKind::UnknownIdentifier("missing".to_string()));
    assert_eq!(e.failing_text(), "missing");
    assert_eq!(e.node, "identifier");
    assert_eq!(e.to_string(), "Translating identifier missing: Unknown identifier: missing");
}

#[test]
fn test_error_names_smallest_failing_subexpression() {
    let e = err("x : isPerson | some x.names.hasChild");
    assert_eq!(e.failing_text(), "x.names.hasChild");
    assert!(matches!(e.cause, TranslationErrorKind::TypeMismatch { .. }));
    assert!(e.environment.contains("x"));
    assert!(e.to_string().starts_with("Translating binary x.names.hasChild: "));
}

#[test]
fn test_rebinding_is_rejected() {
    let e = err("x : nums | x : nums | x");
    assert_eq!(e.cause, TranslationErrorKind::AlreadyBound("x".to_string()));

    let e = err("rel : nums | rel");
    assert_eq!(e.cause, TranslationErrorKind::AlreadyBound("rel".to_string()));

    let e = err("let nums = rel | nums");
    assert_eq!(e.cause, TranslationErrorKind::AlreadyBound("nums".to_string()));
}

#[test]
fn test_set_operation_signature_mismatch() {
    let e = err("rel ; names");
    assert_eq!(
        e.cause.to_string(),
        "Relations in union must have matching signatures, but got (number, number) and (number, symbol)"
    );
    assert_eq!(e.failing_text(), "rel ; names");
}

#[test]
fn test_application_requires_prefix() {
    let e = err("names['a']");
    assert!(matches!(e.cause, TranslationErrorKind::SignatureMismatch { .. }));
}

#[test]
fn test_shape_errors() {
    assert!(matches!(err("^nums").cause, TranslationErrorKind::ArityMismatch { .. }));
    assert!(matches!(err("^names").cause, TranslationErrorKind::TypeMismatch { .. }));
    assert!(matches!(err("~nums").cause, TranslationErrorKind::ArityMismatch { .. }));
    assert!(matches!(err("rel > 1").cause, TranslationErrorKind::ArityMismatch { .. }));
    assert!(matches!(err("words + 1").cause, TranslationErrorKind::TypeMismatch { .. }));
    assert!(matches!(err("words < 'a'").cause, TranslationErrorKind::TypeMismatch { .. }));
    assert!(matches!(err("sum words").cause, TranslationErrorKind::TypeMismatch { .. }));
    assert!(matches!(err("concat nums").cause, TranslationErrorKind::TypeMismatch { .. }));
    assert!(matches!(err("x, y : nums | x").cause, TranslationErrorKind::ArityMismatch { .. }));
    assert!(matches!(err("flag.nums").cause, TranslationErrorKind::ArityMismatch { .. }));
}

#[test]
fn test_reflexive_closure_is_unsupported() {
    let e = err("*rel");
    assert!(matches!(e.cause, TranslationErrorKind::Unsupported(_)));
    assert_eq!(e.failing_text(), "*rel");
}

#[test]
fn test_misplaced_wildcard() {
    let e = err("_ ; rel");
    assert_eq!(e.cause, TranslationErrorKind::MisplacedWildcard);
    assert_eq!(e.failing_text(), "_");
    assert_eq!(err("_._").cause, TranslationErrorKind::MisplacedWildcard);
}

// ============================================================================
// Properties
// ============================================================================

/// Queries over unary number relations
fn numeric_query() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        Just("nums".to_string()),
        Just("isHappy".to_string()),
        (0i64..1000).prop_map(|n| n.to_string()),
        Just("`1 + 2`".to_string()),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a} ; {b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a} & {b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a} - {b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a} + {b})")),
            inner.clone().prop_map(|a| format!("#({a})")),
            inner.clone().prop_map(|a| format!("max ({a})")),
            inner.clone().prop_map(|a| format!("({a}).hasChild")),
            inner.prop_map(|a| format!("(v : {a} -> v * 2)")),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_translation_is_deterministic(source in numeric_query()) {
        let expr = parse(&source).unwrap();
        let first = translate(&expr, &env()).unwrap();
        let second = translate(&expr, &env()).unwrap();
        prop_assert_eq!(first.program.to_string(), second.program.to_string());
        prop_assert_eq!(first.relation, second.relation);
    }

    #[test]
    fn prop_numeric_queries_stay_numeric(source in numeric_query()) {
        let result = translate(&parse(&source).unwrap(), &env()).unwrap();
        prop_assert_eq!(result.relation.types(), vec![Type::Number]);
        assert_well_formed(&result);
    }

    #[test]
    fn prop_let_is_transparent(source in numeric_query()) {
        let direct = translate(&parse(&source).unwrap(), &env()).unwrap();
        let bound = translate(&parse(&format!("let q = {source} | q")).unwrap(), &env()).unwrap();
        prop_assert_eq!(direct.relation.types(), bound.relation.types());
        prop_assert_eq!(direct.program.rules().len(), bound.program.rules().len());
    }
}
