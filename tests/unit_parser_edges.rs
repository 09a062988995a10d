mod support;

use dcec::{DcecError, ParseOptions, parse_statement_with};
use support::{namespace_with, parse_err, parse_ok, s_form};

fn warning_codes(out: &dcec::ParseOutcome) -> Vec<&'static str> {
    out.warnings.iter().map(|w| w.code).collect()
}

#[test]
fn misspelled_keywords_are_replaced_with_a_warning() {
    let out = parse_ok("forall x Red(x)", &["Boolean Red Object"]);
    assert_eq!(s_form(&out), "(forAll QUANT0 (Red QUANT0))");
    assert_eq!(warning_codes(&out), vec!["W-SYNONYM"]);
    assert!(out.warnings.iter().all(|w| w.is_warning()));

    let out = parse_ok("if(a, b)", &["Boolean a", "Boolean b"]);
    assert_eq!(s_form(&out), "(implies a b)");
    assert_eq!(warning_codes(&out), vec!["W-SYNONYM"]);
}

#[test]
fn leading_not_before_a_binary_operator_warns() {
    let out = parse_ok("~a & b", &["Boolean a", "Boolean b"]);
    assert_eq!(s_form(&out), "(and (not a) b)");
    assert_eq!(warning_codes(&out), vec!["W-NOT"]);
}

#[test]
fn quantifier_without_variable_is_rejected() {
    let err = parse_err("forAll", &[]);
    assert!(matches!(err, DcecError::MalformedQuantifier { ref keyword, .. } if keyword == "forAll"));
    assert_eq!(err.code(), "E-QUANT");
}

#[test]
fn quantifier_without_body_is_rejected() {
    assert_eq!(parse_err("forAll x", &[]).code(), "E-QUANT");
}

#[test]
fn unclosed_variable_list_is_rejected() {
    let err = parse_err("forAll [x,y Red(x)", &["Boolean Red Object"]);
    assert_eq!(err.code(), "E-QUANT");
}

#[test]
fn quantifier_sort_needs_a_variable() {
    let err = parse_err("forAll Agent Red(x)", &["Boolean Red Object"]);
    assert!(matches!(err, DcecError::MalformedQuantifier { .. }));
}

#[test]
fn dangling_sort_annotation_is_rejected() {
    let err = parse_err("Agent", &[]);
    assert!(matches!(err, DcecError::InvalidSortAnnotation { ref sort, .. } if sort == "Agent"));
    assert_eq!(err.code(), "E-ANNOTATION");
}

#[test]
fn annotation_followed_by_a_sort_is_rejected() {
    assert_eq!(parse_err("Agent Moment", &[]).code(), "E-ANNOTATION");
}

#[test]
fn annotation_must_agree_with_the_return_sort() {
    let err = parse_err("Moment happens(e, t)", &["Event e", "Moment t"]);
    assert!(matches!(err, DcecError::InvalidSortAnnotation { ref sort, .. } if sort == "Moment"));
}

#[test]
fn annotation_compatible_with_the_return_sort_is_accepted() {
    let out = parse_ok("Object happens(e, t)", &["Event e", "Moment t"]);
    assert_eq!(s_form(&out), "(happens e t)");
}

#[test]
fn inline_annotation_types_an_atomic() {
    let out = parse_ok("Red(Agent john)", &["Boolean Red Object"]);
    assert_eq!(s_form(&out), "(Red john)");
    let sorts = out.discovered.atomics.get("john").expect("john sorts");
    assert_eq!(sorts.first().map(String::as_str), Some("Agent"));
}

#[test]
fn inline_function_without_return_sort_is_rejected() {
    let err = parse_err("likes(john, mary)", &["Agent john", "Agent mary"]);
    assert_eq!(err, DcecError::UnresolvedInlineReturnType("likes".to_string()));
    assert_eq!(err.code(), "E-INLINE");
}

#[test]
fn inline_function_needs_typed_arguments() {
    let err = parse_err("Boolean likes(john, stranger)", &["Agent john"]);
    assert!(matches!(
        err,
        DcecError::UntypedArgument { ref function, ref arg } if function == "likes" && arg == "stranger"
    ));
}

#[test]
fn annotated_inline_name_warns_and_uses_the_annotation() {
    let out = parse_ok("Boolean likes john mary", &["Agent john", "Agent mary"]);
    assert_eq!(s_form(&out), "(likes john mary)");
    assert_eq!(warning_codes(&out), vec!["W-INLINE"]);
    let overloads = out.discovered.functions.get("likes").expect("likes");
    assert_eq!(overloads[0].ret, "Boolean");
}

#[test]
fn group_in_function_position_is_rejected() {
    let err = parse_err("(Red a) b", &["Boolean Red Object"]);
    assert!(matches!(err, DcecError::InvalidFunctionName(_)));
    assert_eq!(err.code(), "E-EXPR");
}

#[test]
fn mismatched_parens_are_rejected() {
    assert_eq!(parse_err("Red(a", &["Boolean Red Object"]).code(), "E-PAREN");
    assert_eq!(parse_err("Red(a))", &["Boolean Red Object"]).code(), "E-PAREN");
}

#[test]
fn nesting_beyond_the_limit_is_rejected() {
    let ns = namespace_with(&["Boolean a"]);
    let options = ParseOptions {
        max_depth: 2,
        ..ParseOptions::default()
    };
    let deep = format!("{}a{}", "not(".repeat(10), ")".repeat(10));
    let err = parse_statement_with(&deep, &ns, &options).expect_err("too deep");
    assert_eq!(err, DcecError::RecursionLimit(2));
    assert_eq!(err.code(), "E-DEPTH");

    let out = parse_statement_with(&deep, &ns, &ParseOptions::default()).expect("within limit");
    assert!(out.tree.as_arg().expect("tree").depth() > 10);
}

#[test]
fn quantifiers_count_towards_the_nesting_limit() {
    let ns = namespace_with(&["Boolean Red Object"]);
    let options = ParseOptions {
        max_depth: 5,
        ..ParseOptions::default()
    };
    let quantified = |count: usize| {
        let vars: Vec<String> = (0..count).map(|i| format!("v{i}")).collect();
        format!("forAll [{}] Red(v0)", vars.join(","))
    };

    let err = parse_statement_with(&quantified(10), &ns, &options).expect_err("too many binders");
    assert_eq!(err, DcecError::RecursionLimit(5));
    assert!(parse_statement_with(&quantified(3), &ns, &options).is_ok());

    let err = parse_statement_with(&quantified(30_000), &ns, &ParseOptions::default())
        .expect_err("too many binders");
    assert_eq!(err, DcecError::RecursionLimit(256));
}

#[test]
fn long_infix_chains_are_bounded_by_the_limit() {
    let prototypes: Vec<String> = (0..10).map(|i| format!("Boolean p{i}")).collect();
    let refs: Vec<&str> = prototypes.iter().map(String::as_str).collect();
    let ns = namespace_with(&refs);
    let text = (0..10).map(|i| format!("p{i}")).collect::<Vec<_>>().join(" & ");
    let options = ParseOptions {
        max_depth: 4,
        ..ParseOptions::default()
    };

    let err = parse_statement_with(&text, &ns, &options).expect_err("chain too deep");
    assert_eq!(err, DcecError::RecursionLimit(4));

    let out = parse_statement_with(&text, &ns, &ParseOptions::default()).expect("within limit");
    assert_eq!(out.tree.as_arg().expect("tree").depth(), 10);
}

#[test]
fn custom_comment_markers_are_honoured() {
    let ns = namespace_with(&["Boolean a"]);
    let options = ParseOptions {
        comment_markers: vec!['%'],
        ..ParseOptions::default()
    };
    let out = parse_statement_with("not(a) % trailing", &ns, &options).expect("parse");
    assert_eq!(s_form(&out), "(not a)");
}

#[test]
fn variable_used_before_its_quantifier_warns() {
    let out = parse_ok("x & forAll x Red(x)", &["Boolean Red Object"]);
    assert_eq!(s_form(&out), "(forAll QUANT0 (and x (Red QUANT0)))");
    assert_eq!(warning_codes(&out), vec!["W-PRENEX"]);
}
