use std::collections::BTreeMap;

use dcec::{Arg, Token, parse_f_expression, parse_s_expression};

fn sample() -> Token {
    // implies(B(john, t, happy), not(sad))
    Token::new(
        "implies",
        vec![
            Arg::Node(Token::new(
                "B",
                vec![Arg::leaf("john"), Arg::leaf("t"), Arg::leaf("happy")],
            )),
            Arg::Node(Token::new("not", vec![Arg::leaf("sad")])),
        ],
    )
}

#[test]
fn depth_counts_the_longest_path() {
    assert_eq!(Arg::leaf("a").depth(), 1);
    assert_eq!(Token::new("f", vec![Arg::leaf("a")]).depth(), 2);
    assert_eq!(sample().depth(), 3);
    assert_eq!(Token::new("c", Vec::new()).depth(), 1);
}

#[test]
fn width_counts_leaves() {
    assert_eq!(Arg::leaf("a").width(), 1);
    assert_eq!(sample().width(), 4);
    assert_eq!(Token::new("c", Vec::new()).width(), 0);
}

#[test]
fn renders_both_notations() {
    let token = sample();
    assert_eq!(
        token.s_expression(),
        "(implies (B john t happy) (not sad))"
    );
    assert_eq!(token.f_expression(), "implies(B(john,t,happy),not(sad))");
    assert_eq!(token.to_string(), token.s_expression());
}

#[test]
fn cached_renderings_do_not_affect_equality() {
    let rendered = sample();
    let _ = rendered.s_expression();
    let _ = rendered.depth();
    assert_eq!(rendered, sample());
}

#[test]
fn s_expression_reads_back_into_the_same_tree() {
    let token = sample();
    let parsed = parse_s_expression(token.s_expression()).expect("parse s-expression");
    assert_eq!(parsed, Arg::Node(token));
}

#[test]
fn f_expression_reads_back_into_the_same_tree() {
    let token = sample();
    let parsed = parse_f_expression(token.f_expression()).expect("parse f-expression");
    assert_eq!(parsed, Arg::Node(token));
}

#[test]
fn s_expression_reader_rejects_bad_input() {
    for src in ["(", "()", "((a) b)", "(a) b", ")"] {
        let err = parse_s_expression(src).expect_err(src);
        assert_eq!(err.code, "E-SEXPR", "{src}");
    }
}

#[test]
fn f_expression_reader_handles_zero_arguments() {
    let parsed = parse_f_expression("now()").expect("parse");
    assert_eq!(parsed, Arg::Node(Token::new("now", Vec::new())));
    assert_eq!(parse_f_expression("x").expect("leaf"), Arg::leaf("x"));
    assert!(parse_f_expression("f(a b)").is_err());
}

#[test]
fn substitute_renames_leaves_only() {
    let names = BTreeMap::from([
        ("john".to_string(), "mary".to_string()),
        ("not".to_string(), "ignored".to_string()),
    ]);
    let renamed = Arg::Node(sample()).substitute(&names);
    assert_eq!(
        renamed.s_expression(),
        "(implies (B mary t happy) (not sad))"
    );
}

#[test]
fn json_uses_names_and_nested_args() {
    let token = Token::new("not", vec![Arg::leaf("sad")]);
    let json = serde_json::to_value(&token).expect("serialize");
    assert_eq!(json, serde_json::json!({ "name": "not", "args": ["sad"] }));
}

#[test]
fn readers_reject_nesting_past_the_default_limit() {
    let levels = 50_000;
    let s_src = format!("{}a{}", "(f ".repeat(levels), ")".repeat(levels));
    let err = parse_s_expression(&s_src).expect_err("s-form too deep");
    assert_eq!(err.code, "E-SEXPR");
    assert!(err.message.contains("deeper than 256"));

    let f_src = format!("{}a{}", "f(".repeat(levels), ")".repeat(levels));
    let err = parse_f_expression(&f_src).expect_err("f-form too deep");
    assert_eq!(err.code, "E-SEXPR");

    let shallow = format!("{}a{}", "(f ".repeat(100), ")".repeat(100));
    assert_eq!(parse_s_expression(&shallow).expect("shallow").depth(), 101);
}

#[test]
fn metrics_are_known_as_soon_as_a_chain_is_built() {
    let mut arg = Arg::leaf("a");
    for _ in 0..1_000 {
        arg = Arg::Node(Token::new("f", vec![arg]));
    }
    assert_eq!(arg.depth(), 1_001);
    assert_eq!(arg.width(), 1);
}
