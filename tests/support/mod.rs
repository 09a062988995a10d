#![allow(dead_code)]

use std::path::PathBuf;

use dcec::{Arg, Container, DcecError, Namespace, ParseOutcome, parse_statement};

pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

pub fn base_namespace() -> Namespace {
    Namespace::with_base().expect("base vocabulary should load")
}

/// Base namespace plus the given prototype lines, in order.
pub fn namespace_with(prototypes: &[&str]) -> Namespace {
    let mut ns = base_namespace();
    for prototype in prototypes {
        ns.declare(prototype).expect("prototype should be accepted");
    }
    ns
}

pub fn container_with(prototypes: &[&str]) -> Container {
    Container::new(namespace_with(prototypes))
}

pub fn parse_ok(text: &str, prototypes: &[&str]) -> ParseOutcome {
    let ns = namespace_with(prototypes);
    parse_statement(text, &ns).expect("statement should parse")
}

pub fn parse_err(text: &str, prototypes: &[&str]) -> DcecError {
    let ns = namespace_with(prototypes);
    parse_statement(text, &ns).expect_err("statement should be rejected")
}

/// S-form of the parsed tree, `()` for an empty statement.
pub fn s_form(outcome: &ParseOutcome) -> String {
    outcome
        .tree
        .as_arg()
        .map(|arg| arg.s_expression().to_string())
        .unwrap_or_else(|| "()".to_string())
}

pub fn leaf(name: &str) -> Arg {
    Arg::leaf(name)
}
