use std::collections::BTreeMap;

use serde::Serialize;

use crate::token::{Arg, Token};

pub const QUANTIFIER_KEYWORDS: [&str; 2] = ["forAll", "exists"];

pub fn is_quantifier(word: &str) -> bool {
    QUANTIFIER_KEYWORDS.contains(&word)
}

/// A quantifier pulled out of a statement, with its internal binder name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quantifier {
    pub keyword: String,
    pub variable: String,
}

impl Quantifier {
    pub fn new(keyword: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            variable: variable.into(),
        }
    }
}

/// Two-way map between the variable names a user wrote and the binder
/// names generated for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bindings {
    surface_to_internal: BTreeMap<String, String>,
    internal_to_surface: BTreeMap<String, String>,
}

impl Bindings {
    pub fn bind(&mut self, surface: &str, internal: &str) {
        self.surface_to_internal
            .insert(surface.to_string(), internal.to_string());
        self.internal_to_surface
            .insert(internal.to_string(), surface.to_string());
    }

    pub fn internal(&self, surface: &str) -> Option<&str> {
        self.surface_to_internal.get(surface).map(String::as_str)
    }

    pub fn surface(&self, internal: &str) -> Option<&str> {
        self.internal_to_surface.get(internal).map(String::as_str)
    }

    pub fn is_bound_surface(&self, name: &str) -> bool {
        self.surface_to_internal.contains_key(name)
    }

    pub fn internal_to_surface(&self) -> &BTreeMap<String, String> {
        &self.internal_to_surface
    }

    pub fn is_empty(&self) -> bool {
        self.internal_to_surface.is_empty()
    }
}

/// Wraps `tree` in the quantifiers, first quantifier outermost.
pub fn reassemble(tree: Arg, quantifiers: &[Quantifier]) -> Arg {
    quantifiers.iter().rev().fold(tree, |body, q| {
        Arg::Node(Token::new(
            q.keyword.clone(),
            vec![Arg::Leaf(q.variable.clone()), body],
        ))
    })
}
