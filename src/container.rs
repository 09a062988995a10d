use serde::{Deserialize, Serialize};

use crate::config::{Config, ParseOptions};
use crate::error::DcecError;
use crate::namespace::{Namespace, Signature};
use crate::parser::{ParseOutcome, parse_statement_with};
use crate::token::{Arg, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notation {
    /// `(name a b)`
    S,
    /// `name(a,b)`
    F,
}

/// A session: one namespace and the statements accepted into it, in order.
#[derive(Debug, Clone)]
pub struct Container {
    namespace: Namespace,
    options: ParseOptions,
    statements: Vec<Arg>,
}

impl Container {
    pub fn new(namespace: Namespace) -> Self {
        Self::with_options(namespace, ParseOptions::default())
    }

    pub fn with_options(namespace: Namespace, options: ParseOptions) -> Self {
        Self {
            namespace,
            options,
            statements: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, DcecError> {
        Ok(Self::with_options(config.namespace()?, config.options()))
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn statements(&self) -> &[Arg] {
        &self.statements
    }

    pub fn declare(&mut self, prototype: &str) -> Result<(), DcecError> {
        self.namespace.declare(prototype)
    }

    /// Parses `text` and merges what it declares into the namespace.
    ///
    /// A rejected statement leaves the container unchanged. Empty statements
    /// are accepted but not stored.
    pub fn add_statement(&mut self, text: &str) -> Result<ParseOutcome, DcecError> {
        let outcome = parse_statement_with(text, &self.namespace, &self.options)?;
        if let Some(tree) = outcome.tree.as_arg() {
            self.namespace.absorb(&outcome.discovered)?;
            self.statements.push(tree);
        }
        Ok(outcome)
    }

    pub fn sort_of(&self, arg: &Arg) -> Option<String> {
        match arg {
            Arg::Leaf(name) => self.namespace.atomic_sort(name).map(str::to_string),
            Arg::Node(token) => self.overload_for(token).map(|sig| sig.ret.clone()),
        }
    }

    pub fn sorts_of_params(&self, token: &Token) -> Option<Vec<String>> {
        self.overload_for(token).map(|sig| sig.params.clone())
    }

    /// First overload whose arity matches and whose parameters accept the
    /// sorts of the token's children.
    fn overload_for(&self, token: &Token) -> Option<&Signature> {
        self.namespace
            .overloads(token.name())
            .iter()
            .filter(|sig| sig.arity() == token.args().len())
            .find(|sig| {
                token.args().iter().zip(&sig.params).all(|(child, param)| {
                    let fits = match self.sort_of(child) {
                        Some(sort) => self.namespace.is_compatible(&sort, param).0,
                        None => true,
                    };
                    fits || (param == "Fluent" && child.as_node().is_some())
                })
            })
    }

    /// Renders `arg` with binder names replaced by the names the user wrote.
    pub fn render(&self, arg: &Arg, notation: Notation) -> String {
        let surface = arg.substitute(self.namespace.quantifier_names());
        match notation {
            Notation::S => surface.s_expression().to_string(),
            Notation::F => surface.f_expression().to_string(),
        }
    }
}
