use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// One argument slot of a [`Token`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arg {
    Leaf(String),
    Node(Token),
}

impl Arg {
    pub fn leaf(name: impl Into<String>) -> Self {
        Arg::Leaf(name.into())
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Arg::Leaf(name) => Some(name),
            Arg::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Token> {
        match self {
            Arg::Leaf(_) => None,
            Arg::Node(token) => Some(token),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Arg::Leaf(_) => 1,
            Arg::Node(token) => token.depth(),
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Arg::Leaf(_) => 1,
            Arg::Node(token) => token.width(),
        }
    }

    pub fn s_expression(&self) -> &str {
        match self {
            Arg::Leaf(name) => name,
            Arg::Node(token) => token.s_expression(),
        }
    }

    pub fn f_expression(&self) -> &str {
        match self {
            Arg::Leaf(name) => name,
            Arg::Node(token) => token.f_expression(),
        }
    }

    /// Renames leaves found in `names`; everything else is kept.
    pub fn substitute(&self, names: &BTreeMap<String, String>) -> Arg {
        match self {
            Arg::Leaf(name) => Arg::Leaf(names.get(name).unwrap_or(name).clone()),
            Arg::Node(token) => Arg::Node(token.substitute(names)),
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.s_expression())
    }
}

impl From<Token> for Arg {
    fn from(token: Token) -> Self {
        Arg::Node(token)
    }
}

#[derive(Debug, Clone, Default)]
struct Rendered {
    s_expression: OnceLock<String>,
    f_expression: OnceLock<String>,
    depth: OnceLock<usize>,
    width: OnceLock<usize>,
}

/// A function or operator applied to its ordered arguments.
///
/// Depth and width are filled in by [`Token::new`] from the already known
/// metrics of the arguments, so reading them never walks the tree.
/// Serializations are computed on first use. The cache takes no part in
/// equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    name: String,
    args: Vec<Arg>,
    #[serde(skip)]
    rendered: Rendered,
}

impl Token {
    pub fn new(name: impl Into<String>, args: Vec<Arg>) -> Self {
        let rendered = Rendered::default();
        let _ = rendered
            .depth
            .set(1 + args.iter().map(Arg::depth).max().unwrap_or(0));
        let _ = rendered.width.set(args.iter().map(Arg::width).sum());
        Self {
            name: name.into(),
            args,
            rendered,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn depth(&self) -> usize {
        *self.rendered.depth.get_or_init(|| {
            1 + self.args.iter().map(Arg::depth).max().unwrap_or(0)
        })
    }

    /// Number of leaves below this token.
    pub fn width(&self) -> usize {
        *self
            .rendered
            .width
            .get_or_init(|| self.args.iter().map(Arg::width).sum())
    }

    /// `(name arg1 arg2)`
    pub fn s_expression(&self) -> &str {
        self.rendered.s_expression.get_or_init(|| {
            let mut out = format!("({}", self.name);
            for arg in &self.args {
                out.push(' ');
                out.push_str(arg.s_expression());
            }
            out.push(')');
            out
        })
    }

    /// `name(arg1,arg2)`
    pub fn f_expression(&self) -> &str {
        self.rendered.f_expression.get_or_init(|| {
            let args: Vec<&str> = self.args.iter().map(Arg::f_expression).collect();
            format!("{}({})", self.name, args.join(","))
        })
    }

    pub fn substitute(&self, names: &BTreeMap<String, String>) -> Token {
        Token::new(
            self.name.clone(),
            self.args.iter().map(|arg| arg.substitute(names)).collect(),
        )
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.args == other.args
    }
}

impl Eq for Token {}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.s_expression())
    }
}
