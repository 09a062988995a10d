pub mod base;
pub mod cleaning;
pub mod config;
pub mod container;
pub mod diagnostics;
pub mod error;
pub mod namespace;
pub mod parser;
pub mod prenex;
pub mod sexpr;
pub mod token;

pub use base::BaseGroup;
pub use config::{Config, ParseOptions};
pub use container::{Container, Notation};
pub use diagnostics::{Diagnostic, Severity, Span};
pub use error::DcecError;
pub use namespace::{Namespace, Signature};
pub use parser::{Discovered, ParseOutcome, Parsed, parse_statement, parse_statement_with};
pub use prenex::Quantifier;
pub use sexpr::{parse_f_expression, parse_s_expression};
pub use token::{Arg, Token};
