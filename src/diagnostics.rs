use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn new(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
            source: None,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span: None,
            source: None,
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        hint_for_code(self.code)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hint = self.hint();
        if let Some(source) = self.source() {
            write!(f, "{}: ", source)?;
        }
        if self.is_warning() {
            write!(f, "{}: ", self.severity.as_str())?;
        }
        if let Some(span) = &self.span {
            write!(
                f,
                "{}: {} at {}:{}",
                self.code, self.message, span.line, span.column
            )?;
        } else {
            write!(f, "{}: {}", self.code, self.message)?;
        }
        if let Some(hint) = hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

pub fn hint_for_code(code: &str) -> Option<&'static str> {
    match code {
        "E-IO" => Some("check the input path and read permissions."),
        "E-PAREN" => Some("every '(' needs a matching ')'."),
        "E-SORT" => Some("declare parent sorts before their children."),
        "E-ATOMIC" => Some("an atomic has exactly one sort; rename one of the uses."),
        "E-OPERATOR" => Some(
            "type the operands inline (e.g. `Numeric x`) or use the prefix name (multiply, sub, and, union, ...).",
        ),
        "E-OVERLOAD" => Some("type your atomics so that only one signature fits."),
        "E-INLINE" => Some(
            "place a sort name before the inline function, e.g. `Boolean (f x)`, or declare a prototype.",
        ),
        "E-ANNOTATION" => Some("a sort name must be followed by the atomic or term it types."),
        "E-QUANT" => Some("write quantifiers as `forAll x body`, `forAll [x,y] body` or `forAll (x,y) body`."),
        "E-EXPR" => Some("check the function names and the number of arguments."),
        "E-DEPTH" => Some("split the statement or raise max_depth in the configuration."),
        "E-PROTOTYPE" => Some("prototypes read `ReturnSort name ParamSort...`, `Sort name` or `typedef Name Parent...`."),
        "E-CONFIG" => Some("check the keys and values of the configuration file."),
        "E-SEXPR" => Some("check the parenthesis structure of the S-expression."),
        _ => None,
    }
}

pub fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let mut line = 1usize;
    let mut col = 1usize;
    for (i, ch) in src.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

pub fn make_span(src: &str, start: usize, end: usize) -> Span {
    let (line, column) = line_col(src, start);
    Span {
        start,
        end,
        line,
        column,
    }
}
