use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::DcecError;

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,]+").expect("valid separator regex"));

/// Infix symbols and their canonical names, longest symbol first.
/// Symbols mapped to themselves have more than one reading and are left for
/// the resolver to disambiguate.
const SYMBOLS: &[(&str, &str)] = &[
    ("===", "tautology"),
    ("<->", "iff"),
    ("->", "implies"),
    (">=", "greaterOrEqual"),
    ("<=", "lessOrEqual"),
    ("==", "equals"),
    ("^", "exponent"),
    ("*", "*"),
    ("/", "divide"),
    ("+", "add"),
    ("-", "-"),
    ("&", "&"),
    ("|", "|"),
    ("~", "not"),
    ("=", "equals"),
    (">", "greater"),
    ("<", "less"),
];

/// `Ok(None)` means the statement has no content, e.g. `()` or a comment.
pub fn normalize(text: &str, comment_markers: &[char]) -> Result<Option<String>, DcecError> {
    let uncommented = strip_comments(text, comment_markers);
    let composed: String = uncommented.nfc().collect();
    let trimmed = composed.trim();
    if trimmed.is_empty() || is_empty_statement(trimmed) {
        return Ok(None);
    }
    if !check_parens(trimmed) {
        return Err(DcecError::ParenMismatch(trimmed.to_string()));
    }

    let functorized = functorize_symbols(trimmed);
    let spaced = strip_white_space(&functorized);
    let tucked = tuck_functions(&spaced);
    let respaced = strip_white_space(&tucked);
    let consolidated = consolidate_parens(&respaced);
    tracing::debug!(input = trimmed, normalized = %consolidated, "normalized statement");

    if is_empty_statement(&consolidated) {
        return Ok(None);
    }
    Ok(Some(consolidated))
}

fn is_empty_statement(text: &str) -> bool {
    text.chars()
        .all(|c| c == '(' || c == ')' || c == ',' || c.is_whitespace())
}

/// Truncates at the first unescaped comment marker. `\#` keeps a literal `#`.
pub fn strip_comments(expression: &str, markers: &[char]) -> String {
    let mut out = String::with_capacity(expression.len());
    let mut chars = expression.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(&next) = chars.peek() {
                if markers.contains(&next) {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
            out.push(ch);
        } else if markers.contains(&ch) {
            break;
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn functorize_symbols(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len() * 2);
    let mut rest = expression;
    'scan: while let Some(ch) = rest.chars().next() {
        for (symbol, name) in SYMBOLS {
            if rest.starts_with(symbol) {
                out.push(' ');
                out.push_str(name);
                out.push(' ');
                rest = &rest[symbol.len()..];
                continue 'scan;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}

/// Collapses every run of whitespace and commas into one comma, trims
/// separators next to parentheses and separates touching `)(`.
pub fn strip_white_space(expression: &str) -> String {
    let bracketed = expression.replace('[', " [").replace(']', "] ");
    let collapsed = SEPARATOR_RUN.replace_all(&bracketed, " ");
    collapsed
        .trim()
        .replace("( ", "(")
        .replace(" )", ")")
        .replace("[ ", "[")
        .replace(" ]", "]")
        .replace(")(", ") (")
        .replace(' ', ",")
}

fn is_call_boundary(byte: u8) -> bool {
    matches!(byte, b',' | b' ' | b'(' | b')')
}

/// `name(args)` becomes `(name,args)`; `not` and `negate` also wrap their
/// argument in its own pair.
pub fn tuck_functions(expression: &str) -> String {
    let bytes = expression.as_bytes();
    let closes = matching_close_parens(expression);
    let mut out = String::with_capacity(expression.len() + 8);
    let mut doubled_closes = BTreeSet::new();
    let mut word_start = 0usize;

    for (i, ch) in expression.char_indices() {
        match ch {
            '(' if i > 0 && !is_call_boundary(bytes[i - 1]) => {
                let name = out[word_start..].to_string();
                out.truncate(word_start);
                out.push('(');
                out.push_str(&name);
                out.push(',');
                if name == "not" || name == "negate" {
                    out.push('(');
                    if let Some(close) = closes[i] {
                        doubled_closes.insert(close);
                    }
                }
                word_start = out.len();
            }
            '(' => {
                out.push('(');
                word_start = out.len();
            }
            ')' => {
                if doubled_closes.contains(&i) {
                    out.push_str("))");
                } else {
                    out.push(')');
                }
                word_start = out.len();
            }
            ',' | ' ' => {
                out.push(ch);
                word_start = out.len();
            }
            _ => out.push(ch),
        }
    }
    out.replace(",,", ",")
}

/// Wraps the expression in one pair of parentheses and removes every pair
/// that only doubles the pair directly inside it.
pub fn consolidate_parens(expression: &str) -> String {
    let wrapped = format!("({expression})");
    let bytes = wrapped.as_bytes();
    let closes = matching_close_parens(&wrapped);
    let mut redundant = BTreeSet::new();

    for open in 0..bytes.len().saturating_sub(1) {
        if bytes[open] != b'(' || bytes[open + 1] != b'(' {
            continue;
        }
        if let (Some(outer), Some(inner)) = (closes[open], closes[open + 1]) {
            if outer == inner + 1 {
                redundant.insert(open);
                redundant.insert(outer);
            }
        }
    }

    wrapped
        .char_indices()
        .filter(|(i, _)| !redundant.contains(i))
        .map(|(_, c)| c)
        .collect()
}

pub fn check_parens(expression: &str) -> bool {
    let mut depth = 0usize;
    for ch in expression.chars() {
        match ch {
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(next) => depth = next,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

/// For every byte offset holding a `(`, the offset of its matching `)`.
/// Other offsets, and opens left unclosed, hold `None`.
pub fn matching_close_parens(input: &str) -> Vec<Option<usize>> {
    let mut closes = vec![None; input.len()];
    let mut open = Vec::new();
    for (i, byte) in input.bytes().enumerate() {
        match byte {
            b'(' => open.push(i),
            b')' => {
                if let Some(start) = open.pop() {
                    closes[start] = Some(i);
                }
            }
            _ => {}
        }
    }
    closes
}

pub fn get_matching_close_paren(input: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, byte) in input.bytes().enumerate().skip(open) {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
