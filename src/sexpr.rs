use crate::config::DEFAULT_MAX_DEPTH;
use crate::diagnostics::{Diagnostic, make_span};
use crate::token::{Arg, Token};

#[derive(Debug, Clone)]
struct Lexeme {
    kind: LexemeKind,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LexemeKind {
    LParen,
    RParen,
    Comma,
    Atom(String),
}

#[derive(Debug, Clone)]
enum SExpr {
    Atom(String),
    List(Vec<SExpr>, usize, usize),
}

pub fn parse_s_expression(src: &str) -> Result<Arg, Diagnostic> {
    let lexemes: Vec<Lexeme> = lex(src)
        .into_iter()
        .filter(|l| l.kind != LexemeKind::Comma)
        .collect();
    let mut idx = 0usize;
    let form = parse_one(src, &lexemes, &mut idx, 0)?;
    expect_end(src, &lexemes, idx)?;
    to_arg(src, form)
}

pub fn parse_f_expression(src: &str) -> Result<Arg, Diagnostic> {
    let lexemes = lex(src);
    let mut idx = 0usize;
    let arg = parse_call(src, &lexemes, &mut idx, 0)?;
    expect_end(src, &lexemes, idx)?;
    Ok(arg)
}

fn lex(src: &str) -> Vec<Lexeme> {
    let mut lexemes = Vec::new();
    let bytes = src.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        let ch = bytes[i] as char;
        if ch.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let single = match ch {
            '(' => Some(LexemeKind::LParen),
            ')' => Some(LexemeKind::RParen),
            ',' => Some(LexemeKind::Comma),
            _ => None,
        };
        if let Some(kind) = single {
            lexemes.push(Lexeme {
                kind,
                start: i,
                end: i + 1,
            });
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() {
            let c = bytes[i] as char;
            if c.is_ascii_whitespace() || c == '(' || c == ')' || c == ',' {
                break;
            }
            i += 1;
        }
        lexemes.push(Lexeme {
            kind: LexemeKind::Atom(src[start..i].to_string()),
            start,
            end: i,
        });
    }

    lexemes
}

fn error_at(src: &str, message: impl Into<String>, start: usize, end: usize) -> Diagnostic {
    Diagnostic::new("E-SEXPR", message, Some(make_span(src, start, end)))
}

fn unexpected_eof(src: &str) -> Diagnostic {
    error_at(src, "unexpected end of input", src.len(), src.len())
}

fn too_deep(src: &str, l: &Lexeme) -> Diagnostic {
    error_at(
        src,
        format!("nested deeper than {DEFAULT_MAX_DEPTH} levels"),
        l.start,
        l.end,
    )
}

fn expect_end(src: &str, lexemes: &[Lexeme], idx: usize) -> Result<(), Diagnostic> {
    match lexemes.get(idx) {
        None => Ok(()),
        Some(extra) => Err(error_at(
            src,
            "trailing input after the expression",
            extra.start,
            extra.end,
        )),
    }
}

fn parse_one(
    src: &str,
    lexemes: &[Lexeme],
    idx: &mut usize,
    depth: usize,
) -> Result<SExpr, Diagnostic> {
    let Some(l) = lexemes.get(*idx) else {
        return Err(unexpected_eof(src));
    };
    match &l.kind {
        LexemeKind::Atom(s) => {
            *idx += 1;
            Ok(SExpr::Atom(s.clone()))
        }
        LexemeKind::RParen | LexemeKind::Comma => {
            Err(error_at(src, "unexpected ')'", l.start, l.end))
        }
        LexemeKind::LParen if depth >= DEFAULT_MAX_DEPTH => Err(too_deep(src, l)),
        LexemeKind::LParen => {
            let start = l.start;
            *idx += 1;
            let mut items = Vec::new();
            loop {
                let Some(cur) = lexemes.get(*idx) else {
                    return Err(error_at(src, "unbalanced parentheses", start, start + 1));
                };
                if cur.kind == LexemeKind::RParen {
                    let end = cur.end;
                    *idx += 1;
                    return Ok(SExpr::List(items, start, end));
                }
                items.push(parse_one(src, lexemes, idx, depth + 1)?);
            }
        }
    }
}

fn to_arg(src: &str, form: SExpr) -> Result<Arg, Diagnostic> {
    match form {
        SExpr::Atom(name) => Ok(Arg::Leaf(name)),
        SExpr::List(items, start, end) => {
            let mut items = items.into_iter();
            let name = match items.next() {
                Some(SExpr::Atom(name)) => name,
                Some(SExpr::List(_, s, e)) => {
                    return Err(error_at(src, "function name must be an atom", s, e));
                }
                None => return Err(error_at(src, "empty list", start, end)),
            };
            let args = items
                .map(|item| to_arg(src, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Arg::Node(Token::new(name, args)))
        }
    }
}

fn parse_call(
    src: &str,
    lexemes: &[Lexeme],
    idx: &mut usize,
    depth: usize,
) -> Result<Arg, Diagnostic> {
    let Some(l) = lexemes.get(*idx) else {
        return Err(unexpected_eof(src));
    };
    let LexemeKind::Atom(name) = &l.kind else {
        return Err(error_at(src, "expected a name", l.start, l.end));
    };
    *idx += 1;

    match lexemes.get(*idx) {
        Some(open) if open.kind == LexemeKind::LParen && depth >= DEFAULT_MAX_DEPTH => {
            Err(too_deep(src, open))
        }
        Some(open) if open.kind == LexemeKind::LParen => {
            *idx += 1;
            let mut args = Vec::new();
            if let Some(close) = lexemes.get(*idx) {
                if close.kind == LexemeKind::RParen {
                    *idx += 1;
                    return Ok(Arg::Node(Token::new(name.clone(), args)));
                }
            }
            loop {
                args.push(parse_call(src, lexemes, idx, depth + 1)?);
                let Some(sep) = lexemes.get(*idx) else {
                    return Err(error_at(src, "unbalanced parentheses", open.start, open.end));
                };
                *idx += 1;
                match sep.kind {
                    LexemeKind::Comma => continue,
                    LexemeKind::RParen => return Ok(Arg::Node(Token::new(name.clone(), args))),
                    _ => return Err(error_at(src, "expected ',' or ')'", sep.start, sep.end)),
                }
            }
        }
        _ => Ok(Arg::Leaf(name.clone())),
    }
}
