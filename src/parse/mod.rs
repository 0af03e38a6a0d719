//! Path expression parsing.
//!
//! # Grammar
//! ```text
//! expr    := step ('.' step)*
//! step    := identifier ('(' argList ')')?
//! argList := (arg (',' arg)*)?
//! arg     := quotedString | jsonLiteral | token
//! ```
//!
//! # Responsibilities
//! - Tokenize the request path into ordered steps
//! - Materialize argument values eagerly at parse time, through the
//!   parameter resolver first and the literal inferencer as fallback
//!
//! # Design Decisions
//! - Step separators and argument commas are recognized only at top
//!   nesting depth outside quotes, so JSON object arguments containing
//!   `.` or `,` parse intact
//! - Quoted-string arguments are never inferred or resolved; they are
//!   string constants
//! - The empty expression parses to zero steps; the engine's
//!   default-member fallback turns that into the root call

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::params::{infer, ParamBags};

/// Parse failure. The engine reports these as Not-Found: a malformed path
/// cannot match any routing member.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty step in path expression")]
    EmptyStep,
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),
    #[error("unbalanced delimiters in path expression")]
    Unbalanced,
    #[error("unterminated string in path expression")]
    UnterminatedString,
    #[error("malformed argument `{0}`")]
    MalformedArgument(String),
    #[error("unexpected input after argument list in `{0}`")]
    TrailingInput(String),
}

/// One dot-separated segment: member access, or a call with materialized
/// argument values. `called` records whether parentheses were written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub args: Vec<Value>,
    pub called: bool,
}

/// An ordered, immutable sequence of steps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedPath {
    pub steps: Vec<Step>,
}

/// Parse a request path into steps, resolving argument tokens through the
/// parameter bags. Leading slashes and a single trailing slash are
/// tolerated; an empty expression yields zero steps.
pub fn parse(path: &str, bags: &ParamBags) -> Result<ParsedPath, ParseError> {
    let expr = path.trim_start_matches('/');
    let expr = expr.strip_suffix('/').unwrap_or(expr);
    if expr.is_empty() {
        return Ok(ParsedPath::default());
    }

    let mut steps = Vec::new();
    for raw in split_top_level(expr, '.')? {
        steps.push(parse_step(raw, bags)?);
    }
    Ok(ParsedPath { steps })
}

/// Split on `sep` at top nesting depth, outside quotes. Tracks `()`/`[]`/
/// `{}` depth and single/double quotes with backslash escapes.
fn split_top_level(input: &str, sep: char) -> Result<Vec<&str>, ParseError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0usize;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => match c {
                '\\' => escaped = true,
                _ if c == q => quote = None,
                _ => {}
            },
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => {
                    depth = depth.checked_sub(1).ok_or(ParseError::Unbalanced)?;
                }
                _ if c == sep && depth == 0 => {
                    parts.push(&input[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }

    if quote.is_some() {
        return Err(ParseError::UnterminatedString);
    }
    if depth != 0 {
        return Err(ParseError::Unbalanced);
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn parse_step(raw: &str, bags: &ParamBags) -> Result<Step, ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ParseError::EmptyStep);
    }

    let Some(open) = raw.find('(') else {
        validate_identifier(raw)?;
        return Ok(Step {
            name: raw.to_string(),
            args: Vec::new(),
            called: false,
        });
    };

    let name = &raw[..open];
    validate_identifier(name)?;

    let rest = &raw[open..];
    if !rest.ends_with(')') {
        return Err(ParseError::TrailingInput(raw.to_string()));
    }
    let body = &rest[1..rest.len() - 1];

    let mut args = Vec::new();
    if !body.trim().is_empty() {
        // An interior `)` at depth zero (e.g. `f(1)(2)`) trips the
        // balance check here.
        for raw_arg in split_top_level(body, ',')? {
            args.push(parse_arg(raw_arg.trim(), bags)?);
        }
    }

    Ok(Step {
        name: name.to_string(),
        args,
        called: true,
    })
}

fn validate_identifier(name: &str) -> Result<(), ParseError> {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        Ok(())
    } else {
        Err(ParseError::InvalidIdentifier(name.to_string()))
    }
}

/// Materialize one argument. Quoted strings are constants; JSON object and
/// array literals are decoded; bare tokens try the resolver first, then
/// fall back to literal inference.
fn parse_arg(raw: &str, bags: &ParamBags) -> Result<Value, ParseError> {
    let Some(first) = raw.chars().next() else {
        return Err(ParseError::MalformedArgument(String::new()));
    };
    match first {
        '\'' | '"' => unquote(raw).map(Value::String),
        '{' | '[' => {
            serde_json::from_str(raw).map_err(|_| ParseError::MalformedArgument(raw.to_string()))
        }
        _ => Ok(bags.resolve(raw).unwrap_or_else(|| infer::infer(raw))),
    }
}

fn unquote(raw: &str) -> Result<String, ParseError> {
    let mut chars = raw.chars();
    let Some(quote) = chars.next() else {
        return Err(ParseError::MalformedArgument(raw.to_string()));
    };
    let mut out = String::new();
    loop {
        match chars.next() {
            Some('\\') => match chars.next() {
                Some(c) => out.push(c),
                None => return Err(ParseError::UnterminatedString),
            },
            Some(c) if c == quote => {
                return if chars.next().is_none() {
                    Ok(out)
                } else {
                    Err(ParseError::TrailingInput(raw.to_string()))
                };
            }
            Some(c) => out.push(c),
            None => return Err(ParseError::UnterminatedString),
        }
    }
}
