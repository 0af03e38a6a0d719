//! Literal type inference for bare tokens.
//!
//! Applied to argument tokens in path expressions and to textual values
//! from the header, query and cookie bags. Never applied to path-step
//! identifiers.

use serde_json::Value;

/// Convert a bare token into a typed value: `true`/`false` become
/// booleans, complete numeric literals become numbers, everything else
/// stays the original string. Total function, no error path.
pub fn infer(token: &str) -> Value {
    match token {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ if is_numeric_literal(token) => parse_number(token),
        _ => Value::String(token.to_string()),
    }
}

/// Complete numeric literal: optional sign, digits, optional fractional
/// part, optional exponent. Checked by hand because `f64::from_str` also
/// accepts `inf`, `infinity` and `NaN`, which must stay strings.
fn is_numeric_literal(token: &str) -> bool {
    let mut chars = token.chars().peekable();

    if matches!(chars.peek(), Some('+') | Some('-')) {
        chars.next();
    }

    let mut int_digits = 0usize;
    while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
        chars.next();
        int_digits += 1;
    }
    if int_digits == 0 {
        return false;
    }

    if chars.peek() == Some(&'.') {
        chars.next();
        let mut frac_digits = 0usize;
        while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
            chars.next();
            frac_digits += 1;
        }
        if frac_digits == 0 {
            return false;
        }
    }

    if matches!(chars.peek(), Some('e') | Some('E')) {
        chars.next();
        if matches!(chars.peek(), Some('+') | Some('-')) {
            chars.next();
        }
        let mut exp_digits = 0usize;
        while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
            chars.next();
            exp_digits += 1;
        }
        if exp_digits == 0 {
            return false;
        }
    }

    chars.next().is_none()
}

fn parse_number(token: &str) -> Value {
    if !token.contains(['.', 'e', 'E']) {
        if let Ok(n) = token.parse::<i64>() {
            return Value::from(n);
        }
    }
    match token.parse::<f64>() {
        Ok(n) => Value::from(n),
        // Unreachable for tokens that pass the grammar check; keep the
        // token text rather than panic.
        Err(_) => Value::String(token.to_string()),
    }
}
