//! Parameter sources and cross-source resolution.
//!
//! # Responsibilities
//! - Hold the four per-request parameter bags (header, query, body, cookie)
//! - Resolve an argument name to a typed value with fixed precedence
//! - Decode structured JSON text carried in query and cookie values
//!
//! # Design Decisions
//! - Precedence is fixed (header > query > body > cookie), not configurable,
//!   and applies independently per name
//! - Body values arrive already structured from the adapter and are never
//!   re-inferred
//! - Only complete JSON object/array text is decoded; scalar-looking tokens
//!   (a bare number, `true`) go through the ordinary literal inferencer

pub mod infer;

use serde_json::{Map, Value};

/// The four request-borne parameter sources, built fresh per request and
/// immutable for the request's lifetime.
#[derive(Debug, Clone, Default)]
pub struct ParamBags {
    pub header: Map<String, Value>,
    pub query: Map<String, Value>,
    pub body: Map<String, Value>,
    pub cookie: Map<String, Value>,
}

impl ParamBags {
    /// Look up `name` across the four bags; the first hit wins. Returns
    /// `None` when the name is in no bag, letting the parser fall back to
    /// literal inference on the token.
    pub fn resolve(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.header.get(name) {
            return Some(textual(v));
        }
        if let Some(v) = self.query.get(name) {
            return Some(structured(v));
        }
        if let Some(v) = self.body.get(name) {
            return Some(v.clone());
        }
        self.cookie.get(name).map(structured)
    }
}

/// Header values are plain text; literal inference only.
fn textual(value: &Value) -> Value {
    match value {
        Value::String(s) => infer::infer(s),
        other => other.clone(),
    }
}

/// Query and cookie values may carry percent-decoded JSON text, enabling
/// structured arguments in a URL.
fn structured(value: &Value) -> Value {
    match value {
        Value::String(s) => decode_structured(s).unwrap_or_else(|| infer::infer(s)),
        other => other.clone(),
    }
}

/// Decode a string that is syntactically complete JSON object/array text.
fn decode_structured(text: &str) -> Option<Value> {
    let head = text.trim_start();
    if head.starts_with('{') || head.starts_with('[') {
        serde_json::from_str(text).ok()
    } else {
        None
    }
}
