//! Engine configuration.
//!
//! # Design Decisions
//! - Options are programmatic (the engine is embedded, not file-driven);
//!   all fields have defaults so hosts configure only what they change
//! - Context injection position is an explicit flag, not positional magic
//! - The reserved default-member name is configuration, not a constant

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Host hook merging custom fields into the per-request call context.
/// Receives the initial call's materialized arguments.
pub type CreateContext = Arc<dyn Fn(&[Value]) -> Map<String, Value> + Send + Sync>;

/// Options controlling context injection and dispatch.
#[derive(Clone)]
pub struct EngineOptions {
    /// Inject the call context as one extra argument slot.
    pub append_context: bool,
    /// Prepend rather than append the context slot. Meaningful only with
    /// `append_context`.
    pub context_as_first_argument: bool,
    /// Hook producing custom context fields; identity when absent.
    pub create_context: Option<CreateContext>,
    /// Reserved member invoked on the root path and on terminal
    /// namespaces.
    pub default_member: String,
    /// Mount prefix stripped from request paths before parsing.
    pub url_prefix: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            append_context: false,
            context_as_first_argument: false,
            create_context: None,
            default_member: "index".to_string(),
            url_prefix: "/".to_string(),
        }
    }
}

impl fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field("append_context", &self.append_context)
            .field("context_as_first_argument", &self.context_as_first_argument)
            .field("create_context", &self.create_context.as_ref().map(|_| ".."))
            .field("default_member", &self.default_member)
            .field("url_prefix", &self.url_prefix)
            .finish()
    }
}
