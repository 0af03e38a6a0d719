//! Per-request invocation context.
//!
//! Created once per request when context injection is enabled, passed to
//! handlers as one extra argument slot, and mutated only by the invoked
//! handler. Never ambient state: the injection position is explicit
//! configuration, not positional magic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use axum::http::request::Parts;
use serde_json::{Map, Value};

/// Buffered manual response. A handler that takes over the reply writes
/// status and body here; the adapter sends them verbatim and the engine
/// skips its own serialization.
#[derive(Debug, Clone, Default)]
pub struct ResponseOverride {
    pub status: Option<u16>,
    pub body: Option<String>,
}

/// Request-scoped context available to handlers through the injected
/// argument slot.
pub struct CallContext {
    /// Positional arguments of the call currently being dispatched;
    /// updated by the engine before each injected invocation.
    args: Mutex<Vec<Value>>,
    /// Custom fields merged in by the host's `create_context` hook.
    fields: Map<String, Value>,
    /// Head of the request being dispatched, when the adapter supplies it.
    request: Option<Parts>,
    handled: AtomicBool,
    response: Mutex<ResponseOverride>,
}

impl CallContext {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            args: Mutex::new(Vec::new()),
            fields,
            request: None,
            handled: AtomicBool::new(false),
            response: Mutex::new(ResponseOverride::default()),
        }
    }

    /// Context carrying the request head for handlers that inspect the
    /// underlying request.
    pub fn with_request(fields: Map<String, Value>, request: Parts) -> Self {
        Self {
            request: Some(request),
            ..Self::new(fields)
        }
    }

    /// The head of the request being dispatched.
    pub fn request(&self) -> Option<&Parts> {
        self.request.as_ref()
    }

    /// Arguments of the call currently being dispatched.
    pub fn args(&self) -> Vec<Value> {
        self.args.lock().expect("context mutex poisoned").clone()
    }

    pub(crate) fn set_args(&self, args: Vec<Value>) {
        *self.args.lock().expect("context mutex poisoned") = args;
    }

    /// A custom field from the host's `create_context` hook.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    /// Mark the response as written manually. The engine reports `Handled`
    /// and serializes nothing.
    pub fn set_handled(&self) {
        self.handled.store(true, Ordering::SeqCst);
    }

    pub fn handled(&self) -> bool {
        self.handled.load(Ordering::SeqCst)
    }

    /// Write the manual response and mark the request handled.
    pub fn respond(&self, status: u16, body: impl Into<String>) {
        let mut response = self.response.lock().expect("context mutex poisoned");
        response.status = Some(status);
        response.body = Some(body.into());
        drop(response);
        self.set_handled();
    }

    /// The buffered manual response, if any was written.
    pub fn response(&self) -> ResponseOverride {
        self.response.lock().expect("context mutex poisoned").clone()
    }
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("fields", &self.fields)
            .field("handled", &self.handled())
            .finish_non_exhaustive()
    }
}
