//! Routing graph node model.
//!
//! # Responsibilities
//! - Represent the host-supplied routing graph as a tagged node union
//! - Represent handler results, including deferred (async) ones
//! - Carry call arguments, including the optional injected context slot
//!
//! # Design Decisions
//! - Member lookup is defined uniformly over namespace-like nodes
//!   (`Namespace` and plain JSON objects) instead of relying on reflection
//! - Handlers are `Arc`-wrapped closures so graphs clone cheaply
//! - The raw-handler escape is its own variant, not a convention on
//!   `Handler`, so the engine can short-circuit serialization explicitly

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::http::request::Parts;
use axum::response::Response;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::engine::context::CallContext;

/// Boxed error type used at the handler seam. Handlers may fail with any
/// error; the engine preserves only the message.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Future carried by a deferred handler result.
pub type NodeFuture = BoxFuture<'static, Result<Node, BoxError>>;

/// Invocable member of the routing graph.
pub type HandlerFn = Arc<dyn Fn(CallArgs) -> Result<Outcome, BoxError> + Send + Sync>;

/// Terminal function that takes over response writing entirely. Receives
/// the request head and produces the full response.
pub type RawFn = Arc<dyn Fn(&Parts) -> Response + Send + Sync>;

/// One vertex of the routing graph.
#[derive(Clone)]
pub enum Node {
    /// Plain value, returned as-is without invocation.
    Value(Value),
    /// Nested mapping of members.
    Namespace(Namespace),
    /// Invocable member.
    Handler(HandlerFn),
    /// Function that writes the response itself, bypassing serialization.
    Raw(RawFn),
}

impl Node {
    /// Plain value node.
    pub fn value(value: impl Into<Value>) -> Self {
        Node::Value(value.into())
    }

    /// Invocable node.
    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(CallArgs) -> Result<Outcome, BoxError> + Send + Sync + 'static,
    {
        Node::Handler(Arc::new(f))
    }

    /// Raw-handler node.
    pub fn raw<F>(f: F) -> Self
    where
        F: Fn(&Parts) -> Response + Send + Sync + 'static,
    {
        Node::Raw(Arc::new(f))
    }

    /// Member lookup. Defined for `Namespace` nodes and for plain JSON
    /// objects; every other node has no members.
    pub fn member(&self, name: &str) -> Option<Node> {
        match self {
            Node::Namespace(ns) => ns.get(name).cloned(),
            Node::Value(Value::Object(map)) => map.get(name).cloned().map(Node::Value),
            _ => None,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Node::Namespace(ns) => f.debug_tuple("Namespace").field(ns).finish(),
            Node::Handler(_) => f.write_str("Handler(..)"),
            Node::Raw(_) => f.write_str("Raw(..)"),
        }
    }
}

impl From<Namespace> for Node {
    fn from(ns: Namespace) -> Self {
        Node::Namespace(ns)
    }
}

/// Mapping from member name to node. Keys are unique per level; deeper
/// structure is arbitrary.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    members: BTreeMap<String, Node>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, node: impl Into<Node>) -> Self {
        self.members.insert(name.into(), node.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, node: impl Into<Node>) {
        self.members.insert(name.into(), node.into());
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.members.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Result of invoking a handler: either an immediately available node or a
/// deferred one. The engine normalizes `Deferred` at a single point before
/// the next chain step runs.
pub enum Outcome {
    Ready(Node),
    Deferred(NodeFuture),
}

impl Outcome {
    /// Ready plain value.
    pub fn value(value: impl Into<Value>) -> Self {
        Outcome::Ready(Node::Value(value.into()))
    }

    /// Ready node of any kind.
    pub fn node(node: impl Into<Node>) -> Self {
        Outcome::Ready(node.into())
    }

    /// Deferred node from a future.
    pub fn deferred<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Result<Node, BoxError>> + Send + 'static,
    {
        Outcome::Deferred(Box::pin(future))
    }
}

/// One positional argument slot of a call. The engine adds at most one
/// `Context` slot per call, first or last depending on configuration.
#[derive(Clone)]
pub enum Arg {
    Value(Value),
    Context(Arc<CallContext>),
}

impl Arg {
    /// Capability check: lets a handler refuse being invoked with a plain
    /// value where it expects the injected context.
    pub fn is_context(&self) -> bool {
        matches!(self, Arg::Context(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(v) => Some(v),
            Arg::Context(_) => None,
        }
    }

    pub fn as_context(&self) -> Option<&Arc<CallContext>> {
        match self {
            Arg::Context(ctx) => Some(ctx),
            Arg::Value(_) => None,
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Arg::Context(_) => f.write_str("Context(..)"),
        }
    }
}

/// Positional arguments passed to a handler.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    args: Vec<Arg>,
}

impl CallArgs {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            args: values.into_iter().map(Arg::Value).collect(),
        }
    }

    pub(crate) fn inject_context(&mut self, context: Arc<CallContext>, first: bool) {
        if first {
            self.args.insert(0, Arg::Context(context));
        } else {
            self.args.push(Arg::Context(context));
        }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    /// The value at `index`, failing on missing slots and on the injected
    /// context slot.
    pub fn value(&self, index: usize) -> Result<&Value, BoxError> {
        match self.args.get(index) {
            Some(Arg::Value(v)) => Ok(v),
            Some(Arg::Context(_)) => Err(format!("argument {index} is an injected context").into()),
            None => Err(format!("argument {index} is missing").into()),
        }
    }

    pub fn number(&self, index: usize) -> Result<f64, BoxError> {
        self.value(index)?
            .as_f64()
            .ok_or_else(|| format!("argument {index} is not a number").into())
    }

    pub fn str(&self, index: usize) -> Result<&str, BoxError> {
        self.value(index)?
            .as_str()
            .ok_or_else(|| format!("argument {index} is not a string").into())
    }

    pub fn bool(&self, index: usize) -> Result<bool, BoxError> {
        self.value(index)?
            .as_bool()
            .ok_or_else(|| format!("argument {index} is not a boolean").into())
    }

    /// The injected context, wherever it sits.
    pub fn context(&self) -> Option<&Arc<CallContext>> {
        self.args.iter().find_map(Arg::as_context)
    }
}

/// Build a JSON number, collapsing integral floats so arithmetic over
/// inferred integers serializes without a trailing `.0`.
pub fn number(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}
