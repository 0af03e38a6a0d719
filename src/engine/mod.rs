//! Resolution and invocation over the routing graph.
//!
//! # Responsibilities
//! - Walk parsed steps strictly left-to-right against the routing graph
//! - Invoke handler members and normalize deferred results before the
//!   next step runs
//! - Apply the default-member fallback and the raw-handler short-circuit
//! - Convert handler failures into the invocation error contract
//!
//! # Design Decisions
//! - Deferred values are awaited at exactly one point; no step ever
//!   observes an unresolved future
//! - Invocation is at-most-once per request: no retries, no partial
//!   serialization
//! - Parse failures map to Not-Found: a malformed path matches no route

pub mod context;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::config::EngineOptions;
use crate::parse::{ParseError, ParsedPath};
use crate::value::{BoxError, CallArgs, HandlerFn, Namespace, Node, Outcome, RawFn};
use context::CallContext;

/// Terminal result of one request's evaluation.
pub enum Dispatch {
    /// Plain value for the adapter to serialize.
    Value(Value),
    /// A handler wrote the response through the context; serialize nothing.
    Handled,
    /// Terminal raw handler; the adapter runs it against the request
    /// primitives.
    Raw(RawFn),
}

/// Failure taxonomy for one request. All failures are terminal.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown member, lookup into a non-namespace value, or a malformed
    /// path.
    #[error("Not found.")]
    NotFound,
    /// A routing handler failed, synchronously or via a rejected deferred
    /// value. Carries the handler's message.
    #[error("{0}")]
    Invocation(String),
}

impl From<ParseError> for EngineError {
    fn from(_: ParseError) -> Self {
        EngineError::NotFound
    }
}

/// Evaluate a parsed path expression against the routing graph.
pub async fn invoke(
    routes: &Namespace,
    parsed: &ParsedPath,
    options: &EngineOptions,
    context: Option<Arc<CallContext>>,
) -> Result<Dispatch, EngineError> {
    let mut cursor = Node::Namespace(routes.clone());

    for step in &parsed.steps {
        let member = cursor.member(&step.name).ok_or(EngineError::NotFound)?;
        cursor = match member {
            Node::Handler(handler) => {
                tracing::debug!(step = %step.name, args = step.args.len(), "Invoking handler");
                call(&handler, step.args.clone(), options, context.as_ref()).await?
            }
            _ if step.called => {
                // Parentheses on a member that is not invocable.
                return Err(EngineError::NotFound);
            }
            node => node,
        };
    }

    // Default-member fallback: a terminal namespace holding the reserved
    // member as a handler is called with no arguments.
    if let Some(Node::Handler(default)) = cursor.member(&options.default_member) {
        tracing::debug!(member = %options.default_member, "Invoking default member");
        cursor = call(&default, Vec::new(), options, None).await?;
    }

    if let Some(ctx) = &context {
        if ctx.handled() {
            return Ok(Dispatch::Handled);
        }
    }

    match cursor {
        Node::Value(value) => Ok(Dispatch::Value(value)),
        Node::Raw(raw) => Ok(Dispatch::Raw(raw)),
        // A terminal namespace without the default member names a
        // namespace, not a result.
        Node::Namespace(_) => Err(EngineError::NotFound),
        // A handler returned an invocable that no further step consumed;
        // functions are not serializable and the raw escape is `Node::Raw`.
        Node::Handler(_) => Err(EngineError::Invocation(
            "call chain ended on an invocable value".to_string(),
        )),
    }
}

/// Invoke one handler and normalize its outcome. This is the single point
/// where deferred values are resolved.
async fn call(
    handler: &HandlerFn,
    args: Vec<Value>,
    options: &EngineOptions,
    context: Option<&Arc<CallContext>>,
) -> Result<Node, EngineError> {
    let mut call_args = CallArgs::new(args.clone());
    if options.append_context {
        if let Some(ctx) = context {
            ctx.set_args(args);
            call_args.inject_context(ctx.clone(), options.context_as_first_argument);
        }
    }

    match handler(call_args).map_err(invocation_error)? {
        Outcome::Ready(node) => Ok(node),
        Outcome::Deferred(future) => future.await.map_err(invocation_error),
    }
}

fn invocation_error(err: BoxError) -> EngineError {
    EngineError::Invocation(err.to_string())
}
