//! Path-expression invocation engine.
//!
//! Turns an HTTP request's URL path into a resolved, possibly-chained
//! function call against an in-memory routing graph, with arguments drawn
//! from the header, query, body and cookie parameter sources and
//! type-inferred from their textual form.
//!
//! ```text
//! GET /binary(x,20)?x=10
//!     → params   x resolves to 10 (query), 20 infers to a number
//!     → parse    [ binary(10, 20) ]
//!     → engine   routes.binary → handler(10, 20) → 30
//!     → adapter  200 application/json  30
//! ```
//!
//! The engine is an in-process library: embed [`adapter::app`] in an axum
//! host, or run [`adapter::serve`] standalone.

// Core evaluation pipeline
pub mod engine;
pub mod params;
pub mod parse;
pub mod value;

// Host surface
pub mod adapter;
pub mod config;
pub mod observability;

pub use adapter::{app, serve};
pub use config::EngineOptions;
pub use engine::{invoke, Dispatch, EngineError};
pub use value::{Arg, BoxError, CallArgs, Namespace, Node, Outcome};
