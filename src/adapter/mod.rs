//! Axum request adapter.
//!
//! # Data Flow
//! ```text
//! axum::http::Request
//!     → parameter bags (header, query, body, cookie)
//!     → parse (steps with materialized argument values)
//!     → engine::invoke (walk, call, flatten deferred results)
//!     → serialize (text / JSON / manual override / raw handler)
//! ```
//!
//! # Design Decisions
//! - The engine never sees raw HTTP: this module owns all transport
//!   syntax (percent-decoding, cookie pairs, body decoding)
//! - String payloads go out as plain text, everything else as JSON
//! - Parse failures and unknown members both answer 404 `Not found.`;
//!   handler failures answer 400 with the handler's message

pub mod request_id;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::EngineOptions;
use crate::engine::{self, context::CallContext, Dispatch, EngineError};
use crate::params::ParamBags;
use crate::parse;
use crate::value::Namespace;
use request_id::{RequestIdLayer, X_REQUEST_ID};

/// Upper bound on buffered request bodies.
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Ceiling on one request's evaluation, deferred values included.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<Namespace>,
    pub options: Arc<EngineOptions>,
}

/// Build an axum router dispatching every path to the engine. Embed it in
/// a host application or hand it to [`serve`].
pub fn app(routes: Namespace, options: EngineOptions) -> Router {
    let state = AppState {
        routes: Arc::new(routes),
        options: Arc::new(options),
    };

    Router::new()
        .route("/", any(dispatch_handler))
        .route("/{*path}", any(dispatch_handler))
        .with_state(state)
        .layer(TimeoutLayer::new(DISPATCH_TIMEOUT))
        .layer(RequestIdLayer)
        .layer(TraceLayer::new_for_http())
}

/// Run the engine as a standalone server on the given listener.
pub async fn serve(
    listener: TcpListener,
    routes: Namespace,
    options: EngineOptions,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Dispatch server starting");

    axum::serve(listener, app(routes, options)).await?;

    tracing::info!("Dispatch server stopped");
    Ok(())
}

/// Main dispatch handler: bags, parse, invoke, serialize.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let raw_path = parts.uri.path().to_string();

    let Some(expr) = strip_prefix(&raw_path, &state.options.url_prefix) else {
        tracing::warn!(request_id = %request_id, path = %raw_path, "Path outside mount prefix");
        return not_found();
    };
    let path = percent_decode_str(expr).decode_utf8_lossy().into_owned();

    let body_bytes = match axum::body::to_bytes(body, MAX_BODY_SIZE).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(request_id = %request_id, error = %err, "Unable to buffer request body");
            return (StatusCode::BAD_REQUEST, "Unable to read request body").into_response();
        }
    };

    let bags = ParamBags {
        header: header_bag(&parts.headers),
        query: query_bag(parts.uri.query()),
        body: body_bag(&parts.headers, &body_bytes),
        cookie: cookie_bag(&parts.headers),
    };

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        path = %path,
        "Dispatching path expression"
    );

    let parsed = match parse::parse(&path, &bags) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(request_id = %request_id, path = %path, error = %err, "Malformed path expression");
            return not_found();
        }
    };

    let context = if state.options.append_context {
        let base_args: Vec<Value> = parsed
            .steps
            .first()
            .map(|step| step.args.clone())
            .unwrap_or_default();
        let fields = match &state.options.create_context {
            Some(hook) => hook(&base_args),
            None => Map::new(),
        };
        Some(Arc::new(CallContext::with_request(fields, parts.clone())))
    } else {
        None
    };

    match engine::invoke(&state.routes, &parsed, &state.options, context.clone()).await {
        Ok(Dispatch::Value(Value::String(text))) => (StatusCode::OK, text).into_response(),
        Ok(Dispatch::Value(value)) => (StatusCode::OK, Json(value)).into_response(),
        Ok(Dispatch::Handled) => {
            let over = context
                .as_ref()
                .map(|ctx| ctx.response())
                .unwrap_or_default();
            let status = over
                .status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::OK);
            (status, over.body.unwrap_or_default()).into_response()
        }
        Ok(Dispatch::Raw(raw)) => raw(&parts),
        Err(EngineError::NotFound) => {
            tracing::warn!(request_id = %request_id, path = %path, "No matching member");
            not_found()
        }
        Err(EngineError::Invocation(message)) => {
            tracing::error!(request_id = %request_id, path = %path, error = %message, "Handler failed");
            (StatusCode::BAD_REQUEST, message).into_response()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found.").into_response()
}

/// Strip the configured mount prefix. `None` means the request is outside
/// the mount and cannot name a route.
fn strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() || prefix == "/" {
        return Some(path);
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// All request headers as textual parameters.
fn header_bag(headers: &HeaderMap) -> Map<String, Value> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let text = value.to_str().ok()?;
            Some((name.as_str().to_string(), Value::String(text.to_string())))
        })
        .collect()
}

/// Query-string pairs, percent-decoded. Later duplicates win.
fn query_bag(query: Option<&str>) -> Map<String, Value> {
    let Some(query) = query else {
        return Map::new();
    };
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(name, value)| (name.into_owned(), Value::String(value.into_owned())))
        .collect()
}

/// Decoded body parameters: JSON object fields, or form fields for
/// urlencoded bodies. Anything else contributes nothing.
fn body_bag(headers: &HeaderMap, body: &[u8]) -> Map<String, Value> {
    if body.is_empty() {
        return Map::new();
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("application/json") {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => Map::new(),
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        url::form_urlencoded::parse(body)
            .map(|(name, value)| (name.into_owned(), Value::String(value.into_owned())))
            .collect()
    } else {
        Map::new()
    }
}

/// `Cookie` header pairs, percent-decoded.
fn cookie_bag(headers: &HeaderMap) -> Map<String, Value> {
    let mut bag = Map::new();
    for value in headers.get_all(header::COOKIE) {
        let Ok(text) = value.to_str() else { continue };
        for pair in text.split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };
            let value = percent_decode_str(value).decode_utf8_lossy().into_owned();
            bag.insert(name.trim().to_string(), Value::String(value));
        }
    }
    bag
}
