//! Shared routing fixture and server helpers for the integration suite.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use pathcall::value::{number, CallArgs};
use pathcall::{BoxError, EngineOptions, Namespace, Node, Outcome};

fn add(args: CallArgs) -> Result<Outcome, BoxError> {
    Ok(Outcome::value(number(args.number(0)? + args.number(1)?)))
}

/// The routing graph exercised by the whole suite.
pub fn routes() -> Namespace {
    Namespace::new()
        .with("index", Node::handler(|_| Ok(Outcome::value("Home page!"))))
        .with("about", Node::handler(|_| Ok(Outcome::value("A tiny dispatch service"))))
        .with("static", Node::value("A static property"))
        .with(
            "unary",
            Node::handler(|args: CallArgs| Ok(Outcome::value(number(args.number(0)? + 10.0)))),
        )
        .with("binary", Node::handler(add))
        .with(
            "divide",
            Node::handler(|args: CallArgs| {
                Ok(Outcome::value(number(args.number(0)? / args.number(1)?)))
            }),
        )
        .with(
            "tripletAdder",
            Node::handler(|args: CallArgs| {
                Ok(Outcome::value(number(
                    args.number(0)? + args.number(1)? + args.number(2)?,
                )))
            }),
        )
        .with("namespace", Namespace::new().with("binary", Node::handler(add)))
        .with(
            "nested",
            Namespace::new().with("namespace", Namespace::new().with("binary", Node::handler(add))),
        )
        .with(
            "json",
            Node::handler(|args: CallArgs| {
                let x = args
                    .value(0)?
                    .get("x")
                    .and_then(Value::as_f64)
                    .ok_or("missing field x")?;
                Ok(Outcome::value(number(x + 20.0)))
            }),
        )
        .with("throw", Node::handler(|_| Err("Exception!".into())))
        .with(
            "chainAdder1",
            Node::handler(|args: CallArgs| {
                let x = args.number(0)?;
                Ok(Outcome::node(Namespace::new().with(
                    "chainAdder2",
                    Node::handler(move |args: CallArgs| {
                        Ok(Outcome::value(number(x + args.number(0)?)))
                    }),
                )))
            }),
        )
        .with(
            "infer",
            Node::handler(|args: CallArgs| {
                Ok(Outcome::value(json!({
                    "_bool": args.value(0)?,
                    "_num": args.value(1)?,
                    "_str": args.value(2)?,
                })))
            }),
        )
        .with(
            "promiseToAdd",
            Node::handler(|args: CallArgs| {
                let (x, y) = (args.number(0)?, args.number(1)?);
                Ok(Outcome::deferred(async move {
                    Ok(Node::value(number(x + y)))
                }))
            }),
        )
        .with(
            "functionOnPromise",
            Node::handler(|args: CallArgs| {
                let (x, y) = (args.number(0)?, args.number(1)?);
                Ok(Outcome::deferred(async move {
                    Ok(Node::from(Namespace::new().with(
                        "adder",
                        Node::handler(move |args: CallArgs| {
                            Ok(Outcome::value(number(x + y + args.number(0)?)))
                        }),
                    )))
                }))
            }),
        )
        .with(
            "defaultFunction",
            Node::handler(|args: CallArgs| {
                let (x, y) = (args.number(0)?, args.number(1)?);
                Ok(Outcome::node(Namespace::new().with(
                    "index",
                    Node::handler(move |_| Ok(Outcome::value(number(x + y)))),
                )))
            }),
        )
        .with(
            "funcWithContext",
            Node::handler(|args: CallArgs| {
                let last = args.len().checked_sub(1).ok_or("missing arguments")?;
                if !args.get(last).is_some_and(|arg| arg.is_context()) {
                    return Err("invalid invocation of funcWithContext".into());
                }
                Ok(Outcome::value(number(args.number(0)? + args.number(1)?)))
            }),
        )
        .with(
            "funcWithPrependedContext",
            Node::handler(|args: CallArgs| {
                // Context occupies slot 0.
                Ok(Outcome::value(number(args.number(1)? + args.number(2)?)))
            }),
        )
        .with(
            "overrideResponse",
            Node::handler(|args: CallArgs| {
                let ctx = args.context().ok_or("context not injected")?;
                let (x, y) = (args.number(1)?, args.number(2)?);
                ctx.respond(200, ((x * y) as i64).to_string());
                Ok(Outcome::value(number(x + y)))
            }),
        )
        .with(
            "customContext",
            Node::handler(|args: CallArgs| {
                let ctx = args.context().ok_or("context not injected")?;
                let z = ctx
                    .field("z")
                    .and_then(|v| v.as_f64())
                    .ok_or("missing context field z")?;
                Ok(Outcome::value(number(z + args.number(1)? + args.number(2)?)))
            }),
        )
        .with(
            "rawHandler",
            Node::handler(|args: CallArgs| {
                let (x, y) = (args.number(0)?, args.number(1)?);
                Ok(Outcome::node(Node::raw(move |_parts| {
                    (StatusCode::OK, ((x * y) as i64).to_string()).into_response()
                })))
            }),
        )
}

/// Spawn the dispatch server on an ephemeral port.
pub async fn spawn_app(options: EngineOptions) -> SocketAddr {
    pathcall::observability::logging::init("pathcall=debug,tower_http=debug");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");

    tokio::spawn(pathcall::serve(listener, routes(), options));

    addr
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("build test client")
}
