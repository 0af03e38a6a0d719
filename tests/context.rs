//! Context-injection tests: argument position, capability check, manual
//! response override and custom context fields.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use pathcall::EngineOptions;

mod common;

#[tokio::test]
async fn passes_context_as_the_last_argument() {
    let options = EngineOptions {
        append_context: true,
        ..Default::default()
    };
    let addr = common::spawn_app(options).await;
    let resp = common::client()
        .get(format!("http://{addr}/funcWithContext(10,20)"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.json::<i64>().await.expect("body"), 30);
}

#[tokio::test]
async fn handlers_can_refuse_positional_invocation() {
    // Without injection the last argument is a plain value and the
    // capability check fails.
    let addr = common::spawn_app(EngineOptions::default()).await;
    let resp = common::client()
        .get(format!("http://{addr}/funcWithContext(10,20)"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 400);
    assert!(!resp.text().await.expect("body").is_empty());
}

#[tokio::test]
async fn passes_context_as_the_first_argument() {
    let options = EngineOptions {
        append_context: true,
        context_as_first_argument: true,
        ..Default::default()
    };
    let addr = common::spawn_app(options).await;
    let resp = common::client()
        .get(format!("http://{addr}/funcWithPrependedContext(10,20)"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.json::<i64>().await.expect("body"), 30);
}

#[tokio::test]
async fn handlers_can_override_the_response() {
    let options = EngineOptions {
        append_context: true,
        context_as_first_argument: true,
        ..Default::default()
    };
    let addr = common::spawn_app(options).await;
    let resp = common::client()
        .get(format!("http://{addr}/overrideResponse(10,20)"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 200);
    // The handler wrote x * y through the context; its x + y return value
    // is not serialized.
    assert_eq!(resp.text().await.expect("body"), "200");
}

#[tokio::test]
async fn merges_custom_context_fields() {
    let options = EngineOptions {
        append_context: true,
        context_as_first_argument: true,
        create_context: Some(Arc::new(|_args: &[Value]| {
            let mut fields = Map::new();
            fields.insert("z".to_string(), json!(10));
            fields
        })),
        ..Default::default()
    };
    let addr = common::spawn_app(options).await;
    let resp = common::client()
        .get(format!("http://{addr}/customContext(10,20)"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.json::<i64>().await.expect("body"), 40);
}
