//! Failure injection: handler errors, panics and broken response streams.

use std::sync::Arc;
use std::time::Duration;

use axum::BoxError;
use bytes::Bytes;
use edge_adapter::config::{AdapterConfig, RouteConfig};
use edge_adapter::handler::{handler_fn, HandlerGroup, StaticGroup};
use edge_adapter::http::{NormalizedRequest, ResponseEnvelope};
use futures_util::stream;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::Value;

mod common;

fn single_route(pattern: &str, group: &str) -> AdapterConfig {
    let mut config = AdapterConfig::default();
    config.routes = vec![RouteConfig {
        pattern: pattern.to_string(),
        group: group.to_string(),
    }];
    config
}

#[tokio::test]
async fn test_handler_error_becomes_500() {
    let failing = handler_fn("failing", |_req: NormalizedRequest| async move {
        Err::<ResponseEnvelope, BoxError>("database unavailable".into())
    });
    let adapter = common::start_adapter(
        single_route("/api/:rest*", "failing"),
        common::registry_with("failing", Arc::new(failing)),
    )
    .await;

    let res = reqwest::get(adapter.url("/api/orders")).await.unwrap();
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Internal Server Error");
    assert!(body["message"].as_str().unwrap().contains("database unavailable"));
}

#[tokio::test]
async fn test_handler_panic_becomes_500_and_server_survives() {
    let panicking = handler_fn("panicking", |req: NormalizedRequest| async move {
        if req.path() == "/boom" {
            panic!("handler bug");
        }
        Ok::<_, BoxError>(ResponseEnvelope::json(StatusCode::OK, &serde_json::json!({"ok": true})))
    });
    let adapter = common::start_adapter(
        single_route("/api/:rest*", "panicking"),
        common::registry_with("panicking", Arc::new(panicking)),
    )
    .await;

    let res = reqwest::get(adapter.url("/api/boom")).await.unwrap();
    assert_eq!(res.status(), 500);

    let res = reqwest::get(adapter.url("/api/fine")).await.unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_stream_failure_after_head_truncates_response() {
    let broken = handler_fn("broken", |_req: NormalizedRequest| async move {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/event-stream"));
        let events = stream::iter(vec![
            Ok(Bytes::from_static(b"data: 1\n\n")),
            Err(std::io::Error::other("upstream reset")),
        ]);
        Ok::<_, BoxError>(ResponseEnvelope::from_stream(StatusCode::OK, headers, events))
    });
    let adapter = common::start_adapter(
        single_route("/feed", "broken"),
        common::registry_with("broken", Arc::new(broken)),
    )
    .await;

    let res = reqwest::get(adapter.url("/feed")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.text().await.is_err());
}

#[tokio::test]
async fn test_slow_stream_is_delivered_in_order() {
    let slow = handler_fn("slow", |_req: NormalizedRequest| async move {
        let events = stream::unfold(0u32, |i| async move {
            if i == 5 {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            Some((Ok::<_, std::io::Error>(Bytes::from(format!("{};", i))), i + 1))
        });
        Ok::<_, BoxError>(ResponseEnvelope::from_stream(StatusCode::OK, HeaderMap::new(), events))
    });
    let mut config = single_route("/slow", "slow");
    config.relay.channel_capacity = 1;
    let adapter = common::start_adapter(config, common::registry_with("slow", Arc::new(slow))).await;

    let res = reqwest::get(adapter.url("/slow")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "0;1;2;3;4;");
}

#[tokio::test]
async fn test_internal_response_headers_are_stripped() {
    let leaky = handler_fn("leaky", |_req: NormalizedRequest| async move {
        let mut headers = HeaderMap::new();
        headers.insert("eop-client-geo", HeaderValue::from_static("asn=1"));
        headers.insert("x-app", HeaderValue::from_static("kept"));
        Ok::<_, BoxError>(ResponseEnvelope::buffered(StatusCode::CREATED, headers, "made"))
    });
    let adapter = common::start_adapter(
        single_route("/make", "leaky"),
        common::registry_with("leaky", Arc::new(leaky)),
    )
    .await;

    let res = reqwest::get(adapter.url("/make")).await.unwrap();
    assert_eq!(res.status(), 201);
    assert!(res.headers().get("eop-client-geo").is_none());
    assert_eq!(res.headers()["x-app"], "kept");
    assert_eq!(res.headers()["content-length"], "4");
    assert_eq!(res.text().await.unwrap(), "made");
}

#[tokio::test]
async fn test_static_group_status() {
    let group: Arc<dyn HandlerGroup> = Arc::new(
        StaticGroup::new("maintenance", serde_json::json!({"status": "maintenance"}))
            .with_status(StatusCode::SERVICE_UNAVAILABLE),
    );
    let adapter = common::start_adapter(
        single_route("/:rest*", "maintenance"),
        common::registry_with("maintenance", group),
    )
    .await;

    let res = reqwest::get(adapter.url("/anything/at/all")).await.unwrap();
    assert_eq!(res.status(), 503);
}

#[tokio::test]
async fn test_buffered_response_with_chunked_header() {
    let framed = handler_fn("framed", |_req: NormalizedRequest| async move {
        let mut headers = HeaderMap::new();
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        Ok::<_, BoxError>(ResponseEnvelope::buffered(StatusCode::OK, headers, "hello"))
    });
    let adapter = common::start_adapter(
        single_route("/framed", "framed"),
        common::registry_with("framed", Arc::new(framed)),
    )
    .await;

    let res = reqwest::get(adapter.url("/framed")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-length"], "5");
    assert_eq!(res.text().await.unwrap(), "hello");
}
