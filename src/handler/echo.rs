//! Built-in diagnostic routes.
//!
//! `GET /events?count=N` streams N server-sent events; every other path
//! echoes what the adapter decoded for the request.

use std::collections::BTreeMap;
use std::convert::Infallible;

use axum::body::Body;
use axum::extract::Extension;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use futures_util::stream;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::decode::QueryValue;
use crate::http::NormalizedRequest;

const MAX_EVENTS: usize = 100;

pub fn echo_router() -> Router {
    Router::new()
        .route("/events", get(events))
        .route("/", any(echo))
        .route("/{*path}", any(echo))
        .layer(TraceLayer::new_for_http())
}

async fn echo(Extension(request): Extension<NormalizedRequest>) -> Response {
    let body = match request.body().await {
        Ok(body) => body,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Bad Request", "message": e.to_string() })),
            )
                .into_response();
        }
    };

    let headers: BTreeMap<&str, String> = request
        .headers()
        .iter()
        .map(|(k, v)| (k.as_str(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
        .collect();

    Json(json!({
        "method": request.method().as_str(),
        "path": request.path(),
        "originalUrl": request.original_uri().to_string(),
        "query": request.query(),
        "cookies": request.cookies(),
        "headers": headers,
        "body": &*body,
        "context": request.context(),
    }))
    .into_response()
}

async fn events(Extension(request): Extension<NormalizedRequest>) -> Response {
    let count = request
        .query()
        .get("count")
        .and_then(|v| match v {
            QueryValue::Int(n) => usize::try_from(*n).ok(),
            QueryValue::Str(s) => s.parse::<usize>().ok(),
            _ => None,
        })
        .unwrap_or(3)
        .min(MAX_EVENTS);

    let frames = stream::iter((1..=count).map(|i| Ok::<_, Infallible>(format!("data: {}\n\n", i))));
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(frames))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
