//! Handler responses and their relay onto the transport.
//!
//! # Responsibilities
//! - Model a handler response as buffered or streamed
//! - Copy status and headers, minus the internal ones, onto the transport
//! - Materialize buffered bodies, stream the rest chunk by chunk
//! - Turn relay failures into a 500 (head not sent) or an aborted body
//!
//! # Design Decisions
//! - Streamed chunks go through a bounded channel, so the source is only
//!   polled as fast as the client drains
//! - Buffered responses always carry an explicit `content-length`

use axum::body::Body;
use axum::BoxError;
use bytes::Bytes;
use futures_util::{StreamExt, TryStream};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use hyper::body::Body as HttpBody;
use serde::Serialize;

use crate::error::RelayError;
use crate::http::transport::ResponseWriter;
use crate::observability::metrics;

/// Marks a response as streamed regardless of its body.
pub const STREAM_MARKER: &str = "x-content-type-stream";

const EVENT_STREAM: &str = "text/event-stream";

/// A handler response, before it reaches the transport.
#[derive(Debug)]
pub enum ResponseEnvelope {
    Buffered {
        status: StatusCode,
        headers: HeaderMap,
        body: Body,
    },
    Streamed {
        status: StatusCode,
        headers: HeaderMap,
        source: Body,
    },
}

impl ResponseEnvelope {
    pub fn buffered(status: StatusCode, headers: HeaderMap, body: impl Into<Body>) -> Self {
        Self::Buffered {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn streamed(status: StatusCode, headers: HeaderMap, source: Body) -> Self {
        Self::Streamed {
            status,
            headers,
            source,
        }
    }

    /// Streamed response fed by any fallible byte stream.
    pub fn from_stream<S>(status: StatusCode, headers: HeaderMap, stream: S) -> Self
    where
        S: TryStream + Send + 'static,
        S::Ok: Into<Bytes>,
        S::Error: Into<BoxError>,
    {
        Self::streamed(status, headers, Body::from_stream(stream))
    }

    /// Buffered JSON response.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Self::buffered(status, headers, bytes)
            }
            Err(e) => Self::internal_error(&e.to_string()),
        }
    }

    /// `{"error": ..., "message": ...}` envelope.
    pub fn error(status: StatusCode, message: Option<&str>) -> Self {
        let error = status.canonical_reason().unwrap_or("Error");
        let body = match message {
            Some(message) => serde_json::json!({ "error": error, "message": message }),
            None => serde_json::json!({ "error": error }),
        };
        Self::json(status, &body)
    }

    pub fn not_found() -> Self {
        Self::error(StatusCode::NOT_FOUND, Some("The requested path does not exist"))
    }

    pub fn internal_error(message: &str) -> Self {
        let body = serde_json::json!({ "error": "Internal Server Error", "message": message });
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self::buffered(StatusCode::INTERNAL_SERVER_ERROR, headers, body.to_string())
    }

    /// Classify a framework response.
    ///
    /// Streamed when the headers say so or the body length is not known up
    /// front.
    pub fn from_http(response: Response<Body>) -> Self {
        let (parts, body) = response.into_parts();
        let known_length = HttpBody::size_hint(&body).exact().is_some();
        if is_streaming(&parts.headers) || !known_length {
            Self::streamed(parts.status, parts.headers, body)
        } else {
            Self::buffered(parts.status, parts.headers, body)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Buffered { status, .. } | Self::Streamed { status, .. } => *status,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        match self {
            Self::Buffered { headers, .. } | Self::Streamed { headers, .. } => headers,
        }
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        match self {
            Self::Buffered { headers, .. } | Self::Streamed { headers, .. } => headers,
        }
    }

    pub fn is_streamed(&self) -> bool {
        matches!(self, Self::Streamed { .. })
    }
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with(EVENT_STREAM))
}

/// Whether headers announce a streamed body.
pub fn is_streaming(headers: &HeaderMap) -> bool {
    let chunked = headers
        .get(TRANSFER_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
    let marked = headers
        .get(STREAM_MARKER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    is_event_stream(headers) || chunked || marked
}

/// Copies handler responses onto the transport.
#[derive(Debug, Clone, Default)]
pub struct ResponseRelay {
    strip: Vec<HeaderName>,
}

impl ResponseRelay {
    /// Headers named in `strip` are never forwarded; invalid names are ignored.
    pub fn new(strip: &[String]) -> Self {
        let mut names: Vec<HeaderName> = strip
            .iter()
            .filter_map(|name| match HeaderName::from_bytes(name.as_bytes()) {
                Ok(name) => Some(name),
                Err(_) => {
                    tracing::warn!(header = %name, "Ignoring invalid strip header name");
                    None
                }
            })
            .collect();
        names.push(HeaderName::from_static(STREAM_MARKER));
        Self { strip: names }
    }

    /// Relay `envelope`, returning the status the client actually received.
    pub async fn relay(&self, envelope: ResponseEnvelope, mut writer: ResponseWriter) -> StatusCode {
        let status = envelope.status();
        let streamed = envelope.is_streamed();

        let err = match self.write(envelope, &mut writer).await {
            Ok(()) => {
                writer.finish();
                return status;
            }
            Err(err) => err,
        };

        let stage = if writer.head_sent() { "body" } else { "head" };
        metrics::record_relay_error(stage);

        match err {
            RelayError::Closed => {
                tracing::debug!(streamed, "Client went away during relay");
                status
            }
            err if writer.head_sent() => {
                tracing::error!(error = %err, streamed, "Relay failed after head was sent, aborting");
                writer.abort(err.to_string()).await;
                status
            }
            err => {
                tracing::error!(error = %err, streamed, "Relay failed before head was sent");
                let fallback = ResponseEnvelope::internal_error(&err.to_string());
                match self.write(fallback, &mut writer).await {
                    Ok(()) => writer.finish(),
                    Err(e) => tracing::debug!(error = %e, "Fallback response not delivered"),
                }
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    async fn write(&self, envelope: ResponseEnvelope, writer: &mut ResponseWriter) -> Result<(), RelayError> {
        match envelope {
            ResponseEnvelope::Buffered {
                status,
                mut headers,
                body,
            } => {
                self.strip(&mut headers);
                let bytes = axum::body::to_bytes(body, usize::MAX)
                    .await
                    .map_err(|e| RelayError::Source(e.to_string()))?;
                headers.remove(TRANSFER_ENCODING);
                headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
                writer.write_head(status, headers)?;
                writer.write_chunk(bytes).await
            }
            ResponseEnvelope::Streamed {
                status,
                mut headers,
                source,
            } => {
                self.strip(&mut headers);
                if is_event_stream(&headers) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM));
                }
                headers.remove(CONTENT_LENGTH);
                writer.write_head(status, headers)?;

                let mut stream = source.into_data_stream();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(|e| RelayError::Source(e.to_string()))?;
                    writer.write_chunk(chunk).await?;
                }
                Ok(())
            }
        }
    }

    fn strip(&self, headers: &mut HeaderMap) {
        for name in &self.strip {
            headers.remove(name);
        }
    }
}
