//! Request body reading and content-type driven decoding.
//!
//! # Responsibilities
//! - Decide whether a request carries a body at all
//! - Drain the body stream exactly once, bounded by a maximum size
//! - Decode the collected bytes according to the declared content-type
//!
//! # Design Decisions
//! - Size is checked per frame so an oversized body aborts mid-stream
//! - A single-frame body is returned without copying
//! - Empty payloads decode to `BodyValue::Empty` whatever the content-type

use std::collections::BTreeMap;

use axum::BoxError;
use bytes::{Bytes, BytesMut};
use http::{header, HeaderMap, Method};
use http_body_util::BodyExt;
use hyper::body::Body as HttpBody;
use serde::Serialize;

use crate::error::{BodyError, DecodeError};

/// Default upper bound for a request body (50 MiB).
pub const MAX_BODY_SIZE: usize = 50 * 1024 * 1024;

/// A decoded request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BodyValue {
    /// No body was sent (or it was empty).
    Empty,
    Json(serde_json::Value),
    Form(BTreeMap<String, String>),
    Text(String),
    /// Unrecognized content-types pass through untouched.
    Bytes(#[serde(serialize_with = "serialize_bytes")] Bytes),
}

fn serialize_bytes<S: serde::Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_bytes(bytes)
}

impl BodyValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, BodyValue::Empty)
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            BodyValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            BodyValue::Form(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            BodyValue::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            BodyValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// Media type without parameters, trimmed and lowercased.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether the request may carry a body worth reading.
///
/// A GET/HEAD without `content-length` and without chunked framing is
/// treated as bodiless and its stream is never touched.
pub fn expects_body(method: &Method, headers: &HeaderMap) -> bool {
    let has_length = headers.contains_key(header::CONTENT_LENGTH);
    let chunked = headers
        .get(header::TRANSFER_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false);

    has_length || chunked || !(method == Method::GET || method == Method::HEAD)
}

/// Drain a body stream, failing once more than `limit` bytes arrive.
pub async fn read_to_limit<B>(body: B, limit: usize) -> Result<Bytes, BodyError>
where
    B: HttpBody<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let mut body = Box::pin(body);
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut total = 0usize;

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| BodyError::Stream(e.into().to_string()))?;
        let Ok(data) = frame.into_data() else {
            // Trailers carry no payload.
            continue;
        };

        total += data.len();
        if total > limit {
            return Err(BodyError::SizeLimit { limit });
        }
        if !data.is_empty() {
            chunks.push(data);
        }
    }

    Ok(match chunks.len() {
        0 => Bytes::new(),
        1 => chunks.pop().unwrap_or_default(),
        _ => {
            let mut buf = BytesMut::with_capacity(total);
            for chunk in &chunks {
                buf.extend_from_slice(chunk);
            }
            buf.freeze()
        }
    })
}

/// Decode collected bytes by their declared content-type.
pub fn decode(bytes: Bytes, content_type: &str) -> Result<BodyValue, DecodeError> {
    if bytes.is_empty() {
        return Ok(BodyValue::Empty);
    }

    match media_type(content_type).as_str() {
        "application/json" => serde_json::from_slice(&bytes)
            .map(BodyValue::Json)
            .map_err(|e| DecodeError::Json(e.to_string())),
        "application/x-www-form-urlencoded" => {
            let form = url::form_urlencoded::parse(&bytes)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            Ok(BodyValue::Form(form))
        }
        "text/plain" => String::from_utf8(bytes.to_vec())
            .map(BodyValue::Text)
            .map_err(|e| DecodeError::Utf8(e.to_string())),
        _ => Ok(BodyValue::Bytes(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use http_body_util::{Full, StreamBody};
    use hyper::body::Frame;

    fn chunked(parts: Vec<&'static str>) -> StreamBody<impl futures_util::Stream<Item = Result<Frame<Bytes>, std::io::Error>>> {
        StreamBody::new(stream::iter(
            parts
                .into_iter()
                .map(|p| Ok::<_, std::io::Error>(Frame::data(Bytes::from_static(p.as_bytes())))),
        ))
    }

    #[test]
    fn test_json_body() {
        let v = decode(Bytes::from_static(br#"{"a":1}"#), "application/json; charset=utf-8").unwrap();
        assert_eq!(v.as_json(), Some(&serde_json::json!({"a": 1})));
    }

    #[test]
    fn test_truncated_json_is_decode_error() {
        let err = decode(Bytes::from_static(br#"{"a":"#), "application/json").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
        assert!(err.to_string().starts_with("Invalid JSON in request body"));
    }

    #[test]
    fn test_form_body() {
        let v = decode(Bytes::from_static(b"name=cats+and+dogs&x=1&x=2"), "Application/X-WWW-Form-Urlencoded").unwrap();
        let form = v.as_form().unwrap();
        assert_eq!(form.get("name").map(String::as_str), Some("cats and dogs"));
        assert_eq!(form.get("x").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_text_body() {
        let v = decode(Bytes::from_static("héllo".as_bytes()), "text/plain").unwrap();
        assert_eq!(v.as_text(), Some("héllo"));

        let err = decode(Bytes::from_static(&[0xff, 0xfe]), "text/plain").unwrap_err();
        assert!(matches!(err, DecodeError::Utf8(_)));
    }

    #[test]
    fn test_unknown_types_pass_through() {
        let raw = Bytes::from_static(&[0x89, b'P', b'N', b'G']);
        let v = decode(raw.clone(), "image/png").unwrap();
        assert_eq!(v.as_bytes(), Some(&raw));
        let v = decode(raw.clone(), "application/octet-stream").unwrap();
        assert_eq!(v.as_bytes(), Some(&raw));
        let v = decode(raw.clone(), "").unwrap();
        assert_eq!(v.as_bytes(), Some(&raw));
    }

    #[test]
    fn test_empty_payload_is_empty() {
        assert!(decode(Bytes::new(), "application/json").unwrap().is_empty());
    }

    #[test]
    fn test_expects_body() {
        let mut headers = HeaderMap::new();
        assert!(!expects_body(&Method::GET, &headers));
        assert!(expects_body(&Method::POST, &headers));

        headers.insert(header::TRANSFER_ENCODING, "Chunked".parse().unwrap());
        assert!(expects_body(&Method::GET, &headers));

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, "3".parse().unwrap());
        assert!(expects_body(&Method::GET, &headers));
    }

    #[tokio::test]
    async fn test_read_concatenates_frames() {
        let bytes = read_to_limit(chunked(vec!["ab", "", "cd"]), 16).await.unwrap();
        assert_eq!(&bytes[..], b"abcd");
    }

    #[tokio::test]
    async fn test_read_single_frame() {
        let bytes = read_to_limit(Full::new(Bytes::from_static(b"xyz")), 16).await.unwrap();
        assert_eq!(&bytes[..], b"xyz");
    }

    #[tokio::test]
    async fn test_read_enforces_limit() {
        let err = read_to_limit(chunked(vec!["1234", "5678"]), 6).await.unwrap_err();
        assert_eq!(err, BodyError::SizeLimit { limit: 6 });
    }

    #[tokio::test]
    async fn test_read_at_exact_limit() {
        let bytes = read_to_limit(chunked(vec!["123", "456"]), 6).await.unwrap();
        assert_eq!(bytes.len(), 6);
    }

    #[tokio::test]
    async fn test_read_stream_error() {
        let failing = StreamBody::new(stream::iter(vec![
            Ok(Frame::data(Bytes::from_static(b"ok"))),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ]));
        let err = read_to_limit(failing, 16).await.unwrap_err();
        assert!(matches!(err, BodyError::Stream(msg) if msg.contains("reset")));
    }
}
