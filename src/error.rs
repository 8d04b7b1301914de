//! Error taxonomy shared by the adapter subsystems.
//!
//! # Propagation
//! - `DecodeError` / `BodyError` are cached by the request view and re-raised
//!   to every caller of `NormalizedRequest::body()`, never to the whole request
//! - A missing route is not an error: the route table returns `None` and the
//!   dispatcher answers 404 itself
//! - `DispatchError` and `RelayError` are caught once at the top of the
//!   dispatcher and turned into a 500 envelope (or a terminated connection
//!   when the status line was already sent)

use thiserror::Error;

/// The payload does not match its declared content-type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid JSON in request body: {0}")]
    Json(String),

    #[error("Invalid UTF-8 in text body: {0}")]
    Utf8(String),
}

/// Failure while preloading or decoding a request body.
///
/// `Clone` so the memoized outcome can be handed to every reader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BodyError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Request body too large. Max size: {limit} bytes")]
    SizeLimit { limit: usize },

    #[error("Failed to read request body: {0}")]
    Stream(String),
}

impl BodyError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BodyError::Decode(_) => "decode",
            BodyError::SizeLimit { .. } => "size_limit",
            BodyError::Stream(_) => "stream",
        }
    }
}

/// Failure while writing a response onto the transport.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The peer went away (response body dropped by the host runtime).
    #[error("transport closed by peer")]
    Closed,

    /// Status and headers were already written.
    #[error("response head already sent")]
    HeadAlreadySent,

    /// The response source failed while being drained.
    #[error("response body failed: {0}")]
    Source(String),

    #[error("invalid response head: {0}")]
    InvalidHead(String),
}

/// Failure raised while resolving or invoking a handler group.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("handler group `{group}` failed: {source}")]
    Handler {
        group: String,
        #[source]
        source: axum::BoxError,
    },

    #[error("invalid forwarded uri `{0}`")]
    InvalidUri(String),
}
