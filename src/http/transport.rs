//! Response transport between the relay and the host runtime.
//!
//! The relay owns a [`ResponseWriter`]; the host runtime owns the matching
//! [`TransportResponse`] and turns it into a hyper response once the head
//! arrives. Body chunks travel over a bounded channel, so a slow client
//! suspends the relay instead of growing a buffer.
//!
//! ```text
//! relay ──head──▶ oneshot ──▶ TransportResponse::into_response
//!       ──chunk─▶ mpsc(N) ──▶ TransportBody::poll_frame ──▶ socket
//! ```

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use hyper::body::{Body as HttpBody, Frame};
use tokio::sync::{mpsc, oneshot};

use crate::error::RelayError;

type Chunk = Result<Frame<Bytes>, io::Error>;

/// Status line and headers, sent once.
#[derive(Debug)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Create a connected writer/response pair with `capacity` buffered chunks.
pub fn channel(capacity: usize) -> (ResponseWriter, TransportResponse) {
    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(capacity.max(1));
    (
        ResponseWriter {
            head_tx: Some(head_tx),
            body_tx,
        },
        TransportResponse { head_rx, body_rx },
    )
}

/// Write half: status and headers once, then body chunks.
///
/// Dropping the writer ends the body.
#[derive(Debug)]
pub struct ResponseWriter {
    head_tx: Option<oneshot::Sender<ResponseHead>>,
    body_tx: mpsc::Sender<Chunk>,
}

impl ResponseWriter {
    pub fn head_sent(&self) -> bool {
        self.head_tx.is_none()
    }

    pub fn write_head(&mut self, status: StatusCode, headers: HeaderMap) -> Result<(), RelayError> {
        let tx = self.head_tx.take().ok_or(RelayError::HeadAlreadySent)?;
        tx.send(ResponseHead { status, headers })
            .map_err(|_| RelayError::Closed)
    }

    /// Send one chunk, waiting while the channel is full.
    pub async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), RelayError> {
        if !self.head_sent() {
            return Err(RelayError::InvalidHead("body chunk written before head".into()));
        }
        if chunk.is_empty() {
            return Ok(());
        }
        self.body_tx
            .send(Ok(Frame::data(chunk)))
            .await
            .map_err(|_| RelayError::Closed)
    }

    /// Complete the body.
    pub fn finish(self) {}

    /// Terminate the connection mid-body; the client sees a truncated response.
    pub async fn abort(self, reason: impl Into<String>) {
        let _ = self
            .body_tx
            .send(Err(io::Error::other(reason.into())))
            .await;
    }
}

/// Read half held by the host runtime.
#[derive(Debug)]
pub struct TransportResponse {
    head_rx: oneshot::Receiver<ResponseHead>,
    body_rx: mpsc::Receiver<Chunk>,
}

impl TransportResponse {
    /// Wait for the head and build the response.
    ///
    /// A writer dropped before sending a head (a panicking handler task, for
    /// instance) yields a plain 500.
    pub async fn into_response(self) -> Response<TransportBody> {
        match self.head_rx.await {
            Ok(head) => {
                let mut response = Response::new(TransportBody::channel(self.body_rx));
                *response.status_mut() = head.status;
                *response.headers_mut() = head.headers;
                response
            }
            Err(_) => {
                tracing::error!("Response writer dropped before sending a head");
                let body = Bytes::from_static(
                    br#"{"error":"Internal Server Error","message":"response was never produced"}"#,
                );
                let mut response = Response::new(TransportBody::Full(Some(body)));
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response
            }
        }
    }
}

/// Body type handed to hyper.
///
/// A failure pulled off the channel is held back for one poll. hyper drops
/// its unflushed write buffer when a body errors, so the connection gets a
/// `Pending` first and flushes the head and earlier chunks before the error
/// tears it down.
#[derive(Debug)]
pub enum TransportBody {
    Channel {
        rx: mpsc::Receiver<Chunk>,
        failed: Option<io::Error>,
    },
    Full(Option<Bytes>),
}

impl TransportBody {
    fn channel(rx: mpsc::Receiver<Chunk>) -> Self {
        TransportBody::Channel { rx, failed: None }
    }
}

impl HttpBody for TransportBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            TransportBody::Channel { rx, failed } => {
                if let Some(err) = failed.take() {
                    return Poll::Ready(Some(Err(err)));
                }
                match rx.poll_recv(cx) {
                    Poll::Ready(Some(Err(err))) => {
                        *failed = Some(err);
                        cx.waker().wake_by_ref();
                        Poll::Pending
                    }
                    other => other,
                }
            }
            TransportBody::Full(data) => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
        }
    }
}
