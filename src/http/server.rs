//! HTTP server: the host runtime side of the adapter.
//!
//! # Responsibilities
//! - Accept connections from the bounded listener
//! - Serve HTTP/1.1 with hyper, one task per connection
//! - Run each request's dispatch in its own task, connected to the socket
//!   through the response transport
//! - Stop accepting on shutdown, letting in-flight connections finish

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http::{Request, Response};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::sync::broadcast;

use crate::http::dispatcher::Dispatcher;
use crate::http::transport::{self, TransportBody};
use crate::net::listener::{Listener, ListenerError};

/// HTTP server for the adapter.
pub struct HttpServer {
    dispatcher: Arc<Dispatcher>,
    channel_capacity: usize,
}

impl HttpServer {
    pub fn new(dispatcher: Dispatcher, channel_capacity: usize) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            channel_capacity,
        }
    }

    /// Accept and serve until `shutdown` fires.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(address = %addr, routes = self.dispatcher.routes().len(), "HTTP server starting");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer, permit) = match accepted {
                        Ok(conn) => conn,
                        Err(ListenerError::Closed) => return Err(ListenerError::Closed),
                        Err(e) => {
                            tracing::warn!(error = %e, "Accept failed");
                            continue;
                        }
                    };

                    let dispatcher = self.dispatcher.clone();
                    let capacity = self.channel_capacity;
                    tokio::spawn(async move {
                        let _permit = permit;
                        let service = service_fn(move |request: Request<Incoming>| {
                            let dispatcher = dispatcher.clone();
                            async move {
                                Ok::<_, Infallible>(serve_request(dispatcher, request, peer, capacity).await)
                            }
                        });

                        if let Err(e) = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                        {
                            tracing::debug!(peer_addr = %peer, error = %e, "Connection closed with error");
                        }
                    });
                }
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Dispatch one request and hand its transport response to hyper.
async fn serve_request(
    dispatcher: Arc<Dispatcher>,
    request: Request<Incoming>,
    peer: SocketAddr,
    capacity: usize,
) -> Response<TransportBody> {
    let (writer, transport) = transport::channel(capacity);
    tokio::spawn(async move {
        dispatcher.dispatch(request, Some(peer), writer).await;
    });
    transport.into_response().await
}
