//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper http1, one task per request)
//!     → dispatcher.rs (vendor headers, routing, context)
//!     → request.rs (normalized view, body preload)
//!     → [handler group]
//!     → response.rs (relay: buffered or streamed)
//!     → transport.rs (bounded channel to the socket)
//! ```

pub mod context;
pub mod dispatcher;
pub mod request;
pub mod response;
pub mod server;
pub mod transport;

pub use context::{EnvSnapshot, RequestContext, ServerInfo};
pub use dispatcher::Dispatcher;
pub use request::{AdapterOptions, IntoNormalized, NormalizedRequest, RequestAdapter};
pub use response::{ResponseEnvelope, ResponseRelay};
pub use server::HttpServer;
