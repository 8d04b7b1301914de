//! HTTP compatibility adapter for edge function runtimes.
//!
//! Bridges the bare host runtime (hyper) to framework-shaped handler groups
//! (axum routers), the way the edge platform expects them.

pub mod config;
pub mod decode;
pub mod error;
pub mod handler;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::AdapterConfig;
pub use crate::http::{Dispatcher, HttpServer};
pub use lifecycle::Shutdown;
