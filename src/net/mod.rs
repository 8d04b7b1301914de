//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - TLS terminates at the edge, connections arrive as plain TCP

pub mod listener;

pub use listener::{ConnectionPermit, Listener, ListenerError};
