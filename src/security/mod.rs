//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (read vendor identity, strip reserved headers)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Reserved vendor headers never reach handler groups
//! - No trust in client input: vendor values are read as lossy text

pub mod headers;

pub use headers::{HeaderSanitizer, VendorHeaders};
