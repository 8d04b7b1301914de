//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Normalized path
//!     → router.rs (ordered scan of mounted templates)
//!     → template.rs (segment-by-segment match)
//!     → Return: (mounted handler group, params, forwarding sub-path) or None
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Compile patterns into RouteTemplates
//!     → Bind each to a registered handler group
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: registration order, first match wins
//! - No match is `None`, answered by the dispatcher with a 404

pub mod router;
pub mod template;

pub use router::{MountedRoute, RouteTable, RouteTableError};
pub use template::{ParamValue, Params, RouteMatch, RouteTemplate, Segment, TemplateError};
