//! Handler groups.
//!
//! # Data Flow
//! ```text
//! Dispatcher (route resolved, context attached)
//!     → HandlerGroup::call(NormalizedRequest)
//!         → router.rs (axum Router mounted as a group)
//!         → echo.rs   (built-in diagnostic routes)
//!     → ResponseEnvelope → relay
//! ```
//!
//! # Design Decisions
//! - Groups are trait objects registered by name; routes reference the name
//! - A group sees the forwarded sub-path, never the mount prefix
//! - Errors are boxed and become a 500 in the dispatcher

pub mod echo;
pub mod router;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::BoxError;
use futures_util::future::{BoxFuture, FutureExt};
use http::StatusCode;

use crate::http::{NormalizedRequest, ResponseEnvelope};

pub use echo::echo_router;
pub use router::RouterGroup;

/// A named request handler mounted behind one or more route templates.
pub trait HandlerGroup: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn call(&self, request: NormalizedRequest) -> BoxFuture<'static, Result<ResponseEnvelope, BoxError>>;
}

/// Groups available to route configuration, keyed by name.
pub type HandlerRegistry = HashMap<String, Arc<dyn HandlerGroup>>;

/// Always answers with the same JSON document.
#[derive(Debug, Clone)]
pub struct StaticGroup {
    name: String,
    status: StatusCode,
    body: serde_json::Value,
}

impl StaticGroup {
    pub fn new(name: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            status: StatusCode::OK,
            body,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl HandlerGroup for StaticGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, _request: NormalizedRequest) -> BoxFuture<'static, Result<ResponseEnvelope, BoxError>> {
        let envelope = ResponseEnvelope::json(self.status, &self.body);
        futures_util::future::ready(Ok(envelope)).boxed()
    }
}

/// Group backed by an async closure.
pub struct FnGroup<F> {
    name: String,
    f: F,
}

/// Wrap an async closure as a handler group.
pub fn handler_fn<F, Fut>(name: impl Into<String>, f: F) -> FnGroup<F>
where
    F: Fn(NormalizedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ResponseEnvelope, BoxError>> + Send + 'static,
{
    FnGroup { name: name.into(), f }
}

impl<F, Fut> HandlerGroup for FnGroup<F>
where
    F: Fn(NormalizedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ResponseEnvelope, BoxError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, request: NormalizedRequest) -> BoxFuture<'static, Result<ResponseEnvelope, BoxError>> {
        (self.f)(request).boxed()
    }
}

/// Registry with the built-in groups behind the default routes.
pub fn default_registry() -> HandlerRegistry {
    let mut groups: HandlerRegistry = HashMap::new();
    for name in ["express", "express-index"] {
        groups.insert(name.to_string(), Arc::new(RouterGroup::new(name, echo_router())));
    }
    groups
}
