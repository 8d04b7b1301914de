//! axum `Router` mounted as a handler group.
//!
//! The normalized request is rebuilt as an `http::Request` on the forwarded
//! sub-path with the preloaded raw body. Handlers reach the decoded view and
//! the request context through extensions:
//!
//! ```ignore
//! async fn handler(
//!     Extension(request): Extension<NormalizedRequest>,
//!     Extension(ctx): Extension<Arc<RequestContext>>,
//! ) -> impl IntoResponse { ... }
//! ```

use axum::body::Body;
use axum::{BoxError, Router};
use futures_util::future::{BoxFuture, FutureExt};
use http::Request;
use tower::ServiceExt;

use super::HandlerGroup;
use crate::http::{NormalizedRequest, ResponseEnvelope};

/// Runs requests through an axum router.
#[derive(Clone)]
pub struct RouterGroup {
    name: String,
    router: Router,
}

impl RouterGroup {
    pub fn new(name: impl Into<String>, router: Router) -> Self {
        Self {
            name: name.into(),
            router,
        }
    }
}

impl std::fmt::Debug for RouterGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterGroup").field("name", &self.name).finish()
    }
}

impl HandlerGroup for RouterGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, request: NormalizedRequest) -> BoxFuture<'static, Result<ResponseEnvelope, BoxError>> {
        let router = self.router.clone();
        async move {
            // A failed preload leaves no raw body; handlers see the error via body().
            let raw = request.raw_body().await.unwrap_or_default();

            let mut req = Request::new(Body::from(raw));
            *req.method_mut() = request.method().clone();
            *req.uri_mut() = request.uri().clone();
            *req.version_mut() = request.version();
            *req.headers_mut() = request.headers().clone();
            if let Some(context) = request.context_arc() {
                req.extensions_mut().insert(context);
            }
            req.extensions_mut().insert(request);

            let response = match router.oneshot(req).await {
                Ok(response) => response,
                Err(never) => match never {},
            };
            Ok(ResponseEnvelope::from_http(response))
        }
        .boxed()
    }
}
