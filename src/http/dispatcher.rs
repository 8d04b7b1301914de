//! Request dispatch.
//!
//! # Steps
//! ```text
//! host request
//!     → geo header decoded
//!     → vendor identity read, reserved headers stripped
//!     → normalized view built, body preload awaited
//!     → path normalized, route resolved (404 envelope when nothing matches)
//!     → URI rewritten to the forwarded sub-path, context attached
//!     → handler group invoked
//!     → public request id added to the response
//!     → relay
//! ```
//!
//! # Design Decisions
//! - A body preload failure does not fail the request; handlers see the
//!   error when they read the body
//! - Handler failures become a 500 envelope
//! - One tracing span per request, keyed by the vendor request id (or a
//!   generated one when the edge sent none)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::BoxError;
use bytes::Bytes;
use http::{Request, Uri};
use hyper::body::Body as HttpBody;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AdapterConfig;
use crate::decode::parse_geo_header;
use crate::error::DispatchError;
use crate::http::context::{EnvSnapshot, RequestContext, ServerInfo};
use crate::http::request::{AdapterOptions, RequestAdapter};
use crate::http::response::{ResponseEnvelope, ResponseRelay};
use crate::http::transport::ResponseWriter;
use crate::observability::metrics;
use crate::routing::RouteTable;
use crate::security::headers::HeaderSanitizer;

/// Routes host requests to handler groups and relays their responses.
pub struct Dispatcher {
    routes: RouteTable,
    adapter: RequestAdapter,
    sanitizer: HeaderSanitizer,
    relay: ResponseRelay,
    env: Arc<EnvSnapshot>,
}

impl Dispatcher {
    pub fn new(config: &AdapterConfig, routes: RouteTable, env: EnvSnapshot) -> Self {
        Self {
            routes,
            adapter: RequestAdapter::new(AdapterOptions {
                max_body_size: config.body.max_size,
                coercion: config.query.coercion(),
            }),
            sanitizer: HeaderSanitizer::new(&config.vendor),
            relay: ResponseRelay::new(&config.relay.strip_headers),
            env: Arc::new(env),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Handle one request end to end, writing the response onto `writer`.
    pub async fn dispatch<B>(&self, request: Request<B>, peer: Option<SocketAddr>, writer: ResponseWriter)
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError> + Send,
    {
        let start = Instant::now();
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        let request_id = self
            .sanitizer
            .extract(request.headers())
            .request_id;
        let span_id = if request_id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            request_id
        };
        let span = tracing::info_span!("dispatch", request_id = %span_id, method = %method, path = %path);

        async move {
            let (envelope, group) = match self.handle(request, peer).await {
                Ok(handled) => handled,
                Err(e) => {
                    tracing::error!(error = %e, "Dispatch failed");
                    (ResponseEnvelope::internal_error(&e.to_string()), None)
                }
            };

            let status = self.relay.relay(envelope, writer).await;
            let group = group.as_deref().unwrap_or("none");
            metrics::record_request(&method, status.as_u16(), group, start);
            tracing::info!(
                status = status.as_u16(),
                group,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Request completed"
            );
        }
        .instrument(span)
        .await
    }

    /// Run every step up to the handler, returning its envelope and group name.
    ///
    /// No group name means no route matched.
    pub async fn handle<B>(
        &self,
        request: Request<B>,
        peer: Option<SocketAddr>,
    ) -> Result<(ResponseEnvelope, Option<String>), DispatchError>
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError> + Send,
    {
        let (mut parts, body) = request.into_parts();

        let geo = parts
            .headers
            .get(self.sanitizer.geo_header())
            .map(|v| parse_geo_header(v.as_bytes()))
            .unwrap_or_default();

        let vendor = self.sanitizer.extract(&parts.headers);
        self.sanitizer.sanitize(&mut parts.headers, &vendor.request_id);

        let mut request = self.adapter.adapt(Request::from_parts(parts, body));
        if let Err(e) = request.preloaded().await {
            tracing::warn!(error = %e, kind = e.kind(), "Request body rejected");
            metrics::record_body_rejected(e.kind());
        }

        let path = normalize_path(request.uri().path());
        let Some((route, matched)) = self.routes.resolve(&path) else {
            tracing::debug!(path = %path, "No route matched");
            let mut envelope = ResponseEnvelope::not_found();
            self.tag_request_id(&mut envelope, &vendor.request_id);
            return Ok((envelope, None));
        };

        let forward = match request.uri().query() {
            Some(query) => format!("{}?{}", matched.forward_path(), query),
            None => matched.forward_path(),
        };
        let uri: Uri = forward
            .parse()
            .map_err(|_| DispatchError::InvalidUri(forward.clone()))?;
        request.set_uri(uri);

        let client_ip = vendor
            .client_ip
            .or_else(|| peer.map(|p| p.ip().to_string()))
            .unwrap_or_default();
        request.attach_context(Arc::new(RequestContext {
            geo,
            client_ip,
            uuid: vendor.uuid,
            server: ServerInfo {
                region: vendor.region,
                request_id: vendor.request_id.clone(),
            },
            params: matched.params,
            env: self.env.clone(),
        }));

        let group = route.group.clone();
        tracing::debug!(group = %group.name(), pattern = %route.template, forward = %forward, "Route matched");

        let mut envelope = group
            .call(request)
            .await
            .map_err(|source| DispatchError::Handler {
                group: group.name().to_string(),
                source,
            })?;

        self.tag_request_id(&mut envelope, &vendor.request_id);

        Ok((envelope, Some(group.name().to_string())))
    }

    fn tag_request_id(&self, envelope: &mut ResponseEnvelope, request_id: &str) {
        if let Some((name, value)) = self.sanitizer.request_id_header(request_id) {
            envelope.headers_mut().insert(name, value);
        }
    }
}

/// Drop a single trailing slash; `/` stays `/`.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }
    path.strip_suffix('/').unwrap_or(path).to_string()
}
