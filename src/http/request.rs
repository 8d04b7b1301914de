//! Normalized request view.
//!
//! # Responsibilities
//! - Accept either a raw host request or an already-normalized one
//! - Preload and decode the body exactly once, in the background
//! - Derive query and cookie maps lazily, memoized per request
//!
//! # Design Decisions
//! - The body is read by a spawned task at construction; every reader awaits
//!   the same shared outcome, so a failure is re-raised to each of them
//! - The raw stream is consumed only inside the preload task
//! - Clones share the memoized fields (one decode per request, not per clone)

use std::fmt;
use std::sync::{Arc, OnceLock};

use axum::BoxError;
use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use http::header::{CONTENT_TYPE, COOKIE};
use http::{HeaderMap, Method, Request, Uri, Version};
use hyper::body::Body as HttpBody;

use crate::decode::body::{decode, expects_body, read_to_limit};
use crate::decode::{
    parse_cookies, parse_query, BodyValue, CookieMap, NumericCoercion, QueryMap, MAX_BODY_SIZE,
};
use crate::error::BodyError;
use crate::http::context::RequestContext;

/// Options applied when normalizing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterOptions {
    pub max_body_size: usize,
    pub coercion: NumericCoercion,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            max_body_size: MAX_BODY_SIZE,
            coercion: NumericCoercion::default(),
        }
    }
}

#[derive(Debug, Clone)]
struct Preload {
    raw: Option<Bytes>,
    decoded: Result<Arc<BodyValue>, BodyError>,
}

impl Preload {
    fn empty() -> Self {
        Self {
            raw: None,
            decoded: Ok(Arc::new(BodyValue::Empty)),
        }
    }

    fn failed(err: BodyError) -> Self {
        Self {
            raw: None,
            decoded: Err(err),
        }
    }
}

#[derive(Default)]
struct Derived {
    query: OnceLock<QueryMap>,
    cookies: OnceLock<CookieMap>,
}

/// A host request with decoded body, query and cookie accessors.
#[derive(Clone)]
pub struct NormalizedRequest {
    method: Method,
    uri: Uri,
    original_uri: Uri,
    version: Version,
    headers: HeaderMap,
    coercion: NumericCoercion,
    preload: Shared<BoxFuture<'static, Preload>>,
    derived: Arc<Derived>,
    context: Option<Arc<RequestContext>>,
}

impl NormalizedRequest {
    /// Wrap a raw host request and start preloading its body.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_request<B>(request: Request<B>, options: AdapterOptions) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError> + Send,
    {
        let (parts, body) = request.into_parts();
        let preload = if expects_body(&parts.method, &parts.headers) {
            let content_type = parts
                .headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            spawn_preload(body, content_type, options.max_body_size)
        } else {
            futures_util::future::ready(Preload::empty()).boxed().shared()
        };

        Self {
            method: parts.method,
            original_uri: parts.uri.clone(),
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            coercion: options.coercion,
            preload,
            derived: Arc::new(Derived::default()),
            context: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Effective URI (rewritten to the forwarded sub-path after routing).
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// URI as received from the host runtime.
    pub fn original_uri(&self) -> &Uri {
        &self.original_uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn set_uri(&mut self, uri: Uri) {
        self.uri = uri;
    }

    /// Decoded body; awaits the preload if it is still running.
    pub async fn body(&self) -> Result<Arc<BodyValue>, BodyError> {
        self.preload.clone().await.decoded
    }

    /// Raw body bytes, `None` when no body was read or reading failed.
    pub async fn raw_body(&self) -> Option<Bytes> {
        self.preload.clone().await.raw
    }

    /// Resolves once the preload has finished, with its error if any.
    pub async fn preloaded(&self) -> Result<(), BodyError> {
        self.body().await.map(|_| ())
    }

    /// Query parameters, decoded on first access.
    pub fn query(&self) -> &QueryMap {
        self.derived
            .query
            .get_or_init(|| parse_query(self.uri.query().unwrap_or_default(), self.coercion))
    }

    /// Cookies from every `Cookie` header, decoded on first access.
    pub fn cookies(&self) -> &CookieMap {
        self.derived.cookies.get_or_init(|| {
            let joined = self
                .headers
                .get_all(COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join("; ");
            parse_cookies(&joined)
        })
    }

    /// Context attached by the dispatcher, absent before routing.
    pub fn context(&self) -> Option<&RequestContext> {
        self.context.as_deref()
    }

    pub fn context_arc(&self) -> Option<Arc<RequestContext>> {
        self.context.clone()
    }

    pub(crate) fn attach_context(&mut self, context: Arc<RequestContext>) {
        self.context = Some(context);
    }
}

impl fmt::Debug for NormalizedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("original_uri", &self.original_uri)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

fn spawn_preload<B>(body: B, content_type: String, limit: usize) -> Shared<BoxFuture<'static, Preload>>
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError> + Send,
{
    let task = tokio::spawn(async move {
        match read_to_limit(body, limit).await {
            Ok(raw) => {
                let decoded = decode(raw.clone(), &content_type)
                    .map(Arc::new)
                    .map_err(BodyError::from);
                Preload {
                    raw: Some(raw),
                    decoded,
                }
            }
            Err(err) => Preload::failed(err),
        }
    });

    async move {
        task.await.unwrap_or_else(|e| {
            Preload::failed(BodyError::Stream(format!("body preload task failed: {}", e)))
        })
    }
    .boxed()
    .shared()
}

/// Anything the request adapter accepts.
pub trait IntoNormalized {
    fn into_normalized(self, options: AdapterOptions) -> NormalizedRequest;
}

impl<B> IntoNormalized for Request<B>
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError> + Send,
{
    fn into_normalized(self, options: AdapterOptions) -> NormalizedRequest {
        NormalizedRequest::from_request(self, options)
    }
}

impl IntoNormalized for NormalizedRequest {
    fn into_normalized(self, _options: AdapterOptions) -> NormalizedRequest {
        self
    }
}

/// Builds normalized views with the configured limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestAdapter {
    options: AdapterOptions,
}

impl RequestAdapter {
    pub fn new(options: AdapterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> AdapterOptions {
        self.options
    }

    /// Normalize a request; already-normalized input is returned unchanged.
    pub fn adapt(&self, request: impl IntoNormalized) -> NormalizedRequest {
        request.into_normalized(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::QueryValue;
    use futures_util::StreamExt;
    use http_body_util::{Empty, Full, StreamBody};
    use hyper::body::Frame;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn post(content_type: &str, body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::POST)
            .uri("/submit?x=1")
            .header(CONTENT_TYPE, content_type)
            .header("content-length", body.len())
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    #[tokio::test]
    async fn test_json_body_is_decoded() {
        let req = RequestAdapter::default().adapt(post("application/json", r#"{"a":1}"#));
        let body = req.body().await.unwrap();
        assert_eq!(body.as_json(), Some(&serde_json::json!({"a": 1})));
        assert_eq!(req.raw_body().await, Some(Bytes::from_static(br#"{"a":1}"#)));
    }

    #[tokio::test]
    async fn test_body_is_read_once() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let chunks = futures_util::stream::iter(vec!["he", "llo"]).map(move |c| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::io::Error>(Frame::data(Bytes::from_static(c.as_bytes())))
        });
        let req = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(CONTENT_TYPE, "text/plain")
            .header("transfer-encoding", "chunked")
            .body(StreamBody::new(chunks))
            .unwrap();

        let req = RequestAdapter::default().adapt(req);
        let first = req.body().await.unwrap();
        let second = req.clone().body().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.as_text(), Some("hello"));
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_json_is_reraised_to_every_reader() {
        let req = RequestAdapter::default().adapt(post("application/json", "{broken"));
        let first = req.body().await.unwrap_err();
        let second = req.body().await.unwrap_err();
        assert_eq!(first, second);
        assert_eq!(first.kind(), "decode");
        assert!(first.to_string().starts_with("Invalid JSON in request body"));
    }

    #[tokio::test]
    async fn test_size_limit() {
        let adapter = RequestAdapter::new(AdapterOptions {
            max_body_size: 4,
            ..AdapterOptions::default()
        });
        let req = adapter.adapt(post("text/plain", "too long"));
        let err = req.body().await.unwrap_err();
        assert_eq!(err, BodyError::SizeLimit { limit: 4 });
        assert_eq!(req.raw_body().await, None);
    }

    #[tokio::test]
    async fn test_get_without_length_skips_body() {
        let req = Request::builder()
            .uri("/list?page=2&tag=a&tag=b")
            .header(COOKIE, "sid=abc; theme=dark")
            .header(COOKIE, "lang=en")
            .body(StreamBody::new(futures_util::stream::once(async {
                Err::<Frame<Bytes>, std::io::Error>(std::io::Error::other("stream was read"))
            })))
            .unwrap();
        let req = RequestAdapter::default().adapt(req);

        // Reading the stream would surface its error instead of an empty body.
        assert!(req.body().await.unwrap().is_empty());
        assert_eq!(req.query().get("page"), Some(&QueryValue::Str("2".into())));
        assert_eq!(
            req.query().get("tag"),
            Some(&QueryValue::List(vec![
                QueryValue::Str("a".into()),
                QueryValue::Str("b".into())
            ]))
        );
        assert_eq!(req.cookies().get("theme").map(String::as_str), Some("dark"));
        assert_eq!(req.cookies().get("lang").map(String::as_str), Some("en"));
    }

    #[tokio::test]
    async fn test_path_without_query_has_empty_query() {
        let req = Request::builder()
            .uri("/plain")
            .body(Empty::<Bytes>::new())
            .unwrap();
        let req = RequestAdapter::default().adapt(req);
        assert!(req.query().is_empty());
        assert!(req.cookies().is_empty());
    }

    #[tokio::test]
    async fn test_normalized_input_passes_through() {
        let adapter = RequestAdapter::default();
        let mut first = adapter.adapt(post("application/x-www-form-urlencoded", "a=1&b=two+words"));
        first.set_uri(Uri::from_static("/rewritten"));

        let again = adapter.adapt(first);
        assert_eq!(again.path(), "/rewritten");
        assert_eq!(again.original_uri().path(), "/submit");
        let body = again.body().await.unwrap();
        assert_eq!(
            body.as_form().and_then(|f| f.get("b")).map(String::as_str),
            Some("two words")
        );
    }
}
