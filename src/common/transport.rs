//! The HTTP capability the client is built on.
//!
//! [`Transport`] is the only seam between the protocol logic and the network: it
//! takes a fully formed request plus a [`CancellationToken`] and hands back status,
//! headers and the aggregated body. [`HyperTransport`] is the production
//! implementation; tests substitute scripted ones.

use std::future::Future;

use anyhow::{Result, anyhow};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{HeaderMap, Method, Request, StatusCode, Uri, header};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use tokio::time::{Duration, timeout};
use tokio_util::sync::CancellationToken;

use crate::common::compression::{add_accept_encoding, decompress_body, detect_encodings};
use crate::error::CalDavError;
use crate::webdav::types::Depth;

pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
pub const ICAL_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// A request ready to be put on the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: header::HeaderName, value: header::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn depth(self, depth: Depth) -> Self {
        self.header(
            header::HeaderName::from_static("depth"),
            header::HeaderValue::from_static(depth.as_str()),
        )
    }

    /// Attach a body together with its `Content-Type`.
    pub fn body(mut self, body: impl Into<Bytes>, content_type: &'static str) -> Self {
        self.headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static(content_type),
        );
        self.body = Some(body.into());
        self
    }

    pub fn xml(self, body: impl Into<Bytes>) -> Self {
        self.body(body, XML_CONTENT_TYPE)
    }
}

/// Status, headers and already-decoded body of a response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Canonical reason phrase for the status (`"Precondition Failed"`, …).
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn etag(&self) -> Option<String> {
        self.header(header::ETAG).map(str::to_string)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issue one HTTP exchange.
///
/// Implementations must stop waiting once `cancel` fires and report it as
/// [`CalDavError::Timeout`] (wrapped in `anyhow`), so callers can tell a deadline
/// apart from other failures.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<TransportResponse>> + Send;
}

type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Connection settings for [`HyperTransport`].
///
/// A CalDAV client talks to a single host, so the pool is sized for that host
/// alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperTransportOptions {
    /// Idle connections kept per host.
    pub max_idle_per_host: usize,

    /// How long an idle connection stays pooled. `None` keeps it until the server closes it.
    pub idle_timeout: Option<Duration>,

    /// Speak HTTP/2 only (prior knowledge on `http://`, ALPN `h2` on `https://`).
    pub http2_only: bool,

    /// Upper bound on one exchange, from connect to the last body byte.
    pub default_timeout: Duration,
}

impl Default for HyperTransportOptions {
    fn default() -> Self {
        Self {
            max_idle_per_host: 4,
            idle_timeout: Some(Duration::from_secs(60)),
            http2_only: false,
            default_timeout: Duration::from_secs(20),
        }
    }
}

/// Default [`Transport`] on hyper 1.x + rustls, with response decompression.
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    default_timeout: Duration,
}

impl HyperTransport {
    pub fn new() -> Result<Self> {
        Self::with_options(HyperTransportOptions::default())
    }

    /// Build the pooled client. Native TLS roots are preferred, with the bundled
    /// WebPKI store when they cannot be loaded.
    pub fn with_options(options: HyperTransportOptions) -> Result<Self> {
        let https = HttpsConnectorBuilder::new()
            .with_native_roots()
            .unwrap_or_else(|err| {
                tracing::debug!(error = %err, "native roots unavailable, using webpki roots");
                HttpsConnectorBuilder::new().with_webpki_roots()
            })
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(options.max_idle_per_host)
            .pool_idle_timeout(options.idle_timeout)
            .http2_only(options.http2_only)
            .build::<_, Full<Bytes>>(https);

        Ok(Self {
            client,
            default_timeout: options.default_timeout,
        })
    }

    /// Upper bound applied to every exchange, on top of any caller deadline.
    pub fn with_default_timeout(mut self, limit: Duration) -> Self {
        self.default_timeout = limit;
        self
    }

    async fn exchange(&self, request: TransportRequest) -> Result<TransportResponse> {
        timeout(self.default_timeout, self.round_trip(request))
            .await
            .map_err(|_| anyhow!("request timed out after {:?}", self.default_timeout))?
    }

    async fn round_trip(&self, request: TransportRequest) -> Result<TransportResponse> {
        let uri: Uri = request.url.parse()?;
        let mut headers = request.headers;
        add_accept_encoding(&mut headers);

        let mut req_builder = Request::builder().method(request.method).uri(uri);
        for (k, v) in headers.iter() {
            req_builder = req_builder.header(k, v);
        }
        let req = req_builder.body(Full::new(request.body.unwrap_or_default()))?;

        let resp = self.client.request(req).await?;

        let encodings = detect_encodings(resp.headers());
        let (mut parts, body) = resp.into_parts();
        let decompressed = decompress_body(body, &encodings).await?;
        if !encodings.is_empty() {
            parts.headers.remove(header::CONTENT_ENCODING);
            parts.headers.remove(header::CONTENT_LENGTH);
        }

        Ok(TransportResponse::new(parts.status, parts.headers, decompressed))
    }
}

impl Transport for HyperTransport {
    async fn send(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> Result<TransportResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CalDavError::Timeout.into()),
            resp = self.exchange(request) => resp,
        }
    }
}
