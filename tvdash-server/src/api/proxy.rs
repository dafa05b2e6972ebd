//! Forwarding proxy
//!
//! `/proxy/<target>` relays GET, POST, PUT and DELETE requests to `<target>`,
//! which is taken verbatim from the request path. Targets without a scheme are
//! sent over plain `http://`. Upstream status, headers and body are relayed back
//! with the body streamed. The read timeout bounds the wait for response headers
//! and for each body chunk, not the whole transfer.
//!
//! Errors use a `{"detail": "..."}` body.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    BoxError, Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::config::ProxyConfig;
use crate::error::ServerError;
use crate::AppState;

/// Path prefix the proxy is mounted under
pub const PROXY_PREFIX: &str = "/proxy/";

/// Headers scoped to a single connection, never forwarded in either direction
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Proxy errors
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),

    #[error("Host not allowed: {0}")]
    HostNotAllowed(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request body too large (limit {0} bytes)")]
    PayloadTooLarge(usize),

    #[error("Upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match self {
            ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ProxyError::HostNotAllowed(_) => StatusCode::FORBIDDEN,
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Timeout(_) | ProxyError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "detail": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Upstream HTTP client plus forwarding policy
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: reqwest::Client,
    config: ProxyConfig,
}

impl ProxyClient {
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| ServerError::Config(format!("Failed to build proxy client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Build the upstream URL from the inbound path and query
    ///
    /// `target` is the raw path after [`PROXY_PREFIX`].
    pub fn target_url(&self, target: &str, query: Option<&str>) -> Result<reqwest::Url, ProxyError> {
        if target.is_empty() {
            return Err(ProxyError::InvalidTarget("empty target".to_string()));
        }

        let mut raw = if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            format!("http://{}", target)
        };
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            raw.push(if raw.contains('?') { '&' } else { '?' });
            raw.push_str(query);
        }

        let url = reqwest::Url::parse(&raw)
            .map_err(|e| ProxyError::InvalidTarget(format!("{}: {}", raw, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| ProxyError::InvalidTarget(format!("{}: no host", raw)))?;

        if !self.config.allows_host(host) {
            return Err(ProxyError::HostNotAllowed(host.to_string()));
        }
        Ok(url)
    }

    /// Forward `request` to `url` and relay the response
    pub async fn forward(&self, url: reqwest::Url, request: Request) -> Result<Response, ProxyError> {
        let method = upstream_method(request.method())?;
        let (parts, body) = request.into_parts();

        if let Some(length) = content_length(&parts.headers) {
            if length > self.config.max_body_bytes {
                return Err(ProxyError::PayloadTooLarge(self.config.max_body_bytes));
            }
        }
        let body = axum::body::to_bytes(body, self.config.max_body_bytes)
            .await
            .map_err(|_| ProxyError::PayloadTooLarge(self.config.max_body_bytes))?;

        debug!("Proxying {} {}", method, url);

        let mut upstream = self
            .client
            .request(method, url)
            .headers(upstream_headers(&parts.headers));
        if !body.is_empty() {
            upstream = upstream.body(body);
        }

        let read_timeout = Duration::from_secs(self.config.read_timeout_secs);
        let response = tokio::time::timeout(read_timeout, upstream.send())
            .await
            .map_err(|_| {
                warn!("Upstream response timed out after {:?}", read_timeout);
                ProxyError::Timeout(read_timeout)
            })?
            .map_err(|e| {
                warn!("Upstream request failed: {}", e);
                ProxyError::Upstream(e)
            })?;

        Ok(relay_response(response, read_timeout))
    }
}

/// ANY /proxy/*target
pub async fn proxy_request(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ProxyError> {
    // Mounted only when a client exists
    let Some(proxy) = state.proxy.clone() else {
        return Err(ProxyError::InvalidTarget("proxy disabled".to_string()));
    };

    // Raw path rather than the decoded capture so `http://` and escapes survive
    let uri = request.uri().clone();
    let target = uri.path().strip_prefix(PROXY_PREFIX).unwrap_or_default();
    let url = proxy.target_url(target, uri.query())?;

    proxy.forward(url, request).await
}

fn upstream_method(method: &Method) -> Result<reqwest::Method, ProxyError> {
    match method.as_str() {
        "GET" => Ok(reqwest::Method::GET),
        "POST" => Ok(reqwest::Method::POST),
        "PUT" => Ok(reqwest::Method::PUT),
        "DELETE" => Ok(reqwest::Method::DELETE),
        _ => Err(ProxyError::MethodNotAllowed),
    }
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(axum::http::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn is_forwardable(name: &str) -> bool {
    !HOP_BY_HOP.contains(&name) && name != "host" && name != "content-length"
}

/// Inbound headers converted to reqwest's header types
fn upstream_headers(headers: &HeaderMap) -> reqwest::header::HeaderMap {
    let mut out = reqwest::header::HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_forwardable(name.as_str()) {
            continue;
        }
        let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes()),
            reqwest::header::HeaderValue::from_bytes(value.as_bytes()),
        ) else {
            continue;
        };
        out.append(name, value);
    }
    out
}

/// Relay status, headers and body; the body fails if any chunk takes longer
/// than `read_timeout`
fn relay_response(upstream: reqwest::Response, read_timeout: Duration) -> Response {
    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut headers = HeaderMap::with_capacity(upstream.headers().len());
    for (name, value) in upstream.headers() {
        // Length is recomputed for the streamed body
        if !is_forwardable(name.as_str()) {
            continue;
        }
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) else {
            continue;
        };
        headers.append(name, value);
    }

    let body = upstream
        .bytes_stream()
        .timeout(read_timeout)
        .map(move |chunk| match chunk {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) => Err(BoxError::from(e)),
            Err(elapsed) => {
                warn!("Upstream body stalled for {:?}", read_timeout);
                Err(BoxError::from(elapsed))
            }
        });

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(allowed: &[&str]) -> ProxyClient {
        ProxyClient::new(ProxyConfig {
            allowed_hosts: allowed.iter().map(|s| s.to_string()).collect(),
            ..ProxyConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_target_without_scheme_gets_http() {
        let url = client(&["*"]).target_url("example.com/api/items", None).unwrap();
        assert_eq!(url.as_str(), "http://example.com/api/items");
    }

    #[test]
    fn test_target_keeps_scheme_and_appends_query() {
        let url = client(&["*"])
            .target_url("https://example.com/search", Some("q=a%20b&page=2"))
            .unwrap();
        assert_eq!(url.as_str(), "https://example.com/search?q=a%20b&page=2");
    }

    #[test]
    fn test_empty_target_rejected() {
        assert!(matches!(
            client(&["*"]).target_url("", None),
            Err(ProxyError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_host_allow_list() {
        let proxy = client(&["api.example.com"]);
        assert!(proxy.target_url("api.example.com/x", None).is_ok());
        assert!(matches!(
            proxy.target_url("other.example.com/x", None),
            Err(ProxyError::HostNotAllowed(_))
        ));
    }

    #[test]
    fn test_upstream_method() {
        assert_eq!(upstream_method(&Method::PUT).unwrap(), reqwest::Method::PUT);
        assert!(matches!(
            upstream_method(&Method::PATCH),
            Err(ProxyError::MethodNotAllowed)
        ));
    }

    #[test]
    fn test_hop_by_hop_headers_dropped() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("localhost:9978"));
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("content-length", HeaderValue::from_static("3"));
        headers.insert("authorization", HeaderValue::from_static("Bearer t"));
        headers.insert("x-custom", HeaderValue::from_static("1"));

        let out = upstream_headers(&headers);
        assert_eq!(out.len(), 2);
        assert_eq!(out.get("authorization").unwrap(), "Bearer t");
        assert_eq!(out.get("x-custom").unwrap(), "1");
    }
}
