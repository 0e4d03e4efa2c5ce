//! Reverse proxy to the upstream web application.

use std::net::SocketAddr;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use balagate_core::config::GatewayConfig;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::GatewayError;

/// Upstream failures, rendered as JSON error responses.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The request body exceeded the configured limit.
    #[error("Request body too large")]
    BodyTooLarge,

    /// The upstream did not answer in time.
    #[error("Upstream timed out")]
    Timeout,

    /// The upstream could not be reached.
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Serialize)]
struct ProxyErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::BodyTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "body_too_large"),
            Self::Timeout => (StatusCode::GATEWAY_TIMEOUT, "upstream_timeout"),
            Self::Unavailable(_) => (StatusCode::BAD_GATEWAY, "upstream_unavailable"),
        };

        let body = ProxyErrorResponse {
            error: self.to_string(),
            code,
        };

        (status, Json(body)).into_response()
    }
}

/// Forwards gated requests to the upstream application.
#[derive(Debug, Clone)]
pub struct UpstreamProxy {
    client: Client,
    upstream: String,
    max_body_bytes: usize,
}

impl UpstreamProxy {
    /// Create a proxy for the configured upstream.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build upstream client: {e}")))?;

        Ok(Self {
            client,
            upstream: config.upstream_url.trim_end_matches('/').to_string(),
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Upstream base URL.
    #[must_use]
    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// Forward a request and stream the upstream response back.
    ///
    /// # Errors
    ///
    /// Returns `ProxyError` when the body is too large or the upstream fails.
    pub async fn forward(&self, request: Request) -> Result<Response, ProxyError> {
        let (parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        let url = format!("{}{path_and_query}", self.upstream);

        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|_| ProxyError::BodyTooLarge)?;

        let mut headers = parts.headers;
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        add_forwarded_headers(&mut headers, peer);
        strip_hop_by_hop(&mut headers);

        tracing::debug!(method = %parts.method, %url, "Forwarding upstream");

        let upstream = self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::warn!(%url, "Upstream timed out");
                    ProxyError::Timeout
                } else {
                    tracing::warn!(%url, error = %e, "Upstream request failed");
                    ProxyError::Unavailable(e.to_string())
                }
            })?;

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// Set the `x-forwarded-*` headers for the upstream.
///
/// The gateway listens on plain HTTP. A scheme already recorded by a
/// TLS-terminating proxy in front of it is kept, otherwise `http` is sent.
/// The peer address is appended to any existing `x-forwarded-for` chain.
fn add_forwarded_headers(headers: &mut HeaderMap, peer: Option<SocketAddr>) {
    let forwarded_host = HeaderName::from_static("x-forwarded-host");
    let forwarded_proto = HeaderName::from_static("x-forwarded-proto");
    let forwarded_for = HeaderName::from_static("x-forwarded-for");

    if let Some(host) = headers.remove(header::HOST) {
        headers.insert(forwarded_host, host);
    }

    if !headers.contains_key(&forwarded_proto) {
        headers.insert(forwarded_proto, HeaderValue::from_static("http"));
    }

    if let Some(peer) = peer {
        let ip = peer.ip().to_string();
        let chain = match headers.get(&forwarded_for).and_then(|v| v.to_str().ok()) {
            Some(existing) if !existing.trim().is_empty() => format!("{existing}, {ip}"),
            _ => ip,
        };
        match HeaderValue::from_str(&chain) {
            Ok(value) => {
                headers.insert(forwarded_for, value);
            }
            Err(e) => tracing::warn!(error = %e, "Dropping unencodable x-forwarded-for"),
        }
    }
}

/// Remove hop-by-hop headers, including any named in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let hop_by_hop = [
        header::CONNECTION,
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
        HeaderName::from_static("keep-alive"),
    ];

    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(&hop_by_hop) {
        headers.remove(name);
    }
}
