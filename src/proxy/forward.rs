//! Single-upstream request forwarding.
//!
//! Sends the buffered request to the configured upstream with a timeout
//! and collects the whole response body. Failures are reported as a
//! [`ForwardError`] so the handler can answer `502 Bad Gateway`.

use std::time::{Duration, Instant};

use axum::http::{HeaderMap, Method, Uri};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::StatusCode;

use crate::config::model::Upstream;
use crate::server::HttpClient;

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid upstream URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build upstream request: {0}")]
    Build(#[from] hyper::http::Error),

    #[error("upstream request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("upstream body read error: {0}")]
    Body(#[from] hyper::Error),

    #[error("upstream timed out after {0}ms")]
    Timeout(u64),
}

#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub latency_ms: u64,
}

pub struct ForwardRequest<'a> {
    pub client: &'a HttpClient,
    pub upstream: &'a Upstream,
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Join the upstream base URL with the incoming path and query.
///
/// `http://backend:8080/api` + `/users?page=2` gives
/// `http://backend:8080/api/users?page=2`.
#[must_use]
pub fn upstream_url(base: &str, uri: &Uri) -> String {
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    format!("{}{}", base.trim_end_matches('/'), path_and_query)
}

/// Parse the joined upstream URL for header construction.
pub fn parse_upstream_url(base: &str, uri: &Uri) -> Result<url::Url, ForwardError> {
    let url = upstream_url(base, uri);
    url::Url::parse(&url).map_err(|source| ForwardError::InvalidUrl { url, source })
}

#[allow(clippy::cast_possible_truncation)]
pub async fn forward(req: ForwardRequest<'_>) -> Result<UpstreamResponse, ForwardError> {
    let target = upstream_url(&req.upstream.url, req.uri);
    let start = Instant::now();

    let mut builder = hyper::Request::builder()
        .method(req.method.clone())
        .uri(target.as_str());
    for (key, value) in &req.headers {
        builder = builder.header(key, value);
    }
    let request = builder.body(Full::new(req.body))?;

    let timeout = Duration::from_millis(req.upstream.timeout);
    let response = tokio::time::timeout(timeout, req.client.request(request))
        .await
        .map_err(|_| ForwardError::Timeout(req.upstream.timeout))??;

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await?.to_bytes();

    Ok(UpstreamResponse {
        status,
        headers,
        body,
        latency_ms: start.elapsed().as_millis() as u64,
    })
}
