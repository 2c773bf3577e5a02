//! Core HTTP forwarding handler.
//!
//! The [`forward_handler`] function is the Axum fallback that receives
//! every non-`/health` request after the identity middleware has stamped
//! it. With an upstream configured it forwards the request ([`forward`])
//! with proxy headers ([`headers`]); without one it answers with the
//! request's identity as JSON.

pub mod forward;
pub mod headers;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{Extensions, HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestIdentity;
use crate::server::AppState;

/// Body returned when no upstream is configured.
#[derive(Debug, Serialize, Deserialize)]
pub struct EchoResponse {
    pub request_id: Option<String>,
    pub user_id: Option<String>,
    pub method: String,
    pub path: String,
}

pub async fn forward_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    extensions: Extensions,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let identity = RequestIdentity::from_extensions(&extensions);
    let request_id = identity.map_or("-", |i| i.id.as_str());

    let config = &state.config.config;
    let Some(upstream) = config.upstream.as_ref() else {
        state.stats.echoed.fetch_add(1, Ordering::Relaxed);
        return Json(EchoResponse {
            request_id: identity.map(|i| i.id.to_string()),
            user_id: identity.map(|i| i.user_id.to_string()),
            method: method.to_string(),
            path: uri.path().to_string(),
        })
        .into_response();
    };

    let target_url = match forward::parse_upstream_url(&upstream.url, &uri) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "invalid upstream URL");
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let client_ip = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default();

    let identity_header = config
        .identity
        .enabled
        .then(|| config.identity.header.parse::<HeaderName>().ok())
        .flatten();

    let headers = headers::build_forwarded_headers(
        &req_headers,
        &client_ip,
        &target_url,
        upstream,
        identity_header.as_ref(),
    );

    let request = forward::ForwardRequest {
        client: &state.http_client,
        upstream,
        method: &method,
        uri: &uri,
        headers,
        body,
    };

    match forward::forward(request).await {
        Ok(upstream_response) => {
            state.stats.forwarded.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %uri.path(),
                status = upstream_response.status.as_u16(),
                latency_ms = upstream_response.latency_ms,
                "upstream responded"
            );

            let mut resp_headers = upstream_response.headers;
            headers::strip_response_hop_by_hop(&mut resp_headers);
            let mut builder = Response::builder().status(upstream_response.status);
            for (key, value) in &resp_headers {
                builder = builder.header(key, value);
            }
            builder
                .body(axum::body::Body::from(upstream_response.body))
                .unwrap_or_else(|e| {
                    tracing::error!(
                        request_id = %request_id,
                        error = %e,
                        "failed to build response"
                    );
                    StatusCode::BAD_GATEWAY.into_response()
                })
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                method = %method,
                path = %uri.path(),
                error = %e,
                "upstream request failed"
            );
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}
