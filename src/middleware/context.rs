//! Per-request views and the request-scoped identity value.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use http::{Extensions, HeaderMap, HeaderName, Method, Request, Uri};

use super::generator::GeneratedId;

/// User ID recorded when the source header is missing or unusable.
pub const ANONYMOUS: &str = "anonymous";

/// Read-only view of the request attributes the middleware hashes and logs.
#[derive(Debug)]
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    pub remote_addr: String,
}

impl<'a> RequestContext<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        let remote_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_default();

        Self {
            method: req.method(),
            uri: req.uri(),
            headers: req.headers(),
            remote_addr,
        }
    }

    /// Value of `source`, or [`ANONYMOUS`] when unset, absent, empty or not UTF-8.
    #[must_use]
    pub fn user_id(&self, source: Option<&HeaderName>) -> &'a str {
        source
            .and_then(|name| self.headers.get(name))
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .unwrap_or(ANONYMOUS)
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.uri.to_string()
    }
}

/// Identity attached to a request's extensions.
///
/// Stored under its own type, so reading it back never collides with values
/// other layers put into the extension map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub id: GeneratedId,
    pub user_id: Arc<str>,
}

impl RequestIdentity {
    #[must_use]
    pub fn from_extensions(extensions: &Extensions) -> Option<&Self> {
        extensions.get::<Self>()
    }

    #[must_use]
    pub fn from_request<B>(req: &Request<B>) -> Option<&Self> {
        Self::from_extensions(req.extensions())
    }
}
