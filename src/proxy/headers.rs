//! Header construction, forwarding, and hop-by-hop stripping.
//!
//! [`build_forwarded_headers`] clones the client headers (when forwarding
//! is enabled), strips hop-by-hop headers, rewrites `Host`, and adds proxy
//! metadata (`X-Forwarded-For`, `X-Real-IP`, `X-Forwarded-Proto`,
//! `X-Forwarded-Host`, `Via`). The request ID header written by the
//! identity middleware is part of the original headers, so it reaches the
//! upstream unchanged.

use std::sync::LazyLock;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::model::Upstream;

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Strip hop-by-hop headers and `content-length` from an upstream response.
///
/// The body has already been fully collected, so `transfer-encoding` and
/// `content-length` from the origin are no longer accurate. Axum sets the
/// correct `content-length` from the actual body bytes.
pub fn strip_response_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove(hyper::header::CONTENT_LENGTH);
}

pub fn build_forwarded_headers(
    original: &HeaderMap,
    client_ip: &str,
    target_url: &url::Url,
    upstream: &Upstream,
    identity_header: Option<&HeaderName>,
) -> HeaderMap {
    let mut headers = if upstream.forward_headers {
        original.clone()
    } else {
        HeaderMap::new()
    };

    if upstream.strip_hop_by_hop {
        for header_name in HOP_BY_HOP.iter() {
            headers.remove(header_name);
        }
    }

    // The request ID always travels upstream, even when client headers do not.
    if let Some(name) = identity_header {
        if let Some(value) = original.get(name) {
            headers.insert(name.clone(), value.clone());
        }
    }

    // Rewrite Host
    if let Some(host) = target_url.host_str() {
        let host_value = target_url
            .port()
            .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
        if let Ok(val) = HeaderValue::from_str(&host_value) {
            headers.insert("host", val);
        }
    }

    if upstream.proxy_headers {
        // X-Forwarded-For: append to chain
        if !client_ip.is_empty() {
            let xff = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .map_or_else(
                    || client_ip.to_string(),
                    |existing| format!("{existing}, {client_ip}"),
                );
            if let Ok(val) = HeaderValue::from_str(&xff) {
                headers.insert("x-forwarded-for", val);
            }

            // X-Real-IP (first IP in chain)
            let real_ip = xff.split(',').next().unwrap_or(client_ip).trim();
            if let Ok(val) = HeaderValue::from_str(real_ip) {
                headers.insert("x-real-ip", val);
            }
        }

        let proto = if target_url.scheme() == "https" {
            "https"
        } else {
            "http"
        };
        headers.insert("x-forwarded-proto", HeaderValue::from_static(proto));

        if let Some(original_host) = original.get("host") {
            headers.insert("x-forwarded-host", original_host.clone());
        }

        headers.insert("via", HeaderValue::from_static("1.1 idgate"));
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> url::Url {
        url::Url::parse("http://backend:9090/api").unwrap()
    }

    fn id_header() -> HeaderName {
        HeaderName::from_static("x-unique-id")
    }

    #[test]
    fn strips_hop_by_hop() {
        let mut original = HeaderMap::new();
        original.insert("connection", "keep-alive".parse().unwrap());
        original.insert("content-type", "application/json".parse().unwrap());

        let upstream = Upstream::new("http://backend:9090");
        let result = build_forwarded_headers(&original, "10.0.0.1", &target(), &upstream, None);

        assert!(result.get("connection").is_none());
        assert!(result.get("content-type").is_some());
    }

    #[test]
    fn rewrites_host() {
        let upstream = Upstream::new("http://backend:9090");
        let result =
            build_forwarded_headers(&HeaderMap::new(), "10.0.0.1", &target(), &upstream, None);

        assert_eq!(result.get("host").unwrap(), "backend:9090");
        assert_eq!(result.get("via").unwrap(), "1.1 idgate");
    }

    #[test]
    fn appends_x_forwarded_for() {
        let mut original = HeaderMap::new();
        original.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());

        let upstream = Upstream::new("http://backend:9090");
        let result = build_forwarded_headers(&original, "10.0.0.1", &target(), &upstream, None);

        assert_eq!(result.get("x-forwarded-for").unwrap(), "1.2.3.4, 10.0.0.1");
        assert_eq!(result.get("x-real-ip").unwrap(), "1.2.3.4");
    }

    #[test]
    fn empty_client_ip_skips_forwarded_for() {
        let upstream = Upstream::new("http://backend:9090");
        let result = build_forwarded_headers(&HeaderMap::new(), "", &target(), &upstream, None);
        assert!(result.get("x-forwarded-for").is_none());
        assert!(result.get("x-real-ip").is_none());
    }

    #[test]
    fn request_id_survives_disabled_forwarding() {
        let mut original = HeaderMap::new();
        original.insert("x-unique-id", "abc123".parse().unwrap());
        original.insert("cookie", "session=1".parse().unwrap());

        let mut upstream = Upstream::new("http://backend:9090");
        upstream.forward_headers = false;
        let result = build_forwarded_headers(
            &original,
            "10.0.0.1",
            &target(),
            &upstream,
            Some(&id_header()),
        );

        assert_eq!(result.get("x-unique-id").unwrap(), "abc123");
        assert!(result.get("cookie").is_none());
    }

    #[test]
    fn proxy_headers_can_be_disabled() {
        let mut upstream = Upstream::new("http://backend:9090");
        upstream.proxy_headers = false;
        let result =
            build_forwarded_headers(&HeaderMap::new(), "10.0.0.1", &target(), &upstream, None);
        assert!(result.get("via").is_none());
        assert!(result.get("x-forwarded-for").is_none());
    }
}
