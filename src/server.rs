//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding config, HTTP
//! client, stats, and uptime), [`build_router`] for constructing the
//! Axum router with middleware layers, [`build_http_client`] for the
//! connection-pooled hyper client, and [`shutdown_signal`] for
//! SIGTERM / Ctrl+C handling.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderName, HeaderValue};
use axum::routing::get;
use axum::Router;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::model::Config;
use crate::config::ConfigVersion;
use crate::error::{IdgateError, ValidationError};
use crate::health::health_handler;
use crate::middleware::{IdentityLayer, IdentitySpec};
use crate::proxy;

/// Response header carrying the configured `extra_info` message.
pub const EXTRA_INFO_HEADER: HeaderName = HeaderName::from_static("x-extra-info");

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Arc<Config>,
    pub version: ConfigVersion,
    pub source_name: String,
    pub loaded_at: Instant,
}

#[derive(Debug)]
pub struct Stats {
    pub forwarded: AtomicU64,
    pub failed: AtomicU64,
    pub echoed: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            forwarded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            echoed: AtomicU64::new(0),
        }
    }
}

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, http_body_util::Full<bytes::Bytes>>;

pub struct AppState {
    pub config: LoadedConfig,
    pub http_client: HttpClient,
    pub start_time: Instant,
    pub stats: Stats,
}

impl AppState {
    #[must_use]
    pub fn new(config: LoadedConfig) -> Self {
        Self {
            config,
            http_client: build_http_client(),
            start_time: Instant::now(),
            stats: Stats::new(),
        }
    }
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    // When multiple rustls crypto providers are compiled in, rustls cannot
    // auto-detect which one to use. Explicitly install `ring` as the default.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https)
}

/// Build the router: `/health`, the proxy fallback, then the body-limit,
/// extra-info, identity and trace layers (innermost first). Identity sits
/// outside everything but tracing, so rejections are stamped too.
pub fn build_router(state: Arc<AppState>, max_body: usize) -> Result<Router, IdgateError> {
    let config = Arc::clone(&state.config.config);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .fallback(proxy::forward_handler)
        .layer(RequestBodyLimitLayer::new(max_body));

    if let Some(ref message) = config.extra_info {
        let value = HeaderValue::from_str(message).map_err(|_| IdgateError::ConfigValidation {
            errors: vec![ValidationError::new(
                "(root)",
                "extra_info",
                "contains characters not allowed in a header value",
            )],
        })?;
        router = router.layer(SetResponseHeaderLayer::appending(EXTRA_INFO_HEADER, value));
    }

    if config.identity.enabled {
        let spec = IdentitySpec::from_config(&config.identity)
            .map_err(|errors| IdgateError::ConfigValidation { errors })?;
        tracing::debug!(
            strategy = %spec.strategy,
            header = %spec.header,
            log_requests = spec.log_enabled,
            "identity middleware installed"
        );
        router = router.layer(IdentityLayer::new(spec));
    }

    Ok(router
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
