//! Integration tests for the HTTP server, identity stamping, forwarding,
//! and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::http::{HeaderMap, Uri};
use axum::{Json, Router};
use idgate::config::model::{Config, IdentityConfig, Strategy, Upstream};
use idgate::config::ConfigVersion;
use idgate::health::HealthResponse;
use idgate::proxy::EchoResponse;
use idgate::server::{self, AppState, LoadedConfig};
use serde::{Deserialize, Serialize};

/// What the fake upstream saw.
#[derive(Debug, Serialize, Deserialize)]
struct Seen {
    unique_id: Option<String>,
    forwarded_for: Option<String>,
    via: Option<String>,
    path: String,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

async fn start_upstream() -> SocketAddr {
    let app = Router::new().fallback(|uri: Uri, headers: HeaderMap| async move {
        Json(Seen {
            unique_id: header(&headers, "x-unique-id"),
            forwarded_for: header(&headers, "x-forwarded-for"),
            via: header(&headers, "via"),
            path: uri
                .path_and_query()
                .map_or("/", |pq| pq.as_str())
                .to_string(),
        })
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn start_test_server(config: Config) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    start_test_server_with_limit(config, 1_048_576).await
}

async fn start_test_server_with_limit(
    config: Config,
    max_body: usize,
) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let state = Arc::new(AppState::new(LoadedConfig {
        config: Arc::new(config),
        version: ConfigVersion::Hash("test-hash".into()),
        source_name: "test".into(),
        loaded_at: Instant::now(),
    }));

    let router = server::build_router(state, max_body).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    (addr, shutdown_tx)
}

fn random_config() -> Config {
    Config {
        identity: IdentityConfig {
            strategy: Strategy::Random,
            id_length: Some(8),
            prefix: Some("req".into()),
            ..IdentityConfig::default()
        },
        ..Config::default()
    }
}

#[tokio::test]
async fn health_endpoint_returns_healthy() {
    let (addr, shutdown) = start_test_server(Config::default()).await;

    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["x-unique-id"].len(), 64);

    let health: HealthResponse = resp.json().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(health.config.source, "test");
    assert_eq!(health.config.version, "test-has");
    assert!(health.config.upstream.is_none());
    assert!(health.identity.enabled);
    assert_eq!(health.identity.strategy, "deterministic");
    assert_eq!(health.stats.requests_forwarded, 0);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn echo_mode_exposes_request_context() {
    let mut config = Config::default();
    config.identity.user_id_header = Some("X-User-ID".into());
    let (addr, shutdown) = start_test_server(config).await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{addr}/orders/42"))
        .header("X-User-ID", "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let header_id = resp.headers()["x-unique-id"].to_str().unwrap().to_string();

    let echo: EchoResponse = resp.json().await.unwrap();
    assert_eq!(echo.request_id.as_deref(), Some(header_id.as_str()));
    assert_eq!(echo.user_id.as_deref(), Some("alice"));
    assert_eq!(echo.method, "GET");
    assert_eq!(echo.path, "/orders/42");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn anonymous_user_without_header() {
    let mut config = Config::default();
    config.identity.user_id_header = Some("X-User-ID".into());
    let (addr, shutdown) = start_test_server(config).await;

    let echo: EchoResponse = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(echo.user_id.as_deref(), Some("anonymous"));

    let _ = shutdown.send(());
}

#[tokio::test]
async fn random_strategy_applies_prefix_and_length() {
    let (addr, shutdown) = start_test_server(random_config()).await;

    let resp = reqwest::get(format!("http://{addr}/anything")).await.unwrap();
    let id = resp.headers()["x-unique-id"].to_str().unwrap().to_string();
    assert!(id.starts_with("req-"), "{id}");
    assert_eq!(id.len(), "req-".len() + 8);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn sequential_requests_get_distinct_ids() {
    let (addr, shutdown) = start_test_server(random_config()).await;

    let mut ids = std::collections::HashSet::new();
    for _ in 0..10 {
        let resp = reqwest::get(format!("http://{addr}/")).await.unwrap();
        ids.insert(resp.headers()["x-unique-id"].to_str().unwrap().to_string());
    }
    assert_eq!(ids.len(), 10);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn disabled_identity_sets_no_header() {
    let mut config = Config::default();
    config.identity.enabled = false;
    let (addr, shutdown) = start_test_server(config).await;

    let resp = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert!(resp.headers().get("x-unique-id").is_none());
    let echo: EchoResponse = resp.json().await.unwrap();
    assert!(echo.request_id.is_none());

    let _ = shutdown.send(());
}

#[tokio::test]
async fn extra_info_header_is_added() {
    let config = Config {
        extra_info: Some("served by idgate".into()),
        ..Config::default()
    };
    let (addr, shutdown) = start_test_server(config).await;

    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.headers()["x-extra-info"], "served by idgate");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn upstream_sees_the_same_id_as_the_client() {
    let upstream_addr = start_upstream().await;
    let config = Config {
        upstream: Some(Upstream::new(format!("http://{upstream_addr}/api"))),
        ..Config::default()
    };
    let (addr, shutdown) = start_test_server(config).await;

    let resp = reqwest::get(format!("http://{addr}/users?page=2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let client_id = resp.headers()["x-unique-id"].to_str().unwrap().to_string();

    let seen: Seen = resp.json().await.unwrap();
    assert_eq!(seen.unique_id.as_deref(), Some(client_id.as_str()));
    assert_eq!(seen.forwarded_for.as_deref(), Some("127.0.0.1"));
    assert_eq!(seen.via.as_deref(), Some("1.1 idgate"));
    assert_eq!(seen.path, "/api/users?page=2");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn custom_header_name_is_forwarded() {
    let upstream_addr = start_upstream().await;
    let config = Config {
        identity: IdentityConfig {
            header: "Req-ID".into(),
            ..IdentityConfig::default()
        },
        upstream: Some(Upstream::new(format!("http://{upstream_addr}"))),
        ..Config::default()
    };
    let (addr, shutdown) = start_test_server(config).await;

    let resp = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(resp.headers()["req-id"].len(), 64);
    let seen: Seen = resp.json().await.unwrap();
    assert!(seen.unique_id.is_none());

    let _ = shutdown.send(());
}

#[tokio::test]
async fn unreachable_upstream_returns_502() {
    // Bind then drop to get a port nothing listens on.
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed_addr = closed.local_addr().unwrap();
    drop(closed);

    let config = Config {
        upstream: Some(Upstream::new(format!("http://{closed_addr}"))),
        ..Config::default()
    };
    let (addr, shutdown) = start_test_server(config).await;

    let resp = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(resp.status(), 502);

    let health: HealthResponse = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.stats.requests_failed, 1);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn oversized_body_rejection_carries_an_id() {
    let (addr, shutdown) = start_test_server_with_limit(Config::default(), 16).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/upload"))
        .body("x".repeat(64))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
    assert_eq!(resp.headers()["x-unique-id"].len(), 64);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn graceful_shutdown_works() {
    let (addr, shutdown) = start_test_server(Config::default()).await;

    let url = format!("http://{addr}/health");
    assert!(reqwest::get(&url).await.is_ok());

    let _ = shutdown.send(());

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let result = reqwest::get(&url).await;
    assert!(result.is_err());
}
