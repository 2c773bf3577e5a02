//! `idgate run`: start the proxy server.
//!
//! Loads configuration from a file (or falls back to built-in defaults),
//! applies CLI overrides, then starts the Axum HTTP server with the
//! identity middleware installed and graceful shutdown wired in.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::cli::RunArgs;
use crate::config::model::{Config, Upstream};
use crate::config::sources;
use crate::config::validation::validate;
use crate::config::{ConfigSource, ConfigVersion};
use crate::error::IdgateError;
use crate::hash::sha256_hex;
use crate::logging;
use crate::server::{self, AppState, LoadedConfig};

/// Config file names probed in the working directory, limited to the
/// formats compiled in.
fn candidates() -> Vec<&'static str> {
    let mut names = Vec::new();
    if cfg!(feature = "yaml") {
        names.extend(["idgate.yaml", "idgate.yml"]);
    }
    if cfg!(feature = "json") {
        names.push("idgate.json");
    }
    if cfg!(feature = "toml") {
        names.push("idgate.toml");
    }
    names
}

pub async fn execute(args: RunArgs) -> Result<(), IdgateError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    let _log_guard = logging::init(&args.log_level, log_format);

    let (config, version, source_name) = match resolve_file_source(args.config.as_deref()).await? {
        Some(source) => {
            let (config, version) = source.load().await?;
            (config, version, source.name().to_string())
        }
        None => {
            tracing::info!("no config file found, using built-in defaults");
            (
                Config::default(),
                ConfigVersion::Hash(sha256_hex(b"")),
                "defaults".to_string(),
            )
        }
    };

    let config = apply_overrides(config, &args)?;

    tracing::info!(
        enabled = config.identity.enabled,
        strategy = %config.identity.strategy,
        header = %config.identity.header,
        upstream = config.upstream.as_ref().map_or("none", |u| u.url.as_str()),
        "identity configured"
    );

    let state = Arc::new(AppState::new(LoadedConfig {
        config: Arc::new(config),
        version,
        source_name,
        loaded_at: Instant::now(),
    }));

    let router = server::build_router(state, args.max_body)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "idgate started");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    tracing::info!("idgate stopped");
    Ok(())
}

/// Apply `--upstream` / `--timeout` on top of the loaded file and re-validate.
fn apply_overrides(mut config: Config, args: &RunArgs) -> Result<Config, IdgateError> {
    if let Some(ref url) = args.upstream {
        match config.upstream {
            Some(ref mut upstream) => upstream.url.clone_from(url),
            None => config.upstream = Some(Upstream::new(url.as_str())),
        }
    }

    if let Some(timeout) = args.timeout {
        if let Some(ref mut upstream) = config.upstream {
            upstream.timeout = timeout;
        } else {
            tracing::warn!(timeout, "--timeout ignored, no upstream configured");
        }
    }

    validate(&config).map_err(|errors| IdgateError::ConfigValidation { errors })?;
    Ok(config)
}

async fn resolve_file_source(
    explicit: Option<&Path>,
) -> Result<Option<Box<dyn ConfigSource>>, IdgateError> {
    if let Some(path) = explicit {
        return create_file_source(path).map(Some);
    }

    // Auto-detect in current directory
    for name in candidates() {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return create_file_source(&path).map(Some);
        }
    }

    Ok(None)
}

fn create_file_source(path: &Path) -> Result<Box<dyn ConfigSource>, IdgateError> {
    Ok(Box::new(sources::for_path(path)?))
}
