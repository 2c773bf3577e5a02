//! Structured logging setup using the `tracing` ecosystem.
//!
//! Configures a `tracing-subscriber` with either JSON output (for
//! production) or pretty-printed output (for TTY / local dev). Format
//! is auto-detected from the terminal but can be forced via `--json`
//! or `--pretty`. The identity middleware's per-request records go
//! through this subscriber like every other event.
//!
//! Output is handed to a `tracing-appender` worker thread, so emitting an
//! event on a request task never waits on stdout.

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Install the global subscriber. Buffered records are flushed when the
/// returned guard is dropped, so keep it alive until shutdown.
#[must_use = "dropping the guard stops the log writer"]
pub fn init(level: &LogLevel, format: LogFormat) -> WorkerGuard {
    let tracing_level = level.to_tracing_level();
    let filter = tracing_subscriber::filter::Targets::new().with_default(tracing_level);
    let (writer, guard) = background_writer(std::io::stdout());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(false).with_writer(writer))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_writer(writer))
                .init();
        }
    }

    guard
}

/// Moves writes to `inner` onto a dedicated worker thread.
fn background_writer<W>(inner: W) -> (NonBlocking, WorkerGuard)
where
    W: std::io::Write + Send + 'static,
{
    tracing_appender::non_blocking(inner)
}
