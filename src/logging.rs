//! Tracing configuration and log routing.
//!
//! Every binary logs to stdout using a compact formatter and, additionally, to a file named
//! after the service. `ECHO_LOG_DIR` selects the directory (default `logs/`), so the chat
//! server writes `logs/echo-chat.log` while the ingestion CLI writes `logs/ingest.log`.
//! Setting `ECHO_LOG_DIR` to an empty string disables the file layer.
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_DIR: &str = "logs";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber for the named service.
///
/// `RUST_LOG` controls filtering and defaults to `info`. Must be called at most once per
/// process; later calls are ignored by `try_init`.
pub fn init_tracing(service: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let installed = match file_writer(service) {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).try_init()
        }
        None => registry.try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(service, "Tracing initialized");
    }
}

fn log_dir() -> Option<PathBuf> {
    match std::env::var("ECHO_LOG_DIR") {
        Ok(value) if value.trim().is_empty() => None,
        Ok(value) => Some(PathBuf::from(value)),
        Err(_) => Some(PathBuf::from(DEFAULT_LOG_DIR)),
    }
}

/// Build a non-blocking writer appending to `<dir>/<service>.log`.
///
/// Returns `None` when file logging is disabled or the directory cannot be created.
fn file_writer(service: &str) -> Option<NonBlocking> {
    let dir = log_dir()?;
    if let Err(err) = std::fs::create_dir_all(&dir) {
        eprintln!("Failed to create log directory {}: {err}", dir.display());
        return None;
    }
    let appender = tracing_appender::rolling::never(&dir, format!("{service}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}
