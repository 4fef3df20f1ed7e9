//! Console and log-file sinks for harness diagnostics.

use crate::config::LoggingConfig;
use crate::error::FsdiffResult;
use std::fs::{File, OpenOptions};
use std::sync::Arc;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer};

/// Active logging sinks. Logging stops and the file is synced when dropped.
///
/// The subscriber is installed for the current thread, so the harness must be
/// driven from a single-threaded runtime.
pub struct LogHandle {
    _guard: DefaultGuard,
    file: Arc<File>,
}

impl Drop for LogHandle {
    fn drop(&mut self) {
        let _ = self.file.sync_all();
    }
}

/// Install a subscriber writing to both the console and `config.file`.
///
/// `RUST_LOG` takes precedence over `config.level`.
pub fn init(config: &LoggingConfig) -> FsdiffResult<LogHandle> {
    if let Some(parent) = config.file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = Arc::new(
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file)?,
    );

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (console, persistent) = if config.json {
        (
            fmt::layer().json().with_target(false).boxed(),
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(file.clone())
                .boxed(),
        )
    } else {
        (
            fmt::layer().with_target(false).boxed(),
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(file.clone())
                .boxed(),
        )
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(persistent);

    Ok(LogHandle {
        _guard: tracing::subscriber::set_default(subscriber),
        file,
    })
}
