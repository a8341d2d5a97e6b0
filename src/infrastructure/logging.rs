//! Logging system configuration and initialization
//!
//! Sets up `tracing` with a level filter derived from the logging config,
//! console output, and optional daily-rotated file output. Noisy dependency
//! targets are quieted by the default module filters; `RUST_LOG` overrides
//! everything when set.

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::infrastructure::config::LoggingConfig;

// Keeps the non-blocking file writer alive for the process lifetime.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Get the log directory relative to the executable location.
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Initialize logging from the given configuration. Safe to call more than
/// once; later calls are no-ops if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;

    if config.file_output {
        let log_dir = get_log_directory();
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory {log_dir:?}"))?;
        let file_appender = rolling::daily(&log_dir, "shopfeed.log");
        let (writer, guard) = non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);

        if config.console_output {
            let _ = Registry::default()
                .with(filter)
                .with(fmt::layer().with_target(true))
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init();
        } else {
            let _ = Registry::default()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init();
        }
    } else if config.console_output {
        let _ = Registry::default()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init();
    } else {
        let _ = Registry::default().with(filter).try_init();
    }

    Ok(())
}

/// RUST_LOG wins; otherwise the configured level plus per-module directives.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    filter_from_config(config)
}

fn filter_from_config(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::new(&config.level);
    for (module, level) in &config.module_filters {
        let directive = format!("{module}={level}")
            .parse()
            .with_context(|| format!("Invalid log filter for module {module}"))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}
