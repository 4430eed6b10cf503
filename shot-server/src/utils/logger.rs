//! Logging Infrastructure
//!
//! Console output plus an optional daily rotating file (`<LOG_DIR>/app.YYYY-MM-DD`).
//! `RUST_LOG` overrides the configured level.

use std::fs;
use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the logger (console only, `info`)
pub fn init_logger() -> anyhow::Result<()> {
    init_logger_with_file("info", false, None)
}

/// Initialize the logging system
///
/// # Arguments
/// * `level` - Log level used when `RUST_LOG` is unset (e.g. "info", "debug")
/// * `json_format` - JSON lines instead of the human-readable format
/// * `log_dir` - Optional directory for the daily rotating file
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let app_log = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            Some(RollingFileAppender::new(Rotation::DAILY, dir, "app"))
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if json_format {
        let console_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true);
        let app_layer = app_log.map(|writer| {
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_thread_ids(true)
                .with_writer(std::sync::Mutex::new(writer))
        });
        subscriber.with(console_layer).with(app_layer).try_init()?;
    } else {
        let console_layer = fmt::layer().with_target(true).with_thread_ids(false);
        let app_layer = app_log.map(|writer| {
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(writer))
        });
        subscriber.with(console_layer).with(app_layer).try_init()?;
    }

    Ok(())
}
