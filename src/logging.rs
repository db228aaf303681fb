//! Logging setup for receiptsync
//!
//! Logs go to the console and to rotating files in the app data directory.
//!
//! ## Features
//!
//! - **File Rotation**: Daily rotation, 10 files retained
//! - **Error Tracking**: Separate error.log for warnings and errors
//! - **Cross-Platform**: Uses platform-specific app data directories
//!
//! ## Usage
//!
//! ```no_run
//! use receiptsync::logging;
//!
//! // Initialize once at startup
//! logging::init().expect("Failed to initialize logging");
//!
//! tracing::info!("Backfill started");
//! ```

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Gets the log directory path based on platform conventions
///
/// Returns:
/// - Windows: `%APPDATA%/receiptsync/logs`
/// - macOS: `~/Library/Application Support/receiptsync/logs`
/// - Linux: `~/.local/share/receiptsync/logs`
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;

    let log_dir = base_dir.join("receiptsync").join("logs");

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }

    Ok(log_dir)
}

/// Initializes console and file logging.
///
/// Creates `receiptsync.log` (all levels) and `error.log` (warnings and
/// errors). The console layer is compact since the CLI prints its own output
/// to stdout; logs go to stderr.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or file appenders fail
pub fn init() -> Result<()> {
    let log_dir = get_log_dir()?;

    let all_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("receiptsync")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create all-logs file appender")?;

    let error_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("error")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create error-logs file appender")?;

    // Default to WARN on the console and INFO in files, RUST_LOG overrides both
    let file_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .context("Failed to create env filter")?;

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .with_filter(console_filter);

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(all_logs_appender)
        .with_filter(file_filter);

    let error_logs_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(error_logs_appender)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .init();

    tracing::info!("Logging initialized, log directory: {}", log_dir.display());

    Ok(())
}
