//! Log output for sessions
//!
//! The library only emits `tracing` events. [`install`] wires those events
//! to the console and/or a timestamped log file according to a
//! [`LoggingConfig`]. Installation is process-wide and happens at most once;
//! later calls leave the existing subscriber in place.

use crate::config::LoggingConfig;
use crate::error::{Result, ResultExt};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Build the log file path for a config and timestamp
pub fn log_file_path(config: &LoggingConfig, now: chrono::DateTime<chrono::Local>) -> PathBuf {
    let name = format!(
        "{}log__{}.log",
        config.log_file_prefix,
        now.format("%Y-%m-%d_%H-%M-%S")
    );
    match &config.log_path {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Install console and file output for the crate's tracing events
///
/// Returns the log file path when a file was opened. Nothing is installed,
/// and no file is touched, when logging is suppressed, both outputs are
/// disabled, or a global subscriber already exists.
pub fn install(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    if config.suppress_logging || (!config.output_log && !config.print_console) {
        return Ok(None);
    }
    if tracing::dispatcher::has_been_set() {
        return Ok(None);
    }

    let (file_layer, path) = if config.output_log {
        let path = log_file_path(config, chrono::Local::now());
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
        }
        // Append: sessions created within the same second share a file name.
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file));
        (Some(layer), Some(path))
    } else {
        (None, None)
    };

    let console_layer = config
        .print_console
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}=info", env!("CARGO_CRATE_NAME"))));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(log_file = ?path, "Installed session log output");
        Ok(path)
    } else {
        // Lost a race with another subscriber
        Ok(None)
    }
}
