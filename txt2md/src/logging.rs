//! Tracing setup for the binary: a console layer on stderr plus an
//! append-mode log file, both filtered at the configured level.

use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use txt2md_core::config::{LogLevel, LogSettings};

pub fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warning => LevelFilter::WARN,
        LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
    }
}

/// Installs the global subscriber. If the log file cannot be opened the
/// console layer still works and a warning is emitted once installed.
pub fn init_logging(settings: &LogSettings) -> anyhow::Result<()> {
    let file = settings
        .log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(std::fs::create_dir_all)
        .transpose()
        .and_then(|_| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&settings.log_file)
        });

    let (file_layer, file_error) = match file {
        Ok(f) => (
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(f))),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(level_filter(settings.log_level))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;

    match file_error {
        None => tracing::info!(
            log_file = %settings.log_file.display(),
            log_level = ?settings.log_level,
            "Logging initialised"
        ),
        Some(e) => tracing::warn!(
            error = %e,
            log_file = %settings.log_file.display(),
            "Could not open log file, logging to console only"
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_config_levels_onto_tracing_filters() {
        assert_eq!(level_filter(LogLevel::Debug), LevelFilter::DEBUG);
        assert_eq!(level_filter(LogLevel::Info), LevelFilter::INFO);
        assert_eq!(level_filter(LogLevel::Warning), LevelFilter::WARN);
        assert_eq!(level_filter(LogLevel::Error), LevelFilter::ERROR);
        assert_eq!(level_filter(LogLevel::Critical), LevelFilter::ERROR);
    }
}
