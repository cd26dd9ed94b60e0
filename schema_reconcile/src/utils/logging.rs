//! Logging utilities for schema_reconcile

use std::fs::File;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Parse a level name; unknown names fall back to INFO
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the filter for the crate at `level`, on top of `RUST_LOG`
pub fn env_filter(level: Level) -> Result<EnvFilter> {
    let directive = format!("schema_reconcile={}", level)
        .parse()
        .map_err(|e| Error::ConfigError(format!("Invalid log directive: {}", e)))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Initialize logging based on configuration
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let config = match config {
        Some(cfg) => cfg,
        None => return Ok(()),
    };

    let env_filter = env_filter(parse_level(&config.level))?;
    let json = config.format.eq_ignore_ascii_case("json");

    // A file wins over stdout
    let result = if let Some(file_path) = &config.file {
        if let Some(parent) = Path::new(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(file_path)?;

        if json {
            let subscriber = fmt::Subscriber::builder()
                .json()
                .with_env_filter(env_filter)
                .with_writer(file)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        } else {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(file)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    } else if config.stdout {
        if json {
            let subscriber = fmt::Subscriber::builder()
                .json()
                .with_env_filter(env_filter)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        } else {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    } else {
        return Ok(());
    };

    result.map_err(|e| Error::ConfigError(format!("Failed to install logger: {}", e)))
}
