//! Structured logging setup.
//!
//! The dispatch path logs through `tracing` with named fields; this module
//! installs the subscriber that prints them. JSON is the default format,
//! pretty-printing is meant for development.
//!
//! `RUST_LOG`, when set, takes precedence over `BRRTD_LOG_LEVEL`.

use anyhow::Result;
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output encoding of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// `pretty` (any case) selects [`LogFormat::Pretty`]; anything else is JSON.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error; unknown names mean info
    pub log_level: String,
    pub format: LogFormat,
}

impl LogConfig {
    /// `BRRTD_LOG_LEVEL` (default `info`) and `BRRTD_LOG_FORMAT` (default `json`).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("BRRTD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: env::var("BRRTD_LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(LogFormat::Json),
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level().as_str()))
    }
}

/// Install the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed, so calling
/// this from several entry points (or several tests) is harmless.
///
/// ```no_run
/// use brrtdispatch::logging::{init_logging, LogConfig};
///
/// init_logging(&LogConfig::from_env()).expect("Failed to initialize logging");
/// ```
///
/// # Errors
///
/// Reserved for subscriber construction failures; an already-installed
/// subscriber is not one.
pub fn init_logging(config: &LogConfig) -> Result<bool> {
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(level = %config.log_level, format = ?config.format, "Logging initialized");
    } else {
        tracing::debug!("Logging already initialized, keeping the existing subscriber");
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("invalid"), LogFormat::Json);
    }

    #[test]
    fn test_level_names() {
        let config = |level: &str| LogConfig {
            log_level: level.to_string(),
            format: LogFormat::Pretty,
        };
        assert_eq!(config("DEBUG").level(), Level::DEBUG);
        assert_eq!(config("warn").level(), Level::WARN);
        assert_eq!(config("loud").level(), Level::INFO);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LogConfig {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
        };
        let first = init_logging(&config).unwrap();
        let second = init_logging(&config).unwrap();
        assert!(!second || !first);
    }
}
