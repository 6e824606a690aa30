//! Logging setup shared by the xwrite binaries
//!
//! Diagnostics always go to stderr so stdout stays clean for command output
//! such as `xw-quota --format json`. The level comes from `RUST_LOG`, then
//! `XWRITE_LOG_LEVEL`, and `--verbose` forces debug.
//!
//! ```no_run
//! use libxwrite::logging::{LoggingConfig, LogFormat};
//!
//! LoggingConfig::new(LogFormat::Json, "info".to_string(), false).init();
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const FORMAT_VAR: &str = "XWRITE_LOG_FORMAT";
const LEVEL_VAR: &str = "XWRITE_LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One line per event, no target
    Text,
    /// One JSON object per line
    Json,
    /// Multi-line with source locations
    Pretty,
}

impl LogFormat {
    /// Case-insensitive name lookup; unknown names yield `None`
    pub fn parse(name: &str) -> Option<Self> {
        [LogFormat::Text, LogFormat::Json, LogFormat::Pretty]
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        }
    }
}

pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub verbose: bool,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
        }
    }

    /// Text at warn unless `XWRITE_LOG_FORMAT` / `XWRITE_LOG_LEVEL` say otherwise
    pub fn from_env(verbose: bool) -> Self {
        let format = match std::env::var(FORMAT_VAR) {
            Ok(name) => LogFormat::parse(&name).unwrap_or_else(|| {
                eprintln!("Ignoring unknown {}={:?}, using text", FORMAT_VAR, name);
                LogFormat::Text
            }),
            Err(_) => LogFormat::Text,
        };

        let level = std::env::var(LEVEL_VAR).unwrap_or_else(|_| "warn".to_string());

        Self::new(format, level, verbose)
    }

    fn filter_directive(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.level
        }
    }

    /// Install the global subscriber
    ///
    /// # Panics
    ///
    /// Panics if a subscriber has already been installed.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.filter_directive()));

        let output = match self.format {
            LogFormat::Json => fmt::layer()
                .json()
                .flatten_event(true)
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Text => fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        };

        tracing_subscriber::registry().with(filter).with(output).init();
    }
}

/// Initialize logging from the environment, honouring `--verbose`
pub fn init_default(verbose: bool) {
    LoggingConfig::from_env(verbose).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_log_format() {
        assert_eq!(LogFormat::parse("text"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" pretty "), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("yaml"), None);
    }

    #[test]
    fn test_verbose_overrides_level() {
        let config = LoggingConfig::new(LogFormat::Text, "error".to_string(), true);
        assert_eq!(config.filter_directive(), "debug");

        let config = LoggingConfig::new(LogFormat::Text, "error".to_string(), false);
        assert_eq!(config.filter_directive(), "error");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(FORMAT_VAR, "json");
        std::env::set_var(LEVEL_VAR, "trace");
        let config = LoggingConfig::from_env(false);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "trace");

        std::env::set_var(FORMAT_VAR, "xml");
        assert_eq!(LoggingConfig::from_env(false).format, LogFormat::Text);

        std::env::remove_var(FORMAT_VAR);
        std::env::remove_var(LEVEL_VAR);
        let config = LoggingConfig::from_env(false);
        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.level, "warn");
    }
}
