use std::str::FromStr;

use serde::Deserialize;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::errors::types::{Error, Result};

/// Line format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Compact,
    Json,
}

/// Logging section of a configuration file.
///
/// ```toml
/// [logging]
/// level = "info"
/// directives = ["sipr_tm_core::manager=trace"]
/// format = "json"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when `RUST_LOG` is not set
    pub level: String,
    /// Extra `target=level` directives applied on top of `level`
    pub directives: Vec<String>,
    pub format: LogFormat,
    /// Whether to include file and line information
    pub file_info: bool,
    /// Whether to log span open/close events
    pub log_spans: bool,
    /// Write through the test harness capture instead of stdout
    #[serde(skip)]
    pub test_writer: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            directives: Vec::new(),
            format: LogFormat::Plain,
            file_info: false,
            log_spans: false,
            test_writer: false,
        }
    }
}

impl LoggingConfig {
    pub fn new(level: Level) -> Self {
        LoggingConfig {
            level: level.to_string(),
            ..Default::default()
        }
    }

    /// Configuration for test binaries: output captured per test
    pub fn for_tests(level: Level) -> Self {
        LoggingConfig {
            test_writer: true,
            ..Self::new(level)
        }
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    pub fn with_spans(mut self) -> Self {
        self.log_spans = true;
        self
    }

    /// Build the filter: `RUST_LOG` if set, `level` otherwise, then `directives`
    pub fn filter(&self) -> Result<EnvFilter> {
        let level = parse_log_level(&self.level)?;
        let mut filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();
        for directive in &self.directives {
            let parsed = Directive::from_str(directive)
                .map_err(|e| Error::Config(format!("Invalid log directive '{}': {}", directive, e)))?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }
}

/// Install the global subscriber described by `config`.
///
/// Fails with [`Error::Logging`] when a subscriber is already installed, so
/// test harnesses can call it repeatedly and ignore the error.
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let span_events = if config.log_spans {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(config.filter()?)
        .with_span_events(span_events)
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let installed = match (config.format, config.test_writer) {
        (LogFormat::Plain, false) => builder.try_init(),
        (LogFormat::Plain, true) => builder.with_test_writer().try_init(),
        (LogFormat::Compact, false) => builder.compact().try_init(),
        (LogFormat::Compact, true) => builder.compact().with_test_writer().try_init(),
        (LogFormat::Json, false) => builder.json().try_init(),
        (LogFormat::Json, true) => builder.json().with_test_writer().try_init(),
    };

    installed.map_err(|e| Error::Logging(e.to_string()))
}

/// Parse a log level from a string
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level).map_err(|_| Error::Config(format!("Invalid log level: {}", level)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_toml_str;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("WARN").unwrap(), Level::WARN);
        assert!(matches!(parse_log_level("chatty"), Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_flags() {
        let config = LoggingConfig::for_tests(Level::TRACE)
            .with_format(LogFormat::Json)
            .with_file_info()
            .with_directive("sipr_tm_core=debug");
        assert_eq!(config.level, "TRACE");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directives, vec!["sipr_tm_core=debug".to_string()]);
        assert!(config.test_writer);
        assert!(config.file_info);
        assert!(!config.log_spans);
    }

    #[test]
    fn test_from_toml_section() {
        let config: LoggingConfig = load_toml_str(
            "level = \"debug\"\nformat = \"compact\"\ndirectives = [\"nom=warn\"]\n",
        )
        .unwrap();
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.directives.len(), 1);
        assert!(!config.test_writer);
        config.filter().unwrap();
    }

    #[test]
    fn test_bad_directive_is_config_error() {
        let config = LoggingConfig::default().with_directive("sipr_tm_core=loud");
        assert!(matches!(config.filter(), Err(Error::Config(_))));
    }

    #[test]
    fn test_second_setup_reports_error() {
        let _ = setup_logging(&LoggingConfig::for_tests(Level::INFO));
        let second = setup_logging(&LoggingConfig::for_tests(Level::INFO).with_spans());
        assert!(matches!(second, Err(Error::Logging(_))));
    }
}
