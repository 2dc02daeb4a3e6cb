//! Logging for the container and the sessions built on it.
//!
//! Container events are emitted through `tracing`: registrations and scope
//! lifecycle at `debug`, individual lookups at `trace`. Nothing is printed
//! until a subscriber is installed, either by the host application or with
//! [`LogConfig::init`].
//!
//! # Examples
//!
//! ```no_run
//! use armature_di::logging::*;
//!
//! let config = LogConfig::new()
//!     .level(LogLevel::Debug)
//!     .format(LogFormat::Pretty)
//!     .with_env_filter("armature_di=trace");
//!
//! config.init().expect("subscriber already installed");
//! debug!("container logging enabled");
//! ```
//!
//! Tests can call [`init_test_logging`], which installs a compact subscriber
//! once per process, filtered by `ARMATURE_LOG` (default `warn`).

use crate::{Error, Result};
use once_cell::sync::OnceCell;
use tracing::Level;
use tracing_subscriber::EnvFilter;

// Re-export tracing for convenience
pub use tracing::{debug, error, info, trace, warn};

/// Environment variable read by [`init_test_logging`]
pub const TEST_LOG_ENV: &str = "ARMATURE_LOG";

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// Convert to string for EnvFilter
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured, machine-readable
    Json,
    /// Multi-line, human-readable
    Pretty,
    /// Single line per event
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level filter
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
    /// Include target (module path)
    pub targets: bool,
    /// Write through the test harness capture instead of raw stderr
    pub test_writer: bool,
    /// Custom environment filter (overrides level if set)
    pub env_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            targets: true,
            test_writer: false,
            env_filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_targets(mut self, enable: bool) -> Self {
        self.targets = enable;
        self
    }

    pub fn with_test_writer(mut self, enable: bool) -> Self {
        self.test_writer = enable;
        self
    }

    /// Set custom environment filter, e.g. `"armature_di=trace,warn"`
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn build_filter(&self) -> Result<EnvFilter> {
        let directives = self
            .env_filter
            .clone()
            .unwrap_or_else(|| self.level.as_str().to_string());
        EnvFilter::try_new(&directives)
            .map_err(|e| Error::Logging(format!("invalid filter `{directives}`: {e}")))
    }

    /// Install a global subscriber for this configuration.
    ///
    /// Fails if the filter does not parse or a subscriber is already set.
    pub fn init(&self) -> Result<()> {
        let filter = self.build_filter()?;
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(self.targets);

        let result = match (self.format, self.test_writer) {
            (LogFormat::Json, false) => builder.json().try_init(),
            (LogFormat::Json, true) => builder.json().with_test_writer().try_init(),
            (LogFormat::Pretty, false) => builder.pretty().try_init(),
            (LogFormat::Pretty, true) => builder.pretty().with_test_writer().try_init(),
            (LogFormat::Compact, false) => builder.compact().try_init(),
            (LogFormat::Compact, true) => builder.compact().with_test_writer().try_init(),
        };
        result.map_err(|e| Error::Logging(e.to_string()))
    }
}

static TEST_LOGGING: OnceCell<()> = OnceCell::new();

/// Install a compact, test-captured subscriber once per process.
///
/// Safe to call from every test; a subscriber installed elsewhere wins.
pub fn init_test_logging() {
    TEST_LOGGING.get_or_init(|| {
        let filter = std::env::var(TEST_LOG_ENV).unwrap_or_else(|_| "warn".to_string());
        let config = LogConfig::new()
            .with_env_filter(filter)
            .with_test_writer(true);
        if let Err(e) = config.init() {
            debug!(error = %e, "Test logging not installed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_strings() {
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::Warn.to_tracing_level(), Level::WARN);
    }

    #[test]
    fn test_builder() {
        let config = LogConfig::new()
            .level(LogLevel::Debug)
            .format(LogFormat::Json)
            .with_targets(false)
            .with_env_filter("armature_di=trace");
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.targets);
        assert_eq!(config.env_filter.as_deref(), Some("armature_di=trace"));
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = LogConfig::new().with_env_filter("armature_di=notalevel");
        assert!(matches!(config.build_filter(), Err(Error::Logging(_))));
    }

    #[test]
    fn test_init_test_logging_is_idempotent() {
        init_test_logging();
        init_test_logging();
    }
}
