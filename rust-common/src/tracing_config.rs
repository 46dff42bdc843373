//! Tracing subscriber setup for binaries.
//!
//! Libraries in this workspace only emit events; installing a subscriber is
//! left to the process entry point. Binaries read their settings from
//! `HCV_LOG_LEVEL` and `HCV_LOG_FORMAT`; `RUST_LOG`, when set, overrides the
//! level.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Variable holding the default filter directive.
pub const LOG_LEVEL_VAR: &str = "HCV_LOG_LEVEL";

/// Variable selecting the output format (`text` or `json`).
pub const LOG_FORMAT_VAR: &str = "HCV_LOG_FORMAT";

/// Event output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event, carrying the current span's fields
    Json,
}

impl LogFormat {
    /// Parse a format name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub log_level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl TracingConfig {
    /// Read the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    ///
    /// Unset or blank variables keep their defaults. An unrecognised format
    /// name falls back to text.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(level) = lookup(LOG_LEVEL_VAR).filter(|v| !v.trim().is_empty()) {
            config.log_level = level.trim().to_string();
        }
        if let Some(format) = lookup(LOG_FORMAT_VAR) {
            config.format = LogFormat::parse(&format).unwrap_or_default();
        }
        config
    }

    /// Set the filter directive.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Install the global subscriber.
///
/// Events go to stderr so that command output on stdout stays clean.
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(config: &TracingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    result.is_ok()
}
