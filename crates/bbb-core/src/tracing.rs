//! Log output for applications embedding the API client.
//!
//! The library crates only emit `tracing` events. Request URLs and response
//! bodies are logged at debug level by `bbb_client` when its `debug` flag is
//! on, so the subscriber has to let that level through for those events to
//! show up. [`TracingConfig::for_client`] does that from the same flag, and
//! `ClientConfig::tracing_config` in `bbb_client` calls it:
//!
//! ```ignore
//! let config = ClientConfig::load_from("bbb.toml")?;
//! bbb_core::init_tracing(config.tracing_config())?;
//! ```
//!
//! `RUST_LOG` still wins when it is set.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Crates covered by the generated filter.
const TARGETS: &[&str] = &["bbb_core", "bbb_protocol", "bbb_client"];

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
}

/// How log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// One line per event.
    #[default]
    Compact,
    /// Multi-line, for reading a single exchange by eye.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Level applied to the client crates when no filter is given.
    pub level: Level,
    pub format: TracingOutputFormat,
    pub timestamps: bool,
    /// Explicit filter directive, used instead of `level` and `RUST_LOG`.
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: TracingOutputFormat::Compact,
            timestamps: true,
            filter: None,
        }
    }
}

impl TracingConfig {
    /// Settings matching a client's `debug` flag: request and response
    /// logging is visible when it is on, only warnings otherwise.
    #[must_use]
    pub fn for_client(debug: bool) -> Self {
        let level = if debug { Level::DEBUG } else { Level::WARN };
        Self::default().with_level(level)
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// The directive used when neither `filter` nor `RUST_LOG` is set,
    /// e.g. `bbb_core=debug,bbb_protocol=debug,bbb_client=debug`.
    pub fn directive(&self) -> String {
        let level = self.level.to_string().to_ascii_lowercase();
        TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        match &self.filter {
            Some(filter) => Ok(EnvFilter::try_new(filter)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.directive()))),
        }
    }
}

/// Installs a global subscriber.
///
/// # Errors
///
/// Fails if a subscriber is already installed or `filter` does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.env_filter()?;

    let layer = match (config.format, config.timestamps) {
        (TracingOutputFormat::Compact, true) => fmt::layer().compact().boxed(),
        (TracingOutputFormat::Compact, false) => fmt::layer().compact().without_time().boxed(),
        (TracingOutputFormat::Pretty, true) => fmt::layer().pretty().boxed(),
        (TracingOutputFormat::Pretty, false) => fmt::layer().pretty().without_time().boxed(),
        (TracingOutputFormat::Json, true) => fmt::layer().json().boxed(),
        (TracingOutputFormat::Json, false) => fmt::layer().json().without_time().boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_debug_flag_selects_level() {
        assert_eq!(TracingConfig::for_client(true).level, Level::DEBUG);
        assert_eq!(TracingConfig::for_client(false).level, Level::WARN);
        assert_eq!(TracingConfig::for_client(false), TracingConfig::default());
    }

    #[test]
    fn directive_covers_all_crates() {
        assert_eq!(
            TracingConfig::for_client(true).directive(),
            "bbb_core=debug,bbb_protocol=debug,bbb_client=debug"
        );
    }

    #[test]
    fn explicit_filter_is_validated() {
        let config = TracingConfig::default().with_filter("bbb_client=trace");
        assert!(config.env_filter().is_ok());

        let bad = TracingConfig::default().with_filter("bbb_client=loud");
        assert!(matches!(bad.env_filter(), Err(TracingError::Filter(_))));
    }

    #[test]
    fn builders() {
        let config = TracingConfig::default()
            .with_format(TracingOutputFormat::Json)
            .without_timestamps();
        assert_eq!(config.format, TracingOutputFormat::Json);
        assert!(!config.timestamps);
        assert_eq!(config.filter, None);
    }
}
