//! Log output for resolution diagnostics.
//!
//! pagekit only emits `tracing` events: lookups at `debug`, ambiguous
//! matches at `warn`. [`init_tracing`] installs a formatting subscriber for
//! test binaries that do not set one up themselves.

use std::io;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Settings;
use crate::result::{PageError, PageResult};

/// Filter used when neither `RUST_LOG` nor an explicit directive is given
pub const DEFAULT_FILTER: &str = "pagekit=info";

/// Output format of the subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

fn build_filter(directive: Option<&str>) -> PageResult<EnvFilter> {
    match directive {
        Some(directive) => EnvFilter::try_new(directive).map_err(|e| PageError::InvalidConfig {
            message: format!("invalid log filter '{directive}': {e}"),
        }),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

type StderrBuilder = fmt::SubscriberBuilder<
    fmt::format::DefaultFields,
    fmt::format::Format,
    EnvFilter,
    fn() -> io::Stderr,
>;

fn stderr_builder(filter: EnvFilter) -> StderrBuilder {
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr as fn() -> io::Stderr)
}

/// Install a global subscriber writing to stderr, filtered by `directive`
/// (or `RUST_LOG`).
///
/// Returns `Ok(false)` when a subscriber was already installed.
pub fn init_tracing(directive: Option<&str>, format: LogFormat) -> PageResult<bool> {
    let filter = build_filter(directive)?;
    let builder = stderr_builder(filter);
    let installed = match format {
        LogFormat::Text => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };
    Ok(installed)
}

/// [`init_tracing`] using the filter from `settings`
pub fn init_from_settings(settings: &Settings) -> PageResult<bool> {
    init_tracing(settings.log_filter.as_deref(), LogFormat::Text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_directive() {
        assert!(matches!(
            build_filter(Some("pagekit=loudest")),
            Err(PageError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_subscriber_writes_to_stderr() {
        let builder: StderrBuilder = stderr_builder(build_filter(Some("warn")).unwrap());
        let subscriber = builder.finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "pagekit", "written to stderr");
        });
    }

    #[test]
    fn test_init_is_repeatable() {
        let _ = init_tracing(Some("pagekit=debug"), LogFormat::Text).unwrap();
        assert!(!init_tracing(Some("pagekit=debug"), LogFormat::Json).unwrap());
        tracing::debug!(target: "pagekit", "tracing installed");
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            log_filter: Some("warn".to_string()),
            ..Settings::default()
        };
        assert!(init_from_settings(&settings).is_ok());
    }
}
