//! Boot: logging init, config load, registry construction.

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use super::cli::Cli;
use crate::conf::AnalyzerConfig;
use crate::registry::ParserRegistry;

pub const DEFAULT_LOG_FILTER: &str = "analyzer=info";

/// Swaps the active filter once the config file names one.
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Initialise the tracing / logging subsystem.
///
/// Output goes to stderr; stdout carries the timeline. `RUST_LOG` wins over
/// the default filter and over any filter set later from config.
pub fn init_logging() -> FilterHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

/// The configured filter to switch to, if `RUST_LOG` does not already decide.
fn filter_override(rust_log_set: bool, configured: Option<&str>) -> Option<&str> {
    if rust_log_set {
        return None;
    }
    configured.map(str::trim).filter(|f| !f.is_empty())
}

pub fn apply_log_filter(handle: &FilterHandle, configured: Option<&str>) {
    let rust_log_set = std::env::var_os(EnvFilter::DEFAULT_ENV).is_some();
    let Some(directives) = filter_override(rust_log_set, configured) else {
        return;
    };
    match EnvFilter::try_new(directives) {
        Ok(filter) => {
            if let Err(e) = handle.reload(filter) {
                warn!("Failed to apply log_filter {:?}: {}", directives, e);
            }
        }
        Err(e) => warn!("Ignoring invalid log_filter {:?}: {}", directives, e),
    }
}

/// Start logging, load config, build the parser registry.
pub fn boot(cli: &Cli) -> Result<(AnalyzerConfig, ParserRegistry), Box<dyn std::error::Error>> {
    let handle = init_logging();

    let config = AnalyzerConfig::load_from(cli.config.as_deref())?;
    apply_log_filter(&handle, config.log_filter.as_deref());
    info!(
        "Correlation: window={}ms, task_id={}, identifier={}, time_window={}, keyword={}",
        config.correlation.time_window_ms,
        config.correlation.enable_task_id_match,
        config.correlation.enable_identifier_match,
        config.correlation.enable_time_window_match,
        config.correlation.enable_keyword_match,
    );

    let registry = ParserRegistry::builtin(&config.parsers)?;
    info!("Registered {} parsers", registry.len());

    Ok((config, registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_beats_configured_filter() {
        assert_eq!(filter_override(true, Some("analyzer=debug")), None);
    }

    #[test]
    fn test_configured_filter_applies() {
        assert_eq!(filter_override(false, Some(" analyzer=debug ")), Some("analyzer=debug"));
        assert_eq!(filter_override(false, Some("  ")), None);
        assert_eq!(filter_override(false, None), None);
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }
}
