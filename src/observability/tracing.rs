//! Structured logging initialization via `tracing-subscriber`.
//!
//! The aggregator does not export traces anywhere; it only needs a
//! consistently formatted, env-filter-driven subscriber. JSON output is
//! opt-in for deployments that ship logs to a collector.

use crate::errors::{AggregatorError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the global `tracing` subscriber.
///
/// `log_level` is a standard `EnvFilter` directive (`"info"`, `"debug"`,
/// `"openapi_aggregator=debug,tower_http=info"`, ...). `json` selects
/// structured JSON output instead of the pretty human-readable format.
pub fn init_logging(log_level: &str, json: bool) -> Result<()> {
    let env_filter = parse_env_filter(log_level)?;

    if json {
        let json_layer = tracing_subscriber::fmt::layer().json().flatten_event(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| AggregatorError::config(format!("failed to initialize logging: {e}")))?;
    } else {
        let pretty_layer = tracing_subscriber::fmt::layer().with_target(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(pretty_layer)
            .try_init()
            .map_err(|e| AggregatorError::config(format!("failed to initialize logging: {e}")))?;
    }

    Ok(())
}

fn parse_env_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| AggregatorError::config(format!("invalid log level '{level}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_filter_directives() {
        let result = parse_env_filter("not a valid directive===");
        assert!(result.is_err());
    }

    #[test]
    fn accepts_standard_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(parse_env_filter(level).is_ok());
        }
    }
}
