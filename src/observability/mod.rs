//! Structured logging for the aggregator service.

pub mod logging;
pub mod tracing;

pub use logging::log_config_info;
pub use tracing::init_logging;
