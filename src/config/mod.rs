//! Layered configuration loading: struct defaults, then an optional file,
//! then `AGGREGATOR_`-prefixed environment variables.

pub mod settings;

pub use settings::{AggregationOptions, AppConfig, NonAnalyzableStrategy, ServerConfig};

use crate::errors::{AggregatorError, Result};
use config::{Config, Environment, File};
use std::path::Path;

/// Load configuration from defaults, an optional file, and the environment.
///
/// Later sources win: defaults < file < environment.
pub fn load_config<P: AsRef<Path>>(config_path: Option<P>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    builder = builder.add_source(Config::try_from(&AppConfig::default())?);

    if let Some(path) = config_path {
        let path = path.as_ref();
        if path.exists() {
            builder = builder.add_source(File::from(path));
        } else {
            return Err(AggregatorError::config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("AGGREGATOR").separator("__").try_parsing(true),
    );

    let config = builder.build()?;
    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;

    Ok(app_config)
}

/// Load configuration from environment variables only. Useful for
/// containerized deployments with no mounted config file.
pub fn load_config_from_env() -> Result<AppConfig> {
    load_config::<&str>(None)
}

/// Load configuration, overlaying a TOML file on top of the defaults.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    load_config(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_default_config() {
        let config = load_config_from_env().unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn file_overrides_defaults() {
        let toml = "[server]\nhost = \"0.0.0.0\"\nport = 9999\nbase_path = \"/api-docs\"\nrequest_timeout_seconds = 30\n";
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let config = load_config_from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = load_config_from_file("/nonexistent/aggregator.toml");
        assert!(result.is_err());
    }
}
