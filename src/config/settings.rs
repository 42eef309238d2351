//! Typed configuration for the aggregator service and the pipeline it drives.

use crate::decorators::{InfoDecorator, ServersDecorator};
use crate::errors::{AggregatorError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

/// Strategy applied when a route's transform chain cannot be analyzed
/// (i.e. it contains an `Unknown` transform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NonAnalyzableStrategy {
    /// Include the backend's paths verbatim and attach a warning.
    IncludeWithWarning,
    /// Drop the paths reached only through the non-analyzable route.
    ExcludeWithWarning,
    /// Drop the whole service.
    SkipService,
}

impl Default for NonAnalyzableStrategy {
    fn default() -> Self {
        Self::IncludeWithWarning
    }
}

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,

    #[validate(nested)]
    pub aggregation: AggregationOptions,
}

impl AppConfig {
    /// Validate the entire configuration, including cross-field checks that
    /// the `validator` derive cannot express.
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(AggregatorError::from)?;
        self.validate_custom()
    }

    fn validate_custom(&self) -> Result<()> {
        if self.aggregation.fallback_paths.len() > 32 {
            return Err(AggregatorError::validation(
                "fallbackPaths supports at most 32 entries",
            ));
        }
        Ok(())
    }
}

/// HTTP server bind configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1, message = "host cannot be empty"))]
    pub host: String,

    #[validate(range(min = 1, max = 65535, message = "port must be between 1 and 65535"))]
    pub port: u16,

    /// Base path the aggregation handler is mounted under.
    #[validate(length(min = 1, message = "base path cannot be empty"))]
    pub base_path: String,

    #[validate(range(min = 1, max = 300, message = "timeout must be between 1 and 300 seconds"))]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_path: "/api-docs".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Options controlling the aggregation pipeline: caching, fetch behavior,
/// and the policy applied to routes whose transforms cannot be analyzed.
#[derive(Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AggregationOptions {
    #[validate(range(min = 1, message = "cacheDurationSecs must be at least 1"))]
    pub cache_duration_secs: u64,

    #[validate(range(min = 1, message = "aggregatedSpecCacheDurationSecs must be at least 1"))]
    pub aggregated_spec_cache_duration_secs: u64,

    #[validate(range(min = 1, message = "failureCacheDurationSecs must be at least 1"))]
    pub failure_cache_duration_secs: u64,

    #[validate(range(min = 1024, message = "maximumCachePayloadBytes must be at least 1KB"))]
    pub maximum_cache_payload_bytes: usize,

    #[validate(length(min = 1, message = "defaultOpenApiPath cannot be empty"))]
    pub default_openapi_path: String,

    pub fallback_paths: Vec<String>,

    pub enable_auto_discovery: bool,

    #[validate(range(min = 1, max = 1024, message = "maxConcurrentFetches must be between 1 and 1024"))]
    pub max_concurrent_fetches: usize,

    #[validate(range(min = 1, message = "defaultFetchTimeoutMs must be at least 1"))]
    pub default_fetch_timeout_ms: u64,

    pub non_analyzable_strategy: NonAnalyzableStrategy,

    pub log_transform_warnings: bool,

    /// `configureInfo`: an optional hook that rewrites the merged `info`
    /// block before it's served. Not loadable from file/env config; an
    /// embedder sets it programmatically after `load_config`.
    #[serde(skip)]
    pub info_decorator: Option<Arc<dyn InfoDecorator>>,

    /// `configureServers`: an optional hook that overrides the merged
    /// `servers` list entirely. Same caveat as `info_decorator`.
    #[serde(skip)]
    pub servers_decorator: Option<Arc<dyn ServersDecorator>>,
}

impl std::fmt::Debug for AggregationOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationOptions")
            .field("cache_duration_secs", &self.cache_duration_secs)
            .field("aggregated_spec_cache_duration_secs", &self.aggregated_spec_cache_duration_secs)
            .field("failure_cache_duration_secs", &self.failure_cache_duration_secs)
            .field("maximum_cache_payload_bytes", &self.maximum_cache_payload_bytes)
            .field("default_openapi_path", &self.default_openapi_path)
            .field("fallback_paths", &self.fallback_paths)
            .field("enable_auto_discovery", &self.enable_auto_discovery)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("default_fetch_timeout_ms", &self.default_fetch_timeout_ms)
            .field("non_analyzable_strategy", &self.non_analyzable_strategy)
            .field("log_transform_warnings", &self.log_transform_warnings)
            .field("info_decorator", &self.info_decorator.is_some())
            .field("servers_decorator", &self.servers_decorator.is_some())
            .finish()
    }
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            cache_duration_secs: 300,
            aggregated_spec_cache_duration_secs: 300,
            failure_cache_duration_secs: 60,
            maximum_cache_payload_bytes: 1024 * 1024,
            default_openapi_path: "/swagger/v1/swagger.json".to_string(),
            fallback_paths: vec![
                "/api/v1/openapi.json".to_string(),
                "/openapi.json".to_string(),
                "/docs/openapi.json".to_string(),
                "/swagger/openapi.json".to_string(),
            ],
            enable_auto_discovery: true,
            max_concurrent_fetches: 10,
            default_fetch_timeout_ms: 10_000,
            non_analyzable_strategy: NonAnalyzableStrategy::IncludeWithWarning,
            log_transform_warnings: true,
            info_decorator: None,
            servers_decorator: None,
        }
    }
}

impl AggregationOptions {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration_secs)
    }

    pub fn aggregated_spec_cache_duration(&self) -> Duration {
        Duration::from_secs(self.aggregated_spec_cache_duration_secs)
    }

    pub fn failure_cache_duration(&self) -> Duration {
        Duration::from_secs(self.failure_cache_duration_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.default_fetch_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn server_config_bind_address() {
        let config = ServerConfig { host: "0.0.0.0".to_string(), port: 9090, ..Default::default() };
        assert_eq!(config.bind_address(), "0.0.0.0:9090");
    }

    #[test]
    fn aggregation_options_durations() {
        let options = AggregationOptions { cache_duration_secs: 42, ..Default::default() };
        assert_eq!(options.cache_duration(), Duration::from_secs(42));
    }

    #[test]
    fn rejects_excessive_fallback_paths() {
        let mut config = AppConfig::default();
        config.aggregation.fallback_paths = (0..40).map(|i| format!("/p{i}")).collect();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_invalid_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }
}
