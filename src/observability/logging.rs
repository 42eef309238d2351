//! Structured logging macros for the request and fetch paths.

/// Span for one inbound HTTP request to the aggregation handler.
#[macro_export]
macro_rules! request_span {
    ($method:expr, $path:expr) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4()
        )
    };
    ($method:expr, $path:expr, $($field:tt)*) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Span for one downstream document fetch.
#[macro_export]
macro_rules! fetch_span {
    ($base_url:expr, $path:expr) => {
        tracing::debug_span!(
            "openapi_fetch",
            base_url = %$base_url,
            path = %$path,
            fetch_id = %uuid::Uuid::new_v4()
        )
    };
}

/// Log the resolved configuration once at startup.
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        server_address = %config.server.bind_address(),
        base_path = %config.server.base_path,
        cache_duration_secs = config.aggregation.cache_duration_secs,
        max_concurrent_fetches = config.aggregation.max_concurrent_fetches,
        non_analyzable_strategy = ?config.aggregation.non_analyzable_strategy,
        "openapi-aggregator configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_compile() {
        let _span = request_span!("GET", "/api-docs");
        let _span = request_span!("GET", "/api-docs", service = "users");
        let _span = fetch_span!("http://users.internal", "/swagger/v1/swagger.json");
    }

    #[test]
    fn log_config_info_does_not_panic() {
        log_config_info(&crate::config::AppConfig::default());
    }
}
