use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use openapi_aggregator::api::{router, ApiState};
use openapi_aggregator::cache::AggregationCache;
use openapi_aggregator::config::load_config;
use openapi_aggregator::fetch::{DocumentFetcher, ReqwestTransport};
use openapi_aggregator::observability::{init_logging, log_config_info};
use openapi_aggregator::pipeline::AggregationPipeline;
use openapi_aggregator::proxy::StaticConfigProvider;
use openapi_aggregator::{AggregatorError, Result, APP_NAME, VERSION};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Aggregates per-service OpenAPI documents behind a reverse proxy.
#[derive(Parser, Debug)]
#[command(name = "openapi-aggregator", version = VERSION)]
struct Cli {
    /// Path to a TOML configuration file. Falls back to defaults + env vars
    /// (prefix `AGGREGATOR__`) if omitted.
    #[arg(long)]
    config: Option<String>,

    /// Emit structured logs as JSON instead of human-readable text.
    #[arg(long)]
    json_logs: bool,

    /// Log level passed to the tracing env-filter when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.json_logs)?;
    info!(app_name = APP_NAME, version = VERSION, "starting openapi-aggregator");

    let config = load_config(cli.config.as_deref())?;
    log_config_info(&config);

    // TODO(demo-binary): wire a real ConfigProvider against the host proxy's
    // control plane; this empty snapshot just lets the server boot standalone.
    let config_provider = Arc::new(StaticConfigProvider::new(vec![], vec![]));

    let cache = Arc::new(AggregationCache::new());
    let transport = Arc::new(ReqwestTransport::new());
    let fetcher = Arc::new(DocumentFetcher::new(transport, cache.clone(), &config.aggregation));
    let pipeline = Arc::new(AggregationPipeline::new(fetcher, cache.clone(), config.aggregation.clone()));

    let state = ApiState { config_provider, pipeline, cache };
    let app = router(state, &config.server.base_path);

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .map_err(|e| AggregatorError::config(format!("invalid bind address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AggregatorError::config(format!("failed to bind {addr}: {e}")))?;

    info!(address = %addr, base_path = %config.server.base_path, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "shutdown signal listener failed");
            }
            info!("shutdown signal received");
        })
        .await
        .map_err(|e| AggregatorError::internal(format!("server error: {e}")))?;

    Ok(())
}
