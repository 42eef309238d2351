//! HTTP surface: the aggregation endpoints mounted at `server.base_path`.

use crate::cache::AggregationCache;
use crate::decorators::RequestContext;
use crate::errors::AggregatorError;
use crate::pipeline::AggregationPipeline;
use crate::proxy::{ConfigProvider, ConfigReader};
use crate::utils::contains_path_traversal;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Wraps [`AggregatorError`] for the `axum` response conversion.
pub struct ApiError(AggregatorError);

impl From<AggregatorError> for ApiError {
    fn from(error: AggregatorError) -> Self {
        Self(error)
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::warn!(error = %self.0, "request rejected");
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub config_provider: Arc<dyn ConfigProvider>,
    pub pipeline: Arc<AggregationPipeline>,
    pub cache: Arc<AggregationCache>,
}

pub fn router(state: ApiState, base_path: &str) -> Router {
    let routes = Router::new()
        .route("/", get(list_services).delete(invalidate_all))
        .route("/{service}", get(get_service_spec).delete(invalidate_service))
        .route("/{service}/openapi.json", get(get_service_spec_json))
        .route("/{service}/openapi.yaml", get(get_service_spec_yaml))
        .route("/{service}/openapi.yml", get(get_service_spec_yaml))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    Router::new().nest(base_path, routes)
}

#[derive(Serialize, ToSchema)]
struct ServiceListEntry {
    name: String,
    url: String,
}

#[derive(Serialize, ToSchema)]
struct ServiceListResponse {
    services: Vec<ServiceListEntry>,
    count: usize,
}

async fn list_services(
    State(state): State<ApiState>,
    axum::extract::OriginalUri(uri): axum::extract::OriginalUri,
) -> Result<Json<ServiceListResponse>, ApiError> {
    let snapshot = state.config_provider.get_config();
    let reader = ConfigReader::new(&snapshot);
    let base = uri.path().trim_end_matches('/').to_string();

    let services: Vec<ServiceListEntry> = state
        .pipeline
        .list_services(&reader)
        .into_iter()
        .map(|s| ServiceListEntry { name: s.service_name, url: format!("{base}/{}", s.url_slug) })
        .collect();

    Ok(Json(ServiceListResponse { count: services.len(), services }))
}

fn reject_traversal(service: &str) -> Result<(), ApiError> {
    if contains_path_traversal(service) {
        return Err(AggregatorError::path_traversal(service).into());
    }
    Ok(())
}

/// Builds the decorator-facing [`RequestContext`] from the inbound request's
/// headers: `Host` (falling back to `localhost`) and `X-Forwarded-Proto`
/// (falling back to `http`).
fn request_context(headers: &HeaderMap) -> RequestContext {
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok()).unwrap_or("localhost").to_string();
    let scheme =
        headers.get("x-forwarded-proto").and_then(|v| v.to_str().ok()).unwrap_or("http").to_string();
    RequestContext { scheme, host }
}

async fn resolve(state: &ApiState, service: &str, headers: &HeaderMap) -> Result<openapiv3::OpenAPI, ApiError> {
    let _span = crate::request_span!("GET", service).entered();
    reject_traversal(service)?;
    let snapshot = state.config_provider.get_config();
    let reader = ConfigReader::new(&snapshot);
    let ctx = request_context(headers);

    state
        .pipeline
        .aggregate_for_service(&reader, service, &ctx)
        .await
        .ok_or_else(|| AggregatorError::not_found("service", service).into())
}

async fn get_service_spec(
    State(state): State<ApiState>,
    Path(service): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let document = resolve(&state, &service, &headers).await?;
    let wants_yaml = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("yaml"))
        .unwrap_or(false);

    if wants_yaml {
        render_yaml(&document)
    } else {
        render_json(&document)
    }
}

async fn get_service_spec_json(
    State(state): State<ApiState>,
    Path(service): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let document = resolve(&state, &service, &headers).await?;
    render_json(&document)
}

async fn get_service_spec_yaml(
    State(state): State<ApiState>,
    Path(service): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let document = resolve(&state, &service, &headers).await?;
    render_yaml(&document)
}

fn render_json(document: &openapiv3::OpenAPI) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(document).map_err(AggregatorError::from)?;
    Ok(([(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())], body).into_response())
}

fn render_yaml(document: &openapiv3::OpenAPI) -> Result<Response, ApiError> {
    let body = serde_yaml::to_string(document).map_err(AggregatorError::from)?;
    const APPLICATION_YAML: &str = "application/yaml";
    Ok(([(header::CONTENT_TYPE, APPLICATION_YAML)], body).into_response())
}

async fn invalidate_service(
    State(state): State<ApiState>,
    Path(service): Path<String>,
) -> Result<StatusCode, ApiError> {
    reject_traversal(&service)?;
    state.cache.invalidate_tag(&format!("service:{}", service.to_ascii_lowercase()));
    Ok(StatusCode::NO_CONTENT)
}

async fn invalidate_all(State(state): State<ApiState>) -> StatusCode {
    state.cache.invalidate_all();
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_maps_status_codes_through() {
        let err: ApiError = AggregatorError::not_found("service", "x").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn rejects_path_traversal_attempts() {
        assert!(reject_traversal("../etc/passwd").is_err());
        assert!(reject_traversal("user-management").is_ok());
    }
}
