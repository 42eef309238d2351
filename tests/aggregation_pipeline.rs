//! End-to-end test: a downstream OpenAPI document served over HTTP is
//! fetched, pruned to reachable paths, renamed, and merged into the
//! aggregated document for one service.

use std::sync::Arc;

use openapi_aggregator::cache::AggregationCache;
use openapi_aggregator::config::AggregationOptions;
use openapi_aggregator::decorators::RequestContext;
use openapi_aggregator::fetch::{DocumentFetcher, ReqwestTransport};
use openapi_aggregator::pipeline::AggregationPipeline;
use openapi_aggregator::proxy::{ClusterConfig, ConfigReader, ConfigSnapshot, RouteConfig, Transform};
use serde_json::json;
use std::collections::HashMap;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn route_with_openapi_metadata(id: &str, cluster_id: &str, service_name: &str) -> RouteConfig {
    let mut metadata = HashMap::new();
    metadata.insert(
        "Ada.OpenApi".to_string(),
        json!({"serviceName": service_name, "enabled": true}).to_string(),
    );
    RouteConfig {
        id: id.to_string(),
        match_pattern: "/api/users/{**catch-all}".to_string(),
        cluster_id: cluster_id.to_string(),
        transforms: vec![Transform::PathRemovePrefix { prefix: "/v1".to_string() }],
        metadata,
    }
}

fn downstream_document() -> serde_json::Value {
    json!({
        "openapi": "3.0.0",
        "info": {"title": "Users Service", "version": "1.2.0"},
        "paths": {
            "/v1/users": {
                "get": {
                    "responses": {
                        "200": {
                            "description": "ok",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/User"}
                                }
                            }
                        }
                    }
                }
            },
            "/internal/debug": {
                "get": {"responses": {"200": {"description": "debug only, unreachable"}}}
            }
        },
        "components": {
            "schemas": {
                "User": {"type": "object", "properties": {"id": {"type": "string"}}}
            }
        }
    })
}

#[tokio::test]
async fn aggregates_a_single_service_pruning_unreachable_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/swagger/v1/swagger.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(downstream_document()))
        .mount(&server)
        .await;

    let mut route = route_with_openapi_metadata("r1", "c1", "Users");
    route.match_pattern = "/api/{**catch-all}".to_string();

    let cluster = ClusterConfig { id: "c1".to_string(), destinations: vec![server.uri()], metadata: HashMap::new() };
    let snapshot = ConfigSnapshot { routes: vec![route], clusters: vec![cluster] };
    let reader = ConfigReader::new(&snapshot);

    let cache = Arc::new(AggregationCache::new());
    let transport = Arc::new(ReqwestTransport::new());
    let options = AggregationOptions::default();
    let fetcher = Arc::new(DocumentFetcher::new(transport, cache.clone(), &options));
    let pipeline = AggregationPipeline::new(fetcher, cache, options);

    let services = pipeline.list_services(&reader);
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].url_slug, "users");

    let document = pipeline
        .aggregate_for_service(&reader, "users", &RequestContext::default())
        .await
        .expect("aggregated document");

    assert!(document.paths.paths.contains_key("/api/users"));
    assert!(!document.paths.paths.contains_key("/internal/debug"));

    let schemas = &document.components.unwrap().schemas;
    assert!(schemas.contains_key("UsersUser"));
}

#[tokio::test]
async fn unreachable_service_returns_none() {
    let cache = Arc::new(AggregationCache::new());
    let transport = Arc::new(ReqwestTransport::new());
    let options = AggregationOptions::default();
    let fetcher = Arc::new(DocumentFetcher::new(transport, cache.clone(), &options));
    let pipeline = AggregationPipeline::new(fetcher, cache, options);

    let route = route_with_openapi_metadata("r1", "c1", "Down");
    let cluster =
        ClusterConfig { id: "c1".to_string(), destinations: vec!["http://127.0.0.1:1".to_string()], metadata: HashMap::new() };
    let snapshot = ConfigSnapshot { routes: vec![route], clusters: vec![cluster] };
    let reader = ConfigReader::new(&snapshot);

    assert!(pipeline.aggregate_for_service(&reader, "down", &RequestContext::default()).await.is_none());
}
