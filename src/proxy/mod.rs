//! Typed view over the host reverse proxy's routing configuration.
//!
//! The proxy itself is an external collaborator (it owns routing, load
//! balancing, and forwarding); this module only models the slice of its
//! configuration the aggregation pipeline needs to reason about, and reads
//! it through the [`ConfigProvider`] trait so a real embedder can supply its
//! own snapshot implementation.

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One step in a route's path-rewrite chain, applied left to right when
/// mapping an external request path to a backend path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Transform {
    Direct,
    PathPattern { template: String },
    PathPrefix { prefix: String },
    PathRemovePrefix { prefix: String },
    PathSet { path: String },
    Unknown { raw: String },
}

impl Transform {
    /// A human-readable label for logging, independent of the payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Transform::Direct => "Direct",
            Transform::PathPattern { .. } => "PathPattern",
            Transform::PathPrefix { .. } => "PathPrefix",
            Transform::PathRemovePrefix { .. } => "PathRemovePrefix",
            Transform::PathSet { .. } => "PathSet",
            Transform::Unknown { .. } => "Unknown",
        }
    }
}

/// A single proxy route: a match pattern, the cluster it forwards to, and
/// the ordered transforms applied along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub id: String,
    pub match_pattern: String,
    pub cluster_id: String,
    pub transforms: Vec<Transform>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A single proxy cluster: an identifier and its destination base URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub id: String,
    pub destinations: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// `Ada.OpenApi` metadata carried on a route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOpenApiConfig {
    pub service_name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RouteOpenApiConfig {
    fn default() -> Self {
        Self { service_name: None, enabled: true }
    }
}

/// `Ada.OpenApi` metadata carried on a cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOpenApiConfig {
    #[serde(default = "default_openapi_path")]
    pub open_api_path: String,
    pub prefix: Option<String>,
}

impl Default for ClusterOpenApiConfig {
    fn default() -> Self {
        Self { open_api_path: default_openapi_path(), prefix: None }
    }
}

fn default_true() -> bool {
    true
}

fn default_openapi_path() -> String {
    "/swagger/v1/swagger.json".to_string()
}

const OPENAPI_METADATA_KEY: &str = "Ada.OpenApi";

/// An immutable view of the proxy's current routes and clusters.
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    pub routes: Vec<RouteConfig>,
    pub clusters: Vec<ClusterConfig>,
}

/// The host reverse proxy, as seen by the aggregation pipeline.
///
/// Production embedders implement this against their live configuration
/// store; [`StaticConfigProvider`] is the in-memory stand-in used by the
/// bundled demo binary and the integration tests.
pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> ConfigSnapshot;
}

/// A `ConfigProvider` backed by an already-built, immutable snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    snapshot: ConfigSnapshot,
}

impl StaticConfigProvider {
    pub fn new(routes: Vec<RouteConfig>, clusters: Vec<ClusterConfig>) -> Self {
        Self { snapshot: ConfigSnapshot { routes, clusters } }
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn get_config(&self) -> ConfigSnapshot {
        self.snapshot.clone()
    }
}

/// Parses the typed proxy metadata (`Ada.OpenApi`) off routes and clusters.
///
/// Parse failures are never propagated as errors: a route or cluster with
/// malformed metadata is treated as if it carried none, and the failure is
/// logged at `warn` level.
pub struct ConfigReader<'a> {
    snapshot: &'a ConfigSnapshot,
}

impl<'a> ConfigReader<'a> {
    pub fn new(snapshot: &'a ConfigSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn routes(&self) -> &[RouteConfig] {
        &self.snapshot.routes
    }

    pub fn clusters(&self) -> &[ClusterConfig] {
        &self.snapshot.clusters
    }

    pub fn find_cluster(&self, cluster_id: &str) -> Option<&ClusterConfig> {
        self.snapshot
            .clusters
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(cluster_id))
    }

    /// Parse a route's `Ada.OpenApi` metadata, if present and well-formed.
    pub fn route_openapi_config(&self, route: &RouteConfig) -> Option<RouteOpenApiConfig> {
        let raw = route.metadata.get(OPENAPI_METADATA_KEY)?;
        match serde_json::from_str(raw) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(route_id = %route.id, error = %e, "failed to parse route Ada.OpenApi metadata");
                None
            }
        }
    }

    /// Parse a cluster's `Ada.OpenApi` metadata, defaulting if absent.
    pub fn cluster_openapi_config(&self, cluster: &ClusterConfig) -> ClusterOpenApiConfig {
        let Some(raw) = cluster.metadata.get(OPENAPI_METADATA_KEY) else {
            return ClusterOpenApiConfig::default();
        };
        match serde_json::from_str(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(cluster_id = %cluster.id, error = %e, "failed to parse cluster Ada.OpenApi metadata");
                ClusterOpenApiConfig::default()
            }
        }
    }

    /// Enumerate (route, parsed route config) pairs, in snapshot order.
    pub fn route_openapi_pairs(&self) -> Vec<(&RouteConfig, Option<RouteOpenApiConfig>)> {
        self.snapshot.routes.iter().map(|r| (r, self.route_openapi_config(r))).collect()
    }
}

/// Validate that the snapshot itself is internally consistent (no cheap way
/// to check this lazily inside `ConfigReader` without a lifetime dance).
pub fn validate_snapshot(snapshot: &ConfigSnapshot) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for route in &snapshot.routes {
        if !seen.insert(route.id.clone()) {
            return Err(crate::errors::AggregatorError::validation(format!(
                "duplicate route id: {}",
                route.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(id: &str, cluster_id: &str, metadata: HashMap<String, String>) -> RouteConfig {
        RouteConfig {
            id: id.to_string(),
            match_pattern: "/api/{**catch-all}".to_string(),
            cluster_id: cluster_id.to_string(),
            transforms: vec![],
            metadata,
        }
    }

    #[test]
    fn parses_route_openapi_metadata() {
        let mut metadata = HashMap::new();
        metadata.insert(
            OPENAPI_METADATA_KEY.to_string(),
            r#"{"serviceName":"User Management","enabled":true}"#.to_string(),
        );
        let snapshot = ConfigSnapshot { routes: vec![route("r1", "c1", metadata)], clusters: vec![] };
        let reader = ConfigReader::new(&snapshot);
        let config = reader.route_openapi_config(&snapshot.routes[0]).unwrap();
        assert_eq!(config.service_name.as_deref(), Some("User Management"));
        assert!(config.enabled);
    }

    #[test]
    fn missing_metadata_parses_to_none() {
        let snapshot = ConfigSnapshot { routes: vec![route("r1", "c1", HashMap::new())], clusters: vec![] };
        let reader = ConfigReader::new(&snapshot);
        assert!(reader.route_openapi_config(&snapshot.routes[0]).is_none());
    }

    #[test]
    fn malformed_metadata_logs_and_returns_none_not_error() {
        let mut metadata = HashMap::new();
        metadata.insert(OPENAPI_METADATA_KEY.to_string(), "not json".to_string());
        let snapshot = ConfigSnapshot { routes: vec![route("r1", "c1", metadata)], clusters: vec![] };
        let reader = ConfigReader::new(&snapshot);
        assert!(reader.route_openapi_config(&snapshot.routes[0]).is_none());
    }

    #[test]
    fn cluster_openapi_config_defaults_when_absent() {
        let cluster = ClusterConfig { id: "c1".to_string(), destinations: vec![], metadata: HashMap::new() };
        let snapshot = ConfigSnapshot { routes: vec![], clusters: vec![cluster] };
        let reader = ConfigReader::new(&snapshot);
        let config = reader.cluster_openapi_config(&snapshot.clusters[0]);
        assert_eq!(config.open_api_path, "/swagger/v1/swagger.json");
        assert!(config.prefix.is_none());
    }

    #[test]
    fn find_cluster_is_case_insensitive() {
        let cluster = ClusterConfig { id: "UserCluster".to_string(), destinations: vec![], metadata: HashMap::new() };
        let snapshot = ConfigSnapshot { routes: vec![], clusters: vec![cluster] };
        let reader = ConfigReader::new(&snapshot);
        assert!(reader.find_cluster("usercluster").is_some());
    }

    #[test]
    fn validate_snapshot_rejects_duplicate_route_ids() {
        let snapshot = ConfigSnapshot {
            routes: vec![route("dup", "c1", HashMap::new()), route("dup", "c2", HashMap::new())],
            clusters: vec![],
        };
        assert!(validate_snapshot(&snapshot).is_err());
    }
}
