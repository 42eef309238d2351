//! Groups proxy routes into per-service specifications.

use crate::proxy::{ClusterOpenApiConfig, ConfigReader, RouteConfig, RouteOpenApiConfig};
use std::collections::HashMap;

/// One route bound to its cluster and both sides' parsed OpenAPI metadata.
#[derive(Debug, Clone)]
pub struct RouteClusterBinding {
    pub route: RouteConfig,
    pub cluster_id: String,
    pub destinations: Vec<String>,
    pub route_config: RouteOpenApiConfig,
    pub cluster_config: ClusterOpenApiConfig,
}

/// All routes (across possibly many clusters) that contribute to one
/// logical service's aggregated document.
#[derive(Debug, Clone)]
pub struct ServiceSpecification {
    pub service_name: String,
    pub bindings: Vec<RouteClusterBinding>,
}

/// Builds [`ServiceSpecification`]s from a [`ConfigReader`].
pub struct ServiceGrouper;

impl ServiceGrouper {
    /// Group every analyzable route by its declared service name.
    ///
    /// Routes are skipped (with a `tracing::warn!`) when: the `Ada.OpenApi`
    /// metadata is absent, `enabled` is false, `serviceName` is blank, or
    /// `clusterId` does not resolve to a known cluster.
    pub fn group(reader: &ConfigReader<'_>) -> Vec<ServiceSpecification> {
        let mut buckets: HashMap<String, Vec<RouteClusterBinding>> = HashMap::new();
        let mut display_names: HashMap<String, String> = HashMap::new();

        for (route, parsed) in reader.route_openapi_pairs() {
            let Some(route_config) = parsed else {
                tracing::warn!(route_id = %route.id, "skipping route with no Ada.OpenApi metadata");
                continue;
            };

            if !route_config.enabled {
                tracing::warn!(route_id = %route.id, "skipping disabled route");
                continue;
            }

            let service_name = match &route_config.service_name {
                Some(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => {
                    tracing::warn!(route_id = %route.id, "skipping route with blank serviceName");
                    continue;
                }
            };

            if route.cluster_id.trim().is_empty() {
                tracing::warn!(route_id = %route.id, "skipping route with empty clusterId");
                continue;
            }

            let Some(cluster) = reader.find_cluster(&route.cluster_id) else {
                tracing::warn!(route_id = %route.id, cluster_id = %route.cluster_id, "skipping route: cluster not found");
                continue;
            };

            let cluster_config = reader.cluster_openapi_config(cluster);
            let key = service_name.to_ascii_lowercase();
            display_names.entry(key.clone()).or_insert_with(|| service_name.clone());

            buckets.entry(key).or_default().push(RouteClusterBinding {
                route: route.clone(),
                cluster_id: cluster.id.clone(),
                destinations: cluster.destinations.clone(),
                route_config,
                cluster_config,
            });
        }

        buckets
            .into_iter()
            .map(|(key, bindings)| ServiceSpecification {
                service_name: display_names.remove(&key).unwrap_or(key),
                bindings,
            })
            .collect()
    }
}
