//! Orchestrates one end-to-end aggregation run: config -> grouped services
//! -> per-service fetch/analyze/prune/rename -> merge -> cache.
//!
//! This is the glue between the component modules (§2, §4 of the design);
//! it owns no algorithmic logic of its own.

use crate::cache::AggregationCache;
use crate::config::AggregationOptions;
use crate::decorators::RequestContext;
use crate::fetch::DocumentFetcher;
use crate::grouping::{RouteClusterBinding, ServiceGrouper, ServiceSpecification};
use crate::merger::{DocumentMerger, MergeInput};
use crate::proxy::ConfigReader;
use crate::pruner::DocumentPruner;
use crate::reachability::ReachabilityAnalyzer;
use crate::renamer::SchemaRenamer;
use crate::utils::kebab_case;
use indexmap::IndexMap;
use openapiv3::OpenAPI;
use std::sync::Arc;

/// One entry in the service listing served at the aggregation root.
#[derive(Debug, Clone)]
pub struct ServiceSummary {
    pub service_name: String,
    pub url_slug: String,
}

/// Builds aggregated OpenAPI documents for each known service and caches
/// them at the "aggregated spec" cache tier.
pub struct AggregationPipeline {
    fetcher: Arc<DocumentFetcher>,
    cache: Arc<AggregationCache>,
    options: AggregationOptions,
}

impl AggregationPipeline {
    pub fn new(fetcher: Arc<DocumentFetcher>, cache: Arc<AggregationCache>, options: AggregationOptions) -> Self {
        Self { fetcher, cache, options }
    }

    /// List every service with at least one enabled, analyzable binding.
    pub fn list_services(&self, reader: &ConfigReader<'_>) -> Vec<ServiceSummary> {
        ServiceGrouper::group(reader)
            .into_iter()
            .map(|spec| ServiceSummary { url_slug: kebab_case(&spec.service_name), service_name: spec.service_name })
            .collect()
    }

    /// Produce (or serve from cache) the aggregated OpenAPI document for one
    /// service, matched case-insensitively by kebab-cased name.
    ///
    /// `ctx` feeds the optional `configureInfo`/`configureServers`
    /// decorators (§4.8); it has no effect when neither is configured. Note
    /// the aggregated document is cached per service, not per request, so a
    /// configured decorator's output is only as request-fresh as the
    /// aggregated-spec cache TTL.
    pub async fn aggregate_for_service(
        &self,
        reader: &ConfigReader<'_>,
        slug: &str,
        ctx: &RequestContext,
    ) -> Option<OpenAPI> {
        let spec = ServiceGrouper::group(reader).into_iter().find(|s| kebab_case(&s.service_name) == slug)?;
        self.aggregate(&spec, ctx).await
    }

    async fn aggregate(&self, spec: &ServiceSpecification, ctx: &RequestContext) -> Option<OpenAPI> {
        let cache_key = format!("openapi_spec_{}", spec.service_name.to_ascii_lowercase());
        let service_tag = format!("service:{}", spec.service_name.to_ascii_lowercase());
        let tags = ["openapi_spec", service_tag.as_str()];

        let bytes = self
            .cache
            .get_or_compute(
                &cache_key,
                self.options.aggregated_spec_cache_duration(),
                self.options.failure_cache_duration(),
                &tags,
                self.options.maximum_cache_payload_bytes,
                || self.build(spec, ctx),
            )
            .await?;

        serde_json::from_slice(&bytes).ok()
    }

    /// Groups `spec`'s bindings by the cluster they route to (bindings
    /// sharing a cluster share a downstream document), fetches each group's
    /// document once, and runs reachability analysis over the *whole*
    /// group so the analyzer's first-binding-wins tie-break (§4.5) sees
    /// every route that can reach that document, not just one at a time.
    async fn build(&self, spec: &ServiceSpecification, ctx: &RequestContext) -> Option<Vec<u8>> {
        let mut merge_inputs = Vec::new();

        let mut groups: IndexMap<String, Vec<RouteClusterBinding>> = IndexMap::new();
        for binding in &spec.bindings {
            groups.entry(binding.cluster_id.clone()).or_default().push(binding.clone());
        }

        for (cluster_id, bindings) in groups {
            let Some(base_url) = bindings.first().and_then(|b| b.destinations.first()) else { continue };
            let open_api_path = &bindings[0].cluster_config.open_api_path;

            let Some(raw_document) = self.fetcher.fetch(base_url, open_api_path).await else {
                tracing::warn!(
                    service = %spec.service_name,
                    cluster_id = %cluster_id,
                    base_url = %base_url,
                    "skipping unreachable downstream during aggregation"
                );
                continue;
            };

            let reachability =
                ReachabilityAnalyzer::analyze(&raw_document, &bindings, self.options.non_analyzable_strategy);
            if self.options.log_transform_warnings {
                for warning in &reachability.warnings {
                    tracing::warn!(service = %spec.service_name, cluster_id = %cluster_id, %warning, "transform warning");
                }
            }

            if reachability.reachable_count() == 0 {
                continue;
            }

            let pruned = DocumentPruner::prune(&raw_document, &reachability);
            let prefix = bindings[0].cluster_config.prefix.clone().unwrap_or_else(|| spec.service_name.clone());
            let renamed = SchemaRenamer::rename(&pruned, &prefix);

            merge_inputs.push(MergeInput { service_name: spec.service_name.clone(), document: renamed });
        }

        if merge_inputs.is_empty() {
            return None;
        }

        let (merged, warnings) = DocumentMerger::merge(&spec.service_name, merge_inputs, &self.options, ctx);
        for warning in warnings {
            tracing::warn!(service = %spec.service_name, %warning, "merge warning");
        }

        serde_json::to_vec(&merged).ok()
    }
}
