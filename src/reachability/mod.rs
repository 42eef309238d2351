//! Determines which backend paths of a downstream document are reachable
//! through a service's bound routes, and at which external ("gateway")
//! path.

use crate::config::NonAnalyzableStrategy;
use crate::grouping::RouteClusterBinding;
use crate::transform::TransformAnalyzer;
use openapiv3::{OpenAPI, PathItem};
use std::collections::HashMap;

/// A backend path that some route makes reachable.
#[derive(Debug, Clone)]
pub struct ReachablePathInfo {
    pub backend_path: String,
    pub gateway_path: String,
    pub path_item: PathItem,
    pub route_id: String,
}

/// A backend path that no bound route reaches.
#[derive(Debug, Clone)]
pub struct UnreachablePathInfo {
    pub backend_path: String,
    pub reason: String,
}

/// Result of analyzing one downstream document against a service's bound
/// routes. Keyed by lowercased gateway/backend path so lookups are
/// case-insensitive; [`ReachablePathInfo::gateway_path`] preserves the
/// original casing.
#[derive(Debug, Clone, Default)]
pub struct PathReachabilityResult {
    reachable: HashMap<String, ReachablePathInfo>,
    unreachable: HashMap<String, UnreachablePathInfo>,
    pub warnings: Vec<String>,
}

impl PathReachabilityResult {
    /// Build a result directly from already-computed reachable entries.
    /// Useful for tests and for composing results from sources other than
    /// [`ReachabilityAnalyzer::analyze`].
    pub fn from_reachable(entries: Vec<ReachablePathInfo>) -> Self {
        let mut result = Self::default();
        for info in entries {
            result.insert_reachable(info);
        }
        result
    }

    pub fn reachable(&self) -> impl Iterator<Item = &ReachablePathInfo> {
        self.reachable.values()
    }

    pub fn unreachable(&self) -> impl Iterator<Item = &UnreachablePathInfo> {
        self.unreachable.values()
    }

    pub fn reachable_count(&self) -> usize {
        self.reachable.len()
    }

    fn insert_reachable(&mut self, info: ReachablePathInfo) {
        let key = info.gateway_path.to_ascii_lowercase();
        self.reachable.entry(key).or_insert(info);
    }

    fn insert_unreachable(&mut self, info: UnreachablePathInfo) {
        let key = info.backend_path.to_ascii_lowercase();
        self.unreachable.entry(key).or_insert(info);
    }
}

/// Computes [`PathReachabilityResult`] for one document against one
/// service's bindings.
pub struct ReachabilityAnalyzer;

impl ReachabilityAnalyzer {
    pub fn analyze(
        document: &OpenAPI,
        bindings: &[RouteClusterBinding],
        strategy: NonAnalyzableStrategy,
    ) -> PathReachabilityResult {
        if strategy == NonAnalyzableStrategy::SkipService
            && bindings.iter().any(|b| !TransformAnalyzer::analyze(&b.route).is_analyzable)
        {
            let mut result = PathReachabilityResult::default();
            result.warnings.push(
                "service skipped: at least one bound route has a non-analyzable transform".to_string(),
            );
            return result;
        }

        let mut result = PathReachabilityResult::default();

        for (backend_path, item) in document.paths.paths.iter() {
            if backend_path.is_empty() {
                continue;
            }
            let Some(path_item) = item.as_item() else { continue };
            if !has_operations(path_item) {
                continue;
            }

            let mut matched = false;

            for binding in bindings {
                let route = &binding.route;
                let analysis = TransformAnalyzer::analyze(route);

                if !analysis.is_analyzable {
                    match strategy {
                        NonAnalyzableStrategy::IncludeWithWarning => {
                            result.insert_reachable(ReachablePathInfo {
                                backend_path: backend_path.clone(),
                                gateway_path: backend_path.clone(),
                                path_item: path_item.clone(),
                                route_id: route.id.clone(),
                            });
                            result.warnings.push(format!(
                                "route '{}' is non-analyzable; included '{}' verbatim",
                                route.id, backend_path
                            ));
                            matched = true;
                            break;
                        }
                        NonAnalyzableStrategy::ExcludeWithWarning => {
                            result.warnings.push(format!(
                                "route '{}' is non-analyzable; excluding paths reachable only through it",
                                route.id
                            ));
                            continue;
                        }
                        NonAnalyzableStrategy::SkipService => unreachable!("handled above"),
                    }
                }

                if let Some(gateway_path) = TransformAnalyzer::map_backend_to_gateway_path(route, backend_path) {
                    result.insert_reachable(ReachablePathInfo {
                        backend_path: backend_path.clone(),
                        gateway_path,
                        path_item: path_item.clone(),
                        route_id: route.id.clone(),
                    });
                    matched = true;
                    break;
                }
            }

            if !matched {
                result.insert_unreachable(UnreachablePathInfo {
                    backend_path: backend_path.clone(),
                    reason: "No route configuration makes this path accessible".to_string(),
                });
            }
        }

        result
    }
}

fn has_operations(item: &PathItem) -> bool {
    item.get.is_some()
        || item.put.is_some()
        || item.post.is_some()
        || item.delete.is_some()
        || item.options.is_some()
        || item.head.is_some()
        || item.patch.is_some()
        || item.trace.is_some()
}
