//! Route match-pattern matching and transform reverse mapping.
//!
//! The proxy only exposes *forward* transforms (external path -> backend
//! path); everything here runs them backwards to recover, for a given
//! backend path, the external ("gateway") path a client would have to
//! request to reach it.

use crate::proxy::{RouteConfig, Transform};
use std::collections::HashMap;

/// The outcome of analyzing one route's transform chain.
#[derive(Debug, Clone)]
pub struct RouteTransformAnalysis {
    pub route_id: String,
    pub match_pattern: String,
    pub classification: String,
    pub is_analyzable: bool,
    pub warnings: Vec<String>,
}

/// Classifies routes and computes forward/reverse path mappings.
pub struct TransformAnalyzer;

impl TransformAnalyzer {
    /// Classify a route: `is_analyzable` is false iff any transform is
    /// `Unknown`; `classification` is the first transform's kind, or
    /// `"Direct"` when the route carries no transforms.
    pub fn analyze(route: &RouteConfig) -> RouteTransformAnalysis {
        let classification =
            route.transforms.first().map(|t| t.kind().to_string()).unwrap_or_else(|| "Direct".to_string());

        let mut warnings = Vec::new();
        let is_analyzable = !route.transforms.iter().any(|t| matches!(t, Transform::Unknown { .. }));
        if !is_analyzable {
            warnings.push(format!(
                "route '{}' has an unrecognized transform and cannot be analyzed",
                route.id
            ));
        }

        RouteTransformAnalysis {
            route_id: route.id.clone(),
            match_pattern: route.match_pattern.clone(),
            classification,
            is_analyzable,
            warnings,
        }
    }

    /// `true` iff [`map_backend_to_gateway_path`] produces a result.
    pub fn is_path_reachable(route: &RouteConfig, backend_path: &str) -> bool {
        Self::map_backend_to_gateway_path(route, backend_path).is_some()
    }

    /// Reverse-map a backend path to the gateway path that would reach it
    /// through this route, or `None` if the route cannot produce it.
    pub fn map_backend_to_gateway_path(route: &RouteConfig, backend_path: &str) -> Option<String> {
        if route.transforms.iter().any(|t| matches!(t, Transform::Unknown { .. })) {
            return None;
        }

        let all_direct = route.transforms.iter().all(|t| matches!(t, Transform::Direct));
        if route.transforms.is_empty() || all_direct {
            return if match_path(&route.match_pattern, backend_path).is_some() {
                Some(backend_path.to_string())
            } else {
                None
            };
        }

        let mut current = backend_path.to_string();
        for t in route.transforms.iter().rev() {
            current = match t {
                Transform::Direct => current,
                Transform::PathPrefix { prefix } => current.strip_prefix(prefix.as_str())?.to_string(),
                Transform::PathRemovePrefix { prefix } => format!("{prefix}{current}"),
                Transform::PathSet { path } => {
                    if current == *path {
                        current
                    } else {
                        return None;
                    }
                }
                Transform::PathPattern { template } => {
                    let captures = match_path(template, &current)?;
                    let substituted = substitute_captures(&route.match_pattern, &captures)?;
                    if match_path(&route.match_pattern, &substituted).is_none() {
                        return None;
                    }
                    substituted
                }
                Transform::Unknown { .. } => return None,
            };
        }
        Some(current)
    }
}

/// Match `path` against a route-style `pattern` containing `{name}`
/// single-segment captures and an optional terminal `{**name}` catch-all.
/// Returns the captured values on success.
pub fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_segs = segments(pattern);
    let path_segs = segments(path);

    let mut captures = HashMap::new();
    let mut pi = 0;
    let mut vi = 0;

    while pi < pattern_segs.len() {
        let seg = pattern_segs[pi];
        if let Some(name) = catch_all_name(seg) {
            if pi != pattern_segs.len() - 1 {
                return None;
            }
            captures.insert(name.to_string(), path_segs[vi..].join("/"));
            return Some(captures);
        } else if let Some(name) = capture_name(seg) {
            let value = path_segs.get(vi)?;
            captures.insert(name.to_string(), (*value).to_string());
            pi += 1;
            vi += 1;
        } else {
            if path_segs.get(vi) != Some(&seg) {
                return None;
            }
            pi += 1;
            vi += 1;
        }
    }

    if vi == path_segs.len() {
        Some(captures)
    } else {
        None
    }
}

/// Rebuild a path from `pattern` by substituting each `{name}`/`{**name}`
/// placeholder with the matching entry from `captures`.
pub fn substitute_captures(pattern: &str, captures: &HashMap<String, String>) -> Option<String> {
    let mut out = Vec::new();
    for seg in segments(pattern) {
        if let Some(name) = catch_all_name(seg) {
            let value = captures.get(name)?;
            if !value.is_empty() {
                out.push(value.clone());
            }
        } else if let Some(name) = capture_name(seg) {
            out.push(captures.get(name)?.clone());
        } else {
            out.push(seg.to_string());
        }
    }
    Some(format!("/{}", out.join("/")))
}

fn segments(path: &str) -> Vec<&str> {
    path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect()
}

fn catch_all_name(segment: &str) -> Option<&str> {
    segment.strip_prefix("{**").and_then(|rest| rest.strip_suffix('}'))
}

fn capture_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{').and_then(|rest| rest.strip_suffix('}'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn route(id: &str, match_pattern: &str, transforms: Vec<Transform>) -> RouteConfig {
        RouteConfig {
            id: id.to_string(),
            match_pattern: match_pattern.to_string(),
            cluster_id: "c1".to_string(),
            transforms,
            metadata: Map::new(),
        }
    }

    #[test]
    fn match_path_handles_literal_and_capture_segments() {
        let captures = match_path("/api/users/{id}", "/api/users/42").unwrap();
        assert_eq!(captures.get("id"), Some(&"42".to_string()));
        assert!(match_path("/api/users/{id}", "/api/users").is_none());
    }

    #[test]
    fn match_path_handles_terminal_catch_all() {
        let captures = match_path("/api/users/{**catch-all}", "/api/users/42/orders").unwrap();
        assert_eq!(captures.get("catch-all"), Some(&"42/orders".to_string()));
        let captures = match_path("/api/{**catch-all}", "/api").unwrap();
        assert_eq!(captures.get("catch-all"), Some(&"".to_string()));
    }

    #[test]
    fn direct_route_reachability_requires_match_pattern() {
        let r = route("r1", "/api/users/{**catch-all}", vec![]);
        assert!(TransformAnalyzer::is_path_reachable(&r, "/api/users/42"));
        assert!(!TransformAnalyzer::is_path_reachable(&r, "/admin/users"));
        assert_eq!(
            TransformAnalyzer::map_backend_to_gateway_path(&r, "/api/users/42"),
            Some("/api/users/42".to_string())
        );
    }

    #[test]
    fn scenario_s3_path_remove_prefix_reverse_mapping() {
        let r = route(
            "r1",
            "/api/{**catch-all}",
            vec![Transform::PathRemovePrefix { prefix: "/v1".to_string() }],
        );
        assert_eq!(
            TransformAnalyzer::map_backend_to_gateway_path(&r, "/users"),
            Some("/v1/users".to_string())
        );
    }

    #[test]
    fn scenario_s4_path_pattern_reverse_mapping() {
        let r = route(
            "r1",
            "/api/users/{**catch-all}",
            vec![Transform::PathPattern { template: "/users/{**catch-all}".to_string() }],
        );
        assert_eq!(
            TransformAnalyzer::map_backend_to_gateway_path(&r, "/users/123"),
            Some("/api/users/123".to_string())
        );
        assert_eq!(TransformAnalyzer::map_backend_to_gateway_path(&r, "/admin/settings"), None);
    }

    #[test]
    fn path_prefix_reverse_mapping() {
        let r = route("r1", "/v1/{**catch-all}", vec![Transform::PathPrefix { prefix: "/v1".to_string() }]);
        assert_eq!(
            TransformAnalyzer::map_backend_to_gateway_path(&r, "/v1/users"),
            Some("/users".to_string())
        );
        assert_eq!(TransformAnalyzer::map_backend_to_gateway_path(&r, "/users"), None);
    }

    #[test]
    fn path_set_reverse_mapping_matches_only_the_fixed_backend_path() {
        let r = route("r1", "/health", vec![Transform::PathSet { path: "/internal/health".to_string() }]);
        assert_eq!(
            TransformAnalyzer::map_backend_to_gateway_path(&r, "/internal/health"),
            Some("/health".to_string())
        );
        assert_eq!(TransformAnalyzer::map_backend_to_gateway_path(&r, "/other"), None);
    }

    #[test]
    fn unknown_transform_is_never_analyzable() {
        let r = route("r1", "/api/{**catch-all}", vec![Transform::Unknown { raw: "CustomRewrite".to_string() }]);
        let analysis = TransformAnalyzer::analyze(&r);
        assert!(!analysis.is_analyzable);
        assert_eq!(analysis.warnings.len(), 1);
        assert_eq!(TransformAnalyzer::map_backend_to_gateway_path(&r, "/users"), None);
    }

    #[test]
    fn classification_defaults_to_direct_when_no_transforms() {
        let r = route("r1", "/api/{**catch-all}", vec![]);
        assert_eq!(TransformAnalyzer::analyze(&r).classification, "Direct");
    }
}
