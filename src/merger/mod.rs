//! Merges per-service pruned, renamed documents into one aggregated
//! `OpenAPI` document.
//!
//! Merge semantics are union-with-first-wins throughout: the first document
//! to contribute a given path+method, schema name, tag, or server wins; a
//! later collision is logged as a warning, not an error (§4.8).

use crate::decorators::RequestContext;
use crate::config::AggregationOptions;
use openapiv3::{Components, Info, OpenAPI, ReferenceOr};
use std::collections::HashSet;

/// Per-document input to the merge, plus the logical service it came from
/// (used for warning messages and `Info.description`).
pub struct MergeInput {
    pub service_name: String,
    pub document: OpenAPI,
}

/// Aggregates multiple single-service documents into one document, plus any
/// warnings raised along the way (path collisions, etc).
pub struct DocumentMerger;

impl DocumentMerger {
    /// Merge `inputs` into one document. `options` supplies the optional
    /// `configureInfo`/`configureServers` decorators (§4.8); `ctx` is the
    /// request-derived data those decorators act on.
    pub fn merge(
        title: &str,
        inputs: Vec<MergeInput>,
        options: &AggregationOptions,
        ctx: &RequestContext,
    ) -> (OpenAPI, Vec<String>) {
        let mut warnings = Vec::new();
        let mut merged = OpenAPI {
            openapi: "3.0.3".to_string(),
            info: merged_info(title, &inputs, options, ctx),
            paths: Default::default(),
            components: None,
            security: None,
            servers: Vec::new(),
            tags: Vec::new(),
            external_docs: None,
            extensions: Default::default(),
        };

        let mut seen_servers: HashSet<String> = HashSet::new();
        let mut seen_tags: HashSet<String> = HashSet::new();
        let mut components = Components::default();

        for input in inputs {
            let doc = input.document;

            for (path, item) in doc.paths.paths {
                merge_path(&mut merged, &input.service_name, path, item, &mut warnings);
            }

            for server in doc.servers {
                if seen_servers.insert(server.url.clone()) {
                    merged.servers.push(server);
                }
            }

            for tag in doc.tags {
                if seen_tags.insert(tag.name.clone()) {
                    merged.tags.push(tag);
                }
            }

            if let Some(sec) = doc.security {
                merged.security.get_or_insert_with(Vec::new).extend(sec);
            }

            if merged.external_docs.is_none() {
                merged.external_docs = doc.external_docs;
            }

            if let Some(doc_components) = doc.components {
                merge_components(&mut components, doc_components, &input.service_name, &mut warnings);
            }
        }

        if let Some(decorator) = &options.servers_decorator {
            merged.servers = decorator.build(ctx);
        }

        merged.components = Some(components);
        (merged, warnings)
    }
}

fn merged_info(title: &str, inputs: &[MergeInput], options: &AggregationOptions, ctx: &RequestContext) -> Info {
    let highest_version =
        inputs.iter().map(|i| i.document.info.version.clone()).max().unwrap_or_else(|| "0.0.0".to_string());
    let service_names: Vec<&str> = inputs.iter().map(|i| i.service_name.as_str()).collect();
    let contact = inputs.iter().find_map(|i| i.document.info.contact.clone());

    let info = Info {
        title: title.to_string(),
        description: Some(format!("Aggregated OpenAPI document for: {}", service_names.join(", "))),
        version: highest_version,
        contact,
        ..Default::default()
    };

    match &options.info_decorator {
        Some(decorator) => decorator.decorate(info, ctx),
        None => info,
    }
}

fn merge_path(
    merged: &mut OpenAPI,
    service_name: &str,
    path: String,
    item: ReferenceOr<openapiv3::PathItem>,
    warnings: &mut Vec<String>,
) {
    let ReferenceOr::Item(incoming) = item else { return };

    match merged.paths.paths.get_mut(&path) {
        None => {
            merged.paths.paths.insert(path, ReferenceOr::Item(incoming));
        }
        Some(ReferenceOr::Item(existing)) => {
            merge_methods(existing, incoming, &path, service_name, warnings);
        }
        Some(ReferenceOr::Reference { .. }) => {
            warnings.push(format!("path '{path}' from service '{service_name}' collides with a $ref path; skipped"));
        }
    }
}

fn merge_methods(
    existing: &mut openapiv3::PathItem,
    incoming: openapiv3::PathItem,
    path: &str,
    service_name: &str,
    warnings: &mut Vec<String>,
) {
    macro_rules! merge_method {
        ($field:ident, $name:literal) => {
            if incoming.$field.is_some() {
                if existing.$field.is_none() {
                    existing.$field = incoming.$field;
                } else {
                    warnings.push(format!(
                        "method {} on path '{path}' already defined; service '{service_name}' contribution skipped",
                        $name
                    ));
                }
            }
        };
    }

    merge_method!(get, "GET");
    merge_method!(put, "PUT");
    merge_method!(post, "POST");
    merge_method!(delete, "DELETE");
    merge_method!(options, "OPTIONS");
    merge_method!(head, "HEAD");
    merge_method!(patch, "PATCH");
    merge_method!(trace, "TRACE");
}

fn merge_components(
    accumulator: &mut Components,
    incoming: Components,
    service_name: &str,
    warnings: &mut Vec<String>,
) {
    merge_index_map(&mut accumulator.schemas, incoming.schemas, "schema", service_name, warnings);
    merge_index_map(&mut accumulator.responses, incoming.responses, "response", service_name, warnings);
    merge_index_map(&mut accumulator.parameters, incoming.parameters, "parameter", service_name, warnings);
    merge_index_map(&mut accumulator.request_bodies, incoming.request_bodies, "requestBody", service_name, warnings);
    merge_index_map(&mut accumulator.headers, incoming.headers, "header", service_name, warnings);
    merge_index_map(&mut accumulator.examples, incoming.examples, "example", service_name, warnings);
    merge_index_map(&mut accumulator.links, incoming.links, "link", service_name, warnings);
    merge_index_map(&mut accumulator.callbacks, incoming.callbacks, "callback", service_name, warnings);
    merge_index_map(
        &mut accumulator.security_schemes,
        incoming.security_schemes,
        "securityScheme",
        service_name,
        warnings,
    );
}

fn merge_index_map<T>(
    accumulator: &mut indexmap::IndexMap<String, T>,
    incoming: indexmap::IndexMap<String, T>,
    kind: &str,
    service_name: &str,
    warnings: &mut Vec<String>,
) {
    for (key, value) in incoming {
        if accumulator.contains_key(&key) {
            warnings.push(format!(
                "{kind} '{key}' from service '{service_name}' collides with an existing entry; first wins"
            ));
            continue;
        }
        accumulator.insert(key, value);
    }
}
