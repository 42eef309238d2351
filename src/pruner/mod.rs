//! Builds a new `OpenAPI` document containing only reachable paths and the
//! component schemas/tags those paths transitively reference.

use crate::reachability::PathReachabilityResult;
use openapiv3::{
    AdditionalProperties, Components, OpenAPI, Operation, Paths, ReferenceOr, Schema, SchemaKind, Tag, Type,
};
use std::collections::HashSet;

/// Prunes an `OpenAPI` document down to the paths present in `reachability`
/// (renamed to their gateway path) plus the transitive closure of schemas
/// those paths' operations reference.
pub struct DocumentPruner;

impl DocumentPruner {
    pub fn prune(original: &OpenAPI, reachability: &PathReachabilityResult) -> OpenAPI {
        let mut pruned = original.clone();
        let mut paths = Paths::default();
        let mut used_tags: HashSet<String> = HashSet::new();
        let mut referenced_schemas: HashSet<String> = HashSet::new();

        for info in reachability.reachable() {
            for op in operations(&info.path_item) {
                used_tags.extend(op.tags.iter().cloned());
                collect_operation_refs(op, &mut referenced_schemas);
            }
            paths.paths.insert(info.gateway_path.clone(), ReferenceOr::Item(info.path_item.clone()));
        }

        let closure = close_over_schemas(original.components.as_ref(), &referenced_schemas);

        pruned.paths = paths;
        pruned.tags = original.tags.iter().filter(|t| used_tags.contains(&t.name)).cloned().collect::<Vec<Tag>>();
        pruned.components = original.components.as_ref().map(|c| prune_components(c, &closure));

        pruned
    }
}

fn operations(item: &openapiv3::PathItem) -> Vec<&Operation> {
    [
        item.get.as_ref(),
        item.put.as_ref(),
        item.post.as_ref(),
        item.delete.as_ref(),
        item.options.as_ref(),
        item.head.as_ref(),
        item.patch.as_ref(),
        item.trace.as_ref(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn schema_ref_name(reference: &str) -> Option<&str> {
    reference.strip_prefix("#/components/schemas/")
}

fn collect_operation_refs(op: &Operation, out: &mut HashSet<String>) {
    for param in &op.parameters {
        if let Some(p) = param.as_item() {
            match &p.parameter_data_ref().format {
                openapiv3::ParameterSchemaOrContent::Schema(schema) => collect_from_ref_schema(schema, out),
                openapiv3::ParameterSchemaOrContent::Content(content) => {
                    for media in content.values() {
                        if let Some(schema) = &media.schema {
                            collect_from_ref_schema(schema, out);
                        }
                    }
                }
            }
        }
    }
    if let Some(body) = &op.request_body {
        if let Some(b) = body.as_item() {
            for media in b.content.values() {
                if let Some(schema) = &media.schema {
                    collect_from_ref_schema(schema, out);
                }
            }
        }
    }
    for response in op.responses.responses.values() {
        if let Some(r) = response.as_item() {
            for media in r.content.values() {
                if let Some(schema) = &media.schema {
                    collect_from_ref_schema(schema, out);
                }
            }
        }
    }
    if let Some(default) = &op.responses.default {
        if let Some(r) = default.as_item() {
            for media in r.content.values() {
                if let Some(schema) = &media.schema {
                    collect_from_ref_schema(schema, out);
                }
            }
        }
    }
}

fn collect_from_ref_schema(r: &ReferenceOr<Schema>, out: &mut HashSet<String>) {
    match r {
        ReferenceOr::Reference { reference } => {
            if let Some(name) = schema_ref_name(reference) {
                out.insert(name.to_string());
            }
        }
        ReferenceOr::Item(s) => collect_from_schema(s, out),
    }
}

fn collect_from_ref_boxed_schema(r: &ReferenceOr<Box<Schema>>, out: &mut HashSet<String>) {
    match r {
        ReferenceOr::Reference { reference } => {
            if let Some(name) = schema_ref_name(reference) {
                out.insert(name.to_string());
            }
        }
        ReferenceOr::Item(boxed) => collect_from_schema(boxed, out),
    }
}

fn collect_from_schema(s: &Schema, out: &mut HashSet<String>) {
    match &s.schema_kind {
        SchemaKind::Type(Type::Object(o)) => {
            for prop in o.properties.values() {
                collect_from_ref_boxed_schema(prop, out);
            }
            if let Some(AdditionalProperties::Schema(boxed)) = &o.additional_properties {
                collect_from_ref_schema(boxed.as_ref(), out);
            }
        }
        SchemaKind::Type(Type::Array(a)) => {
            if let Some(items) = &a.items {
                collect_from_ref_boxed_schema(items, out);
            }
        }
        SchemaKind::AllOf { all_of } => all_of.iter().for_each(|s| collect_from_ref_schema(s, out)),
        SchemaKind::OneOf { one_of } => one_of.iter().for_each(|s| collect_from_ref_schema(s, out)),
        SchemaKind::AnyOf { any_of } => any_of.iter().for_each(|s| collect_from_ref_schema(s, out)),
        SchemaKind::Not { not } => collect_from_ref_schema(not.as_ref(), out),
        _ => {}
    }
}

/// Breadth-first closure over `components.schemas`, starting from the
/// operation-referenced schema names, following nested `$ref`s until no new
/// name is discovered.
fn close_over_schemas(components: Option<&Components>, seeds: &HashSet<String>) -> HashSet<String> {
    let mut closure: HashSet<String> = seeds.clone();
    let Some(components) = components else { return closure };

    let mut frontier: Vec<String> = seeds.iter().cloned().collect();
    while let Some(name) = frontier.pop() {
        let Some(schema_ref) = components.schemas.get(&name) else { continue };
        let mut found = HashSet::new();
        collect_from_ref_schema(schema_ref, &mut found);
        for n in found {
            if closure.insert(n.clone()) {
                frontier.push(n);
            }
        }
    }
    closure
}

fn prune_components(original: &Components, keep: &HashSet<String>) -> Components {
    let mut pruned = original.clone();
    pruned.schemas.retain(|name, _| keep.contains(name));
    pruned
}
