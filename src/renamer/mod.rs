//! Prefixes every component schema name with the owning service's name and
//! rewrites every `$ref` in the document to match.
//!
//! Renaming is deliberately not idempotent: running it twice with the same
//! prefix yields `PPName`, not `PName` (invariant 6). Callers must apply it
//! exactly once per document, before merging.

use openapiv3::{OpenAPI, Operation, ReferenceOr, Responses, Schema};
use std::collections::HashMap;

pub struct SchemaRenamer;

impl SchemaRenamer {
    /// Rename every `components.schemas` entry to `{prefix}{name}` and
    /// rewrite all `$ref`s in the document accordingly. A blank
    /// (whitespace-only) prefix is a no-op.
    pub fn rename(document: &OpenAPI, prefix: &str) -> OpenAPI {
        if prefix.trim().is_empty() {
            return document.clone();
        }

        let Some(components) = &document.components else { return document.clone() };
        let rename_map: HashMap<String, String> =
            components.schemas.keys().map(|name| (name.clone(), format!("{prefix}{name}"))).collect();

        let mut renamed = document.clone();
        rewrite_components(&mut renamed, &rename_map);
        for path_item in renamed.paths.paths.values_mut() {
            if let ReferenceOr::Item(item) = path_item {
                for op in operations_mut(item) {
                    rewrite_operation(op, &rename_map);
                }
            }
        }
        renamed
    }
}

fn operations_mut(item: &mut openapiv3::PathItem) -> Vec<&mut Operation> {
    [
        item.get.as_mut(),
        item.put.as_mut(),
        item.post.as_mut(),
        item.delete.as_mut(),
        item.options.as_mut(),
        item.head.as_mut(),
        item.patch.as_mut(),
        item.trace.as_mut(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn rewrite_components(document: &mut OpenAPI, rename_map: &HashMap<String, String>) {
    let Some(components) = &mut document.components else { return };

    let renamed_schemas = components
        .schemas
        .iter()
        .map(|(name, schema)| {
            let mut schema = schema.clone();
            rewrite_ref_schema(&mut schema, rename_map);
            (rename_map.get(name).cloned().unwrap_or_else(|| name.clone()), schema)
        })
        .collect();
    components.schemas = renamed_schemas;

    rewrite_map_component(components.responses.values_mut(), rename_map, rewrite_response);
    rewrite_map_component(components.request_bodies.values_mut(), rename_map, rewrite_request_body);
    rewrite_map_component(components.parameters.values_mut(), rename_map, rewrite_parameter);
    rewrite_map_component(components.headers.values_mut(), rename_map, rewrite_header);
    rewrite_map_component(components.callbacks.values_mut(), rename_map, rewrite_callback);
}

fn rewrite_map_component<'a, T: 'a, F>(
    values: impl Iterator<Item = &'a mut ReferenceOr<T>>,
    rename_map: &HashMap<String, String>,
    mut f: F,
) where
    F: FnMut(&mut T, &HashMap<String, String>),
{
    for value in values {
        if let ReferenceOr::Item(item) = value {
            f(item, rename_map);
        }
    }
}

fn rewrite_operation(op: &mut Operation, rename_map: &HashMap<String, String>) {
    for param in &mut op.parameters {
        if let ReferenceOr::Item(p) = param {
            rewrite_parameter(p, rename_map);
        }
    }
    if let Some(ReferenceOr::Item(body)) = &mut op.request_body {
        rewrite_request_body(body, rename_map);
    }
    rewrite_responses(&mut op.responses, rename_map);
    for callback in op.callbacks.values_mut() {
        if let ReferenceOr::Item(cb) = callback {
            rewrite_callback(cb, rename_map);
        }
    }
}

fn rewrite_callback(callback: &mut openapiv3::Callback, rename_map: &HashMap<String, String>) {
    for path_item in callback.values_mut() {
        for op in operations_mut(path_item) {
            rewrite_operation(op, rename_map);
        }
    }
}

fn rewrite_responses(responses: &mut Responses, rename_map: &HashMap<String, String>) {
    for response in responses.responses.values_mut() {
        if let ReferenceOr::Item(r) = response {
            rewrite_response(r, rename_map);
        }
    }
    if let Some(ReferenceOr::Item(default)) = &mut responses.default {
        rewrite_response(default, rename_map);
    }
}

fn rewrite_response(response: &mut openapiv3::Response, rename_map: &HashMap<String, String>) {
    for media in response.content.values_mut() {
        if let Some(schema) = &mut media.schema {
            rewrite_ref_schema_ref(schema, rename_map);
        }
    }
    for header in response.headers.values_mut() {
        if let ReferenceOr::Item(h) = header {
            rewrite_header(h, rename_map);
        }
    }
}

fn rewrite_request_body(body: &mut openapiv3::RequestBody, rename_map: &HashMap<String, String>) {
    for media in body.content.values_mut() {
        if let Some(schema) = &mut media.schema {
            rewrite_ref_schema_ref(schema, rename_map);
        }
    }
}

fn rewrite_parameter(parameter: &mut openapiv3::Parameter, rename_map: &HashMap<String, String>) {
    let data = parameter.parameter_data_mut();
    match &mut data.format {
        openapiv3::ParameterSchemaOrContent::Schema(schema) => rewrite_ref_schema_ref(schema, rename_map),
        openapiv3::ParameterSchemaOrContent::Content(content) => {
            for media in content.values_mut() {
                if let Some(schema) = &mut media.schema {
                    rewrite_ref_schema_ref(schema, rename_map);
                }
            }
        }
    }
}

fn rewrite_header(header: &mut openapiv3::Header, rename_map: &HashMap<String, String>) {
    match &mut header.format {
        openapiv3::ParameterSchemaOrContent::Schema(schema) => rewrite_ref_schema_ref(schema, rename_map),
        openapiv3::ParameterSchemaOrContent::Content(content) => {
            for media in content.values_mut() {
                if let Some(schema) = &mut media.schema {
                    rewrite_ref_schema_ref(schema, rename_map);
                }
            }
        }
    }
}

fn rewrite_ref_schema_ref(r: &mut ReferenceOr<Schema>, rename_map: &HashMap<String, String>) {
    match r {
        ReferenceOr::Reference { reference } => rewrite_reference(reference, rename_map),
        ReferenceOr::Item(s) => rewrite_schema(s, rename_map),
    }
}

fn rewrite_ref_schema(r: &mut ReferenceOr<Schema>, rename_map: &HashMap<String, String>) {
    rewrite_ref_schema_ref(r, rename_map)
}

fn rewrite_ref_boxed_schema(r: &mut ReferenceOr<Box<Schema>>, rename_map: &HashMap<String, String>) {
    match r {
        ReferenceOr::Reference { reference } => rewrite_reference(reference, rename_map),
        ReferenceOr::Item(boxed) => rewrite_schema(boxed, rename_map),
    }
}

fn rewrite_schema(schema: &mut Schema, rename_map: &HashMap<String, String>) {
    use openapiv3::{AdditionalProperties, SchemaKind, Type};
    match &mut schema.schema_kind {
        SchemaKind::Type(Type::Object(o)) => {
            for prop in o.properties.values_mut() {
                rewrite_ref_boxed_schema(prop, rename_map);
            }
            if let Some(AdditionalProperties::Schema(boxed)) = &mut o.additional_properties {
                rewrite_ref_schema_ref(boxed.as_mut(), rename_map);
            }
        }
        SchemaKind::Type(Type::Array(a)) => {
            if let Some(items) = &mut a.items {
                rewrite_ref_boxed_schema(items, rename_map);
            }
        }
        SchemaKind::AllOf { all_of } => all_of.iter_mut().for_each(|s| rewrite_ref_schema_ref(s, rename_map)),
        SchemaKind::OneOf { one_of } => one_of.iter_mut().for_each(|s| rewrite_ref_schema_ref(s, rename_map)),
        SchemaKind::AnyOf { any_of } => any_of.iter_mut().for_each(|s| rewrite_ref_schema_ref(s, rename_map)),
        SchemaKind::Not { not } => rewrite_ref_schema_ref(not.as_mut(), rename_map),
        _ => {}
    }
}

fn rewrite_reference(reference: &mut String, rename_map: &HashMap<String, String>) {
    const PREFIX: &str = "#/components/schemas/";
    if let Some(name) = reference.strip_prefix(PREFIX) {
        if let Some(renamed) = rename_map.get(name) {
            *reference = format!("{PREFIX}{renamed}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> OpenAPI {
        let value = serde_json::json!({
            "openapi": "3.0.0",
            "info": {"title": "Users", "version": "1.0.0"},
            "paths": {
                "/users": {
                    "get": {
                        "responses": {
                            "200": {
                                "description": "ok",
                                "content": {"application/json": {"schema": {"$ref": "#/components/schemas/User"}}}
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "User": {
                        "type": "object",
                        "properties": {"address": {"$ref": "#/components/schemas/Address"}}
                    },
                    "Address": {"type": "object"}
                }
            }
        });
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn renames_schemas_and_rewrites_refs() {
        let renamed = SchemaRenamer::rename(&doc(), "Users");
        let schemas = &renamed.components.unwrap().schemas;
        assert!(schemas.contains_key("UsersUser"));
        assert!(schemas.contains_key("UsersAddress"));

        let value = serde_json::to_value(&renamed.paths.paths["/users"]).unwrap();
        let ref_value = value["get"]["responses"]["200"]["content"]["application/json"]["schema"]["$ref"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(ref_value, "#/components/schemas/UsersUser");
    }

    #[test]
    fn rewrites_refs_inside_component_callbacks() {
        let mut document = doc();
        let components = document.components.as_mut().unwrap();
        let callback_value = serde_json::json!({
            "{$request.body#/callbackUrl}": {
                "post": {
                    "requestBody": {
                        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/User"}}}
                    },
                    "responses": {"200": {"description": "ok"}}
                }
            }
        });
        components.callbacks.insert("onUserEvent".to_string(), ReferenceOr::Item(serde_json::from_value(callback_value).unwrap()));

        let renamed = SchemaRenamer::rename(&document, "Users");
        let components = renamed.components.unwrap();
        let value = serde_json::to_value(&components.callbacks["onUserEvent"]).unwrap();
        let ref_value = value["{$request.body#/callbackUrl}"]["post"]["requestBody"]["content"]["application/json"]["schema"]["$ref"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(ref_value, "#/components/schemas/UsersUser");
    }

    #[test]
    fn blank_prefix_is_a_no_op() {
        let original = doc();
        let renamed = SchemaRenamer::rename(&original, "   ");
        assert!(renamed.components.unwrap().schemas.contains_key("User"));
    }

    #[test]
    fn renaming_twice_is_not_idempotent() {
        let once = SchemaRenamer::rename(&doc(), "P");
        let twice = SchemaRenamer::rename(&once, "P");
        let schemas = &twice.components.unwrap().schemas;
        assert!(schemas.contains_key("PPUser"));
        assert!(!schemas.contains_key("PUser"));
    }
}
