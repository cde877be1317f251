//! Document schemas
//!
//! Emits one JSON Schema (or MongoDB `$jsonSchema` body for BSON) per
//! collection. Each included category becomes a property of the root: a
//! bare object for unit-cardinality categories, otherwise a non-empty array
//! of objects.

use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::{contains_id, excluded_items, SchemaBuilder};
use crate::config::{CollectionConfig, EnforceConfig, JsonDraft};
use crate::content::{AttributeFeatures, ScalarValue};
use crate::dictionary::ItemName;
use crate::error::{Result, SchemaError};
use crate::profile::{Profile, TargetProfile};
use crate::slice::SliceView;

/// One emitted category
struct CategorySchema {
    name: String,
    schema: Value,
    object: Value,
    mandatory: bool,
}

pub(crate) fn build(builder: &SchemaBuilder<'_>, profile: &Profile, collection: &str) -> Result<Value> {
    let config = builder.config();
    let coll = config.collection(collection)?;

    let slice = match &coll.slice_filter {
        Some(name) => Some(builder.slices().get(name).ok_or_else(|| {
            SchemaError::InvalidFormat(format!(
                "collection {} filters on undefined slice {}",
                collection, name
            ))
        })?),
        None => None,
    };

    let excluded = excluded_items(
        config
            .assembly
            .excluded_attributes
            .iter()
            .chain(coll.excluded_attributes.iter()),
    );

    let mut emitted = Vec::new();
    for cat in builder.content().categories() {
        if !include_in_collection(builder, profile, coll, slice, cat) {
            continue;
        }
        match category_schema(builder, profile, coll, slice, cat, &excluded) {
            Some(schema) => emitted.push(schema),
            None => debug!(category = %cat, "No properties, skipping category"),
        }
    }

    let type_key = profile.target.type_key();
    let mut root = if emitted.len() == 1 && !coll.retain_singleton {
        emitted.remove(0).object
    } else {
        let required: Vec<Value> = emitted
            .iter()
            .filter(|c| c.mandatory)
            .map(|c| Value::from(c.name.clone()))
            .collect();
        let properties: Map<String, Value> = emitted
            .into_iter()
            .map(|c| (c.name, c.schema))
            .collect();
        let mut root = json!({
            type_key: "object",
            "properties": properties,
            "additionalProperties": false,
        });
        if !required.is_empty() {
            root["required"] = Value::Array(required);
        }
        root
    };

    let version = config.collection_version(collection);
    match profile.target {
        TargetProfile::Bson => {
            if let Some(props) = root.get_mut("properties").and_then(Value::as_object_mut) {
                props.insert("_id".to_string(), json!({ "bsonType": "objectId" }));
            }
        }
        _ => {
            let draft = config.assembly.json_draft;
            if let Some(obj) = root.as_object_mut() {
                obj.insert("$schema".to_string(), Value::from(draft.schema_url()));
                obj.insert(
                    "title".to_string(),
                    Value::from(format!(
                        "schema: {} collection: {} version: {}",
                        config.database.name, collection, version
                    )),
                );
                obj.insert(
                    "description".to_string(),
                    Value::from(format!(
                        "Collection {} of the {} dictionary",
                        collection, config.database.name
                    )),
                );
                obj.insert("$comment".to_string(), Value::from(format!("schema_version: {}", version)));
            }
        }
    }

    info!(profile = %profile.target, collection = %collection, version = %version, "Built document schema");
    Ok(root)
}

/// Schema-level policy, then the collection's lists, then its slice filter
fn include_in_collection(
    builder: &SchemaBuilder<'_>,
    profile: &Profile,
    coll: &CollectionConfig,
    slice: Option<&SliceView>,
    cat: &str,
) -> bool {
    if !builder.include_category(profile, cat) {
        return false;
    }
    let id = profile.id(cat);
    if contains_id(&coll.exclude, &id) {
        return false;
    }
    if !coll.include.is_empty() && !contains_id(&coll.include, &id) {
        return false;
    }
    slice.map_or(true, |view| view.contains(cat))
}

fn category_schema(
    builder: &SchemaBuilder<'_>,
    profile: &Profile,
    coll: &CollectionConfig,
    slice: Option<&SliceView>,
    cat: &str,
    excluded: &BTreeSet<ItemName>,
) -> Option<CategorySchema> {
    let config = builder.config();
    let enforce = &config.assembly.enforce;
    let draft = config.assembly.json_draft;
    let type_key = profile.target.type_key();
    let features = builder.content().category_features(cat)?;
    let attrs = builder.ordered_attributes(cat, excluded);

    let mut properties = Map::new();
    let mut required: Vec<String> = Vec::new();

    if let Some(block) = &config.assembly.block_attribute {
        let name = profile.name(&block.name);
        let type_name = profile
            .types
            .type_name(Some(&block.type_code), profile.target.unknown_type());
        properties.insert(name.clone(), json!({ type_key: type_name }));
        required.push(name);
    }

    let mut grouped: BTreeSet<String> = BTreeSet::new();
    for agg in &coll.sub_category_aggregates {
        let members: Vec<&&AttributeFeatures> = attrs.iter().filter(|f| f.in_sub_category(&agg.id)).collect();
        if members.is_empty() {
            continue;
        }
        let prefix = format!("{}_", agg.id.to_lowercase());
        let mut sub_props = Map::new();
        let mut sub_required = Vec::new();
        for f in members {
            let raw = f.attribute_name.as_str();
            let short = match raw.get(..prefix.len()) {
                Some(head) if head.eq_ignore_ascii_case(&prefix) => &raw[prefix.len()..],
                _ => raw,
            };
            let name = profile.name(short);
            let mut prop = attribute_schema(profile, f, enforce, draft);
            if f.embedded_iterable_delimiter.is_some() {
                prop = json!({ type_key: "array", "items": prop, "uniqueItems": false });
            }
            if enforce.mandatory_attributes && f.is_mandatory {
                sub_required.push(Value::from(name.clone()));
            }
            sub_props.insert(name, prop);
            grouped.insert(f.attribute_name.clone());
        }
        let mut sub_object = json!({
            type_key: "object",
            "properties": sub_props,
            "additionalProperties": false,
        });
        if !sub_required.is_empty() {
            sub_object["required"] = Value::Array(sub_required);
        }
        let aggregate = if agg.unit_cardinality {
            sub_object
        } else {
            json!({ type_key: "array", "items": sub_object, "uniqueItems": false })
        };
        properties.insert(profile.name(&agg.id), aggregate);
    }

    for f in attrs.iter().filter(|f| !grouped.contains(&f.attribute_name)) {
        let name = profile.name(&f.attribute_name);
        let mut prop = attribute_schema(profile, f, enforce, draft);
        if f.iterable_delimiter.is_some() {
            prop = json!({ type_key: "array", "items": prop, "uniqueItems": true });
        }
        if (enforce.mandatory_keys && f.is_key) || (enforce.mandatory_attributes && f.is_mandatory) {
            required.push(name.clone());
        }
        properties.insert(name, prop);
    }

    if properties.is_empty() {
        return None;
    }

    let mut object = json!({
        type_key: "object",
        "properties": properties,
        "additionalProperties": false,
    });
    if !required.is_empty() {
        object["required"] = Value::from(required);
    }

    let unit = match slice {
        Some(view) => view.has_unit_cardinality(cat),
        None => features.unit_cardinality,
    };
    let schema = if unit {
        object.clone()
    } else {
        json!({
            type_key: "array",
            "items": object.clone(),
            "minItems": 1,
            "uniqueItems": true,
        })
    };

    Some(CategorySchema {
        name: profile.name(cat),
        schema,
        object,
        mandatory: features.is_mandatory,
    })
}

/// Property schema for a single attribute value
fn attribute_schema(profile: &Profile, f: &AttributeFeatures, enforce: &EnforceConfig, draft: JsonDraft) -> Value {
    let type_key = profile.target.type_key();
    let type_code = f.type_code.as_deref();
    if !type_code.is_some_and(|c| profile.types.has_type(c)) {
        warn!(item = %f.item(), type_code = ?type_code, "Type unknown");
    }
    let app_type = profile.types.type_name(type_code, profile.target.unknown_type());

    let mut prop = Map::new();
    match app_type.as_str() {
        "date" | "datetime" if profile.target == TargetProfile::Json => {
            let format = if app_type == "date" { "date" } else { "date-time" };
            prop.insert("type".to_string(), Value::from("string"));
            prop.insert("format".to_string(), Value::from(format));
        }
        "number" | "integer" | "int" | "double" => {
            prop.insert(type_key.to_string(), Value::from(app_type.as_str()));
            if enforce.bounds {
                insert_bounds(&mut prop, f, draft);
            }
        }
        other => {
            prop.insert(type_key.to_string(), Value::from(other));
        }
    }

    if enforce.enums && !f.enums.is_empty() {
        prop.insert(
            "enum".to_string(),
            Value::Array(f.enums.iter().map(ScalarValue::to_json).collect()),
        );
    }

    if profile.target != TargetProfile::Bson {
        if !f.examples.is_empty() {
            prop.insert(
                "examples".to_string(),
                Value::Array(f.examples.iter().map(ScalarValue::to_json).collect()),
            );
        }
        if let Some(description) = &f.description {
            prop.insert("description".to_string(), Value::from(description.as_str()));
        }
    }
    Value::Object(prop)
}

fn insert_bounds(prop: &mut Map<String, Value>, f: &AttributeFeatures, draft: JsonDraft) {
    let b = &f.bounds;
    if let Some(v) = &b.min_value {
        prop.insert("minimum".to_string(), v.to_json());
    }
    if let Some(v) = &b.max_value {
        prop.insert("maximum".to_string(), v.to_json());
    }
    if draft.boolean_exclusive_bounds() {
        if let Some(v) = &b.min_value_exclusive {
            prop.insert("minimum".to_string(), v.to_json());
            prop.insert("exclusiveMinimum".to_string(), Value::Bool(true));
        }
        if let Some(v) = &b.max_value_exclusive {
            prop.insert("maximum".to_string(), v.to_json());
            prop.insert("exclusiveMaximum".to_string(), Value::Bool(true));
        }
    } else {
        if let Some(v) = &b.min_value_exclusive {
            prop.insert("exclusiveMinimum".to_string(), v.to_json());
        }
        if let Some(v) = &b.max_value_exclusive {
            prop.insert("exclusiveMaximum".to_string(), v.to_json());
        }
    }
}
