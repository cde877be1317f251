//! Relational descriptors
//!
//! One [`SchemaObject`] per included category: attribute types and widths,
//! the unique and search indices, the merge index back to dictionary names,
//! and slice attachments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::{excluded_items, SchemaBuilder};
use crate::content::{AttributeFeatures, CategoryFeatures};
use crate::error::Result;
use crate::profile::{Profile, TargetProfile};

const BLOCK_CONTENT_CLASS: &str = "BLOCK_ATTRIBUTE";
const SCHEMA_TYPE: &str = "transactional";

// =============================================================================
// Descriptor types
// =============================================================================

/// All schema objects for one database and profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    pub database_name: String,
    pub database_version: String,
    pub profile: TargetProfile,
    pub schemas: BTreeMap<String, SchemaObject>,
    /// Converted root parent items per slice
    pub slice_parent_items: BTreeMap<String, Vec<SliceParent>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceParent {
    #[serde(rename = "CATEGORY")]
    pub category: String,
    #[serde(rename = "ATTRIBUTE")]
    pub attribute: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaObject {
    pub schema_id: String,
    pub schema_name: String,
    pub schema_type: String,
    pub unit_cardinality: bool,
    pub content_classes: Vec<String>,
    pub mandatory: bool,
    pub sub_categories: Vec<String>,
    /// Attribute id to converted attribute name
    pub attributes: BTreeMap<String, String>,
    pub attribute_info: BTreeMap<String, AttributeInfo>,
    pub attribute_map: BTreeMap<String, AttributeSource>,
    pub indices: BTreeMap<String, IndexDef>,
    /// Source category to its natural key names
    pub map_merge_indices: BTreeMap<String, MergeIndex>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub slice_attributes: BTreeMap<String, Vec<SliceLink>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub slice_unit_cardinality: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub slice_category_extras: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_delete_attribute: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeInfo {
    pub order: u32,
    pub nullable: bool,
    pub precision: u32,
    pub primary_key: bool,
    #[serde(rename = "type")]
    pub type_name: String,
    pub width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterable_delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_iterable_delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_types: Vec<String>,
    pub is_char_type: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_categories: Vec<String>,
}

/// Where a loader gets an attribute's value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeSource {
    Method {
        #[serde(rename = "METHOD_NAME")]
        method_name: String,
    },
    Item {
        #[serde(rename = "CATEGORY")]
        category: String,
        #[serde(rename = "ATTRIBUTE")]
        attribute: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexType {
    Unique,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    #[serde(rename = "type")]
    pub index_type: IndexType,
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeIndex {
    #[serde(rename = "ATTRIBUTES")]
    pub attributes: Vec<String>,
    #[serde(rename = "TYPE")]
    pub join_type: String,
}

/// Slice parent/child link with converted names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceLink {
    #[serde(rename = "PARENT_CATEGORY")]
    pub parent_category: String,
    #[serde(rename = "PARENT_ATTRIBUTE")]
    pub parent_attribute: String,
    #[serde(rename = "CHILD_ATTRIBUTE")]
    pub child_attribute: String,
}

// =============================================================================
// Emission
// =============================================================================

pub(crate) fn build(builder: &SchemaBuilder<'_>, profile: &Profile) -> Result<SchemaDefinition> {
    let config = builder.config();
    let excluded = excluded_items(&config.assembly.excluded_attributes);

    let mut schemas = BTreeMap::new();
    for cat in builder.content().categories() {
        if !builder.include_category(profile, cat) {
            continue;
        }
        let Some(features) = builder.content().category_features(cat) else {
            continue;
        };
        let attrs = builder.ordered_attributes(cat, &excluded);
        if attrs.is_empty() {
            debug!(category = %cat, "No attributes to emit");
            continue;
        }
        let object = schema_object(builder, profile, cat, features, &attrs);
        schemas.insert(object.schema_id.clone(), object);
    }

    let slice_parent_items = builder
        .slices()
        .iter()
        .map(|(name, view)| {
            let parents = view
                .parents
                .iter()
                .map(|p| SliceParent {
                    category: profile.id(&p.category),
                    attribute: profile.id(&p.attribute),
                })
                .collect();
            (name.clone(), parents)
        })
        .collect();

    info!(profile = %profile.target, schemas = schemas.len(), "Built relational schema");
    Ok(SchemaDefinition {
        database_name: config.database.name.clone(),
        database_version: config.database.version.clone(),
        profile: profile.target,
        schemas,
        slice_parent_items,
    })
}

fn schema_object(
    builder: &SchemaBuilder<'_>,
    profile: &Profile,
    cat: &str,
    features: &CategoryFeatures,
    attrs: &[&AttributeFeatures],
) -> SchemaObject {
    let assembly = &builder.config().assembly;
    let unknown = profile.target.unknown_type();

    let mut attributes = BTreeMap::new();
    let mut attribute_info = BTreeMap::new();
    let mut attribute_map = BTreeMap::new();
    let mut key_ids = Vec::new();
    let mut order = 1;

    let block = assembly.block_attribute.as_ref().map(|block| {
        let id = profile.id(&block.name);
        attributes.insert(id.clone(), profile.name(&block.name));
        attribute_info.insert(
            id.clone(),
            AttributeInfo {
                order,
                nullable: false,
                precision: 0,
                primary_key: true,
                type_name: profile.types.type_name(Some(&block.type_code), unknown),
                width: block.max_width,
                iterable_delimiter: None,
                embedded_iterable_delimiter: None,
                filter_types: Vec::new(),
                is_char_type: true,
                enumeration: None,
                content_classes: vec![BLOCK_CONTENT_CLASS.to_string()],
                sub_categories: Vec::new(),
            },
        );
        let source = match &block.method {
            Some(method) => AttributeSource::Method {
                method_name: method.clone(),
            },
            None => AttributeSource::Item {
                category: cat.to_string(),
                attribute: block.name.clone(),
            },
        };
        attribute_map.insert(id.clone(), source);
        order += 1;
        (id, block.name.clone())
    });

    for f in attrs {
        let id = profile.id(&f.attribute_name);
        attributes.insert(id.clone(), profile.name(&f.attribute_name));
        if f.is_key {
            key_ids.push(id.clone());
        }
        attribute_info.insert(id.clone(), attribute_info_for(builder, profile, f, order));
        let source = match &f.method_implementation {
            Some(method) => AttributeSource::Method {
                method_name: method.clone(),
            },
            None => AttributeSource::Item {
                category: f.category_name.clone(),
                attribute: f.attribute_name.clone(),
            },
        };
        attribute_map.insert(id, source);
        order += 1;
    }

    let mut unique = Vec::new();
    if let Some((id, _)) = &block {
        unique.push(id.clone());
    }
    unique.extend(key_ids);

    let mut indices = BTreeMap::new();
    if let Some((id, _)) = &block {
        if unique.len() > 1 {
            indices.insert(
                "s1".to_string(),
                IndexDef {
                    index_type: IndexType::Search,
                    attributes: vec![id.clone()],
                },
            );
        }
    }
    indices.insert(
        "p1".to_string(),
        IndexDef {
            index_type: IndexType::Unique,
            attributes: unique,
        },
    );

    let mut merge_attributes: Vec<String> = block.iter().map(|(_, name)| name.clone()).collect();
    merge_attributes.extend(
        attrs
            .iter()
            .filter(|f| f.is_key)
            .map(|f| f.attribute_name.clone()),
    );
    let mut map_merge_indices = BTreeMap::new();
    map_merge_indices.insert(
        cat.to_string(),
        MergeIndex {
            attributes: merge_attributes,
            join_type: "EQUI-JOIN".to_string(),
        },
    );

    let mut sub_categories: Vec<String> = attrs
        .iter()
        .flat_map(|f| f.sub_categories.iter().map(|s| s.id.clone()))
        .collect();
    sub_categories.sort();
    sub_categories.dedup();

    let mut object = SchemaObject {
        schema_id: profile.id(cat),
        schema_name: profile.name(cat),
        schema_type: SCHEMA_TYPE.to_string(),
        unit_cardinality: features.unit_cardinality,
        content_classes: features.content_classes.clone(),
        mandatory: features.is_mandatory,
        sub_categories,
        attributes,
        attribute_info,
        attribute_map,
        indices,
        map_merge_indices,
        slice_attributes: BTreeMap::new(),
        slice_unit_cardinality: BTreeMap::new(),
        slice_category_extras: BTreeMap::new(),
        schema_delete_attribute: block.map(|(id, _)| id),
    };
    attach_slices(builder, profile, cat, &mut object);
    object
}

fn attribute_info_for(
    builder: &SchemaBuilder<'_>,
    profile: &Profile,
    f: &AttributeFeatures,
    order: u32,
) -> AttributeInfo {
    let assembly = &builder.config().assembly;
    let coverage = builder.coverage();
    let type_code = f.type_code.as_deref();

    if !type_code.is_some_and(|c| profile.types.has_type(c)) {
        warn!(item = %f.item(), type_code = ?type_code, "Type unknown");
    }
    let type_name = profile.types.type_name(type_code, profile.target.unknown_type());

    // the buffer only widens observed data
    let observed = coverage.max_width(&f.category_name, &f.attribute_name);
    let (basis, buffer) = if observed == 0 {
        (profile.types.default_width(type_code, 0), 0.0)
    } else {
        (observed, assembly.buffer_percent)
    };
    let (type_name, width) = profile
        .types
        .revise_width(f.is_key, &type_name, basis, buffer, assembly.min_width);

    let observed_precision = coverage.max_precision(&f.category_name, &f.attribute_name);
    let precision = if observed_precision > 0 {
        observed_precision
    } else {
        profile.types.default_precision(type_code, 0)
    };

    let enumeration = if profile.target == TargetProfile::Sql || f.enums.is_empty() {
        None
    } else {
        Some(f.enums.iter().map(|v| v.to_json()).collect())
    };

    AttributeInfo {
        order,
        nullable: !(f.is_key || f.is_mandatory),
        precision,
        primary_key: f.is_key,
        type_name,
        width,
        iterable_delimiter: f.iterable_delimiter.clone(),
        embedded_iterable_delimiter: f.embedded_iterable_delimiter.clone(),
        filter_types: f.filter_types.clone(),
        is_char_type: f.is_char_type,
        enumeration,
        content_classes: f.content_classes.clone(),
        sub_categories: f.sub_categories.iter().map(|s| s.id.clone()).collect(),
    }
}

fn attach_slices(builder: &SchemaBuilder<'_>, profile: &Profile, cat: &str, object: &mut SchemaObject) {
    for (name, view) in builder.slices().iter() {
        if !view.contains(cat) {
            continue;
        }
        let links = view
            .children(cat)
            .iter()
            .map(|c| SliceLink {
                parent_category: profile.id(&c.parent_category),
                parent_attribute: profile.id(&c.parent_attribute),
                child_attribute: profile.id(&c.child_attribute),
            })
            .collect();
        object.slice_attributes.insert(name.clone(), links);
        object
            .slice_unit_cardinality
            .insert(name.clone(), view.has_unit_cardinality(cat));
        object
            .slice_category_extras
            .insert(name.clone(), view.is_extra(cat));
    }
}
