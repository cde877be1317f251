//! JSON dictionary snapshot
//!
//! ```json
//! {
//!   "categories": {
//!     "widget": {
//!       "keys": ["_widget.id"],
//!       "mandatory": "yes",
//!       "attributes": {
//!         "id":    { "type_code": "code", "primitive": "char", "mandatory": "yes" },
//!         "color": { "type_code": "code", "enums": ["red", "green", "blue"] },
//!         "shop_id": { "type_code": "code", "parents": ["_shop.id"] }
//!       }
//!     }
//!   },
//!   "methods": {
//!     "stamp": { "language": "python", "implementation": "stamp_now", "code": "calculate_on_load" }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::graph::ItemGraph;
use super::{DictionaryModel, EnumDetail, ItemName, MethodDefinition, SubCategoryRef};

/// Serialized dictionary content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryDocument {
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryDef>,

    #[serde(default)]
    pub methods: BTreeMap<String, MethodDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Key items; bare attribute names refer to this category
    #[serde(default)]
    pub keys: Vec<String>,

    #[serde(default)]
    pub mandatory: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub contexts: Vec<String>,

    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeDef {
    #[serde(default)]
    pub type_code: Option<String>,
    #[serde(default)]
    pub type_code_alt: Option<String>,
    #[serde(default)]
    pub primitive: Option<String>,
    #[serde(default)]
    pub mandatory: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_alt: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub enums: Vec<String>,
    #[serde(default)]
    pub enums_alt: Vec<String>,
    #[serde(default)]
    pub enum_details: Vec<EnumDetail>,
    #[serde(default)]
    pub enum_details_alt: Vec<EnumDetail>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub examples_alt: Vec<String>,
    #[serde(default)]
    pub boundaries: Vec<(String, String)>,
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub sub_categories: Vec<SubCategoryRef>,
    #[serde(default)]
    pub methods: Vec<String>,
}

impl DictionaryDocument {
    /// Merge another document; later definitions replace earlier ones
    /// attribute by attribute
    pub fn merge(&mut self, other: DictionaryDocument) {
        for (name, cat) in other.categories {
            match self.categories.get_mut(&name) {
                Some(existing) => {
                    if !cat.keys.is_empty() {
                        existing.keys = cat.keys;
                    }
                    if cat.mandatory.is_some() {
                        existing.mandatory = cat.mandatory;
                    }
                    if cat.description.is_some() {
                        existing.description = cat.description;
                    }
                    for ctx in cat.contexts {
                        if !existing.contexts.contains(&ctx) {
                            existing.contexts.push(ctx);
                        }
                    }
                    existing.attributes.extend(cat.attributes);
                }
                None => {
                    self.categories.insert(name, cat);
                }
            }
        }
        self.methods.extend(other.methods);
    }
}

/// Immutable, indexed dictionary
#[derive(Debug, Clone)]
pub struct DictionarySnapshot {
    document: DictionaryDocument,
    graph: ItemGraph,
    bundle_hash: String,
}

impl DictionarySnapshot {
    pub fn new(document: DictionaryDocument) -> Self {
        Self::with_hash(document, String::new())
    }

    pub fn with_hash(mut document: DictionaryDocument, bundle_hash: String) -> Self {
        for (id, method) in document.methods.iter_mut() {
            if method.id.is_empty() {
                method.id = id.clone();
            }
        }

        let mut graph = ItemGraph::new();
        for (cat_name, cat) in &document.categories {
            for (at_name, at) in &cat.attributes {
                let child = ItemName::new(cat_name, at_name);
                for parent in &at.parents {
                    match ItemName::parse(parent) {
                        Some(p) => graph.add_link(&p, &child),
                        None => warn!(item = %child, parent = %parent, "Ignoring malformed parent item"),
                    }
                }
            }
        }
        debug!(
            categories = document.categories.len(),
            items = graph.item_count(),
            links = graph.link_count(),
            "Indexed dictionary snapshot"
        );

        Self {
            document,
            graph,
            bundle_hash,
        }
    }

    /// Parse a snapshot from JSON text
    pub fn from_json(content: &str) -> crate::Result<Self> {
        let document: DictionaryDocument = serde_json::from_str(content)?;
        Ok(Self::new(document))
    }

    /// sha256 over the source files, empty for in-memory documents
    pub fn bundle_hash(&self) -> &str {
        &self.bundle_hash
    }

    pub fn document(&self) -> &DictionaryDocument {
        &self.document
    }

    fn attribute(&self, item: &ItemName) -> Option<&AttributeDef> {
        self.document
            .categories
            .get(&item.category)
            .and_then(|c| c.attributes.get(&item.attribute))
    }
}

impl DictionaryModel for DictionarySnapshot {
    fn categories(&self) -> Vec<String> {
        self.document.categories.keys().cloned().collect()
    }

    fn attributes(&self, category: &str) -> Vec<String> {
        self.document
            .categories
            .get(category)
            .map(|c| c.attributes.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn type_code(&self, item: &ItemName) -> Option<String> {
        self.attribute(item).and_then(|a| a.type_code.clone())
    }

    fn type_code_alt(&self, item: &ItemName) -> Option<String> {
        self.attribute(item).and_then(|a| a.type_code_alt.clone())
    }

    fn type_primitive(&self, item: &ItemName) -> Option<String> {
        self.attribute(item).and_then(|a| a.primitive.clone())
    }

    fn mandatory_code(&self, item: &ItemName) -> Option<String> {
        self.attribute(item).and_then(|a| a.mandatory.clone())
    }

    fn category_mandatory_code(&self, category: &str) -> Option<String> {
        self.document
            .categories
            .get(category)
            .and_then(|c| c.mandatory.clone())
    }

    fn description(&self, item: &ItemName) -> Option<String> {
        self.attribute(item).and_then(|a| a.description.clone())
    }

    fn description_alt(&self, item: &ItemName) -> Option<String> {
        self.attribute(item).and_then(|a| a.description_alt.clone())
    }

    fn category_description(&self, category: &str) -> Option<String> {
        self.document
            .categories
            .get(category)
            .and_then(|c| c.description.clone())
    }

    fn units(&self, item: &ItemName) -> Option<String> {
        self.attribute(item).and_then(|a| a.units.clone())
    }

    fn full_child_list(&self, item: &ItemName) -> Vec<ItemName> {
        self.graph.children(item)
    }

    fn full_descendant_list(&self, item: &ItemName) -> Vec<ItemName> {
        self.graph.descendants(item)
    }

    fn ultimate_parent(&self, item: &ItemName) -> Option<ItemName> {
        self.attribute(item)?;
        Some(self.graph.ultimate_parent(item))
    }

    fn full_parent_list(&self, item: &ItemName, strip_self: bool) -> Vec<ItemName> {
        self.graph
            .parents(item)
            .into_iter()
            .filter(|p| !strip_self || p != item)
            .collect()
    }

    fn category_key_list(&self, category: &str) -> Vec<ItemName> {
        self.document
            .categories
            .get(category)
            .map(|c| {
                c.keys
                    .iter()
                    .map(|k| ItemName::parse_in(category, k))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn item_sub_category_list(&self, item: &ItemName) -> Vec<SubCategoryRef> {
        self.attribute(item)
            .map(|a| a.sub_categories.clone())
            .unwrap_or_default()
    }

    fn enum_list(&self, item: &ItemName) -> Vec<String> {
        self.attribute(item).map(|a| a.enums.clone()).unwrap_or_default()
    }

    fn enum_list_alt(&self, item: &ItemName) -> Vec<String> {
        self.attribute(item)
            .map(|a| a.enums_alt.clone())
            .unwrap_or_default()
    }

    fn enum_details(&self, item: &ItemName) -> Vec<EnumDetail> {
        self.attribute(item)
            .map(|a| a.enum_details.clone())
            .unwrap_or_default()
    }

    fn enum_details_alt(&self, item: &ItemName) -> Vec<EnumDetail> {
        self.attribute(item)
            .map(|a| a.enum_details_alt.clone())
            .unwrap_or_default()
    }

    fn example_list(&self, item: &ItemName) -> Vec<String> {
        self.attribute(item)
            .map(|a| a.examples.clone())
            .unwrap_or_default()
    }

    fn example_list_alt(&self, item: &ItemName) -> Vec<String> {
        self.attribute(item)
            .map(|a| a.examples_alt.clone())
            .unwrap_or_default()
    }

    fn boundary_list(&self, item: &ItemName) -> Vec<(String, String)> {
        self.attribute(item)
            .map(|a| a.boundaries.clone())
            .unwrap_or_default()
    }

    fn category_contexts(&self, category: &str) -> Vec<String> {
        self.document
            .categories
            .get(category)
            .map(|c| c.contexts.clone())
            .unwrap_or_default()
    }

    fn attribute_contexts(&self, item: &ItemName) -> Vec<String> {
        self.attribute(item)
            .map(|a| a.contexts.clone())
            .unwrap_or_default()
    }

    fn method_index(&self, item: &ItemName) -> Vec<String> {
        self.attribute(item)
            .map(|a| a.methods.clone())
            .unwrap_or_default()
    }

    fn method_by_id(&self, id: &str) -> Option<MethodDefinition> {
        self.document.methods.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "categories": {
            "shop": {
                "keys": ["id"],
                "mandatory": "yes",
                "contexts": ["RETAIL"],
                "attributes": {
                    "id": { "type_code": "code", "primitive": "char", "mandatory": "yes" }
                }
            },
            "widget": {
                "keys": ["_widget.shop_id", "_widget.id"],
                "attributes": {
                    "id": { "type_code": "code", "primitive": "char" },
                    "shop_id": { "type_code": "code", "parents": ["_shop.id"] },
                    "size": { "type_code": "int", "primitive": "numb", "boundaries": [["0", "."]] }
                }
            }
        },
        "methods": {
            "stamp": { "code": "calculate_on_load", "implementation": "stamp_now" }
        }
    }"#;

    #[test]
    fn test_basic_queries() {
        let dict = DictionarySnapshot::from_json(SAMPLE).unwrap();
        assert_eq!(dict.categories(), vec!["shop", "widget"]);
        assert_eq!(dict.attributes("widget"), vec!["id", "shop_id", "size"]);
        assert_eq!(
            dict.type_code(&ItemName::new("widget", "size")),
            Some("int".to_string())
        );
        assert_eq!(dict.category_mandatory_code("shop"), Some("yes".to_string()));
        assert_eq!(dict.category_contexts("shop"), vec!["RETAIL"]);
        assert!(dict.attributes("missing").is_empty());
    }

    #[test]
    fn test_key_list_accepts_bare_names() {
        let dict = DictionarySnapshot::from_json(SAMPLE).unwrap();
        assert_eq!(dict.category_key_list("shop"), vec![ItemName::new("shop", "id")]);
        assert_eq!(dict.category_key_list("widget").len(), 2);
    }

    #[test]
    fn test_relationships() {
        let dict = DictionarySnapshot::from_json(SAMPLE).unwrap();
        let shop_id = ItemName::new("shop", "id");
        let widget_shop = ItemName::new("widget", "shop_id");
        assert_eq!(dict.full_child_list(&shop_id), vec![widget_shop.clone()]);
        assert_eq!(dict.full_parent_list(&widget_shop, true), vec![shop_id.clone()]);
        assert_eq!(dict.ultimate_parent(&widget_shop), Some(shop_id.clone()));
        assert_eq!(dict.ultimate_parent(&shop_id), Some(shop_id));
        assert_eq!(dict.ultimate_parent(&ItemName::new("nope", "x")), None);
    }

    #[test]
    fn test_method_ids_filled_from_keys() {
        let dict = DictionarySnapshot::from_json(SAMPLE).unwrap();
        let m = dict.method_by_id("stamp").unwrap();
        assert_eq!(m.id, "stamp");
        assert_eq!(m.code, "calculate_on_load");
    }

    #[test]
    fn test_merge_documents() {
        let mut base: DictionaryDocument = serde_json::from_str(SAMPLE).unwrap();
        let extra: DictionaryDocument = serde_json::from_str(
            r#"{ "categories": { "widget": { "attributes": { "weight": { "type_code": "float" } } } } }"#,
        )
        .unwrap();
        base.merge(extra);
        let widget = &base.categories["widget"];
        assert_eq!(widget.attributes.len(), 4);
        assert_eq!(widget.keys.len(), 2);
    }
}
