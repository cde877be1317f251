//! Dictionary Model
//!
//! Read-only query interface over a record-type dictionary. Everything the
//! compiler knows about categories, attributes and their relationships comes
//! through [`DictionaryModel`].
//!
//! The in-crate implementation is [`DictionarySnapshot`], a JSON document
//! with its parent/child item relationships held in a petgraph `DiGraph`.

pub mod graph;
pub mod loader;
pub mod snapshot;

pub use graph::ItemGraph;
pub use loader::load_snapshot;
pub use snapshot::{
    AttributeDef, CategoryDef, DictionaryDocument, DictionarySnapshot,
};

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Item Names
// =============================================================================

/// Fully qualified attribute name, written `_category.attribute`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemName {
    pub category: String,
    pub attribute: String,
}

impl ItemName {
    pub fn new(category: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            attribute: attribute.into(),
        }
    }

    /// Parse `_category.attribute` (the leading underscore is optional)
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s.strip_prefix('_').unwrap_or(s);
        let (category, attribute) = s.split_once('.')?;
        if category.is_empty() || attribute.is_empty() {
            return None;
        }
        Some(Self::new(category, attribute))
    }

    /// Parse an item name, treating a bare attribute as belonging to `category`
    pub fn parse_in(category: &str, s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| Self::new(category, s.trim()))
    }
}

impl fmt::Display for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_{}.{}", self.category, self.attribute)
    }
}

impl TryFrom<String> for ItemName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid item name: {}", value))
    }
}

impl From<ItemName> for String {
    fn from(value: ItemName) -> Self {
        value.to_string()
    }
}

// =============================================================================
// Dictionary Records
// =============================================================================

/// Enumeration value with its annotations
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnumDetail {
    pub value: String,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub brief: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
}

impl EnumDetail {
    pub fn has_annotation(&self) -> bool {
        self.detail.is_some() || self.brief.is_some() || self.units.is_some()
    }
}

/// Sub-category membership of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCategoryRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Method definition referenced by item bindings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDefinition {
    /// Filled from the snapshot's method table key when absent
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub implementation: Option<String>,
    /// Method code, e.g. `calculate_on_load`
    #[serde(default)]
    pub code: String,
    /// Binding type, e.g. `attribute`
    #[serde(default)]
    pub kind: Option<String>,
}

// =============================================================================
// Query Interface
// =============================================================================

/// Read-only dictionary queries
///
/// Lookups for things the dictionary does not define return `None` or an
/// empty list. Implementations must be deterministic.
pub trait DictionaryModel: Send + Sync {
    /// All category names, sorted
    fn categories(&self) -> Vec<String>;

    /// Attribute names of a category, sorted
    fn attributes(&self, category: &str) -> Vec<String>;

    fn type_code(&self, item: &ItemName) -> Option<String>;

    fn type_code_alt(&self, item: &ItemName) -> Option<String>;

    /// Primitive type class: `char`, `uchar` or `numb`
    fn type_primitive(&self, item: &ItemName) -> Option<String>;

    fn mandatory_code(&self, item: &ItemName) -> Option<String>;

    fn category_mandatory_code(&self, category: &str) -> Option<String>;

    fn description(&self, item: &ItemName) -> Option<String>;

    fn description_alt(&self, item: &ItemName) -> Option<String>;

    fn category_description(&self, category: &str) -> Option<String>;

    fn units(&self, item: &ItemName) -> Option<String>;

    /// Direct children of an item
    fn full_child_list(&self, item: &ItemName) -> Vec<ItemName>;

    /// Transitive children of an item
    fn full_descendant_list(&self, item: &ItemName) -> Vec<ItemName>;

    /// Root of the parent chain; the item itself when it has no parent
    fn ultimate_parent(&self, item: &ItemName) -> Option<ItemName>;

    /// Direct parents of an item
    fn full_parent_list(&self, item: &ItemName, strip_self: bool) -> Vec<ItemName>;

    fn category_key_list(&self, category: &str) -> Vec<ItemName>;

    fn item_sub_category_list(&self, item: &ItemName) -> Vec<SubCategoryRef>;

    fn enum_list(&self, item: &ItemName) -> Vec<String>;

    fn enum_list_alt(&self, item: &ItemName) -> Vec<String>;

    fn enum_details(&self, item: &ItemName) -> Vec<EnumDetail>;

    fn enum_details_alt(&self, item: &ItemName) -> Vec<EnumDetail>;

    fn example_list(&self, item: &ItemName) -> Vec<String>;

    fn example_list_alt(&self, item: &ItemName) -> Vec<String>;

    /// (min, max) boundary pairs; `.` and `?` mark open ends
    fn boundary_list(&self, item: &ItemName) -> Vec<(String, String)>;

    fn category_contexts(&self, category: &str) -> Vec<String>;

    fn attribute_contexts(&self, item: &ItemName) -> Vec<String>;

    /// Method ids bound to an item
    fn method_index(&self, item: &ItemName) -> Vec<String>;

    fn method_by_id(&self, id: &str) -> Option<MethodDefinition>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_name() {
        let item = ItemName::parse("_widget.widget_id").unwrap();
        assert_eq!(item.category, "widget");
        assert_eq!(item.attribute, "widget_id");
        assert_eq!(item.to_string(), "_widget.widget_id");

        assert_eq!(ItemName::parse("widget.color"), Some(ItemName::new("widget", "color")));
        assert_eq!(ItemName::parse("color"), None);
        assert_eq!(ItemName::parse("_widget."), None);
    }

    #[test]
    fn test_parse_in_category() {
        assert_eq!(ItemName::parse_in("widget", "color"), ItemName::new("widget", "color"));
        assert_eq!(ItemName::parse_in("widget", "_gadget.id"), ItemName::new("gadget", "id"));
    }

    #[test]
    fn test_item_name_serde() {
        let item: ItemName = serde_json::from_str("\"_a.b\"").unwrap();
        assert_eq!(item, ItemName::new("a", "b"));
        assert_eq!(serde_json::to_string(&item).unwrap(), "\"_a.b\"");
        assert!(serde_json::from_str::<ItemName>("\"nodot\"").is_err());
    }

    #[test]
    fn test_item_name_ordering() {
        let mut items = vec![
            ItemName::new("b", "a"),
            ItemName::new("a", "z"),
            ItemName::new("a", "b"),
        ];
        items.sort();
        assert_eq!(items[0], ItemName::new("a", "b"));
        assert_eq!(items[2], ItemName::new("b", "a"));
    }
}
