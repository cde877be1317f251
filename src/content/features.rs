//! Feature records
//!
//! Immutable per-category and per-attribute summaries produced by the
//! classifier and consumed by the assembler. Serialized field names follow
//! the upper-case convention used in the emitted descriptors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::values::{Bounds, ScalarValue};
use crate::dictionary::{ItemName, SubCategoryRef};

// =============================================================================
// Selectors
// =============================================================================

/// Attribute part of a category-scoped rule
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeSelector {
    Specific(String),
    AllAttributesInCategory,
}

impl AttributeSelector {
    pub fn matches(&self, attribute: &str) -> bool {
        match self {
            AttributeSelector::Specific(name) => name == attribute,
            AttributeSelector::AllAttributesInCategory => true,
        }
    }
}

/// Category-scoped rule values keyed by (category, selector)
#[derive(Debug, Clone, Default)]
pub struct SelectorTable {
    entries: BTreeMap<(String, AttributeSelector), Vec<String>>,
}

impl SelectorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add values for a category and optional attribute list; `None` selects
    /// every attribute
    pub fn insert(&mut self, category: &str, attributes: Option<&[String]>, value: &str) {
        let selectors: Vec<AttributeSelector> = match attributes {
            None => vec![AttributeSelector::AllAttributesInCategory],
            Some(list) => list
                .iter()
                .map(|a| AttributeSelector::Specific(a.clone()))
                .collect(),
        };
        for selector in selectors {
            let values = self
                .entries
                .entry((category.to_string(), selector))
                .or_default();
            if !values.iter().any(|v| v == value) {
                values.push(value.to_string());
            }
        }
    }

    pub fn get(&self, category: &str, selector: &AttributeSelector) -> Option<&Vec<String>> {
        self.entries.get(&(category.to_string(), selector.clone()))
    }

    fn wildcard(&self, category: &str) -> Option<&Vec<String>> {
        self.get(category, &AttributeSelector::AllAttributesInCategory)
    }

    fn specific(&self, category: &str, attribute: &str) -> Option<&Vec<String>> {
        self.get(category, &AttributeSelector::Specific(attribute.to_string()))
    }

    /// Category-level values
    pub fn category_values(&self, category: &str) -> Vec<String> {
        self.wildcard(category).cloned().unwrap_or_default()
    }

    /// Wildcard entry when present, otherwise the attribute's own entry
    pub fn wildcard_first(&self, category: &str, attribute: &str) -> Vec<String> {
        self.wildcard(category)
            .or_else(|| self.specific(category, attribute))
            .cloned()
            .unwrap_or_default()
    }

    /// Attribute's own entry when present, otherwise the wildcard entry
    pub fn specific_first(&self, category: &str, attribute: &str) -> Vec<String> {
        self.specific(category, attribute)
            .or_else(|| self.wildcard(category))
            .cloned()
            .unwrap_or_default()
    }
}

// =============================================================================
// Unique candidates
// =============================================================================

/// At most one value picked from a list that should hold at most one
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueCandidate<T>(Option<T>);

impl<T> UniqueCandidate<T> {
    /// Fails with all candidates when more than one is supplied
    pub fn from_candidates(mut candidates: Vec<T>) -> Result<Self, Vec<T>> {
        if candidates.len() > 1 {
            Err(candidates)
        } else {
            Ok(Self(candidates.pop()))
        }
    }

    pub fn into_inner(self) -> Option<T> {
        self.0
    }
}

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedText {
    pub text: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedEnum {
    pub value: ScalarValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// Method bound to an attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct MethodBinding {
    pub method_language: Option<String>,
    pub method_implement: Option<String>,
    pub method_type: Option<String>,
    pub method_code: String,
}

/// Category summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CategoryFeatures {
    /// Sorted key attribute names after substitution
    pub key_attributes: Vec<String>,
    pub unit_cardinality: bool,
    pub content_classes: Vec<String>,
    pub is_mandatory: bool,
    /// Sub-category ids used by any attribute, first use order
    pub sub_categories: Vec<String>,
}

/// Attribute summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AttributeFeatures {
    pub category_name: String,
    pub attribute_name: String,
    pub type_code: Option<String>,
    pub type_code_alt: Option<String>,
    pub is_mandatory: bool,
    pub is_key: bool,
    pub is_char_type: bool,
    pub is_numeric: bool,
    pub description: Option<String>,
    pub description_annotated: Vec<AnnotatedText>,
    pub units: Option<String>,
    pub child_items: Vec<ItemName>,
    pub root_parent: Option<ItemName>,
    pub parent: Option<ItemName>,
    pub iterable_delimiter: Option<String>,
    pub embedded_iterable_delimiter: Option<String>,
    pub filter_types: Vec<String>,
    pub content_classes: Vec<String>,
    pub methods: Vec<MethodBinding>,
    /// Implementation of the load-time method, if one is bound
    pub method_implementation: Option<String>,
    pub enums: Vec<ScalarValue>,
    pub enums_annotated: Option<Vec<AnnotatedEnum>>,
    pub examples: Vec<ScalarValue>,
    pub sub_categories: Vec<SubCategoryRef>,
    #[serde(flatten)]
    pub bounds: Bounds,
}

impl AttributeFeatures {
    pub fn item(&self) -> ItemName {
        ItemName::new(&self.category_name, &self.attribute_name)
    }

    pub fn in_sub_category(&self, id: &str) -> bool {
        self.sub_categories.iter().any(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_selector_matching() {
        assert!(AttributeSelector::AllAttributesInCategory.matches("anything"));
        assert!(AttributeSelector::Specific("id".into()).matches("id"));
        assert!(!AttributeSelector::Specific("id".into()).matches("name"));
    }

    #[test]
    fn test_selector_does_not_collide_with_literal_name() {
        let mut t = SelectorTable::new();
        t.insert("cat", Some(&list(&["__all__"])), "LITERAL");
        assert!(t.category_values("cat").is_empty());
        assert_eq!(t.specific_first("cat", "__all__"), vec!["LITERAL"]);
        assert!(t.specific_first("cat", "other").is_empty());
    }

    #[test]
    fn test_wildcard_first() {
        let mut t = SelectorTable::new();
        t.insert("cat", None, "WIDE");
        t.insert("cat", Some(&list(&["x"])), "NARROW");
        assert_eq!(t.wildcard_first("cat", "x"), vec!["WIDE"]);
        assert_eq!(t.specific_first("cat", "x"), vec!["NARROW"]);
        assert_eq!(t.specific_first("cat", "y"), vec!["WIDE"]);
    }

    #[test]
    fn test_insert_dedupes_values() {
        let mut t = SelectorTable::new();
        t.insert("cat", None, "A");
        t.insert("cat", None, "A");
        t.insert("cat", None, "B");
        assert_eq!(t.category_values("cat"), vec!["A", "B"]);
    }

    #[test]
    fn test_unique_candidate() {
        assert_eq!(UniqueCandidate::<i32>::from_candidates(vec![]).unwrap().into_inner(), None);
        assert_eq!(UniqueCandidate::from_candidates(vec![1]).unwrap().into_inner(), Some(1));
        assert_eq!(UniqueCandidate::from_candidates(vec![1, 2]).unwrap_err(), vec![1, 2]);
    }

    #[test]
    fn test_attribute_features_serialize_upper_case() {
        let f = AttributeFeatures {
            category_name: "widget".into(),
            attribute_name: "id".into(),
            is_key: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["CATEGORY_NAME"], "widget");
        assert_eq!(json["IS_KEY"], true);
        assert!(json.get("MIN_VALUE").is_none());
    }
}
