//! Slice resolution
//!
//! A slice is the part of the dictionary reachable from a set of root parent
//! items. For every category it records which parent item each of its
//! attributes descends from, and which categories hold at most one record
//! per parent instance.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::config::SliceConfig;
use crate::dictionary::{DictionaryModel, ItemName};

/// One parent/child attribute link inside a slice
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SliceChild {
    #[serde(rename = "PARENT_CATEGORY_NAME")]
    pub parent_category: String,
    #[serde(rename = "PARENT_ATTRIBUTE_NAME")]
    pub parent_attribute: String,
    #[serde(rename = "CHILD_ATTRIBUTE_NAME")]
    pub child_attribute: String,
}

/// Resolved slice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceView {
    pub name: String,
    pub parents: Vec<ItemName>,
    /// Child links grouped by owning category, sorted and de-duplicated
    pub categories: BTreeMap<String, Vec<SliceChild>>,
    pub unit_cardinality: BTreeSet<String>,
    pub category_extras: BTreeSet<String>,
}

impl SliceView {
    /// Categories reached from the parents plus forced extras
    pub fn member_categories(&self) -> BTreeSet<String> {
        self.categories
            .keys()
            .cloned()
            .chain(self.category_extras.iter().cloned())
            .collect()
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains_key(category) || self.category_extras.contains(category)
    }

    pub fn children(&self, category: &str) -> &[SliceChild] {
        self.categories
            .get(category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_unit_cardinality(&self, category: &str) -> bool {
        self.unit_cardinality.contains(category)
    }

    pub fn is_extra(&self, category: &str) -> bool {
        self.category_extras.contains(category)
    }
}

/// All resolved slices, keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceSet {
    views: BTreeMap<String, SliceView>,
}

impl SliceSet {
    pub fn get(&self, name: &str) -> Option<&SliceView> {
        self.views.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.views.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SliceView)> {
        self.views.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

/// Categories with unit cardinality relative to a set of parent items
///
/// A candidate is the parent's own category, or a category holding a direct
/// child of the parent inside its key. Candidates must qualify for every
/// parent and have exactly as many key items as there are parents.
pub fn unit_cardinality_categories(
    dict: &dyn DictionaryModel,
    parents: &[ItemName],
) -> BTreeSet<String> {
    let mut common: Option<BTreeSet<String>> = None;

    for parent in parents {
        let mut candidates = BTreeSet::new();
        candidates.insert(parent.category.clone());
        for child in dict.full_child_list(parent) {
            if dict.category_key_list(&child.category).contains(&child) {
                candidates.insert(child.category.clone());
            }
        }
        common = Some(match common {
            None => candidates,
            Some(prev) => prev.intersection(&candidates).cloned().collect(),
        });
    }

    let result: BTreeSet<String> = common
        .unwrap_or_default()
        .into_iter()
        .filter(|cat| dict.category_key_list(cat).len() == parents.len())
        .collect();
    debug!(parents = ?parents, categories = ?result, "Unit cardinality categories");
    result
}

/// Computes slice views from slice definitions
pub struct SliceResolver<'a> {
    dict: &'a dyn DictionaryModel,
}

impl<'a> SliceResolver<'a> {
    pub fn new(dict: &'a dyn DictionaryModel) -> Self {
        Self { dict }
    }

    pub fn resolve_all(&self, slices: &BTreeMap<String, SliceConfig>) -> SliceSet {
        let views = slices
            .iter()
            .map(|(name, cfg)| (name.clone(), self.resolve(name, cfg)))
            .collect();
        SliceSet { views }
    }

    pub fn resolve(&self, name: &str, cfg: &SliceConfig) -> SliceView {
        let parents: Vec<ItemName> = cfg
            .parents
            .iter()
            .filter_map(|p| {
                let item = ItemName::parse(p);
                if item.is_none() {
                    warn!(slice = %name, parent = %p, "Ignoring malformed slice parent");
                }
                item
            })
            .collect();

        let mut categories: BTreeMap<String, Vec<SliceChild>> = BTreeMap::new();
        for parent in &parents {
            categories
                .entry(parent.category.clone())
                .or_default()
                .push(SliceChild {
                    parent_category: parent.category.clone(),
                    parent_attribute: parent.attribute.clone(),
                    child_attribute: parent.attribute.clone(),
                });

            for child in self.dict.full_descendant_list(parent) {
                if child.category == parent.category {
                    continue;
                }
                categories.entry(child.category.clone()).or_default().push(SliceChild {
                    parent_category: parent.category.clone(),
                    parent_attribute: parent.attribute.clone(),
                    child_attribute: child.attribute,
                });
            }
        }
        for links in categories.values_mut() {
            links.sort();
            links.dedup();
        }

        let category_extras: BTreeSet<String> = cfg.category_extras.iter().cloned().collect();
        let mut unit_cardinality = unit_cardinality_categories(self.dict, &parents);
        unit_cardinality.extend(category_extras.iter().cloned());
        unit_cardinality.extend(cfg.cardinality_extras.iter().cloned());

        debug!(
            slice = %name,
            categories = categories.len(),
            unit_cardinality = unit_cardinality.len(),
            "Resolved slice"
        );

        SliceView {
            name: name.to_string(),
            parents,
            categories,
            unit_cardinality,
            category_extras,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::DictionarySnapshot;

    const DICT: &str = r#"{
        "categories": {
            "entity": {
                "keys": ["id"],
                "attributes": { "id": {}, "type": {}, "parent_id": { "parents": ["_entity.id"] } }
            },
            "entity_poly": {
                "keys": ["entity_id"],
                "attributes": { "entity_id": { "parents": ["_entity.id"] }, "seq": {} }
            },
            "entity_poly_seq": {
                "keys": ["entity_id", "num"],
                "attributes": { "entity_id": { "parents": ["_entity_poly.entity_id"] }, "num": {} }
            },
            "entity_note": {
                "keys": ["id"],
                "attributes": { "id": {}, "entity_id": { "parents": ["_entity.id"] } }
            }
        }
    }"#;

    fn dict() -> DictionarySnapshot {
        DictionarySnapshot::from_json(DICT).unwrap()
    }

    fn slice(parents: &[&str]) -> SliceConfig {
        SliceConfig {
            parents: parents.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_seed_and_descendants() {
        let d = dict();
        let view = SliceResolver::new(&d).resolve("entity", &slice(&["_entity.id"]));

        assert_eq!(
            view.children("entity"),
            &[SliceChild {
                parent_category: "entity".into(),
                parent_attribute: "id".into(),
                child_attribute: "id".into(),
            }]
        );
        assert_eq!(view.children("entity_poly").len(), 1);
        assert_eq!(view.children("entity_poly_seq")[0].child_attribute, "entity_id");
        assert_eq!(view.children("entity_note")[0].child_attribute, "entity_id");
    }

    #[test]
    fn test_parent_category_descendants_excluded() {
        let d = dict();
        let view = SliceResolver::new(&d).resolve("entity", &slice(&["_entity.id"]));
        // _entity.parent_id descends from _entity.id but lands in the parent category
        assert!(view.children("entity").iter().all(|c| c.child_attribute != "parent_id"));
    }

    #[test]
    fn test_closure_each_descendant_in_one_bucket() {
        let d = dict();
        let parent = ItemName::new("entity", "id");
        let view = SliceResolver::new(&d).resolve("entity", &slice(&["_entity.id"]));
        for desc in d.full_descendant_list(&parent) {
            if desc.category == parent.category {
                continue;
            }
            let hits: usize = view
                .categories
                .iter()
                .filter(|(cat, links)| {
                    **cat == desc.category && links.iter().any(|l| l.child_attribute == desc.attribute)
                })
                .count();
            assert_eq!(hits, 1, "{} should appear once", desc);
        }
    }

    #[test]
    fn test_unit_cardinality() {
        let d = dict();
        let uc = unit_cardinality_categories(&d, &[ItemName::new("entity", "id")]);
        // entity_poly keys on a direct child; entity_note's child is not a key
        assert!(uc.contains("entity"));
        assert!(uc.contains("entity_poly"));
        assert!(!uc.contains("entity_note"));
        assert!(!uc.contains("entity_poly_seq"));
    }

    #[test]
    fn test_unit_cardinality_requires_key_width() {
        let d = dict();
        let uc = unit_cardinality_categories(
            &d,
            &[ItemName::new("entity_poly", "entity_id"), ItemName::new("entity_poly_seq", "num")],
        );
        assert!(uc.is_empty());
    }

    #[test]
    fn test_extras_merge_into_membership_and_cardinality() {
        let d = dict();
        let cfg = SliceConfig {
            parents: vec!["_entity.id".into()],
            category_extras: vec!["citation".into()],
            cardinality_extras: vec!["entity_note".into()],
        };
        let view = SliceResolver::new(&d).resolve("entity", &cfg);
        assert!(view.contains("citation"));
        assert!(view.is_extra("citation"));
        assert!(view.has_unit_cardinality("citation"));
        assert!(view.has_unit_cardinality("entity_note"));
        assert!(view.member_categories().contains("citation"));
    }

    #[test]
    fn test_duplicate_parents_deduplicated() {
        let d = dict();
        let view = SliceResolver::new(&d).resolve("dup", &slice(&["_entity.id", "_entity.id"]));
        assert_eq!(view.children("entity").len(), 1);
        assert_eq!(view.children("entity_poly").len(), 1);
    }

    #[test]
    fn test_resolve_all_and_malformed_parent() {
        let d = dict();
        let mut slices = BTreeMap::new();
        slices.insert("bad".to_string(), slice(&["nodot"]));
        slices.insert("entity".to_string(), slice(&["_entity.id"]));
        let set = SliceResolver::new(&d).resolve_all(&slices);
        assert_eq!(set.names().count(), 2);
        assert!(set.get("bad").unwrap().categories.is_empty());
        assert!(!set.is_empty());
    }
}
