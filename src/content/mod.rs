//! Content Classifier
//!
//! Builds immutable feature records for every category and attribute in the
//! dictionary:
//! - Key attributes, with optional substitution
//! - Content classes and filter tags from category-scoped rules
//! - Enumerations, examples and boundaries with numeric promotion
//! - Parent/child relationships and load-time method bindings
//! - Iterable delimiters from type tables or description phrases
//!
//! Missing dictionary information degrades to empty values. The only hard
//! failure is an ambiguous parent or method under `strict_relations`.

pub mod features;
pub mod values;

pub use features::{
    AnnotatedEnum, AnnotatedText, AttributeFeatures, AttributeSelector, CategoryFeatures,
    MethodBinding, SelectorTable, UniqueCandidate,
};
pub use values::{Bounds, ScalarValue};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;
use tracing::{debug, error, info, warn};

use crate::config::ContentConfig;
use crate::dictionary::{DictionaryModel, EnumDetail, ItemName};
use crate::error::{Result, SchemaError};
use crate::slice::unit_cardinality_categories;
use values::{coerce_values, dedent, is_numeric_primitive, parse_number, resolve_bounds, sort_values};

// =============================================================================
// Content Model
// =============================================================================

/// Feature records for a whole dictionary
#[derive(Debug, Clone, Default)]
pub struct ContentModel {
    categories: Vec<String>,
    category_features: BTreeMap<String, CategoryFeatures>,
    attribute_features: BTreeMap<String, BTreeMap<String, AttributeFeatures>>,
    unit_cardinality: BTreeSet<String>,
    category_contexts: BTreeMap<String, Vec<String>>,
    item_contexts: BTreeMap<String, Vec<ItemName>>,
}

impl ContentModel {
    /// All category names, sorted
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Attribute names of a category, sorted
    pub fn attributes(&self, category: &str) -> Vec<String> {
        self.attribute_features
            .get(category)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn category_features(&self, category: &str) -> Option<&CategoryFeatures> {
        self.category_features.get(category)
    }

    pub fn attribute_features(&self, category: &str) -> Option<&BTreeMap<String, AttributeFeatures>> {
        self.attribute_features.get(category)
    }

    pub fn attribute(&self, category: &str, attribute: &str) -> Option<&AttributeFeatures> {
        self.attribute_features
            .get(category)
            .and_then(|m| m.get(attribute))
    }

    /// Global unit-cardinality categories
    pub fn unit_cardinality(&self) -> &BTreeSet<String> {
        &self.unit_cardinality
    }

    /// Categories tagged with a dictionary context
    pub fn categories_in_context(&self, context: &str) -> Vec<String> {
        self.category_contexts.get(context).cloned().unwrap_or_default()
    }

    /// Items tagged with a dictionary context
    pub fn items_in_context(&self, context: &str) -> Vec<ItemName> {
        self.item_contexts.get(context).cloned().unwrap_or_default()
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Derives a [`ContentModel`] from a dictionary and content settings
pub struct ContentClassifier<'a> {
    dict: &'a dyn DictionaryModel,
    config: &'a ContentConfig,
    classes: SelectorTable,
    filters: SelectorTable,
    iterable_types: HashMap<String, String>,
    embedded_iterable_types: HashMap<String, String>,
    item_delimiters: HashMap<ItemName, String>,
    internal_enums: BTreeSet<ItemName>,
}

impl<'a> ContentClassifier<'a> {
    pub fn new(dict: &'a dyn DictionaryModel, config: &'a ContentConfig) -> Self {
        let mut classes = SelectorTable::new();
        for rule in &config.content_classes {
            classes.insert(&rule.category, rule.attributes.as_deref(), &rule.class);
        }

        let mut filters = SelectorTable::new();
        for rule in &config.item_transformers {
            filters.insert(&rule.category, rule.attributes.as_deref(), &rule.filter);
        }

        let iterable_types = config
            .iterable_type_codes
            .iter()
            .map(|t| (t.type_code.clone(), t.delimiter.clone()))
            .collect();
        let embedded_iterable_types = config
            .embedded_iterable_type_codes
            .iter()
            .map(|t| (t.type_code.clone(), t.delimiter.clone()))
            .collect();

        let item_delimiters = config
            .iterable_delimiters
            .iter()
            .filter_map(|d| match ItemName::parse(&d.item) {
                Some(item) => Some((item, d.delimiter.clone())),
                None => {
                    warn!(item = %d.item, "Ignoring delimiter for malformed item name");
                    None
                }
            })
            .collect();

        let internal_enums = config
            .internal_enum_items
            .iter()
            .filter_map(|s| ItemName::parse(s))
            .collect();

        Self {
            dict,
            config,
            classes,
            filters,
            iterable_types,
            embedded_iterable_types,
            item_delimiters,
            internal_enums,
        }
    }

    /// Classify every category and attribute
    pub fn classify(&self) -> Result<ContentModel> {
        let categories = self.dict.categories();
        let substitutions = self.key_substitutions(&categories);
        let unit_cardinality = self.global_unit_cardinality();

        let mut category_contexts: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut item_contexts: BTreeMap<String, Vec<ItemName>> = BTreeMap::new();
        let mut category_features = BTreeMap::new();
        let mut attribute_features = BTreeMap::new();

        for cat in &categories {
            for ctx in self.dict.category_contexts(cat) {
                category_contexts.entry(ctx).or_default().push(cat.clone());
            }

            let cat_feat = self.category(cat, &substitutions, &unit_cardinality);

            let mut attrs = BTreeMap::new();
            for at in self.dict.attributes(cat) {
                let item = ItemName::new(cat, &at);
                for ctx in self.dict.attribute_contexts(&item) {
                    item_contexts.entry(ctx).or_default().push(item.clone());
                }
                let is_key = cat_feat.key_attributes.contains(&at);
                attrs.insert(at, self.attribute(&item, is_key)?);
            }

            category_features.insert(cat.clone(), cat_feat);
            attribute_features.insert(cat.clone(), attrs);
        }

        info!(
            categories = categories.len(),
            unit_cardinality = unit_cardinality.len(),
            "Classified dictionary content"
        );

        Ok(ContentModel {
            categories,
            category_features,
            attribute_features,
            unit_cardinality,
            category_contexts,
            item_contexts,
        })
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Key substitution lists per category: context-tagged items first,
    /// replaced outright by explicit configuration
    fn key_substitutions(&self, categories: &[String]) -> BTreeMap<String, Vec<String>> {
        let mut table: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for cat in categories {
            for at in self.dict.attributes(cat) {
                let item = ItemName::new(cat, &at);
                if self
                    .dict
                    .attribute_contexts(&item)
                    .iter()
                    .any(|c| *c == self.config.key_substitution_context)
                {
                    table.entry(cat.clone()).or_default().push(at);
                }
            }
        }
        for sub in &self.config.key_substitutions {
            table.insert(sub.category.clone(), sub.attributes.clone());
        }
        if !table.is_empty() {
            debug!(categories = table.len(), "Key substitutions");
        }
        table
    }

    fn global_unit_cardinality(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        if let Some(parent) = &self.config.cardinality_parent {
            match ItemName::parse(parent) {
                Some(item) => set = unit_cardinality_categories(self.dict, &[item]),
                None => warn!(item = %parent, "Ignoring malformed cardinality parent"),
            }
        }
        set.extend(self.config.cardinality_category_extras.iter().cloned());
        set
    }

    fn category(
        &self,
        cat: &str,
        substitutions: &BTreeMap<String, Vec<String>>,
        unit_cardinality: &BTreeSet<String>,
    ) -> CategoryFeatures {
        let mut key_attributes: Vec<String> = match substitutions.get(cat) {
            Some(list) => list.clone(),
            None => self
                .dict
                .category_key_list(cat)
                .into_iter()
                .map(|k| k.attribute)
                .collect(),
        };
        key_attributes.sort();
        key_attributes.dedup();
        if key_attributes.is_empty() {
            warn!(category = %cat, "Category has no key attributes");
        }

        let mut sub_categories: Vec<String> = Vec::new();
        for at in self.dict.attributes(cat) {
            for sc in self.dict.item_sub_category_list(&ItemName::new(cat, &at)) {
                if !sub_categories.contains(&sc.id) {
                    sub_categories.push(sc.id);
                }
            }
        }

        CategoryFeatures {
            key_attributes,
            unit_cardinality: unit_cardinality.contains(cat),
            content_classes: self.classes.category_values(cat),
            is_mandatory: self
                .dict
                .category_mandatory_code(cat)
                .map(|c| c.trim().eq_ignore_ascii_case("yes"))
                .unwrap_or(false),
            sub_categories,
        }
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    fn attribute(&self, item: &ItemName, is_key: bool) -> Result<AttributeFeatures> {
        let type_code = self.dict.type_code(item);
        let type_code_alt = self.dict.type_code_alt(item);
        if type_code.is_none() {
            debug!(item = %item, "Missing type code");
        }
        let primitive = self.dict.type_primitive(item);
        let is_numeric = is_numeric_primitive(primitive.as_deref());
        let is_char_type = primitive
            .as_deref()
            .map(|p| matches!(p.trim().to_lowercase().as_str(), "char" | "uchar"))
            .unwrap_or(false);

        let description = self.dict.description(item).map(|d| dedent(&d)).filter(|d| !d.is_empty());
        let description_alt = self
            .dict
            .description_alt(item)
            .map(|d| dedent(&d))
            .filter(|d| !d.is_empty());
        let mut description_annotated = Vec::new();
        if let Some(text) = &description {
            description_annotated.push(AnnotatedText {
                text: text.clone(),
                context: "dictionary".to_string(),
            });
        }
        if let Some(text) = description_alt {
            description_annotated.push(AnnotatedText {
                text,
                context: "deposition".to_string(),
            });
        }

        let root_parent = self.dict.ultimate_parent(item).filter(|p| p != item);
        let parent = self.pick_unique("parent", item, self.dict.full_parent_list(item, true))?;

        let (iterable_delimiter, embedded_iterable_delimiter) = if is_key {
            (None, None)
        } else {
            (
                self.iterable_delimiter(item, type_code.as_deref(), type_code_alt.as_deref(), description.as_deref()),
                self.embedded_iterable_delimiter(item, type_code.as_deref(), type_code_alt.as_deref()),
            )
        };

        let methods = self.methods(item);
        let implementations: Vec<String> = methods
            .iter()
            .filter(|m| m.method_code.eq_ignore_ascii_case(&self.config.method_kind))
            .filter_map(|m| m.method_implement.clone())
            .collect();
        let method_implementation = self.pick_unique("method", item, implementations)?;

        let (enums, enums_annotated) = self.enumerations(item, is_numeric);

        let mut examples = Vec::new();
        for list in [self.dict.example_list_alt(item), self.dict.example_list(item)] {
            let tokens: Vec<String> = list.iter().map(|t| t.trim().to_string()).collect();
            examples.extend(coerce_values(&tokens, is_numeric));
        }

        Ok(AttributeFeatures {
            category_name: item.category.clone(),
            attribute_name: item.attribute.clone(),
            type_code,
            type_code_alt,
            is_mandatory: self
                .dict
                .mandatory_code(item)
                .map(|c| matches!(c.trim().to_lowercase().as_str(), "y" | "yes"))
                .unwrap_or(false),
            is_key,
            is_char_type,
            is_numeric,
            description,
            description_annotated,
            units: self.dict.units(item),
            child_items: self.dict.full_child_list(item),
            root_parent,
            parent,
            iterable_delimiter,
            embedded_iterable_delimiter,
            filter_types: self.filters.specific_first(&item.category, &item.attribute),
            content_classes: self.classes.wildcard_first(&item.category, &item.attribute),
            methods,
            method_implementation,
            enums,
            enums_annotated,
            examples,
            sub_categories: self.dict.item_sub_category_list(item),
            bounds: resolve_bounds(&self.dict.boundary_list(item)),
        })
    }

    fn iterable_delimiter(
        &self,
        item: &ItemName,
        type_code: Option<&str>,
        type_code_alt: Option<&str>,
        description: Option<&str>,
    ) -> Option<String> {
        let from_table = type_code
            .and_then(|c| self.iterable_types.get(c))
            .or_else(|| type_code_alt.and_then(|c| self.iterable_types.get(c)));
        if let Some(delimiter) = from_table {
            return Some(self.item_delimiters.get(item).unwrap_or(delimiter).clone());
        }

        let description = description?;
        if self
            .config
            .iterable_query_strings
            .iter()
            .any(|q| description.contains(q.as_str()))
        {
            debug!(item = %item, "Iterable by description");
            return Some(
                self.item_delimiters
                    .get(item)
                    .unwrap_or(&self.config.default_delimiter)
                    .clone(),
            );
        }
        None
    }

    fn embedded_iterable_delimiter(
        &self,
        item: &ItemName,
        type_code: Option<&str>,
        type_code_alt: Option<&str>,
    ) -> Option<String> {
        type_code
            .and_then(|c| self.embedded_iterable_types.get(c))
            .or_else(|| type_code_alt.and_then(|c| self.embedded_iterable_types.get(c)))
            .map(|d| self.item_delimiters.get(item).unwrap_or(d).clone())
    }

    fn methods(&self, item: &ItemName) -> Vec<MethodBinding> {
        self.dict
            .method_index(item)
            .into_iter()
            .filter_map(|id| match self.dict.method_by_id(&id) {
                Some(def) => Some(MethodBinding {
                    method_language: def.language,
                    method_implement: def.implementation,
                    method_type: def.kind,
                    method_code: def.code,
                }),
                None => {
                    error!(item = %item, method = %id, "Missing method definition");
                    None
                }
            })
            .collect()
    }

    fn enumerations(
        &self,
        item: &ItemName,
        is_numeric: bool,
    ) -> (Vec<ScalarValue>, Option<Vec<AnnotatedEnum>>) {
        let (list, details) = if self.internal_enums.contains(item) {
            (self.dict.enum_list_alt(item), self.dict.enum_details_alt(item))
        } else {
            (self.dict.enum_list(item), self.dict.enum_details(item))
        };

        let mut enums = coerce_values(&list, is_numeric);
        sort_values(&mut enums);

        let annotated = if details.iter().any(EnumDetail::has_annotation) {
            Some(annotate_enums(details, is_numeric))
        } else {
            None
        };
        (enums, annotated)
    }

    /// At most one candidate; ambiguity fails under `strict_relations`,
    /// otherwise the first candidate is kept
    fn pick_unique<T: Display>(
        &self,
        relation: &str,
        item: &ItemName,
        candidates: Vec<T>,
    ) -> Result<Option<T>> {
        match UniqueCandidate::from_candidates(candidates) {
            Ok(unique) => Ok(unique.into_inner()),
            Err(all) => {
                let names: Vec<String> = all.iter().map(|c| c.to_string()).collect();
                if self.config.strict_relations {
                    return Err(SchemaError::AmbiguousRelation {
                        relation: relation.to_string(),
                        item: item.to_string(),
                        candidates: names,
                    });
                }
                warn!(item = %item, relation = %relation, candidates = ?names, "Multiple candidates, keeping the first");
                Ok(all.into_iter().next())
            }
        }
    }
}

fn annotate_enums(details: Vec<EnumDetail>, is_numeric: bool) -> Vec<AnnotatedEnum> {
    let as_float = details.iter().any(|d| d.value.contains('.'));
    let mut annotated: Vec<AnnotatedEnum> = details
        .into_iter()
        .filter_map(|d| {
            let value = if is_numeric {
                parse_number(&d.value, as_float)?
            } else {
                ScalarValue::Text(d.value)
            };
            Some(AnnotatedEnum {
                value,
                detail: d.detail,
                name: d.brief,
                units: d.units,
            })
        })
        .collect();
    annotated.sort_by(|a, b| a.value.total_cmp(&b.value));
    annotated
}
