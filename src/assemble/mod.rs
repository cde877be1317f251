//! Schema Assembler
//!
//! Composes classified content, slices, type tables and name conversion
//! into target schemas:
//! - Relational descriptors (ANY, SQL) in [`relational`]
//! - JSON and BSON document schemas in [`document`]
//!
//! Both emitters share the category inclusion policy and attribute ordering
//! defined here.

pub mod document;
pub mod relational;

pub use relational::{
    AttributeInfo, AttributeSource, IndexDef, IndexType, MergeIndex, SchemaDefinition,
    SchemaObject, SliceParent,
};

use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::content::{AttributeFeatures, ContentClassifier, ContentModel};
use crate::coverage::CoverageProvider;
use crate::dictionary::{DictionaryModel, ItemName};
use crate::error::{Result, SchemaError};
use crate::profile::{Emitter, Profile, TargetProfile};
use crate::provider::BuildSession;
use crate::slice::{SliceResolver, SliceSet};

/// Builds schemas for any target from one classified dictionary
pub struct SchemaBuilder<'a> {
    coverage: &'a dyn CoverageProvider,
    config: &'a BuildConfig,
    content: ContentModel,
    slices: SliceSet,
}

impl<'a> SchemaBuilder<'a> {
    /// Classify the dictionary and resolve configured slices
    pub fn new(
        dict: &dyn DictionaryModel,
        coverage: &'a dyn CoverageProvider,
        config: &'a BuildConfig,
    ) -> Result<Self> {
        let content = ContentClassifier::new(dict, &config.content).classify()?;
        let slices = SliceResolver::new(dict).resolve_all(&config.slices);
        info!(
            database = %config.database.name,
            categories = content.categories().len(),
            slices = config.slices.len(),
            "Schema builder ready"
        );
        Ok(Self {
            coverage,
            config,
            content,
            slices,
        })
    }

    pub fn from_session(session: &'a BuildSession, config: &'a BuildConfig) -> Result<Self> {
        Self::new(session.dictionary(), session.coverage(), config)
    }

    pub fn content(&self) -> &ContentModel {
        &self.content
    }

    pub fn slices(&self) -> &SliceSet {
        &self.slices
    }

    /// Relational descriptor for an ANY or SQL target
    pub fn build_relational(&self, target: TargetProfile) -> Result<SchemaDefinition> {
        let profile = Profile::new(target, self.config);
        if profile.emitter() != Emitter::Relational {
            return Err(SchemaError::ProfileMismatch(format!(
                "{} is not a relational profile",
                target
            )));
        }
        relational::build(self, &profile)
    }

    /// Document schema for one collection on a JSON or BSON target
    pub fn build_document(&self, target: TargetProfile, collection: &str) -> Result<serde_json::Value> {
        let profile = Profile::new(target, self.config);
        if profile.emitter() != Emitter::Document {
            return Err(SchemaError::ProfileMismatch(format!(
                "{} is not a document profile",
                target
            )));
        }
        document::build(self, &profile, collection)
    }

    /// Build whatever the profile emits, as JSON
    pub fn build(&self, target: TargetProfile, collection: Option<&str>) -> Result<serde_json::Value> {
        match (target.emitter(), collection) {
            (Emitter::Relational, None) => Ok(serde_json::to_value(self.build_relational(target)?)?),
            (Emitter::Relational, Some(name)) => Err(SchemaError::ProfileMismatch(format!(
                "{} builds whole databases, not collection {}",
                target, name
            ))),
            (Emitter::Document, Some(name)) => self.build_document(target, name),
            (Emitter::Document, None) => Err(SchemaError::ProfileMismatch(format!(
                "{} requires a collection",
                target
            ))),
        }
    }

    // =========================================================================
    // Shared policy
    // =========================================================================

    fn always_included(&self, classes: &[String]) -> bool {
        classes
            .iter()
            .any(|c| self.config.assembly.include_content_classes.contains(c))
    }

    /// Schema-level inclusion: exclude wins, a non-empty include list admits
    /// its members regardless of coverage, otherwise coverage or an
    /// always-include content class is required
    pub(crate) fn include_category(&self, profile: &Profile, category: &str) -> bool {
        let id = profile.id(category);
        let assembly = &self.config.assembly;
        if contains_id(&assembly.exclude, &id) {
            debug!(category = %category, "Excluded category");
            return false;
        }
        if !assembly.include.is_empty() {
            return contains_id(&assembly.include, &id);
        }
        let classes = self
            .content
            .category_features(category)
            .map(|f| f.content_classes.as_slice())
            .unwrap_or(&[]);
        if self.coverage.exists(category, None) || self.always_included(classes) {
            true
        } else {
            debug!(category = %category, "Skipping category without coverage");
            false
        }
    }

    /// Key attributes then non-key attributes, each sorted, without excluded
    /// or unobserved attributes
    pub(crate) fn ordered_attributes(
        &self,
        category: &str,
        excluded: &BTreeSet<ItemName>,
    ) -> Vec<&AttributeFeatures> {
        let Some(attrs) = self.content.attribute_features(category) else {
            return Vec::new();
        };
        let keep = |f: &&AttributeFeatures| {
            !excluded.contains(&f.item())
                && (self.coverage.exists(category, Some(&f.attribute_name))
                    || self.always_included(&f.content_classes))
        };
        let keys = attrs.values().filter(|f| f.is_key).filter(keep);
        let others = attrs.values().filter(|f| !f.is_key).filter(keep);
        keys.chain(others).collect()
    }

    pub(crate) fn coverage(&self) -> &dyn CoverageProvider {
        self.coverage
    }

    pub(crate) fn config(&self) -> &BuildConfig {
        self.config
    }
}

/// Parse excluded item names, ignoring malformed entries
pub(crate) fn excluded_items<'s>(lists: impl IntoIterator<Item = &'s String>) -> BTreeSet<ItemName> {
    lists
        .into_iter()
        .filter_map(|s| ItemName::parse(s))
        .collect()
}

pub(crate) fn contains_id(list: &[String], id: &str) -> bool {
    list.iter().any(|s| s.eq_ignore_ascii_case(id))
}
