//! Configuration management for schema builds
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (dictschema.toml)
//! - Environment variables (DICTSCHEMA__*)
//!
//! Item names are written in `_category.attribute` form. Keyed tables are
//! avoided for item-level settings because the loader treats `.` as a path
//! separator, so those settings are lists of small records instead.
//!
//! ## Example config file (dictschema.toml):
//! ```toml
//! [database]
//! name = "widgets"
//! version = "1.0.0"
//! dictionary = ["./dictionary"]
//! coverage = ["./coverage/widgets.json"]
//!
//! [content]
//! cardinality_parent = "_shop.id"
//! iterable_type_codes = [{ type_code = "id_list", delimiter = "," }]
//!
//! [slices.gadget]
//! parents = ["_gadget.id"]
//!
//! [assembly]
//! include_content_classes = ["GENERATED_CONTENT"]
//! json_draft = "4"
//!
//! [collections.widget_core]
//! include = ["WIDGET", "GADGET"]
//! ```

use config_crate::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Result, SchemaError};

/// Main configuration for a schema build
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildConfig {
    /// Database identity and provider locators
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Feature extraction settings
    #[serde(default)]
    pub content: ContentConfig,

    /// Named slices keyed by slice name
    #[serde(default)]
    pub slices: BTreeMap<String, SliceConfig>,

    /// Schema assembly settings
    #[serde(default)]
    pub assembly: AssemblyConfig,

    /// Document collections keyed by collection name
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionConfig>,

    /// Per-profile type table overrides
    #[serde(default)]
    pub type_overrides: Vec<TypeOverride>,
}

/// Database identity and provider locators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database (content type) name
    #[serde(default = "default_database_name")]
    pub name: String,

    /// Default schema version for collections that do not set one
    #[serde(default = "default_version")]
    pub version: String,

    /// Dictionary snapshot files or directories
    #[serde(default)]
    pub dictionary: Vec<String>,

    /// Coverage table files; empty means bypass mode
    #[serde(default)]
    pub coverage: Vec<String>,
}

/// Feature extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Attribute context naming key substitution items
    #[serde(default = "default_key_substitution_context")]
    pub key_substitution_context: String,

    /// Explicit key substitutions, replacing context-derived ones per category
    #[serde(default)]
    pub key_substitutions: Vec<KeySubstitution>,

    /// Items whose curated (alternate) enumeration replaces the dictionary one
    #[serde(default)]
    pub internal_enum_items: Vec<String>,

    /// Item whose unit-cardinality children define the global cardinality set
    #[serde(default)]
    pub cardinality_parent: Option<String>,

    /// Categories always treated as unit cardinality
    #[serde(default)]
    pub cardinality_category_extras: Vec<String>,

    /// Content class assignments
    #[serde(default)]
    pub content_classes: Vec<ContentClassRule>,

    /// Filter/transform tag assignments
    #[serde(default)]
    pub item_transformers: Vec<TransformRule>,

    /// Type codes whose values are delimited lists
    #[serde(default)]
    pub iterable_type_codes: Vec<TypeDelimiter>,

    /// Type codes whose values are delimited lists inside sub-category aggregates
    #[serde(default)]
    pub embedded_iterable_type_codes: Vec<TypeDelimiter>,

    /// Description phrases that mark an attribute as iterable
    #[serde(default)]
    pub iterable_query_strings: Vec<String>,

    /// Per-item delimiter overrides
    #[serde(default)]
    pub iterable_delimiters: Vec<ItemDelimiter>,

    /// Delimiter used by the description heuristic when no override exists
    #[serde(default = "default_delimiter")]
    pub default_delimiter: String,

    /// Method code selecting load-time computed attributes
    #[serde(default = "default_method_kind")]
    pub method_kind: String,

    /// Fail the build on ambiguous parent or method candidates
    #[serde(default = "default_strict_relations")]
    pub strict_relations: bool,
}

/// Key substitution for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySubstitution {
    pub category: String,
    pub attributes: Vec<String>,
}

/// Assigns content classes to a category or some of its attributes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentClassRule {
    pub class: String,
    pub category: String,
    /// None applies to the category and all of its attributes
    #[serde(default)]
    pub attributes: Option<Vec<String>>,
}

/// Assigns a filter tag to attributes of a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRule {
    pub filter: String,
    pub category: String,
    /// None applies to all attributes in the category
    #[serde(default)]
    pub attributes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDelimiter {
    pub type_code: String,
    pub delimiter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDelimiter {
    pub item: String,
    pub delimiter: String,
}

/// Slice definition
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SliceConfig {
    /// Root parent items
    #[serde(default)]
    pub parents: Vec<String>,

    /// Categories forced into the slice and its cardinality set
    #[serde(default)]
    pub category_extras: Vec<String>,

    /// Categories forced into the cardinality set only
    #[serde(default)]
    pub cardinality_extras: Vec<String>,
}

/// Schema assembly settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Schema ids to include; empty includes everything
    #[serde(default)]
    pub include: Vec<String>,

    /// Schema ids to exclude
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Items dropped from every schema
    #[serde(default)]
    pub excluded_attributes: Vec<String>,

    /// Synthetic attribute added to every schema object
    #[serde(default)]
    pub block_attribute: Option<BlockAttributeConfig>,

    /// Content classes kept even without coverage
    #[serde(default = "default_include_content_classes")]
    pub include_content_classes: Vec<String>,

    /// Width headroom applied to observed widths
    #[serde(default = "default_buffer_percent")]
    pub buffer_percent: f64,

    /// Lower bound for revised widths
    #[serde(default = "default_min_width")]
    pub min_width: u32,

    /// Constraints carried into document schemas
    #[serde(default)]
    pub enforce: EnforceConfig,

    /// JSON Schema draft for document output
    #[serde(default)]
    pub json_draft: JsonDraft,

    /// Extra identifiers prefixed by the default name converter
    #[serde(default)]
    pub reserved_words: Vec<String>,
}

/// Synthetic block attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockAttributeConfig {
    pub name: String,

    #[serde(default = "default_block_type_code")]
    pub type_code: String,

    #[serde(default = "default_block_width")]
    pub max_width: u32,

    /// Load-time method populating the attribute
    #[serde(default)]
    pub method: Option<String>,
}

/// Constraints carried into document schemas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforceConfig {
    #[serde(default = "default_true")]
    pub mandatory_keys: bool,

    #[serde(default = "default_true")]
    pub mandatory_attributes: bool,

    #[serde(default = "default_true")]
    pub bounds: bool,

    #[serde(default = "default_true")]
    pub enums: bool,
}

/// JSON Schema draft selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JsonDraft {
    #[default]
    #[serde(rename = "4")]
    Draft4,
    #[serde(rename = "6")]
    Draft6,
    #[serde(rename = "7")]
    Draft7,
}

impl JsonDraft {
    /// Draft 4 expresses exclusive bounds as boolean flags
    pub fn boolean_exclusive_bounds(&self) -> bool {
        matches!(self, JsonDraft::Draft4)
    }

    pub fn schema_url(&self) -> &'static str {
        match self {
            JsonDraft::Draft4 => "http://json-schema.org/draft-04/schema#",
            JsonDraft::Draft6 => "http://json-schema.org/draft-06/schema#",
            JsonDraft::Draft7 => "http://json-schema.org/draft-07/schema#",
        }
    }
}

/// Document collection definition
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CollectionConfig {
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub excluded_attributes: Vec<String>,

    /// Restrict the collection to one slice's categories
    #[serde(default)]
    pub slice_filter: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    /// Keep the category wrapper even when only one category remains
    #[serde(default)]
    pub retain_singleton: bool,

    #[serde(default)]
    pub sub_category_aggregates: Vec<SubCategoryAggregate>,
}

/// Groups a sub-category's attributes into a nested object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubCategoryAggregate {
    pub id: String,

    #[serde(default)]
    pub unit_cardinality: bool,
}

/// Replaces one type table entry for a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeOverride {
    pub profile: String,
    pub type_code: String,
    pub type_name: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub precision: u32,
}

// Default value functions
fn default_database_name() -> String {
    "schema".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_key_substitution_context() -> String {
    "KEY_SUBSTITUTION".to_string()
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_method_kind() -> String {
    "calculate_on_load".to_string()
}

fn default_strict_relations() -> bool {
    cfg!(debug_assertions)
}

fn default_include_content_classes() -> Vec<String> {
    vec![
        "GENERATED_CONTENT".to_string(),
        "EVOLVING_CONTENT".to_string(),
        "CONSOLIDATED_BIRD_CONTENT".to_string(),
        "INTEGRATED_CONTENT".to_string(),
    ]
}

fn default_buffer_percent() -> f64 {
    20.0
}

fn default_min_width() -> u32 {
    10
}

fn default_block_type_code() -> String {
    "code".to_string()
}

fn default_block_width() -> u32 {
    12
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: default_database_name(),
            version: default_version(),
            dictionary: Vec::new(),
            coverage: Vec::new(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            key_substitution_context: default_key_substitution_context(),
            key_substitutions: Vec::new(),
            internal_enum_items: Vec::new(),
            cardinality_parent: None,
            cardinality_category_extras: Vec::new(),
            content_classes: Vec::new(),
            item_transformers: Vec::new(),
            iterable_type_codes: Vec::new(),
            embedded_iterable_type_codes: Vec::new(),
            iterable_query_strings: Vec::new(),
            iterable_delimiters: Vec::new(),
            default_delimiter: default_delimiter(),
            method_kind: default_method_kind(),
            strict_relations: default_strict_relations(),
        }
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            excluded_attributes: Vec::new(),
            block_attribute: None,
            include_content_classes: default_include_content_classes(),
            buffer_percent: default_buffer_percent(),
            min_width: default_min_width(),
            enforce: EnforceConfig::default(),
            json_draft: JsonDraft::default(),
            reserved_words: Vec::new(),
        }
    }
}

impl Default for EnforceConfig {
    fn default() -> Self {
        Self {
            mandatory_keys: true,
            mandatory_attributes: true,
            bounds: true,
            enums: true,
        }
    }
}

impl BuildConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = [
            "dictschema.toml",
            ".dictschema.toml",
            "config/dictschema.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "dictschema", "dictschema") {
            let xdg_config = config_dir.config_dir().join("dictschema.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (DICTSCHEMA__*)
        builder = builder.add_source(
            Environment::with_prefix("DICTSCHEMA")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Parse configuration from TOML text, without consulting other sources
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Look up a collection by name
    pub fn collection(&self, name: &str) -> Result<&CollectionConfig> {
        self.collections
            .get(name)
            .ok_or_else(|| SchemaError::CollectionNotFound(name.to_string()))
    }

    /// Schema version for a collection, falling back to the database version
    pub fn collection_version(&self, name: &str) -> String {
        self.collections
            .get(name)
            .and_then(|c| c.version.clone())
            .unwrap_or_else(|| self.database.version.clone())
    }

    /// Dictionary locators resolved against the current directory
    pub fn dictionary_paths(&self) -> Vec<PathBuf> {
        self.database.dictionary.iter().map(|p| resolve_path(p)).collect()
    }

    /// Coverage locators resolved against the current directory
    pub fn coverage_paths(&self) -> Vec<PathBuf> {
        self.database.coverage.iter().map(|p| resolve_path(p)).collect()
    }
}

fn resolve_path(p: &str) -> PathBuf {
    let path = PathBuf::from(p);
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    }
}
