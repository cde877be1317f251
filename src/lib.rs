//! dictschema
//!
//! Compiles a record-type dictionary (categories, attributes, relationships,
//! constraints) into target-specific schemas: relational table descriptors
//! with indices, and JSON / BSON document schemas.
//!
//! ## Features
//!
//! - **Content classification**: keys, content classes, enumerations,
//!   boundaries, iterables and method bindings per attribute
//! - **Slices**: parent/child closure views with per-slice unit cardinality
//! - **Type mapping**: abstract type codes to physical types, with widths
//!   revised from observed data
//! - **Multi-target assembly**: ANY, SQL, JSON and BSON profiles
//! - **Shared providers**: dictionaries and coverage tables are loaded once
//!   per locator set and shared across builds
//!
//! ## Pipeline
//!
//! ```text
//! DictionaryModel ──┬─> ContentClassifier ──┐
//!                   └─> SliceResolver ──────┼─> SchemaBuilder ─> descriptor
//! CoverageProvider ───> TypeTable ──────────┘        ^
//!                                     Profile (types + names)
//! ```

pub mod assemble;
pub mod config;
pub mod content;
pub mod coverage;
pub mod dictionary;
pub mod error;
pub mod naming;
pub mod profile;
pub mod provider;
pub mod slice;
pub mod typemap;

pub use assemble::{SchemaBuilder, SchemaDefinition, SchemaObject};
pub use config::BuildConfig;
pub use content::{ContentClassifier, ContentModel};
pub use coverage::{CoverageProvider, InstanceCoverage};
pub use dictionary::{DictionaryModel, DictionarySnapshot, ItemName};
pub use error::{Result, SchemaError};
pub use naming::{DefaultNameConverter, NameConverter, PunctuationNameConverter};
pub use profile::{Profile, TargetProfile};
pub use provider::{BuildSession, LocatorSet, Providers};
pub use slice::{SliceResolver, SliceSet, SliceView};
pub use typemap::TypeTable;
