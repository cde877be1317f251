//! Target profiles
//!
//! A profile is chosen once per build and bundles everything that varies by
//! target: the type table, the name converter and the emitter kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::BuildConfig;
use crate::error::SchemaError;
use crate::naming::{DefaultNameConverter, NameConverter, PunctuationNameConverter};
use crate::typemap::TypeTable;

/// Output target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetProfile {
    /// Generic typing consumed by loaders
    Any,
    /// Relational database tables
    Sql,
    /// JSON Schema documents
    Json,
    /// MongoDB `$jsonSchema` documents
    Bson,
}

/// Which assembler path a profile uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emitter {
    Relational,
    Document,
}

impl TargetProfile {
    pub fn is_relational(&self) -> bool {
        matches!(self, TargetProfile::Sql)
    }

    pub fn is_document(&self) -> bool {
        matches!(self, TargetProfile::Json | TargetProfile::Bson)
    }

    pub fn emitter(&self) -> Emitter {
        if self.is_document() {
            Emitter::Document
        } else {
            Emitter::Relational
        }
    }

    /// Property key carrying the type in document schemas
    pub fn type_key(&self) -> &'static str {
        match self {
            TargetProfile::Bson => "bsonType",
            _ => "type",
        }
    }

    /// Type name used when a type code has no mapping
    pub fn unknown_type(&self) -> &'static str {
        if self.is_document() {
            "string"
        } else {
            "unknown"
        }
    }

    pub fn name_converter(&self, reserved_words: &[String]) -> Box<dyn NameConverter> {
        match self {
            TargetProfile::Sql => Box::new(DefaultNameConverter::with_reserved_words(reserved_words)),
            _ => Box::new(PunctuationNameConverter),
        }
    }
}

impl fmt::Display for TargetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetProfile::Any => "ANY",
            TargetProfile::Sql => "SQL",
            TargetProfile::Json => "JSON",
            TargetProfile::Bson => "BSON",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TargetProfile {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" | "generic" | "document" | "solr" => Ok(TargetProfile::Any),
            "sql" | "mysql" | "cockroach" | "crate" => Ok(TargetProfile::Sql),
            "json" => Ok(TargetProfile::Json),
            "bson" => Ok(TargetProfile::Bson),
            other => Err(SchemaError::ProfileMismatch(format!("unknown target profile: {}", other))),
        }
    }
}

/// Everything a build needs to know about its target
#[derive(Debug)]
pub struct Profile {
    pub target: TargetProfile,
    pub types: TypeTable,
    pub names: Box<dyn NameConverter>,
}

impl Profile {
    pub fn new(target: TargetProfile, config: &BuildConfig) -> Self {
        Self {
            target,
            types: TypeTable::for_profile(target).with_overrides(&config.type_overrides),
            names: target.name_converter(&config.assembly.reserved_words),
        }
    }

    pub fn emitter(&self) -> Emitter {
        self.target.emitter()
    }

    /// Converted name
    pub fn name(&self, raw: &str) -> String {
        self.names.convert(raw)
    }

    /// Converted, upper-cased identifier
    pub fn id(&self, raw: &str) -> String {
        self.names.convert(raw).to_uppercase()
    }
}
