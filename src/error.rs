//! Error types for schema compilation

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema compilation errors
///
/// Most dictionary lookups degrade to defaults instead of failing; these
/// variants cover the cases that abort a build outright.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Provider unavailable for {locator}: {reason}")]
    ProviderUnavailable { locator: String, reason: String },

    #[error("Invalid input format: {0}")]
    InvalidFormat(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Profile mismatch: {0}")]
    ProfileMismatch(String),

    #[error("Ambiguous {relation} for {item}: {candidates:?}")]
    AmbiguousRelation {
        relation: String,
        item: String,
        candidates: Vec<String>,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
