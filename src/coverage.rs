//! Instance coverage statistics
//!
//! Observed per-attribute widths, precisions and counts, gathered from real
//! data by an external scanner and supplied as a JSON table:
//!
//! ```json
//! { "widget": { "color": { "minWidth": 3, "maxWidth": 5, "minPrec": 0, "maxPrec": 0, "count": 12 } } }
//! ```
//!
//! With no table at all the provider runs in bypass mode and reports every
//! category and attribute as present.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{Result, SchemaError};

/// Observed statistics for one attribute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeStats {
    #[serde(default)]
    pub min_width: u32,
    #[serde(default)]
    pub max_width: u32,
    #[serde(default)]
    pub min_prec: u32,
    #[serde(default)]
    pub max_prec: u32,
    #[serde(default)]
    pub count: u64,
}

/// Coverage queries used during assembly
pub trait CoverageProvider: Send + Sync {
    /// Whether the category (or one of its attributes) was observed
    fn exists(&self, category: &str, attribute: Option<&str>) -> bool;

    fn max_width(&self, category: &str, attribute: &str) -> u32;

    fn min_width(&self, category: &str, attribute: &str) -> u32;

    fn min_precision(&self, category: &str, attribute: &str) -> u32;

    fn max_precision(&self, category: &str, attribute: &str) -> u32;

    fn count(&self, category: &str, attribute: &str) -> u64;
}

pub type CoverageTable = BTreeMap<String, BTreeMap<String, AttributeStats>>;

/// Coverage table with optional bypass
#[derive(Debug, Clone, Default)]
pub struct InstanceCoverage {
    table: CoverageTable,
    bypass: bool,
}

impl InstanceCoverage {
    /// Provider that reports everything as present
    pub fn bypass() -> Self {
        Self {
            table: BTreeMap::new(),
            bypass: true,
        }
    }

    pub fn from_table(table: CoverageTable) -> Self {
        Self {
            table,
            bypass: false,
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let table: CoverageTable = serde_json::from_str(content)?;
        Ok(Self::from_table(table))
    }

    pub fn is_bypass(&self) -> bool {
        self.bypass
    }

    fn stats(&self, category: &str, attribute: &str) -> Option<&AttributeStats> {
        self.table.get(category).and_then(|c| c.get(attribute))
    }
}

impl CoverageProvider for InstanceCoverage {
    fn exists(&self, category: &str, attribute: Option<&str>) -> bool {
        if self.bypass {
            return true;
        }
        match attribute {
            None => self.table.contains_key(category),
            Some(at) => self.stats(category, at).is_some(),
        }
    }

    fn max_width(&self, category: &str, attribute: &str) -> u32 {
        self.stats(category, attribute).map(|s| s.max_width).unwrap_or(0)
    }

    fn min_width(&self, category: &str, attribute: &str) -> u32 {
        self.stats(category, attribute).map(|s| s.min_width).unwrap_or(0)
    }

    fn min_precision(&self, category: &str, attribute: &str) -> u32 {
        self.stats(category, attribute).map(|s| s.min_prec).unwrap_or(0)
    }

    fn max_precision(&self, category: &str, attribute: &str) -> u32 {
        self.stats(category, attribute).map(|s| s.max_prec).unwrap_or(0)
    }

    fn count(&self, category: &str, attribute: &str) -> u64 {
        self.stats(category, attribute).map(|s| s.count).unwrap_or(0)
    }
}

/// Load and merge coverage tables; no locators yields bypass mode
pub fn load_coverage(locators: &[PathBuf]) -> Result<InstanceCoverage> {
    if locators.is_empty() {
        info!("No coverage data supplied, using bypass mode");
        return Ok(InstanceCoverage::bypass());
    }

    let files = crate::dictionary::loader::collect_json_files(locators)?;
    let mut table = CoverageTable::new();
    for path in &files {
        let content = fs::read_to_string(path).map_err(|e| SchemaError::ProviderUnavailable {
            locator: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let part: CoverageTable = serde_json::from_str(&content).map_err(|e| {
            SchemaError::InvalidFormat(format!("Failed to parse coverage in {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), categories = part.len(), "Read coverage table");
        for (cat, attrs) in part {
            table.entry(cat).or_default().extend(attrs);
        }
    }
    info!(files = files.len(), categories = table.len(), "Loaded coverage");
    Ok(InstanceCoverage::from_table(table))
}
