//! Abstract type mapping
//!
//! Maps dictionary type codes to physical types for each target profile:
//! - Generic table shared by ANY and SQL targets
//! - JSON and BSON tables derived from the generic one
//! - Width revision from observed data widths

use std::collections::BTreeMap;
use tracing::debug;

use crate::config::TypeOverride;
use crate::profile::TargetProfile;

/// Largest bounded string width before promotion to `text`
pub const MAX_CHAR_WIDTH: u32 = 16382;

/// Physical type for one abstract type code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapEntry {
    pub type_name: String,
    pub width: u32,
    pub precision: u32,
}

impl TypeMapEntry {
    pub fn new(type_name: impl Into<String>, width: u32, precision: u32) -> Self {
        Self {
            type_name: type_name.into(),
            width,
            precision,
        }
    }
}

// (type code, generic type, default width, default precision)
const GENERIC_TYPES: &[(&str, &str, u32, u32)] = &[
    ("code", "char", 10, 0),
    ("ucode", "char", 10, 0),
    ("line", "char", 80, 0),
    ("uline", "char", 80, 0),
    ("text", "char", 200, 0),
    ("int", "int", 10, 0),
    ("float", "float", 10, 6),
    ("name", "char", 80, 0),
    ("idname", "char", 80, 0),
    ("any", "text", 255, 0),
    ("yyyy-mm-dd", "date", 15, 0),
    ("uchar3", "char", 4, 0),
    ("uchar1", "char", 2, 0),
    ("symop", "char", 10, 0),
    ("atcode", "char", 6, 0),
    ("yyyy-mm-dd:hh:mm", "datetime", 20, 0),
    ("fax", "char", 25, 0),
    ("phone", "char", 25, 0),
    ("email", "char", 80, 0),
    ("code30", "char", 30, 0),
    ("float-range", "char", 30, 0),
    ("operation_expression", "char", 30, 0),
    ("yyyy-mm-dd:hh:mm-flex", "datetime", 20, 0),
    ("ec-type", "char", 10, 0),
    ("ucode-alphanum-csv", "char", 25, 0),
    ("int-range", "char", 20, 0),
    ("point_symmetry", "char", 80, 0),
    ("id_list", "char", 100, 0),
    ("4x3_matrix", "char", 10, 0),
    ("non_negative_int", "int", 10, 0),
    ("positive_int", "int", 10, 0),
    ("emd_id", "char", 15, 0),
    ("pdb_id", "char", 20, 0),
    ("point_group", "char", 20, 0),
    ("point_group_helical", "char", 20, 0),
    ("boolean", "char", 5, 0),
    ("author", "char", 80, 0),
    ("orcid_id", "char", 20, 0),
    ("symmetry_operation", "char", 80, 0),
    ("sequence_dep", "char", 20, 0),
    ("date_dep", "char", 20, 0),
    ("citation_doi", "char", 20, 0),
    ("exp_data_doi", "char", 20, 0),
    ("asym_id", "char", 20, 0),
    ("pdbx_PDB_obsoleted_db_id", "char", 20, 0),
];

fn json_type(generic: &str) -> &str {
    match generic {
        "char" | "text" => "string",
        "float" => "number",
        "int" => "integer",
        other => other,
    }
}

fn bson_type(generic: &str) -> &str {
    match generic {
        "char" | "text" => "string",
        "float" | "double" => "double",
        "date" | "datetime" => "date",
        "int" => "int",
        other => other,
    }
}

/// Type table for one target profile
#[derive(Debug, Clone)]
pub struct TypeTable {
    target: TargetProfile,
    entries: BTreeMap<String, TypeMapEntry>,
}

impl TypeTable {
    /// Build the table for a profile from the generic entries
    pub fn for_profile(target: TargetProfile) -> Self {
        let entries = GENERIC_TYPES
            .iter()
            .map(|&(code, generic, width, precision)| {
                let type_name = match target {
                    TargetProfile::Any | TargetProfile::Sql => generic,
                    TargetProfile::Json => json_type(generic),
                    TargetProfile::Bson => bson_type(generic),
                };
                (code.to_string(), TypeMapEntry::new(type_name, width, precision))
            })
            .collect();
        Self { target, entries }
    }

    /// Replace entries with configured overrides for this profile
    pub fn with_overrides(mut self, overrides: &[TypeOverride]) -> Self {
        for o in overrides {
            match o.profile.parse::<TargetProfile>() {
                Ok(p) if p == self.target => {
                    debug!(profile = %p, type_code = %o.type_code, type_name = %o.type_name, "Type override");
                    self.entries.insert(
                        o.type_code.clone(),
                        TypeMapEntry::new(o.type_name.clone(), o.width, o.precision),
                    );
                }
                Ok(_) => {}
                Err(_) => debug!(profile = %o.profile, "Ignoring override for unknown profile"),
            }
        }
        self
    }

    pub fn target(&self) -> TargetProfile {
        self.target
    }

    pub fn has_type(&self, type_code: &str) -> bool {
        self.entries.contains_key(type_code)
    }

    pub fn entry(&self, type_code: &str) -> Option<&TypeMapEntry> {
        self.entries.get(type_code)
    }

    pub fn type_name(&self, type_code: Option<&str>, default: &str) -> String {
        type_code
            .and_then(|c| self.entries.get(c))
            .map(|e| e.type_name.clone())
            .unwrap_or_else(|| default.to_string())
    }

    pub fn default_width(&self, type_code: Option<&str>, default: u32) -> u32 {
        type_code
            .and_then(|c| self.entries.get(c))
            .map(|e| e.width)
            .unwrap_or(default)
    }

    pub fn default_precision(&self, type_code: Option<&str>, default: u32) -> u32 {
        type_code
            .and_then(|c| self.entries.get(c))
            .map(|e| e.precision)
            .unwrap_or(default)
    }

    /// Revise a type and width from an observed width
    ///
    /// The width becomes `observed + floor(observed * buffer%)`, never below
    /// `min_width`. On relational targets an oversized bounded string turns
    /// into `text` and a `text` key turns back into `char`.
    pub fn revise_width(
        &self,
        is_key: bool,
        type_name: &str,
        observed: u32,
        buffer_percent: f64,
        min_width: u32,
    ) -> (String, u32) {
        let buffered = observed as u64 + (buffer_percent * 0.01 * observed as f64).floor() as u64;
        let width = buffered.max(min_width as u64).min(u32::MAX as u64) as u32;

        let mut revised = type_name.to_string();
        if self.target.is_relational() {
            let upper = type_name.to_uppercase();
            if (upper == "CHAR" || upper == "VARCHAR") && width > MAX_CHAR_WIDTH {
                revised = "text".to_string();
            }
            if upper == "TEXT" && is_key {
                revised = "char".to_string();
            }
        }
        (revised, width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_entries() {
        let t = TypeTable::for_profile(TargetProfile::Any);
        let e = t.entry("float").unwrap();
        assert_eq!(e.type_name, "float");
        assert_eq!(e.width, 10);
        assert_eq!(e.precision, 6);
        assert_eq!(t.type_name(Some("code"), "unknown"), "char");
    }

    #[test]
    fn test_json_post_processing() {
        let t = TypeTable::for_profile(TargetProfile::Json);
        assert_eq!(t.type_name(Some("code"), "string"), "string");
        assert_eq!(t.type_name(Some("text"), "string"), "string");
        assert_eq!(t.type_name(Some("int"), "string"), "integer");
        assert_eq!(t.type_name(Some("float"), "string"), "number");
        assert_eq!(t.type_name(Some("yyyy-mm-dd"), "string"), "date");
        assert_eq!(t.type_name(Some("yyyy-mm-dd:hh:mm"), "string"), "datetime");
    }

    #[test]
    fn test_bson_post_processing() {
        let t = TypeTable::for_profile(TargetProfile::Bson);
        assert_eq!(t.type_name(Some("int"), "string"), "int");
        assert_eq!(t.type_name(Some("float"), "string"), "double");
        assert_eq!(t.type_name(Some("yyyy-mm-dd"), "string"), "date");
        assert_eq!(t.type_name(Some("yyyy-mm-dd:hh:mm"), "string"), "date");
    }

    #[test]
    fn test_unmapped_falls_back() {
        let t = TypeTable::for_profile(TargetProfile::Sql);
        assert!(!t.has_type("mystery"));
        assert_eq!(t.type_name(Some("mystery"), "unknown"), "unknown");
        assert_eq!(t.type_name(None, "unknown"), "unknown");
        assert_eq!(t.default_width(Some("mystery"), 7), 7);
        assert_eq!(t.default_precision(None, 0), 0);
    }

    #[test]
    fn test_revise_width_buffer_and_floor() {
        let t = TypeTable::for_profile(TargetProfile::Sql);
        assert_eq!(t.revise_width(false, "char", 50, 20.0, 10), ("char".to_string(), 60));
        assert_eq!(t.revise_width(false, "char", 3, 20.0, 10), ("char".to_string(), 10));
        // 14 + floor(2.8)
        assert_eq!(t.revise_width(false, "char", 14, 20.0, 10), ("char".to_string(), 16));
    }

    #[test]
    fn test_text_is_bounded_until_revised() {
        let t = TypeTable::for_profile(TargetProfile::Sql);
        assert_eq!(t.entry("text"), Some(&TypeMapEntry::new("char", 200, 0)));
        assert_eq!(t.revise_width(false, "char", 200, 0.0, 10), ("char".to_string(), 200));
        assert_eq!(t.revise_width(false, "char", 20000, 20.0, 10).0, "text");
    }

    #[test]
    fn test_revise_width_promotes_large_strings() {
        let t = TypeTable::for_profile(TargetProfile::Sql);
        let (ty, w) = t.revise_width(false, "char", 20000, 20.0, 10);
        assert_eq!(ty, "text");
        assert_eq!(w, 24000);
    }

    #[test]
    fn test_revise_width_demotes_text_keys() {
        let t = TypeTable::for_profile(TargetProfile::Sql);
        assert_eq!(t.revise_width(true, "text", 30, 20.0, 10).0, "char");
        assert_eq!(t.revise_width(false, "text", 30, 20.0, 10).0, "text");
    }

    #[test]
    fn test_revise_width_document_targets_keep_type() {
        let t = TypeTable::for_profile(TargetProfile::Json);
        assert_eq!(t.revise_width(true, "string", 20000, 20.0, 10).0, "string");
    }

    #[test]
    fn test_overrides_apply_to_matching_profile() {
        let overrides = vec![
            TypeOverride {
                profile: "sql".to_string(),
                type_code: "code".to_string(),
                type_name: "varchar".to_string(),
                width: 32,
                precision: 0,
            },
            TypeOverride {
                profile: "json".to_string(),
                type_code: "code".to_string(),
                type_name: "string".to_string(),
                width: 1,
                precision: 0,
            },
        ];
        let t = TypeTable::for_profile(TargetProfile::Sql).with_overrides(&overrides);
        assert_eq!(t.entry("code"), Some(&TypeMapEntry::new("varchar", 32, 0)));
    }
}
