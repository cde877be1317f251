//! Dictionary Loading
//!
//! Reads JSON dictionary documents from files or directories, merges them in
//! path order and fingerprints the bundle with sha256.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::snapshot::{DictionaryDocument, DictionarySnapshot};
use crate::error::{Result, SchemaError};

/// Expand locators into the ordered list of JSON files they name
pub(crate) fn collect_json_files(locators: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for locator in locators {
        if locator.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(locator).sort_by_file_name() {
                let entry = entry.map_err(|e| SchemaError::ProviderUnavailable {
                    locator: e
                        .path()
                        .unwrap_or(locator.as_path())
                        .display()
                        .to_string(),
                    reason: e.to_string(),
                })?;
                let path = entry.into_path();
                if path.is_file() && path.extension().map(|ext| ext == "json").unwrap_or(false) {
                    found.push(path);
                }
            }
            found.sort();
            files.extend(found);
        } else if locator.is_file() {
            files.push(locator.clone());
        } else {
            return Err(SchemaError::ProviderUnavailable {
                locator: locator.display().to_string(),
                reason: "no such file or directory".to_string(),
            });
        }
    }
    Ok(files)
}

fn read_document(path: &Path) -> Result<(String, DictionaryDocument)> {
    let content = fs::read_to_string(path).map_err(|e| SchemaError::ProviderUnavailable {
        locator: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let document = serde_json::from_str(&content).map_err(|e| {
        SchemaError::InvalidFormat(format!("Failed to parse JSON in {}: {}", path.display(), e))
    })?;
    Ok((content, document))
}

/// Load and merge dictionary documents into one snapshot
pub fn load_snapshot(locators: &[PathBuf]) -> Result<DictionarySnapshot> {
    if locators.is_empty() {
        return Err(SchemaError::ProviderUnavailable {
            locator: String::new(),
            reason: "no dictionary locators configured".to_string(),
        });
    }

    let files = collect_json_files(locators)?;
    let mut hasher = Sha256::new();
    let mut merged = DictionaryDocument::default();

    for path in &files {
        let (content, document) = read_document(path)?;
        hasher.update(content.as_bytes());
        debug!(path = %path.display(), categories = document.categories.len(), "Read dictionary document");
        merged.merge(document);
    }

    let bundle_hash = format!("{:x}", hasher.finalize());
    info!(
        files = files.len(),
        categories = merged.categories.len(),
        hash = %bundle_hash,
        "Loaded dictionary"
    );
    Ok(DictionarySnapshot::with_hash(merged, bundle_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::DictionaryModel;

    #[test]
    fn test_load_directory_merges_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"{ "categories": { "shop": { "keys": ["id"], "attributes": { "id": { "type_code": "code" } } } } }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{ "categories": { "widget": { "attributes": { "id": { "type_code": "code" } } } } }"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let snapshot = load_snapshot(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(snapshot.categories(), vec!["shop", "widget"]);
        assert_eq!(snapshot.bundle_hash().len(), 64);
    }

    #[test]
    fn test_hash_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.json");
        fs::write(&path, r#"{ "categories": {} }"#).unwrap();
        let a = load_snapshot(&[path.clone()]).unwrap();
        let b = load_snapshot(&[path]).unwrap();
        assert_eq!(a.bundle_hash(), b.bundle_hash());
    }

    #[test]
    fn test_missing_locator_is_unavailable() {
        let err = load_snapshot(&[PathBuf::from("/definitely/not/here.json")]).unwrap_err();
        assert!(matches!(err, SchemaError::ProviderUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_aborts_load() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"{ "categories": {} }"#).unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("b.json"), r#"{ "categories": {} }"#).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root ignores directory permissions
        let readable = fs::read_dir(&locked).is_ok();
        let result = load_snapshot(&[dir.path().to_path_buf()]);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if !readable {
            assert!(matches!(result, Err(SchemaError::ProviderUnavailable { .. })));
        }
    }

    #[test]
    fn test_malformed_json_is_invalid_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_snapshot(&[path]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidFormat(_)));
    }

    #[test]
    fn test_empty_locators_rejected() {
        assert!(load_snapshot(&[]).is_err());
    }
}
