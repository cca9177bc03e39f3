//! File system helpers shared by the engines
//!
//! Entity files are plain `.json` files; anything whose file name starts with
//! an underscore is a sidecar (summaries, manifests) and is excluded from
//! entity-file counts everywhere.

use crate::error::{FlowDeployError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Whether a file name denotes a sidecar rather than an entity file
pub fn is_sidecar(file_name: &str) -> bool {
    file_name.starts_with('_')
}

/// Serialize a value as pretty-printed JSON and write it atomically.
///
/// Writes to a temporary sibling first and renames into place so a crashed
/// run never leaves a half-written entity file behind.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(value)?;
    let temp_path = path.with_extension("json.tmp");

    std::fs::write(&temp_path, &content).map_err(|e| {
        FlowDeployError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to write temp file '{}': {}", temp_path.display(), e),
        ))
    })?;

    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        FlowDeployError::Io(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to rename temp file '{}' to '{}': {}",
                temp_path.display(),
                path.display(),
                e
            ),
        ))
    })
}

/// Read and parse a JSON file into an untyped value
pub fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        FlowDeployError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read file '{}': {}", path.display(), e),
        ))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| FlowDeployError::validation(path, format!("Invalid JSON: {e}")))
}

/// List entity files (non-sidecar `.json`) in a directory, sorted by file
/// name for deterministic iteration order.
///
/// A missing directory yields an empty list, not an error.
pub fn list_entity_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.extension() != Some(std::ffi::OsStr::new("json")) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_sidecar(name) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Total byte size of all files under a directory
pub fn dir_size_bytes(dir: &Path) -> u64 {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_sidecar_detection() {
        assert!(is_sidecar("_backup_metadata.json"));
        assert!(is_sidecar("_export_summary_prod.json"));
        assert!(!is_sidecar("order_sync.json"));
    }

    #[test]
    fn test_write_json_atomic_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/file.json");
        write_json_atomic(&path, &json!({"a": 1})).unwrap();

        let value = read_json(&path).unwrap();
        assert_eq!(value["a"], 1);
        // No temp file left behind
        assert!(!dir.path().join("nested/deeper/file.json.tmp").exists());
    }

    #[test]
    fn test_list_entity_files_skips_sidecars_and_sorts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("zeta.json"), "{}").unwrap();
        std::fs::write(dir.path().join("alpha.json"), "{}").unwrap();
        std::fs::write(dir.path().join("_backup_metadata.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = list_entity_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["alpha.json", "zeta.json"]);
    }

    #[test]
    fn test_list_entity_files_missing_dir() {
        let dir = TempDir::new().unwrap();
        let files = list_entity_files(&dir.path().join("does-not-exist")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_read_json_invalid_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        let err = read_json(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }
}
