//! Offline verification and comparison of backups
//!
//! Everything here reads files only; no network. Verification accumulates
//! errors and warnings independently: errors fail the backup, warnings never
//! do. Comparison produces typed difference records grouped by file, and a
//! zero-difference result is a valid, reportable outcome.

use crate::backup::MANIFEST_FILE;
use crate::error::{FlowDeployError, Result};
use crate::fs_utils::{dir_size_bytes, list_entity_files, read_json};
use crate::workflow::Workflow;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Backups older than this are flagged with a staleness warning
const STALE_AFTER_DAYS: i64 = 7;

/// Directories smaller than this are likely empty or truncated
const MIN_PLAUSIBLE_SIZE_BYTES: u64 = 1024;

/// Outcome of verifying one backup
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    /// The backup verified
    pub backup_name: String,
    /// Number of entity files inspected
    pub files_checked: usize,
    /// Problems that fail the backup
    pub errors: Vec<String>,
    /// Observations that do not fail the backup
    pub warnings: Vec<String>,
}

impl VerifyReport {
    /// A backup passes verification when it has no errors; warnings never
    /// fail it
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One structural difference between two copies of an entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    /// The workflow name differs
    NameChanged {
        /// Name in the first backup
        from: String,
        /// Name in the second backup
        to: String,
    },
    /// The recorded activation flag differs
    ActiveChanged {
        /// Flag in the first backup
        from: Option<bool>,
        /// Flag in the second backup
        to: Option<bool>,
    },
    /// The node count differs
    NodeCountChanged {
        /// Count in the first backup
        from: usize,
        /// Count in the second backup
        to: usize,
    },
    /// Node types present only in the second copy
    NodeTypesAdded {
        /// The added type strings
        types: Vec<String>,
    },
    /// Node types present only in the first copy
    NodeTypesRemoved {
        /// The removed type strings
        types: Vec<String>,
    },
    /// The tag sets differ
    TagsChanged {
        /// Tags present only in the second copy
        added: Vec<String>,
        /// Tags present only in the first copy
        removed: Vec<String>,
    },
    /// The connection topology differs, approximated by the sorted set of
    /// connection source keys rather than a deep graph diff
    ConnectionsChanged {
        /// Sources present only in the second copy
        added: Vec<String>,
        /// Sources present only in the first copy
        removed: Vec<String>,
    },
}

impl Change {
    /// One-line human-readable description, used by changelog rendering and
    /// the comparison report
    pub fn describe(&self) -> String {
        fn flag(value: Option<bool>) -> &'static str {
            match value {
                Some(true) => "active",
                Some(false) => "inactive",
                None => "unset",
            }
        }
        match self {
            Change::NameChanged { from, to } => format!("Renamed from '{from}' to '{to}'"),
            Change::ActiveChanged { from, to } => {
                format!("Activation changed from {} to {}", flag(*from), flag(*to))
            }
            Change::NodeCountChanged { from, to } => {
                format!("Node count changed from {from} to {to}")
            }
            Change::NodeTypesAdded { types } => format!("Node types added: {}", types.join(", ")),
            Change::NodeTypesRemoved { types } => {
                format!("Node types removed: {}", types.join(", "))
            }
            Change::TagsChanged { added, removed } => {
                let mut parts = Vec::new();
                if !added.is_empty() {
                    parts.push(format!("added {}", added.join(", ")));
                }
                if !removed.is_empty() {
                    parts.push(format!("removed {}", removed.join(", ")));
                }
                format!("Tags changed: {}", parts.join("; "))
            }
            Change::ConnectionsChanged { added, removed } => {
                let mut parts = Vec::new();
                if !added.is_empty() {
                    parts.push(format!("new sources {}", added.join(", ")));
                }
                if !removed.is_empty() {
                    parts.push(format!("dropped sources {}", removed.join(", ")));
                }
                format!("Connections changed: {}", parts.join("; "))
            }
        }
    }
}

/// All differences found in one file common to both backups
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    /// The entity file name
    pub file: String,
    /// Ordered differences found in this file
    pub changes: Vec<Change>,
}

/// Outcome of comparing two backups
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareReport {
    /// First backup name
    pub backup_a: String,
    /// Second backup name
    pub backup_b: String,
    /// Entity files present only in the first backup
    pub only_in_a: Vec<String>,
    /// Entity files present only in the second backup
    pub only_in_b: Vec<String>,
    /// Per-file differences for files common to both
    pub changed: Vec<FileDiff>,
}

impl CompareReport {
    /// Total number of differences across the whole report
    pub fn difference_count(&self) -> usize {
        self.only_in_a.len()
            + self.only_in_b.len()
            + self.changed.iter().map(|d| d.changes.len()).sum::<usize>()
    }

    /// Whether the two backups are structurally identical
    pub fn is_identical(&self) -> bool {
        self.difference_count() == 0
    }
}

/// Structural diff of two workflow copies: name, activation, node count,
/// node-type set, tag set and connection topology.
pub fn diff_workflows(a: &Workflow, b: &Workflow) -> Vec<Change> {
    let mut changes = Vec::new();

    if a.name != b.name {
        changes.push(Change::NameChanged {
            from: a.name.clone(),
            to: b.name.clone(),
        });
    }
    if a.active != b.active {
        changes.push(Change::ActiveChanged {
            from: a.active,
            to: b.active,
        });
    }
    if a.node_count() != b.node_count() {
        changes.push(Change::NodeCountChanged {
            from: a.node_count(),
            to: b.node_count(),
        });
    }

    let types_a = a.node_type_set();
    let types_b = b.node_type_set();
    let added: Vec<String> = types_b.difference(&types_a).cloned().collect();
    let removed: Vec<String> = types_a.difference(&types_b).cloned().collect();
    if !added.is_empty() {
        changes.push(Change::NodeTypesAdded { types: added });
    }
    if !removed.is_empty() {
        changes.push(Change::NodeTypesRemoved { types: removed });
    }

    let tags_a = a.tag_names();
    let tags_b = b.tag_names();
    if tags_a != tags_b {
        changes.push(Change::TagsChanged {
            added: tags_b.difference(&tags_a).cloned().collect(),
            removed: tags_a.difference(&tags_b).cloned().collect(),
        });
    }

    let sources_a: BTreeSet<String> = a.connection_sources().into_iter().collect();
    let sources_b: BTreeSet<String> = b.connection_sources().into_iter().collect();
    if sources_a != sources_b {
        changes.push(Change::ConnectionsChanged {
            added: sources_b.difference(&sources_a).cloned().collect(),
            removed: sources_a.difference(&sources_b).cloned().collect(),
        });
    }

    changes
}

/// Verifies and compares backup directories without touching the network
pub struct BackupAuditor {
    backups_dir: PathBuf,
}

impl BackupAuditor {
    /// Build an auditor rooted at the working directory that holds `backups/`
    pub fn new(root: &Path) -> Self {
        Self {
            backups_dir: root.join("backups"),
        }
    }

    /// Names of all backup directories, sorted for deterministic iteration
    pub fn backup_names(&self) -> Result<Vec<String>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.backups_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Check one backup's structural integrity and metadata cross-checks
    pub fn verify(&self, backup_name: &str) -> Result<VerifyReport> {
        let dir = self.backups_dir.join(backup_name);
        if !dir.is_dir() {
            return Err(FlowDeployError::Precondition(format!(
                "Backup '{backup_name}' not found"
            )));
        }

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let files = list_entity_files(&dir)?;
        if files.is_empty() {
            errors.push("Backup contains no workflow files".to_string());
        }

        self.check_manifest(&dir, backup_name, files.len(), &mut errors, &mut warnings);

        let mut names_seen: BTreeMap<String, String> = BTreeMap::new();
        for path in &files {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            match read_json(path) {
                Ok(value) => {
                    check_workflow_file(&file_name, &value, &mut errors, &mut warnings);
                    if let Some(name) = value.get("name").and_then(Value::as_str) {
                        if let Some(other) = names_seen.insert(name.to_string(), file_name.clone())
                        {
                            errors.push(format!(
                                "Duplicate workflow name '{name}' in '{other}' and '{file_name}'"
                            ));
                        }
                    }
                }
                Err(e) => errors.push(format!("{file_name}: {e}")),
            }
        }

        let size = dir_size_bytes(&dir);
        if size < MIN_PLAUSIBLE_SIZE_BYTES {
            warnings.push(format!(
                "Backup is only {size} bytes; it may be empty or truncated"
            ));
        }

        Ok(VerifyReport {
            backup_name: backup_name.to_string(),
            files_checked: files.len(),
            errors,
            warnings,
        })
    }

    /// Verify every backup under the backup root
    pub fn verify_all(&self) -> Result<Vec<VerifyReport>> {
        self.backup_names()?
            .iter()
            .map(|name| self.verify(name))
            .collect()
    }

    fn check_manifest(
        &self,
        dir: &Path,
        backup_name: &str,
        actual_file_count: usize,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            errors.push(format!("Manifest sidecar {MANIFEST_FILE} is missing"));
            return;
        }
        let manifest = match read_json(&manifest_path) {
            Ok(value) => value,
            Err(e) => {
                errors.push(format!("Manifest does not parse: {e}"));
                return;
            }
        };

        for field in ["backupName", "environment", "createdAt", "workflowCount"] {
            if manifest.get(field).is_none() {
                errors.push(format!("Manifest is missing required field '{field}'"));
            }
        }

        if let Some(recorded) = manifest.get("backupName").and_then(Value::as_str) {
            if recorded != backup_name {
                warnings.push(format!(
                    "Manifest records backup name '{recorded}' but the directory is '{backup_name}'"
                ));
            }
        }

        if let Some(created_at) = manifest
            .get("createdAt")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        {
            let age = Utc::now().signed_duration_since(created_at.with_timezone(&Utc));
            if age > Duration::days(STALE_AFTER_DAYS) {
                warnings.push(format!(
                    "Backup is {} days old (created {})",
                    age.num_days(),
                    created_at.format("%Y-%m-%d")
                ));
            }
        }

        if let Some(recorded_count) = manifest.get("workflowCount").and_then(Value::as_u64) {
            if recorded_count as usize != actual_file_count {
                warnings.push(format!(
                    "Manifest records {recorded_count} workflows but the directory holds \
                     {actual_file_count} files"
                ));
            }
        }
    }

    /// Structurally compare two backups
    pub fn compare(&self, backup_a: &str, backup_b: &str) -> Result<CompareReport> {
        let dir_a = self.backups_dir.join(backup_a);
        let dir_b = self.backups_dir.join(backup_b);
        for (name, dir) in [(backup_a, &dir_a), (backup_b, &dir_b)] {
            if !dir.is_dir() {
                return Err(FlowDeployError::Precondition(format!(
                    "Backup '{name}' not found"
                )));
            }
        }

        let names_of = |dir: &Path| -> Result<BTreeSet<String>> {
            Ok(list_entity_files(dir)?
                .iter()
                .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
                .collect())
        };
        let files_a = names_of(&dir_a)?;
        let files_b = names_of(&dir_b)?;

        let only_in_a: Vec<String> = files_a.difference(&files_b).cloned().collect();
        let only_in_b: Vec<String> = files_b.difference(&files_a).cloned().collect();

        let mut changed = Vec::new();
        for file in files_a.intersection(&files_b) {
            let a = load_workflow(&dir_a.join(file))?;
            let b = load_workflow(&dir_b.join(file))?;
            let changes = diff_workflows(&a, &b);
            if !changes.is_empty() {
                changed.push(FileDiff {
                    file: file.clone(),
                    changes,
                });
            }
        }

        Ok(CompareReport {
            backup_a: backup_a.to_string(),
            backup_b: backup_b.to_string(),
            only_in_a,
            only_in_b,
            changed,
        })
    }
}

fn load_workflow(path: &Path) -> Result<Workflow> {
    let value = read_json(path)?;
    serde_json::from_value(value)
        .map_err(|e| FlowDeployError::validation(path, format!("Invalid workflow file: {e}")))
}

/// Per-file structural checks used by verification
fn check_workflow_file(
    file_name: &str,
    value: &Value,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    if value.get("name").and_then(Value::as_str).is_none() {
        errors.push(format!("{file_name}: missing workflow name"));
    }

    match value.get("nodes").and_then(Value::as_array) {
        Some(nodes) => {
            if nodes.is_empty() {
                warnings.push(format!("{file_name}: workflow has no nodes"));
            }
            let mut node_names = BTreeSet::new();
            for (index, node) in nodes.iter().enumerate() {
                let name = node.get("name").and_then(Value::as_str);
                if name.is_none() {
                    errors.push(format!("{file_name}: node {index} is missing its name"));
                }
                if node.get("type").and_then(Value::as_str).is_none() {
                    errors.push(format!(
                        "{file_name}: node '{}' is missing its type",
                        name.unwrap_or(&index.to_string())
                    ));
                }
                if let Some(name) = name {
                    if !node_names.insert(name.to_string()) {
                        errors.push(format!("{file_name}: duplicate node name '{name}'"));
                    }
                }
            }
        }
        None => errors.push(format!("{file_name}: missing node list")),
    }

    if value.get("connections").and_then(Value::as_object).is_none() {
        errors.push(format!("{file_name}: missing connection map"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_backup(root: &Path, name: &str, workflows: &[Value], manifest: Option<Value>) {
        let dir = root.join("backups").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        for workflow in workflows {
            let file = format!(
                "{}.json",
                workflow["name"]
                    .as_str()
                    .unwrap()
                    .to_lowercase()
                    .replace(' ', "_")
            );
            std::fs::write(
                dir.join(file),
                serde_json::to_string_pretty(workflow).unwrap(),
            )
            .unwrap();
        }
        if let Some(manifest) = manifest {
            std::fs::write(
                dir.join(MANIFEST_FILE),
                serde_json::to_string_pretty(&manifest).unwrap(),
            )
            .unwrap();
        }
    }

    fn workflow_value(name: &str, node_count: usize) -> Value {
        let nodes: Vec<Value> = (0..node_count)
            .map(|i| {
                json!({
                    "id": format!("n{i}"),
                    "name": format!("Step {i}"),
                    "type": "n8n-nodes-base.httpRequest",
                    "position": [i * 100, 0],
                    "parameters": {"url": "https://example.com/endpoint/with/a/reasonably/long/path"}
                })
            })
            .collect();
        json!({
            "name": name,
            "active": false,
            "nodes": nodes,
            "connections": {},
            "tags": ["managed"]
        })
    }

    fn manifest_value(name: &str, count: usize, created_at: &str) -> Value {
        json!({
            "backupName": name,
            "environment": "prod",
            "createdAt": created_at,
            "workflowCount": count,
            "failedCount": 0,
            "workflows": []
        })
    }

    #[test]
    fn test_verify_complete_backup_passes() {
        let root = TempDir::new().unwrap();
        let now = Utc::now().to_rfc3339();
        write_backup(
            root.path(),
            "good",
            &[workflow_value("Order Sync-prod", 4), workflow_value("Invoice Export-prod", 3)],
            Some(manifest_value("good", 2, &now)),
        );

        let report = BackupAuditor::new(root.path()).verify("good").unwrap();
        assert!(report.passed(), "errors: {:?}", report.errors);
        assert_eq!(report.files_checked, 2);
    }

    #[test]
    fn test_verify_missing_manifest_fails() {
        let root = TempDir::new().unwrap();
        write_backup(root.path(), "no_manifest", &[workflow_value("X-prod", 1)], None);

        let report = BackupAuditor::new(root.path()).verify("no_manifest").unwrap();
        assert!(!report.passed());
        assert!(report.errors.iter().any(|e| e.contains(MANIFEST_FILE)));
    }

    #[test]
    fn test_verify_old_backup_warns_but_passes() {
        let root = TempDir::new().unwrap();
        let ten_days_ago = (Utc::now() - Duration::days(10)).to_rfc3339();
        write_backup(
            root.path(),
            "old",
            &[workflow_value("Order Sync-prod", 4)],
            Some(manifest_value("old", 1, &ten_days_ago)),
        );

        let report = BackupAuditor::new(root.path()).verify("old").unwrap();
        assert!(report.passed());
        assert!(report.warnings.iter().any(|w| w.contains("days old")));
    }

    #[test]
    fn test_verify_count_mismatch_and_name_mismatch_warn() {
        let root = TempDir::new().unwrap();
        let now = Utc::now().to_rfc3339();
        write_backup(
            root.path(),
            "mismatch",
            &[workflow_value("X-prod", 2)],
            Some(manifest_value("something_else", 5, &now)),
        );

        let report = BackupAuditor::new(root.path()).verify("mismatch").unwrap();
        assert!(report.passed());
        assert!(report.warnings.iter().any(|w| w.contains("records 5 workflows")));
        assert!(report.warnings.iter().any(|w| w.contains("something_else")));
    }

    #[test]
    fn test_verify_structural_errors() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("backups/broken");
        std::fs::create_dir_all(&dir).unwrap();
        // Missing node type, missing connections
        std::fs::write(
            dir.join("broken.json"),
            json!({
                "name": "Broken-prod",
                "nodes": [{"name": "Step"}]
            })
            .to_string(),
        )
        .unwrap();
        // Same workflow name in a second file
        std::fs::write(
            dir.join("duplicate.json"),
            json!({
                "name": "Broken-prod",
                "nodes": [],
                "connections": {}
            })
            .to_string(),
        )
        .unwrap();

        let report = BackupAuditor::new(root.path()).verify("broken").unwrap();
        assert!(!report.passed());
        assert!(report.errors.iter().any(|e| e.contains("missing its type")));
        assert!(report.errors.iter().any(|e| e.contains("missing connection map")));
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("Duplicate workflow name")));
        assert!(report.warnings.iter().any(|w| w.contains("no nodes")));
    }

    #[test]
    fn test_verify_empty_backup_fails() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("backups/empty")).unwrap();
        let report = BackupAuditor::new(root.path()).verify("empty").unwrap();
        assert!(!report.passed());
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("no workflow files")));
        assert!(report.warnings.iter().any(|w| w.contains("bytes")));
    }

    #[test]
    fn test_compare_identical_backups() {
        let root = TempDir::new().unwrap();
        let now = Utc::now().to_rfc3339();
        let workflows = [workflow_value("Order Sync-prod", 3)];
        write_backup(root.path(), "a", &workflows, Some(manifest_value("a", 1, &now)));
        write_backup(root.path(), "b", &workflows, Some(manifest_value("b", 1, &now)));

        let report = BackupAuditor::new(root.path()).compare("a", "b").unwrap();
        assert!(report.is_identical());
        assert_eq!(report.difference_count(), 0);
    }

    #[test]
    fn test_compare_reports_node_count_change() {
        let root = TempDir::new().unwrap();
        let now = Utc::now().to_rfc3339();
        write_backup(
            root.path(),
            "before",
            &[workflow_value("Order Sync-prod", 3)],
            Some(manifest_value("before", 1, &now)),
        );
        // One node added, same node type: exactly one difference
        write_backup(
            root.path(),
            "after",
            &[workflow_value("Order Sync-prod", 4)],
            Some(manifest_value("after", 1, &now)),
        );

        let report = BackupAuditor::new(root.path()).compare("before", "after").unwrap();
        assert_eq!(report.difference_count(), 1);
        assert_eq!(report.changed.len(), 1);
        assert_eq!(
            report.changed[0].changes,
            vec![Change::NodeCountChanged { from: 3, to: 4 }]
        );
    }

    #[test]
    fn test_compare_reports_file_set_difference() {
        let root = TempDir::new().unwrap();
        let now = Utc::now().to_rfc3339();
        write_backup(
            root.path(),
            "a",
            &[workflow_value("Order Sync-prod", 2), workflow_value("Old Flow-prod", 1)],
            Some(manifest_value("a", 2, &now)),
        );
        write_backup(
            root.path(),
            "b",
            &[workflow_value("Order Sync-prod", 2), workflow_value("New Flow-prod", 1)],
            Some(manifest_value("b", 2, &now)),
        );

        let report = BackupAuditor::new(root.path()).compare("a", "b").unwrap();
        assert_eq!(report.only_in_a, vec!["old_flow-prod.json"]);
        assert_eq!(report.only_in_b, vec!["new_flow-prod.json"]);
        assert!(report.changed.is_empty());
    }

    #[test]
    fn test_diff_detects_tags_and_connections() {
        let a: Workflow = serde_json::from_value(json!({
            "name": "X",
            "tags": ["one"],
            "connections": {"Start": {}}
        }))
        .unwrap();
        let b: Workflow = serde_json::from_value(json!({
            "name": "X",
            "tags": ["one", "two"],
            "connections": {"Start": {}, "Middle": {}}
        }))
        .unwrap();

        let changes = diff_workflows(&a, &b);
        assert!(changes.contains(&Change::TagsChanged {
            added: vec!["two".to_string()],
            removed: vec![]
        }));
        assert!(changes.contains(&Change::ConnectionsChanged {
            added: vec!["Middle".to_string()],
            removed: vec![]
        }));
    }
}
