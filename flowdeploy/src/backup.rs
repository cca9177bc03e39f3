//! Timestamped backup snapshots of an environment's managed workflows
//!
//! A backup is a directory: one JSON file per entity plus a
//! `_backup_metadata.json` manifest. Restores go back through the same
//! name-keyed create-or-update reconciliation path as deploys. Retention
//! pruning deletes the oldest directories beyond the keep count permanently,
//! and only ever after a successful backup write.

use crate::client::WorkflowClient;
use crate::config::{DeployConfig, Environment};
use crate::error::{FlowDeployError, Result};
use crate::fs_utils::{list_entity_files, read_json, write_json_atomic};
use crate::names::NameCodec;
use crate::promote::{reconcile, EntityFailure, ExportOutcome, OutcomeStatus, ReconcileAction};
use crate::workflow::Workflow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the manifest sidecar inside every backup directory
pub const MANIFEST_FILE: &str = "_backup_metadata.json";

/// Metadata manifest describing one backup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    /// The backup directory's name
    pub backup_name: String,
    /// Environment the snapshot was taken from
    pub environment: Environment,
    /// When the backup was created
    pub created_at: DateTime<Utc>,
    /// Number of successfully backed-up workflows
    pub workflow_count: usize,
    /// Number of workflows that failed to back up
    pub failed_count: usize,
    /// Per-entity records
    pub workflows: Vec<ExportOutcome>,
}

/// A backup directory as seen by `list_backups`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    /// Directory name, the backup's identity
    pub name: String,
    /// Absolute path of the directory
    #[serde(skip)]
    pub path: PathBuf,
    /// Filesystem creation time (modification time where creation time is
    /// unavailable)
    pub created_at: DateTime<Utc>,
    /// Quick workflow count: non-sidecar files in the directory
    pub workflow_count: usize,
}

/// Per-entity record produced by a restore
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRecord {
    /// Display name restored
    pub name: String,
    /// Source file inside the backup
    pub file_name: String,
    /// Created or updated
    pub action: ReconcileAction,
    /// Remote id of the restored entity
    pub id: String,
    /// The remote entity's activation state before the restore, for operator
    /// visibility when verifying a rollback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_active: Option<bool>,
}

/// Batch summary for a restore run, persisted as a sidecar in the backup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    /// The backup restored from
    pub backup_name: String,
    /// When the restore ran
    pub restored_at: DateTime<Utc>,
    /// Total files attempted
    pub total: usize,
    /// Successful records, in file order
    pub restored: Vec<RestoreRecord>,
    /// Failures, in file order
    pub failures: Vec<EntityFailure>,
}

/// Creates, lists, restores and prunes backups
pub struct BackupEngine<'a> {
    config: &'a DeployConfig,
    codec: NameCodec,
    client: &'a dyn WorkflowClient,
    root: PathBuf,
}

impl<'a> BackupEngine<'a> {
    /// Build an engine rooted at the working directory that holds `backups/`
    pub fn new(config: &'a DeployConfig, client: &'a dyn WorkflowClient, root: &Path) -> Self {
        Self {
            config,
            codec: NameCodec::new(config),
            client,
            root: root.to_path_buf(),
        }
    }

    /// Directory holding all backups
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// Snapshot every managed workflow of an environment into a new backup
    /// directory, write the manifest, then prune to the retention count.
    ///
    /// Zero managed entities still yields a well-formed manifest recording a
    /// zero count, so unconditional backup-before-deploy steps never abort
    /// when there is nothing to back up.
    pub async fn create_backup(
        &self,
        env: Environment,
        custom_name: Option<&str>,
    ) -> Result<BackupManifest> {
        let name = match custom_name {
            Some(name) => name.to_string(),
            None => format!("backup_{env}_{}", Utc::now().format("%Y%m%d_%H%M%S")),
        };
        let dir = self.backups_dir().join(&name);
        std::fs::create_dir_all(&dir)?;

        let remote = self.client.list_all().await?;
        let mut outcomes = Vec::new();

        for managed in self.config.workflows_for(env) {
            let display_name = self.codec.display_name(&managed.base_name, env)?;
            let file_name = self.codec.file_name(&display_name);
            match self
                .backup_one(&remote, &display_name, &dir.join(&file_name))
                .await
            {
                Ok((active, node_count)) => outcomes.push(ExportOutcome {
                    name: display_name,
                    base_name: managed.base_name.clone(),
                    environment: env,
                    file_name,
                    status: OutcomeStatus::Success,
                    active,
                    node_count,
                    error: None,
                }),
                Err(e) => {
                    warn!("Backup failed for '{}': {}", display_name, e);
                    outcomes.push(ExportOutcome {
                        name: display_name,
                        base_name: managed.base_name.clone(),
                        environment: env,
                        file_name,
                        status: OutcomeStatus::Failed,
                        active: None,
                        node_count: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let workflow_count = outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Success)
            .count();
        let manifest = BackupManifest {
            backup_name: name.clone(),
            environment: env,
            created_at: Utc::now(),
            workflow_count,
            failed_count: outcomes.len() - workflow_count,
            workflows: outcomes,
        };
        write_json_atomic(&dir.join(MANIFEST_FILE), &manifest)?;
        info!(
            "Backup '{}' created with {} workflows ({} failed)",
            name, manifest.workflow_count, manifest.failed_count
        );

        // Prune only now that the new backup is fully written
        self.cleanup_old_backups(self.config.max_backups_to_keep)?;
        Ok(manifest)
    }

    async fn backup_one(
        &self,
        remote: &[Workflow],
        display_name: &str,
        path: &Path,
    ) -> Result<(Option<bool>, usize)> {
        let listed = remote
            .iter()
            .find(|w| w.name == display_name)
            .ok_or_else(|| {
                FlowDeployError::remote("get", display_name, "not found in remote list")
            })?;
        let id = listed
            .id
            .as_deref()
            .ok_or_else(|| FlowDeployError::remote("get", display_name, "remote entity has no id"))?;

        let mut full = self.client.get_by_id(id).await?;
        let active = full.active;
        let node_count = full.node_count();
        full.sanitize_for_file();
        write_json_atomic(path, &full)?;
        Ok((active, node_count))
    }

    /// Enumerate backups, newest first by filesystem creation time.
    ///
    /// A missing backup root is an empty list, not an error.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        let backups_dir = self.backups_dir();
        if !backups_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in std::fs::read_dir(&backups_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
                continue;
            };
            let metadata = entry.metadata()?;
            let created = metadata.created().or_else(|_| metadata.modified())?;
            backups.push(BackupInfo {
                name,
                created_at: DateTime::<Utc>::from(created),
                workflow_count: list_entity_files(&path)?.len(),
                path,
            });
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(backups)
    }

    /// Restore a backup (or a base-name subset of it) through the standard
    /// reconciliation path.
    ///
    /// Restored entities keep whatever the backup file says about activation;
    /// stripping bookkeeping is the only normalization applied, so the remote
    /// service decides the default state for newly created resources.
    pub async fn restore_from_backup(
        &self,
        backup_name: &str,
        base_names: Option<&[String]>,
    ) -> Result<RestoreSummary> {
        let dir = self.backups_dir().join(backup_name);
        if !dir.is_dir() {
            return Err(FlowDeployError::Precondition(format!(
                "Backup '{backup_name}' not found"
            )));
        }

        let mut files = list_entity_files(&dir)?;
        if let Some(names) = base_names {
            // Restores target production by convention
            let mut wanted = BTreeSet::new();
            for base in names {
                let display = self.codec.display_name(base, Environment::Prod)?;
                wanted.insert(self.codec.file_name(&display));
            }
            files.retain(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| wanted.contains(n))
            });
        }

        let remote = self.client.list_all().await?;
        let mut seen = BTreeSet::new();
        let mut restored = Vec::new();
        let mut failures = Vec::new();
        let total = files.len();

        for path in &files {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            match self.restore_one(&remote, path, &file_name, &mut seen).await {
                Ok(record) => {
                    info!(
                        "Restored '{}' ({:?}, previously active: {:?})",
                        record.name, record.action, record.previous_active
                    );
                    restored.push(record);
                }
                Err(e) => {
                    warn!("Restore failed for '{}': {}", file_name, e);
                    failures.push(EntityFailure {
                        name: file_name,
                        error: e.to_string(),
                    });
                }
            }
        }

        let summary = RestoreSummary {
            backup_name: backup_name.to_string(),
            restored_at: Utc::now(),
            total,
            restored,
            failures,
        };
        write_json_atomic(
            &dir.join(format!(
                "_restore_summary_{}.json",
                summary.restored_at.format("%Y%m%d_%H%M%S")
            )),
            &summary,
        )?;
        Ok(summary)
    }

    async fn restore_one(
        &self,
        remote: &[Workflow],
        path: &Path,
        file_name: &str,
        seen: &mut BTreeSet<String>,
    ) -> Result<RestoreRecord> {
        let value = read_json(path)?;
        if value.get("name").and_then(serde_json::Value::as_str).is_none() {
            return Err(FlowDeployError::validation(
                path,
                "Backup file has no workflow name field",
            ));
        }
        let mut workflow: Workflow = serde_json::from_value(value)
            .map_err(|e| FlowDeployError::validation(path, format!("Invalid workflow file: {e}")))?;
        workflow.sanitize_for_push();

        let reconciled = reconcile(self.client, remote, &workflow, seen).await?;
        Ok(RestoreRecord {
            name: workflow.name,
            file_name: file_name.to_string(),
            action: reconciled.action,
            id: reconciled.id,
            previous_active: reconciled.previous_active,
        })
    }

    /// Delete every backup beyond the `keep_count` newest.
    ///
    /// Deletion is permanent and recursive; returns the names deleted,
    /// oldest last.
    pub fn cleanup_old_backups(&self, keep_count: usize) -> Result<Vec<String>> {
        let backups = self.list_backups()?;
        let mut deleted = Vec::new();
        for backup in backups.iter().skip(keep_count) {
            std::fs::remove_dir_all(&backup.path)?;
            info!("Pruned old backup '{}'", backup.name);
            deleted.push(backup.name.clone());
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryWorkflowClient;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_config() -> DeployConfig {
        serde_yaml::from_str(
            r#"
server:
  base_url: http://localhost
max_backups_to_keep: 10
workflows:
  - base_name: Order Sync
    variables:
      prod:
        apiUrl: https://prod.example.com
  - base_name: Invoice Export
    variables:
      prod:
        apiUrl: https://prod.example.com
"#,
        )
        .unwrap()
    }

    fn prod_workflow(name: &str) -> Workflow {
        serde_json::from_value(json!({
            "name": name,
            "active": true,
            "updatedAt": "2026-01-01T00:00:00Z",
            "nodes": [
                {"id": "n1", "name": "Start", "type": "n8n-nodes-base.manualTrigger", "position": [0, 0]}
            ],
            "connections": {}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_backup_writes_entities_and_manifest() {
        let config = test_config();
        let client = MemoryWorkflowClient::with_workflows(vec![
            prod_workflow("Order Sync-prod"),
            prod_workflow("Invoice Export-prod"),
        ]);
        let root = TempDir::new().unwrap();
        let engine = BackupEngine::new(&config, &client, root.path());

        let manifest = engine
            .create_backup(Environment::Prod, Some("test_backup"))
            .await
            .unwrap();
        assert_eq!(manifest.workflow_count, 2);
        assert_eq!(manifest.failed_count, 0);

        let dir = root.path().join("backups/test_backup");
        assert!(dir.join("order_sync.json").exists());
        assert!(dir.join("invoice_export.json").exists());
        assert!(dir.join(MANIFEST_FILE).exists());

        let files = list_entity_files(&dir).unwrap();
        assert_eq!(files.len(), manifest.workflow_count);
    }

    #[tokio::test]
    async fn test_create_backup_with_nothing_to_back_up() {
        let config: DeployConfig = serde_yaml::from_str(
            "server:\n  base_url: http://localhost\nworkflows: []\n",
        )
        .unwrap();
        let client = MemoryWorkflowClient::new();
        let root = TempDir::new().unwrap();
        let engine = BackupEngine::new(&config, &client, root.path());

        // Must not fail the caller; pipelines back up unconditionally
        let manifest = engine.create_backup(Environment::Prod, None).await.unwrap();
        assert_eq!(manifest.workflow_count, 0);
        assert_eq!(manifest.failed_count, 0);
    }

    #[tokio::test]
    async fn test_backup_restore_round_trip() {
        let config = test_config();
        let source = MemoryWorkflowClient::with_workflows(vec![
            prod_workflow("Order Sync-prod"),
            prod_workflow("Invoice Export-prod"),
        ]);
        let root = TempDir::new().unwrap();

        let manifest = BackupEngine::new(&config, &source, root.path())
            .create_backup(Environment::Prod, Some("round_trip"))
            .await
            .unwrap();
        assert_eq!(manifest.workflow_count, 2);

        // Restore against an empty instance: everything is created
        let target = MemoryWorkflowClient::new();
        let summary = BackupEngine::new(&config, &target, root.path())
            .restore_from_backup("round_trip", None)
            .await
            .unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.restored.len(), 2);
        assert!(summary.failures.is_empty());
        assert!(summary
            .restored
            .iter()
            .all(|r| r.action == ReconcileAction::Created));

        let remote = target.list_all().await.unwrap();
        assert_eq!(remote.len(), 2);

        // The restore summary sidecar landed in the backup directory
        let sidecars: Vec<_> = std::fs::read_dir(root.path().join("backups/round_trip"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("_restore_summary_")
            })
            .collect();
        assert_eq!(sidecars.len(), 1);
    }

    #[tokio::test]
    async fn test_restore_filters_by_base_name() {
        let config = test_config();
        let source = MemoryWorkflowClient::with_workflows(vec![
            prod_workflow("Order Sync-prod"),
            prod_workflow("Invoice Export-prod"),
        ]);
        let root = TempDir::new().unwrap();
        BackupEngine::new(&config, &source, root.path())
            .create_backup(Environment::Prod, Some("partial"))
            .await
            .unwrap();

        let target = MemoryWorkflowClient::new();
        let summary = BackupEngine::new(&config, &target, root.path())
            .restore_from_backup("partial", Some(&["Order Sync".to_string()]))
            .await
            .unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.restored[0].name, "Order Sync-prod");
    }

    #[tokio::test]
    async fn test_restore_missing_backup_is_precondition_failure() {
        let config = test_config();
        let client = MemoryWorkflowClient::new();
        let root = TempDir::new().unwrap();
        let engine = BackupEngine::new(&config, &client, root.path());

        let err = engine
            .restore_from_backup("no_such_backup", None)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowDeployError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_restore_skips_file_without_name_but_continues() {
        let config = test_config();
        let client = MemoryWorkflowClient::new();
        let root = TempDir::new().unwrap();

        let dir = root.path().join("backups/mixed");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("nameless.json"), r#"{"nodes": []}"#).unwrap();
        std::fs::write(
            dir.join("valid.json"),
            serde_json::to_string(&prod_workflow("Order Sync-prod")).unwrap(),
        )
        .unwrap();

        let summary = BackupEngine::new(&config, &client, root.path())
            .restore_from_backup("mixed", None)
            .await
            .unwrap();
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.restored.len(), 1);
        assert!(summary.failures[0].error.contains("no workflow name"));
    }

    #[tokio::test]
    async fn test_cleanup_keeps_newest_backups() {
        let config = test_config();
        let client = MemoryWorkflowClient::new();
        let root = TempDir::new().unwrap();
        let engine = BackupEngine::new(&config, &client, root.path());

        for i in 0..5 {
            let dir = root.path().join(format!("backups/backup_{i}"));
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("_backup_metadata.json"), "{}").unwrap();
            // Distinct creation times so the ordering is unambiguous
            std::thread::sleep(std::time::Duration::from_millis(20));
        }

        let deleted = engine.cleanup_old_backups(2).unwrap();
        assert_eq!(deleted.len(), 3);
        assert!(deleted.contains(&"backup_0".to_string()));
        assert!(deleted.contains(&"backup_1".to_string()));
        assert!(deleted.contains(&"backup_2".to_string()));

        let remaining = engine.list_backups().unwrap();
        let names: Vec<_> = remaining.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["backup_4", "backup_3"]);
    }
}
