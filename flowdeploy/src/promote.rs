//! Export, deploy and import of workflows between environments
//!
//! Every batch operation here follows the same discipline: fetch one fresh
//! remote snapshot, process entities strictly in input order, catch each
//! entity's failure into a status record, and finish with a summary that is
//! producible even under partial failure. Only hard preconditions abort the
//! whole invocation.

use crate::backup::BackupEngine;
use crate::client::WorkflowClient;
use crate::config::{DeployConfig, Environment, ManagedWorkflow};
use crate::error::{FlowDeployError, Result};
use crate::fs_utils::write_json_atomic;
use crate::inject::inject_variables;
use crate::names::NameCodec;
use crate::workflow::Workflow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Terminal state of one entity within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// The entity was processed to completion
    Success,
    /// The entity failed; the record carries the message
    Failed,
}

/// Per-entity record produced by export and backup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOutcome {
    /// Display name of the entity
    pub name: String,
    /// Canonical base name
    pub base_name: String,
    /// Environment the entity was exported from
    pub environment: Environment,
    /// File the entity was written to
    pub file_name: String,
    /// Terminal state
    pub status: OutcomeStatus,
    /// Live activation state at export time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Number of nodes in the exported representation
    #[serde(default)]
    pub node_count: usize,
    /// Failure message when status is `failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExportOutcome {
    fn failed(name: &str, base_name: &str, env: Environment, file_name: &str, error: String) -> Self {
        Self {
            name: name.to_string(),
            base_name: base_name.to_string(),
            environment: env,
            file_name: file_name.to_string(),
            status: OutcomeStatus::Failed,
            active: None,
            node_count: 0,
            error: Some(error),
        }
    }
}

/// Batch summary for an export run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    /// Environment exported from
    pub environment: Environment,
    /// When the batch ran
    pub exported_at: DateTime<Utc>,
    /// Total entities attempted
    pub total: usize,
    /// How many succeeded
    pub succeeded: usize,
    /// How many failed
    pub failed: usize,
    /// Per-entity records, in input order
    pub workflows: Vec<ExportOutcome>,
}

impl ExportSummary {
    fn from_outcomes(environment: Environment, workflows: Vec<ExportOutcome>) -> Self {
        let succeeded = workflows
            .iter()
            .filter(|o| o.status == OutcomeStatus::Success)
            .count();
        Self {
            environment,
            exported_at: Utc::now(),
            total: workflows.len(),
            succeeded,
            failed: workflows.len() - succeeded,
            workflows,
        }
    }
}

/// Whether reconciliation created a new entity or updated an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileAction {
    /// No entity with the target name existed; one was created
    Created,
    /// An entity with the target name existed and was updated in place
    Updated,
}

/// Result of pushing one entity through the create-or-update path
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// What happened
    pub action: ReconcileAction,
    /// Remote id of the created or updated entity
    pub id: String,
    /// The matched entity's activation state before the update, if any
    pub previous_active: Option<bool>,
}

/// Per-entity record produced by deploy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRecord {
    /// Canonical base name
    pub base_name: String,
    /// Created or updated
    pub action: ReconcileAction,
    /// Source display name read from the exported dev file
    pub dev_name: String,
    /// Target display name in production
    pub prod_name: String,
    /// Remote id of the production entity
    pub prod_id: String,
}

/// A per-entity failure inside a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityFailure {
    /// The entity the failure belongs to (base name or display name)
    pub name: String,
    /// The underlying failure message
    pub error: String,
}

/// Batch summary for a deploy run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploySummary {
    /// Version stamp applied, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Name of the pre-deploy backup, when one was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    /// Successful records, in input order
    pub deployed: Vec<DeployRecord>,
    /// Failures, in input order
    pub failures: Vec<EntityFailure>,
}

/// Per-entity record produced by import
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    /// Canonical base name
    pub base_name: String,
    /// Target display name
    pub name: String,
    /// Created or updated
    pub action: ReconcileAction,
    /// Remote id of the target entity
    pub id: String,
}

/// Batch summary for an import run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Environment imported into
    pub environment: Environment,
    /// When the batch ran
    pub imported_at: DateTime<Utc>,
    /// Successful records, in input order
    pub imported: Vec<ImportRecord>,
    /// Failures, in input order
    pub failures: Vec<EntityFailure>,
}

/// Push one entity through the name-keyed create-or-update path.
///
/// The match is exact display-name equality against the remote list fetched
/// at the start of the batch; no fuzzy matching, no id reuse. `seen` carries
/// the target names already reconciled in this batch: a second entity
/// resolving to the same name fails loudly instead of risking a silent
/// duplicate at the remote service.
pub(crate) async fn reconcile(
    client: &dyn WorkflowClient,
    remote: &[Workflow],
    workflow: &Workflow,
    seen: &mut BTreeSet<String>,
) -> Result<Reconciled> {
    let name = workflow.name.clone();
    if !seen.insert(name.clone()) {
        return Err(FlowDeployError::Other(format!(
            "Target name '{name}' was already reconciled in this batch; refusing to continue \
             with a duplicate"
        )));
    }

    let matches: Vec<&Workflow> = remote.iter().filter(|w| w.name == name).collect();
    if matches.len() > 1 {
        return Err(FlowDeployError::Other(format!(
            "Remote has {} workflows named '{name}'; resolve the duplicates manually",
            matches.len()
        )));
    }

    match matches.first() {
        Some(existing) => {
            let id = existing
                .id
                .clone()
                .ok_or_else(|| FlowDeployError::remote("update", &name, "remote entity has no id"))?;
            client.update_by_id(&id, workflow).await?;
            Ok(Reconciled {
                action: ReconcileAction::Updated,
                id,
                previous_active: existing.active,
            })
        }
        None => {
            let created = client.create(workflow).await?;
            Ok(Reconciled {
                action: ReconcileAction::Created,
                id: created.id.unwrap_or_default(),
                previous_active: None,
            })
        }
    }
}

/// Rewrite per-node credential references to the environment's configured
/// credentials, keyed by credential type. Nodes referencing credential types
/// the config does not cover are left alone.
pub(crate) fn rewrite_credentials(
    workflow: &mut Workflow,
    managed: &ManagedWorkflow,
    env: Environment,
) {
    let Some(replacements) = managed.credentials.get(&env) else {
        return;
    };
    let Some(nodes) = &mut workflow.nodes else {
        return;
    };
    for node in nodes {
        let Some(serde_json::Value::Object(node_creds)) = node.extra.get_mut("credentials") else {
            continue;
        };
        for (cred_type, replacement) in replacements {
            if node_creds.contains_key(cred_type.as_str()) {
                node_creds.insert(
                    cred_type.clone(),
                    json!({ "id": replacement.id, "name": replacement.name }),
                );
            }
        }
    }
}

/// Orchestrates export, deploy and import
pub struct PromotionEngine<'a> {
    config: &'a DeployConfig,
    codec: NameCodec,
    client: &'a dyn WorkflowClient,
    root: PathBuf,
}

impl<'a> PromotionEngine<'a> {
    /// Build an engine rooted at the working directory that holds
    /// `workflows/`, `backups/` and `logs/`
    pub fn new(config: &'a DeployConfig, client: &'a dyn WorkflowClient, root: &Path) -> Self {
        Self {
            config,
            codec: NameCodec::new(config),
            client,
            root: root.to_path_buf(),
        }
    }

    /// Directory holding exported entity files
    pub fn workflows_dir(&self) -> PathBuf {
        self.root.join("workflows")
    }

    fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Export workflows from an environment to disk.
    ///
    /// With explicit `base_names`, the remote list is filtered to entities in
    /// the environment whose base name is requested; otherwise every managed
    /// workflow configured for the environment is exported. One record per
    /// entity; failures never abort siblings.
    pub async fn export(
        &self,
        env: Environment,
        base_names: Option<&[String]>,
    ) -> Result<ExportSummary> {
        let remote = self.client.list_all().await?;

        // (base name, expected display name) in input order
        let targets: Vec<(String, String)> = match base_names {
            Some(names) => {
                let mut targets = Vec::new();
                for base in names {
                    let matched = remote.iter().find(|w| {
                        self.codec.environment_of(&w.name) == Some(env)
                            && self.codec.base_name(&w.name) == base.as_str()
                    });
                    match matched {
                        Some(w) => targets.push((base.clone(), w.name.clone())),
                        None => targets.push((base.clone(), self.codec.display_name(base, env)?)),
                    }
                }
                targets
            }
            None => {
                let mut targets = Vec::new();
                for managed in self.config.workflows_for(env) {
                    targets.push((
                        managed.base_name.clone(),
                        self.codec.display_name(&managed.base_name, env)?,
                    ));
                }
                targets
            }
        };

        let mut outcomes = Vec::with_capacity(targets.len());
        for (base_name, display_name) in &targets {
            let file_name = self.codec.file_name(display_name);
            match self.export_one(&remote, display_name, &file_name).await {
                Ok(outcome) => {
                    info!("Exported '{}' to {}", display_name, outcome.file_name);
                    outcomes.push(outcome);
                }
                Err(e) => {
                    warn!("Export failed for '{}': {}", display_name, e);
                    outcomes.push(ExportOutcome::failed(
                        display_name,
                        base_name,
                        env,
                        &file_name,
                        e.to_string(),
                    ));
                }
            }
        }

        let summary = ExportSummary::from_outcomes(env, outcomes);
        write_json_atomic(
            &self.logs_dir().join(format!("_export_summary_{env}.json")),
            &summary,
        )?;
        Ok(summary)
    }

    async fn export_one(
        &self,
        remote: &[Workflow],
        display_name: &str,
        file_name: &str,
    ) -> Result<ExportOutcome> {
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

        write_json_atomic(&self.workflows_dir().join(file_name), &full)?;

        Ok(ExportOutcome {
            name: display_name.to_string(),
            base_name: self.codec.base_name(display_name).to_string(),
            environment: self.codec.environment_of(display_name).unwrap_or(Environment::Dev),
            file_name: file_name.to_string(),
            status: OutcomeStatus::Success,
            active,
            node_count,
            error: None,
        })
    }

    /// Promote exported dev copies of the given base names to production.
    ///
    /// Reads the locally exported dev files (a deploy never fetches fresh dev
    /// state), strips the activation flag and webhook ids, rewrites
    /// credential references, injects production variables and the version
    /// stamp, and reconciles each entity by its production display name.
    pub async fn deploy(
        &self,
        base_names: &[String],
        version: Option<&str>,
    ) -> Result<DeploySummary> {
        let workflows_dir = self.workflows_dir();
        let resolvable = base_names
            .iter()
            .filter(|base| {
                self.codec
                    .display_name(base, Environment::Dev)
                    .map(|name| workflows_dir.join(self.codec.file_name(&name)).exists())
                    .unwrap_or(false)
            })
            .count();
        if resolvable == 0 {
            return Err(FlowDeployError::Precondition(
                "No exported dev workflows found for the requested base names; run export first"
                    .to_string(),
            ));
        }

        let backup = if self.config.backup_before_deploy {
            let engine = BackupEngine::new(self.config, self.client, &self.root);
            let name = format!("pre_deploy_auto_{}", Utc::now().format("%Y%m%d_%H%M%S"));
            // create_backup prunes to the retention count after writing
            let manifest = engine.create_backup(Environment::Prod, Some(&name)).await?;
            Some(manifest.backup_name)
        } else {
            None
        };

        let remote = self.client.list_all().await?;
        let mut seen = BTreeSet::new();
        let mut deployed = Vec::new();
        let mut failures = Vec::new();

        for base_name in base_names {
            match self
                .deploy_one(&remote, base_name, version, &mut seen)
                .await
            {
                Ok(record) => {
                    info!(
                        "Deployed '{}' as '{}' ({:?})",
                        record.dev_name, record.prod_name, record.action
                    );
                    deployed.push(record);
                }
                Err(e) => {
                    warn!("Deploy failed for '{}': {}", base_name, e);
                    failures.push(EntityFailure {
                        name: base_name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(DeploySummary {
            version: version.map(str::to_string),
            backup,
            deployed,
            failures,
        })
    }

    async fn deploy_one(
        &self,
        remote: &[Workflow],
        base_name: &str,
        version: Option<&str>,
        seen: &mut BTreeSet<String>,
    ) -> Result<DeployRecord> {
        let dev_name = self.codec.display_name(base_name, Environment::Dev)?;
        let prod_name = self.codec.display_name(base_name, Environment::Prod)?;
        let path = self.workflows_dir().join(self.codec.file_name(&dev_name));

        let content = std::fs::read_to_string(&path).map_err(|e| {
            FlowDeployError::validation(
                &path,
                format!("Cannot read exported dev copy: {e}; run export first"),
            )
        })?;
        let mut workflow: Workflow = serde_json::from_str(&content)
            .map_err(|e| FlowDeployError::validation(&path, format!("Invalid workflow file: {e}")))?;

        let source_name = workflow.name.clone();
        workflow.name = prod_name.clone();
        workflow.sanitize_for_push();
        // Promoted entities never inherit dev's activation flag
        workflow.active = None;
        workflow.strip_webhook_ids();
        if let Some(managed) = self.config.find_workflow(base_name) {
            rewrite_credentials(&mut workflow, managed, Environment::Prod);
        }
        inject_variables(self.config, &mut workflow, base_name, Environment::Prod, version);

        let reconciled = reconcile(self.client, remote, &workflow, seen).await?;
        Ok(DeployRecord {
            base_name: base_name.to_string(),
            action: reconciled.action,
            dev_name: source_name,
            prod_name,
            prod_id: reconciled.id,
        })
    }

    /// Import exported files into an environment.
    ///
    /// Like deploy, except source and target environment coincide: files are
    /// read directly, renamed to the environment's display name when they do
    /// not already match (logged as a warning), injected, and reconciled.
    pub async fn import(
        &self,
        env: Environment,
        base_names: Option<&[String]>,
        version: Option<&str>,
    ) -> Result<ImportSummary> {
        let names: Vec<String> = match base_names {
            Some(names) => names.to_vec(),
            None => self
                .config
                .workflows_for(env)
                .iter()
                .map(|w| w.base_name.clone())
                .collect(),
        };
        if names.is_empty() {
            return Err(FlowDeployError::Precondition(format!(
                "No workflows to import into {env}"
            )));
        }

        let remote = self.client.list_all().await?;
        let mut seen = BTreeSet::new();
        let mut imported = Vec::new();
        let mut failures = Vec::new();

        for base_name in &names {
            match self
                .import_one(&remote, base_name, env, version, &mut seen)
                .await
            {
                Ok(record) => imported.push(record),
                Err(e) => {
                    warn!("Import failed for '{}': {}", base_name, e);
                    failures.push(EntityFailure {
                        name: base_name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let summary = ImportSummary {
            environment: env,
            imported_at: Utc::now(),
            imported,
            failures,
        };
        write_json_atomic(
            &self.logs_dir().join(format!("_import_summary_{env}.json")),
            &summary,
        )?;
        Ok(summary)
    }

    async fn import_one(
        &self,
        remote: &[Workflow],
        base_name: &str,
        env: Environment,
        version: Option<&str>,
        seen: &mut BTreeSet<String>,
    ) -> Result<ImportRecord> {
        let target_name = self.codec.display_name(base_name, env)?;
        let path = self
            .workflows_dir()
            .join(self.codec.file_name(&target_name));

        let content = std::fs::read_to_string(&path).map_err(|e| {
            FlowDeployError::validation(&path, format!("Cannot read exported copy: {e}"))
        })?;
        let mut workflow: Workflow = serde_json::from_str(&content)
            .map_err(|e| FlowDeployError::validation(&path, format!("Invalid workflow file: {e}")))?;

        if workflow.name != target_name {
            warn!(
                "Renaming '{}' to '{}' to match the {env} environment",
                workflow.name, target_name
            );
            workflow.name = target_name.clone();
        }
        workflow.sanitize_for_push();
        workflow.active = None;
        if let Some(managed) = self.config.find_workflow(base_name) {
            rewrite_credentials(&mut workflow, managed, env);
        }
        inject_variables(self.config, &mut workflow, base_name, env, version);

        let reconciled = reconcile(self.client, remote, &workflow, seen).await?;
        Ok(ImportRecord {
            base_name: base_name.to_string(),
            name: target_name,
            action: reconciled.action,
            id: reconciled.id,
        })
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
backup_before_deploy: false
workflows:
  - base_name: Order Sync
    variables:
      dev:
        apiUrl: https://dev.example.com
      prod:
        apiUrl: https://prod.example.com
    credentials:
      prod:
        httpHeaderAuth:
          id: "prod-cred-1"
          name: Prod Header Auth
"#,
        )
        .unwrap()
    }

    fn dev_workflow() -> Workflow {
        serde_json::from_value(json!({
            "name": "Order Sync-dev",
            "active": true,
            "createdAt": "2026-01-01T00:00:00Z",
            "versionId": "v1",
            "nodes": [
                {
                    "id": "n1",
                    "name": "Webhook Trigger",
                    "type": "n8n-nodes-base.webhookTrigger",
                    "position": [0, 0],
                    "webhookId": "dev-hook",
                    "credentials": {
                        "httpHeaderAuth": {"id": "dev-cred-9", "name": "Dev Header Auth"}
                    }
                },
                {
                    "id": "n2",
                    "name": "Configuration",
                    "type": "n8n-nodes-base.code",
                    "typeVersion": 2,
                    "parameters": {"jsCode": "return {};"},
                    "position": [200, 0]
                }
            ],
            "connections": {
                "Webhook Trigger": {"main": [[{"node": "Configuration", "type": "main", "index": 0}]]}
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_export_writes_file_and_summary() {
        let config = test_config();
        let client = MemoryWorkflowClient::with_workflows(vec![dev_workflow()]);
        let root = TempDir::new().unwrap();
        let engine = PromotionEngine::new(&config, &client, root.path());

        let summary = engine.export(Environment::Dev, None).await.unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.workflows[0].file_name, "order_sync.json");
        assert_eq!(summary.workflows[0].active, Some(true));

        let exported = crate::fs_utils::read_json(
            &root.path().join("workflows").join("order_sync.json"),
        )
        .unwrap();
        // Bookkeeping and id are never persisted to files
        assert!(exported.get("id").is_none());
        assert!(exported.get("createdAt").is_none());
        assert_eq!(exported["name"], "Order Sync-dev");

        assert!(root
            .path()
            .join("logs")
            .join("_export_summary_dev.json")
            .exists());
    }

    #[tokio::test]
    async fn test_export_records_missing_entity_as_failure() {
        let config = test_config();
        let client = MemoryWorkflowClient::new();
        let root = TempDir::new().unwrap();
        let engine = PromotionEngine::new(&config, &client, root.path());

        let summary = engine.export(Environment::Dev, None).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.workflows[0].status, OutcomeStatus::Failed);
        assert!(summary.workflows[0].error.as_ref().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_deploy_creates_then_updates() {
        let config = test_config();
        let client = MemoryWorkflowClient::with_workflows(vec![dev_workflow()]);
        let root = TempDir::new().unwrap();
        let engine = PromotionEngine::new(&config, &client, root.path());

        engine.export(Environment::Dev, None).await.unwrap();

        let names = vec!["Order Sync".to_string()];
        let first = engine.deploy(&names, Some("v1.0.0")).await.unwrap();
        assert_eq!(first.deployed.len(), 1);
        assert_eq!(first.deployed[0].action, ReconcileAction::Created);
        assert_eq!(first.deployed[0].prod_name, "Order Sync-prod");

        let second = engine.deploy(&names, Some("v1.0.1")).await.unwrap();
        assert_eq!(second.deployed[0].action, ReconcileAction::Updated);

        // Exactly one production entity exists after both runs
        let remote = client.list_all().await.unwrap();
        let prod: Vec<_> = remote
            .iter()
            .filter(|w| w.name == "Order Sync-prod")
            .collect();
        assert_eq!(prod.len(), 1);
    }

    #[tokio::test]
    async fn test_deploy_strips_active_and_webhooks_and_rewrites_credentials() {
        let config = test_config();
        let client = MemoryWorkflowClient::with_workflows(vec![dev_workflow()]);
        let root = TempDir::new().unwrap();
        let engine = PromotionEngine::new(&config, &client, root.path());

        engine.export(Environment::Dev, None).await.unwrap();
        engine
            .deploy(&["Order Sync".to_string()], Some("v1.0.0"))
            .await
            .unwrap();

        let remote = client.list_all().await.unwrap();
        let prod = remote.iter().find(|w| w.name == "Order Sync-prod").unwrap();

        // Activation was stripped from the push body; the memory client's
        // create default applies
        assert_eq!(prod.active, Some(false));

        let trigger = prod.find_node("Webhook Trigger").unwrap();
        assert!(!trigger.extra.contains_key("webhookId"));
        assert_eq!(
            trigger.extra["credentials"]["httpHeaderAuth"]["id"],
            "prod-cred-1"
        );

        // Prod variables plus the version stamp landed in the config node
        let script = prod.find_node("Configuration").unwrap().parameters.as_ref().unwrap()
            ["jsCode"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(script.contains("prod.example.com"));
        assert!(script.contains("v1.0.0"));
    }

    #[tokio::test]
    async fn test_deploy_without_export_is_precondition_failure() {
        let config = test_config();
        let client = MemoryWorkflowClient::new();
        let root = TempDir::new().unwrap();
        let engine = PromotionEngine::new(&config, &client, root.path());

        let err = engine
            .deploy(&["Order Sync".to_string()], None)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowDeployError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_import_renames_to_target_environment() {
        let config = test_config();
        let client = MemoryWorkflowClient::with_workflows(vec![dev_workflow()]);
        let root = TempDir::new().unwrap();
        let engine = PromotionEngine::new(&config, &client, root.path());

        engine.export(Environment::Dev, None).await.unwrap();

        let summary = engine
            .import(Environment::Prod, Some(&["Order Sync".to_string()]), None)
            .await
            .unwrap();
        assert_eq!(summary.imported.len(), 1);
        assert_eq!(summary.imported[0].name, "Order Sync-prod");
        assert_eq!(summary.imported[0].action, ReconcileAction::Created);
    }

    #[tokio::test]
    async fn test_reconcile_rejects_batch_duplicates() {
        let client = MemoryWorkflowClient::new();
        let workflow: Workflow = serde_json::from_value(json!({"name": "X-prod"})).unwrap();
        let mut seen = BTreeSet::new();

        reconcile(&client, &[], &workflow, &mut seen).await.unwrap();
        let err = reconcile(&client, &[], &workflow, &mut seen)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already reconciled"));
    }

    #[tokio::test]
    async fn test_reconcile_rejects_remote_duplicates() {
        let client = MemoryWorkflowClient::new();
        let a: Workflow =
            serde_json::from_value(json!({"id": "1", "name": "X-prod"})).unwrap();
        let b: Workflow =
            serde_json::from_value(json!({"id": "2", "name": "X-prod"})).unwrap();
        let workflow: Workflow = serde_json::from_value(json!({"name": "X-prod"})).unwrap();
        let mut seen = BTreeSet::new();

        let err = reconcile(&client, &[a, b], &workflow, &mut seen)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("resolve the duplicates"));
    }
}
