//! # FlowDeploy
//!
//! Environment promotion and backup/restore for automation-platform workflow
//! definitions: move versioned workflows between a development and a
//! production namespace inside a single remote instance, with filesystem
//! export/import, Git-based release tagging, and timestamped, verifiable
//! backups.
//!
//! ## Features
//!
//! - **Name codec**: canonical base names vs environment-suffixed display
//!   names vs filesystem-safe file names
//! - **Variable injection**: rewrite a designated configuration node with
//!   environment-specific values and a version annotation
//! - **Promotion**: export, deploy and import with name-keyed
//!   create-or-update reconciliation against the remote service
//! - **Backups**: timestamped snapshots with manifests, restore, retention
//!   pruning, offline verification and structural comparison
//! - **Releases**: semantic version tags derived from Git history plus
//!   structural changelogs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowdeploy::{DeployConfig, Environment, HttpWorkflowClient, PromotionEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DeployConfig::load(std::path::Path::new("flowdeploy.yaml"))?;
//! let client = HttpWorkflowClient::from_config(&config)?;
//! let engine = PromotionEngine::new(&config, &client, std::path::Path::new("."));
//!
//! let summary = engine.export(Environment::Dev, None).await?;
//! println!("{} exported, {} failed", summary.succeeded, summary.failed);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Offline verification and comparison of backups
pub mod audit;

/// Backup creation, listing, restore and retention pruning
pub mod backup;

/// Client boundary for the remote workflow service
pub mod client;

/// Operator configuration
pub mod config;

/// Error types
pub mod error;

/// File system helpers
pub mod fs_utils;

/// Variable injection into workflow node graphs
pub mod inject;

/// Name mapping between base names, display names and file names
pub mod names;

/// Export, deploy and import orchestration
pub mod promote;

/// Git-backed release tagging and change analysis
pub mod release;

/// The workflow entity model
pub mod workflow;

pub use audit::{BackupAuditor, Change, CompareReport, FileDiff, VerifyReport};
pub use backup::{BackupEngine, BackupInfo, BackupManifest, RestoreRecord, RestoreSummary};
pub use client::{HttpWorkflowClient, MemoryWorkflowClient, WorkflowClient};
pub use config::{
    CredentialRef, DeployConfig, Environment, ManagedWorkflow, ServerConfig, UnmatchedSuffixPolicy,
};
pub use error::{FlowDeployError, Result};
pub use inject::inject_variables;
pub use names::NameCodec;
pub use promote::{
    DeployRecord, DeploySummary, EntityFailure, ExportOutcome, ExportSummary, ImportRecord,
    ImportSummary, OutcomeStatus, PromotionEngine, ReconcileAction,
};
pub use release::{git_safe_name, suggest_next_version, ReleaseCoordinator, Version};
pub use workflow::{Node, NodeKind, Workflow};
