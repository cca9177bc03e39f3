use clap::{Parser, Subcommand, ValueEnum};
use flowdeploy::Environment;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Environment argument accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum EnvArg {
    Dev,
    Staging,
    Prod,
}

impl From<EnvArg> for Environment {
    fn from(arg: EnvArg) -> Self {
        match arg {
            EnvArg::Dev => Environment::Dev,
            EnvArg::Staging => Environment::Staging,
            EnvArg::Prod => Environment::Prod,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "flowdeploy")]
#[command(version)]
#[command(about = "Promote, back up and restore automation workflows between environments")]
#[command(long_about = "
flowdeploy moves versioned workflow definitions between the development and
production namespaces of a remote automation instance. Workflows are
correlated by display name (base name plus environment suffix); exports live
as JSON files under workflows/, backups under backups/.

Example usage:
  flowdeploy export dev                    # Export all managed dev workflows
  flowdeploy deploy -w 'Order Sync' -v v1.2.0
  flowdeploy backup prod                   # Snapshot prod with a manifest
  flowdeploy verify --all                  # Check every backup offline
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the operator config file
    #[arg(long, global = true, default_value = "flowdeploy.yaml")]
    pub config: PathBuf,

    /// Working directory holding workflows/, backups/ and logs/
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export workflows from an environment to local JSON files
    #[command(long_about = "
Exports workflows from the remote instance to workflows/, one JSON file per
entity, named by the sanitized base name. Service-managed bookkeeping fields
and the remote id are never written to disk.

With --workflow flags, only the named base names are exported; otherwise
every workflow managed for the environment is.

Examples:
  flowdeploy export dev
  flowdeploy export prod -w 'Order Sync' -w 'Invoice Export'
")]
    Export {
        /// Source environment
        #[arg(value_enum)]
        environment: EnvArg,

        /// Base names to export (repeatable); all managed when omitted
        #[arg(short, long = "workflow", value_name = "BASE_NAME")]
        workflows: Vec<String>,
    },

    /// Import exported files into an environment
    #[command(long_about = "
Reads exported files from workflows/ and pushes them into the target
environment. Entities are renamed to the environment's display name when
needed (logged as a warning), environment variables are injected, and each
entity is reconciled by name: updated when it exists, created otherwise.

Examples:
  flowdeploy import dev
  flowdeploy import prod -w 'Order Sync' --version v1.3.0
")]
    Import {
        /// Target environment
        #[arg(value_enum)]
        environment: EnvArg,

        /// Base names to import (repeatable); all managed when omitted
        #[arg(short, long = "workflow", value_name = "BASE_NAME")]
        workflows: Vec<String>,

        /// Version stamp rendered into the workflow annotation
        #[arg(long)]
        version: Option<String>,
    },

    /// Promote exported dev workflows to production
    #[command(long_about = "
Promotes the locally exported dev copies of the given base names into the
production namespace. Unless disabled in the config, a pre-deploy backup of
production is taken first and old backups are pruned to the retention count.

The promoted copy never inherits dev's activation flag, webhook ids are
stripped, credential references are rewritten for production, and production
variables plus the version stamp are injected.

Examples:
  flowdeploy deploy -w 'Order Sync'
  flowdeploy deploy -w 'Order Sync' -w 'Invoice Export' --version v2.1.0
")]
    Deploy {
        /// Base names to promote (repeatable, at least one)
        #[arg(short, long = "workflow", value_name = "BASE_NAME", required = true)]
        workflows: Vec<String>,

        /// Version stamp injected into prod variables and the annotation
        #[arg(long)]
        version: Option<String>,
    },

    /// List managed workflows and their presence per environment
    List {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show every workflow on the remote instance
    Status {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Create a timestamped backup of an environment
    #[command(long_about = "
Snapshots every workflow managed for the environment into
backups/<name>/, one JSON file per entity plus a _backup_metadata.json
manifest, then prunes old backups to the configured retention count.

Examples:
  flowdeploy backup prod
  flowdeploy backup prod --name before_migration
")]
    Backup {
        /// Environment to back up
        #[arg(value_enum)]
        environment: EnvArg,

        /// Custom backup name instead of backup_<env>_<timestamp>
        #[arg(long)]
        name: Option<String>,
    },

    /// List backups, newest first
    ListBackups {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Restore a backup through the create-or-update reconciliation path
    #[command(long_about = "
Restores all (or a subset of) workflows from a named backup. Each file is
reconciled by display name against the remote instance: updated when it
exists, created otherwise. A _restore_summary_<timestamp>.json sidecar is
written into the backup directory, recording per-entity outcomes and the
previous activation state.

Examples:
  flowdeploy restore backup_prod_20260801_120000
  flowdeploy restore backup_prod_20260801_120000 -w 'Order Sync'
")]
    Restore {
        /// Name of the backup directory to restore from
        backup_name: String,

        /// Base names to restore (repeatable); everything when omitted
        #[arg(short, long = "workflow", value_name = "BASE_NAME")]
        workflows: Vec<String>,
    },

    /// Delete old backups beyond the retention count
    CleanupBackups {
        /// How many backups to keep; defaults to the configured retention
        #[arg(long)]
        keep: Option<usize>,
    },

    /// Verify a backup's structural integrity offline
    #[command(long_about = "
Checks a backup without touching the network: manifest presence and fields,
per-file JSON structure, node name/type presence, duplicate names, age and
plausible size. Errors fail the backup; warnings do not.

Exit codes:
  0 - All checked backups pass
  1 - Errors found (or the backup does not exist)

Examples:
  flowdeploy verify backup_prod_20260801_120000
  flowdeploy verify --all
")]
    Verify {
        /// Backup name to verify
        backup_name: Option<String>,

        /// Verify every backup
        #[arg(long)]
        all: bool,
    },

    /// Structurally compare two backups
    #[command(long_about = "
Compares two backups file by file: entities present in only one of them, and
for common files the name, activation flag, node count, node-type set, tag
set and connection topology. Exit code 1 when any difference is found.

Example:
  flowdeploy compare backup_prod_20260801_120000 backup_prod_20260802_120000
")]
    Compare {
        /// First backup name
        backup_a: String,

        /// Second backup name
        backup_b: String,
    },

    /// Show release versions and the structural changelog for a workflow
    #[command(long_about = "
Shows the workflow's current released version (from Git tags named
<git-safe-base-name>-v<semver>), the suggested next version, and a structural
changelog of the exported file against the production branch.

Examples:
  flowdeploy release 'Order Sync'
  flowdeploy release 'Order Sync' --tag     # also create the annotated tag
")]
    Release {
        /// Base name of the workflow
        workflow: String,

        /// Create the annotated tag for the suggested next version
        #[arg(long)]
        tag: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
