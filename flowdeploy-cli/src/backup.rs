//! Backup, list-backups, restore and cleanup-backups command implementations

use crate::cli::{EnvArg, OutputFormat};
use crate::error::CliResult;
use crate::exit_codes::{EXIT_FAILURE, EXIT_SUCCESS};
use colored::*;
use flowdeploy::{BackupEngine, DeployConfig, Environment, HttpWorkflowClient};
use std::path::Path;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

pub async fn run_backup_command(
    config: &DeployConfig,
    root: &Path,
    environment: EnvArg,
    name: Option<String>,
) -> CliResult<i32> {
    let env: Environment = environment.into();
    let client = HttpWorkflowClient::from_config(config)?;
    let engine = BackupEngine::new(config, &client, root);

    let manifest = engine.create_backup(env, name.as_deref()).await?;

    println!("{}", format!("Backup '{}'", manifest.backup_name).bold());
    for outcome in &manifest.workflows {
        match outcome.error {
            None => println!(
                "  {} {} ({} nodes)",
                "✓".green(),
                outcome.name,
                outcome.node_count
            ),
            Some(ref error) => println!("  {} {}: {}", "✗".red(), outcome.name, error),
        }
    }
    println!(
        "\n{} backed up, {} failed",
        manifest.workflow_count, manifest.failed_count
    );

    Ok(if manifest.failed_count == 0 {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Workflows")]
    workflows: usize,
}

pub fn run_list_backups_command(
    config: &DeployConfig,
    root: &Path,
    format: OutputFormat,
) -> CliResult<i32> {
    // Listing never touches the network; a throwaway in-memory client
    // satisfies the engine's constructor
    let client = flowdeploy::MemoryWorkflowClient::new();
    let engine = BackupEngine::new(config, &client, root);
    let backups = engine.list_backups()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&backups).unwrap_or_default());
        }
        OutputFormat::Table => {
            if backups.is_empty() {
                println!("No backups found");
                return Ok(EXIT_SUCCESS);
            }
            let rows: Vec<BackupRow> = backups
                .iter()
                .map(|b| BackupRow {
                    name: b.name.clone(),
                    created: b.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                    workflows: b.workflow_count,
                })
                .collect();
            let mut table = Table::new(rows);
            table
                .with(Style::rounded())
                .with(Modify::new(Rows::new(1..)).with(Alignment::left()));
            println!("{table}");
            println!("\n{} backups (newest first)", backups.len());
        }
    }

    Ok(EXIT_SUCCESS)
}

pub async fn run_restore_command(
    config: &DeployConfig,
    root: &Path,
    backup_name: String,
    workflows: Vec<String>,
) -> CliResult<i32> {
    let client = HttpWorkflowClient::from_config(config)?;
    let engine = BackupEngine::new(config, &client, root);

    let base_names = (!workflows.is_empty()).then_some(workflows.as_slice());
    let summary = engine.restore_from_backup(&backup_name, base_names).await?;

    println!("{}", format!("Restoring from '{backup_name}'").bold());
    for record in &summary.restored {
        let previous = match record.previous_active {
            Some(true) => " (was active)",
            Some(false) => " (was inactive)",
            None => "",
        };
        println!(
            "  {} {} ({:?}, id {}){}",
            "✓".green(),
            record.name,
            record.action,
            record.id,
            previous
        );
    }
    for failure in &summary.failures {
        println!("  {} {}: {}", "✗".red(), failure.name, failure.error);
    }
    println!(
        "\n{} of {} restored, {} failed",
        summary.restored.len(),
        summary.total,
        summary.failures.len()
    );

    Ok(if summary.failures.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}

pub fn run_cleanup_backups_command(
    config: &DeployConfig,
    root: &Path,
    keep: Option<usize>,
) -> CliResult<i32> {
    let client = flowdeploy::MemoryWorkflowClient::new();
    let engine = BackupEngine::new(config, &client, root);

    let keep_count = keep.unwrap_or(config.max_backups_to_keep);
    let deleted = engine.cleanup_old_backups(keep_count)?;

    if deleted.is_empty() {
        println!("Nothing to prune; keeping at most {keep_count} backups");
    } else {
        for name in &deleted {
            println!("  {} deleted {}", "✗".red(), name);
        }
        println!("\n{} backups deleted, {} kept at most", deleted.len(), keep_count);
    }

    Ok(EXIT_SUCCESS)
}
