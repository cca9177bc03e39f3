//! Export and import command implementations

use crate::cli::EnvArg;
use crate::error::CliResult;
use crate::exit_codes::{EXIT_FAILURE, EXIT_SUCCESS};
use colored::*;
use flowdeploy::{
    DeployConfig, Environment, HttpWorkflowClient, OutcomeStatus, PromotionEngine,
};
use std::path::Path;

pub async fn run_export_command(
    config: &DeployConfig,
    root: &Path,
    environment: EnvArg,
    workflows: Vec<String>,
) -> CliResult<i32> {
    let env: Environment = environment.into();
    let client = HttpWorkflowClient::from_config(config)?;
    let engine = PromotionEngine::new(config, &client, root);

    let base_names = (!workflows.is_empty()).then_some(workflows.as_slice());
    let summary = engine.export(env, base_names).await?;

    println!("{}", format!("Exporting from {env}").bold());
    for outcome in &summary.workflows {
        match outcome.status {
            OutcomeStatus::Success => println!(
                "  {} {} -> {} ({} nodes)",
                "✓".green(),
                outcome.name,
                outcome.file_name,
                outcome.node_count
            ),
            OutcomeStatus::Failed => println!(
                "  {} {}: {}",
                "✗".red(),
                outcome.name,
                outcome.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    println!(
        "\n{} total, {} exported, {} failed",
        summary.total, summary.succeeded, summary.failed
    );

    Ok(if summary.failed == 0 {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}

pub async fn run_import_command(
    config: &DeployConfig,
    root: &Path,
    environment: EnvArg,
    workflows: Vec<String>,
    version: Option<String>,
) -> CliResult<i32> {
    let env: Environment = environment.into();
    let client = HttpWorkflowClient::from_config(config)?;
    let engine = PromotionEngine::new(config, &client, root);

    let base_names = (!workflows.is_empty()).then_some(workflows.as_slice());
    let summary = engine.import(env, base_names, version.as_deref()).await?;

    println!("{}", format!("Importing into {env}").bold());
    for record in &summary.imported {
        println!(
            "  {} {} ({:?}, id {})",
            "✓".green(),
            record.name,
            record.action,
            record.id
        );
    }
    for failure in &summary.failures {
        println!("  {} {}: {}", "✗".red(), failure.name, failure.error);
    }
    println!(
        "\n{} imported, {} failed",
        summary.imported.len(),
        summary.failures.len()
    );

    Ok(if summary.failures.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}
