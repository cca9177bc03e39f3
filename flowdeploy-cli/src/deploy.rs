//! Deploy command implementation

use crate::error::CliResult;
use crate::exit_codes::{EXIT_FAILURE, EXIT_SUCCESS};
use colored::*;
use flowdeploy::{DeployConfig, HttpWorkflowClient, PromotionEngine};
use std::path::Path;

pub async fn run_deploy_command(
    config: &DeployConfig,
    root: &Path,
    workflows: Vec<String>,
    version: Option<String>,
) -> CliResult<i32> {
    let client = HttpWorkflowClient::from_config(config)?;
    let engine = PromotionEngine::new(config, &client, root);

    println!("{}", "Deploying to prod".bold());
    let summary = engine.deploy(&workflows, version.as_deref()).await?;

    if let Some(backup) = &summary.backup {
        println!("  {} pre-deploy backup: {}", "•".blue(), backup);
    }
    for record in &summary.deployed {
        println!(
            "  {} {} -> {} ({:?}, id {})",
            "✓".green(),
            record.dev_name,
            record.prod_name,
            record.action,
            record.prod_id
        );
    }
    for failure in &summary.failures {
        println!("  {} {}: {}", "✗".red(), failure.name, failure.error);
    }
    println!(
        "\n{} deployed, {} failed",
        summary.deployed.len(),
        summary.failures.len()
    );

    Ok(if summary.failures.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}
