//! Release command implementation

use crate::error::CliResult;
use crate::exit_codes::EXIT_SUCCESS;
use colored::*;
use flowdeploy::{suggest_next_version, DeployConfig, ReleaseCoordinator};
use std::path::Path;

pub fn run_release_command(
    config: &DeployConfig,
    root: &Path,
    workflow: String,
    tag: bool,
) -> CliResult<i32> {
    let coordinator = ReleaseCoordinator::new(config, root)?;

    let current = coordinator.current_version(&workflow)?;
    let next = suggest_next_version(current.as_ref());

    println!("{}", workflow.bold());
    match current {
        Some(version) => println!("  current version: {version}"),
        None => println!("  current version: no releases yet"),
    }
    println!("  suggested next:  {next}");

    match coordinator.analyze_changes(&workflow, &next) {
        Ok(changelog) => {
            println!("\n{changelog}");
        }
        Err(e) => {
            // Change analysis needs an exported, committed copy; its absence
            // is informational here, not fatal
            println!("\n  {} no changelog: {}", "!".yellow(), e);
        }
    }

    if tag {
        let created = coordinator.create_tag(
            &workflow,
            &next,
            &format!("Release {next} of {workflow}"),
        )?;
        println!("{} tagged {}", "✓".green(), created);
    }

    Ok(EXIT_SUCCESS)
}
