//! Verify and compare command implementations

use crate::error::{CliError, CliResult};
use crate::exit_codes::{EXIT_FAILURE, EXIT_SUCCESS};
use colored::*;
use flowdeploy::{BackupAuditor, VerifyReport};
use std::path::Path;

fn print_report(report: &VerifyReport) {
    let headline = if report.passed() {
        format!("{} {}", "PASS".green().bold(), report.backup_name)
    } else {
        format!("{} {}", "FAIL".red().bold(), report.backup_name)
    };
    println!("{headline} ({} files)", report.files_checked);

    for error in &report.errors {
        println!("  {} {}", "error:".red(), error);
    }
    for warning in &report.warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
}

pub fn run_verify_command(
    root: &Path,
    backup_name: Option<String>,
    all: bool,
) -> CliResult<i32> {
    let auditor = BackupAuditor::new(root);

    let reports = if all {
        auditor.verify_all()?
    } else {
        let name = backup_name
            .ok_or_else(|| CliError::new("Provide a backup name or pass --all"))?;
        vec![auditor.verify(&name)?]
    };

    if reports.is_empty() {
        println!("No backups to verify");
        return Ok(EXIT_SUCCESS);
    }

    for report in &reports {
        print_report(report);
    }

    let failed = reports.iter().filter(|r| !r.passed()).count();
    println!(
        "\n{} verified, {} passed, {} failed",
        reports.len(),
        reports.len() - failed,
        failed
    );

    Ok(if failed == 0 { EXIT_SUCCESS } else { EXIT_FAILURE })
}

pub fn run_compare_command(root: &Path, backup_a: String, backup_b: String) -> CliResult<i32> {
    let auditor = BackupAuditor::new(root);
    let report = auditor.compare(&backup_a, &backup_b)?;

    println!(
        "{}",
        format!("Comparing '{}' and '{}'", report.backup_a, report.backup_b).bold()
    );

    for file in &report.only_in_a {
        println!("  {} only in {}: {}", "-".red(), report.backup_a, file);
    }
    for file in &report.only_in_b {
        println!("  {} only in {}: {}", "+".green(), report.backup_b, file);
    }
    for diff in &report.changed {
        println!("  {} {}", "~".yellow(), diff.file);
        for change in &diff.changes {
            println!("      {}", change.describe());
        }
    }

    if report.is_identical() {
        println!("\nBackups are identical");
        Ok(EXIT_SUCCESS)
    } else {
        println!("\n{} differences found", report.difference_count());
        Ok(EXIT_FAILURE)
    }
}
