use std::process;

mod backup;
mod cli;
mod deploy;
mod error;
mod exit_codes;
mod export;
mod list;
mod release;
mod verify;

use clap::CommandFactory;
use cli::{Cli, Commands};
use error::{handle_cli_result, CliError, CliResult};
use exit_codes::EXIT_SUCCESS;
use flowdeploy::DeployConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    if cli.command.is_none() {
        Cli::command().print_help().expect("Failed to print help");
        process::exit(EXIT_SUCCESS);
    }

    use tracing::Level;
    let log_level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level)
        .init();

    // No color codes when piping output into files or other tools
    use is_terminal::IsTerminal;
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let exit_code = handle_cli_result(run_command(cli).await);
    process::exit(exit_code);
}

fn load_config(cli: &Cli) -> CliResult<DeployConfig> {
    DeployConfig::load(&cli.config).map_err(|e| {
        CliError::from_error(e)
    })
}

async fn run_command(cli: Cli) -> CliResult<i32> {
    let root = cli.dir.clone();
    match cli.command.as_ref().expect("command checked above") {
        Commands::Export {
            environment,
            workflows,
        } => {
            let config = load_config(&cli)?;
            export::run_export_command(&config, &root, *environment, workflows.clone()).await
        }
        Commands::Import {
            environment,
            workflows,
            version,
        } => {
            let config = load_config(&cli)?;
            export::run_import_command(
                &config,
                &root,
                *environment,
                workflows.clone(),
                version.clone(),
            )
            .await
        }
        Commands::Deploy { workflows, version } => {
            let config = load_config(&cli)?;
            deploy::run_deploy_command(&config, &root, workflows.clone(), version.clone()).await
        }
        Commands::List { format } => {
            let config = load_config(&cli)?;
            list::run_list_command(&config, *format).await
        }
        Commands::Status { format } => {
            let config = load_config(&cli)?;
            list::run_status_command(&config, *format).await
        }
        Commands::Backup { environment, name } => {
            let config = load_config(&cli)?;
            backup::run_backup_command(&config, &root, *environment, name.clone()).await
        }
        Commands::ListBackups { format } => {
            let config = load_config(&cli)?;
            backup::run_list_backups_command(&config, &root, *format)
        }
        Commands::Restore {
            backup_name,
            workflows,
        } => {
            let config = load_config(&cli)?;
            backup::run_restore_command(&config, &root, backup_name.clone(), workflows.clone())
                .await
        }
        Commands::CleanupBackups { keep } => {
            let config = load_config(&cli)?;
            backup::run_cleanup_backups_command(&config, &root, *keep)
        }
        // Verification and comparison are offline; no config required
        Commands::Verify { backup_name, all } => {
            verify::run_verify_command(&root, backup_name.clone(), *all)
        }
        Commands::Compare { backup_a, backup_b } => {
            verify::run_compare_command(&root, backup_a.clone(), backup_b.clone())
        }
        Commands::Release { workflow, tag } => {
            let config = load_config(&cli)?;
            release::run_release_command(&config, &root, workflow.clone(), *tag)
        }
    }
}
