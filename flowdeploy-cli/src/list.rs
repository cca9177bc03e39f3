//! List and status command implementations

use crate::cli::OutputFormat;
use crate::error::CliResult;
use crate::exit_codes::EXIT_SUCCESS;
use flowdeploy::{
    DeployConfig, Environment, HttpWorkflowClient, NameCodec, WorkflowClient,
};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Tabled)]
struct ManagedRow {
    #[tabled(rename = "Base Name")]
    base_name: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Dev")]
    dev: String,
    #[tabled(rename = "Prod")]
    prod: String,
}

#[derive(serde::Serialize)]
struct ManagedInfo {
    base_name: String,
    description: String,
    environments: Vec<String>,
    dev_present: bool,
    prod_present: bool,
}

/// Show every managed workflow and whether it exists remotely per environment
pub async fn run_list_command(
    config: &DeployConfig,
    format: OutputFormat,
) -> CliResult<i32> {
    let client = HttpWorkflowClient::from_config(config)?;
    let remote = client.list_all().await?;
    let codec = NameCodec::new(config);

    let present = |base: &str, env: Environment| -> bool {
        codec
            .display_name(base, env)
            .map(|name| remote.iter().any(|w| w.name == name))
            .unwrap_or(false)
    };

    let infos: Vec<ManagedInfo> = config
        .workflows
        .iter()
        .map(|managed| ManagedInfo {
            base_name: managed.base_name.clone(),
            description: managed.description.clone(),
            environments: managed
                .environments()
                .iter()
                .map(|e| e.to_string())
                .collect(),
            dev_present: present(&managed.base_name, Environment::Dev),
            prod_present: present(&managed.base_name, Environment::Prod),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&infos).unwrap_or_default());
        }
        OutputFormat::Table => {
            let mark = |present: bool| if present { "✓" } else { "-" }.to_string();
            let rows: Vec<ManagedRow> = infos
                .iter()
                .map(|info| ManagedRow {
                    base_name: info.base_name.clone(),
                    description: info.description.clone(),
                    dev: mark(info.dev_present),
                    prod: mark(info.prod_present),
                })
                .collect();
            let mut table = Table::new(rows);
            table
                .with(Style::rounded())
                .with(Modify::new(Rows::new(1..)).with(Alignment::left()));
            println!("{table}");
            println!("\n{} managed workflows", infos.len());
        }
    }

    Ok(EXIT_SUCCESS)
}

#[derive(Tabled)]
struct RemoteRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Base Name")]
    base_name: String,
    #[tabled(rename = "Environment")]
    environment: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Managed")]
    managed: String,
}

#[derive(serde::Serialize)]
struct RemoteInfo {
    name: String,
    base_name: String,
    environment: Option<String>,
    active: Option<bool>,
    managed: bool,
}

/// Show every workflow the remote instance reports
pub async fn run_status_command(
    config: &DeployConfig,
    format: OutputFormat,
) -> CliResult<i32> {
    let client = HttpWorkflowClient::from_config(config)?;
    let remote = client.list_all().await?;
    let codec = NameCodec::new(config);

    let mut infos: Vec<RemoteInfo> = remote
        .iter()
        .map(|workflow| {
            let base_name = codec.base_name(&workflow.name).to_string();
            RemoteInfo {
                name: workflow.name.clone(),
                environment: codec.environment_of(&workflow.name).map(|e| e.to_string()),
                managed: config.find_workflow(&base_name).is_some(),
                base_name,
                active: workflow.active,
            }
        })
        .collect();
    infos.sort_by(|a, b| a.name.cmp(&b.name));

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&infos).unwrap_or_default());
        }
        OutputFormat::Table => {
            let rows: Vec<RemoteRow> = infos
                .iter()
                .map(|info| RemoteRow {
                    name: info.name.clone(),
                    base_name: info.base_name.clone(),
                    environment: info
                        .environment
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string()),
                    active: match info.active {
                        Some(true) => "active".to_string(),
                        Some(false) => "inactive".to_string(),
                        None => "-".to_string(),
                    },
                    managed: if info.managed { "✓" } else { "-" }.to_string(),
                })
                .collect();
            let mut table = Table::new(rows);
            table
                .with(Style::rounded())
                .with(Modify::new(Rows::new(1..)).with(Alignment::left()));
            println!("{table}");
            println!("\n{} workflows on the remote instance", infos.len());
        }
    }

    Ok(EXIT_SUCCESS)
}
