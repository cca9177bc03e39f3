//! Operator configuration for FlowDeploy
//!
//! The configuration is authored by operators in a YAML (or JSON) file and is
//! read-only to every engine: it is loaded once, validated, and then threaded
//! through component constructors as an immutable value. Nothing in this
//! module mutates a loaded configuration.

use crate::error::{FlowDeployError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Environment variable consulted when the config file carries no API key
pub const API_KEY_ENV_VAR: &str = "FLOWDEPLOY_API_KEY";

/// Default number of backups retained by cleanup
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// A deployment environment inside the remote instance.
///
/// `Staging` exists for backward compatibility with a legacy configuration
/// variant; a suffix table does not have to populate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development namespace
    Dev,
    /// Legacy intermediate namespace
    Staging,
    /// Production namespace
    Prod,
}

impl Environment {
    /// All environments, in promotion order
    pub const ALL: [Environment; 3] = [Environment::Dev, Environment::Staging, Environment::Prod];

    /// Lowercase name as used in file names and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = FlowDeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(FlowDeployError::Config(format!(
                "Unknown environment '{other}' (expected dev, staging or prod)"
            ))),
        }
    }
}

/// What `environment_of` should report for a display name that matches no
/// configured suffix.
///
/// Two observed legacy variants disagreed (`unknown` vs silently defaulting
/// to `dev`), so the behavior is a configuration knob instead of a guess.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnmatchedSuffixPolicy {
    /// Report the environment as unknown (`None`)
    #[default]
    Unknown,
    /// Treat unsuffixed names as development entities
    DefaultDev,
}

/// Connection settings for the remote workflow service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the remote API, e.g. `https://automation.example.com/api/v1`
    pub base_url: String,
    /// API key; falls back to the `FLOWDEPLOY_API_KEY` environment variable.
    /// A key in the config file takes precedence when both are present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// A credential reference as the remote service stores it on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRef {
    /// Remote credential id
    pub id: String,
    /// Remote credential display name
    pub name: String,
}

/// One business-level workflow governed by the tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedWorkflow {
    /// Canonical identity, unique across the config, independent of environment
    pub base_name: String,
    /// Operator-facing description
    #[serde(default)]
    pub description: String,
    /// Per-environment variables injected into the configuration node
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<Environment, serde_json::Map<String, serde_json::Value>>,
    /// Per-environment credential references, keyed by credential type
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub credentials: BTreeMap<Environment, BTreeMap<String, CredentialRef>>,
}

impl ManagedWorkflow {
    /// Environments this workflow is configured for.
    ///
    /// The union of the variables and credentials tables; a workflow with
    /// neither is treated as present in every environment.
    pub fn environments(&self) -> Vec<Environment> {
        let mut envs: Vec<Environment> = Vec::new();
        for env in Environment::ALL {
            if self.variables.contains_key(&env) || self.credentials.contains_key(&env) {
                envs.push(env);
            }
        }
        if envs.is_empty() {
            envs.extend(Environment::ALL);
        }
        envs
    }
}

fn default_backup_before_deploy() -> bool {
    true
}

fn default_max_backups() -> usize {
    DEFAULT_MAX_BACKUPS
}

fn default_suffixes() -> BTreeMap<Environment, String> {
    let mut map = BTreeMap::new();
    map.insert(Environment::Dev, "-dev".to_string());
    map.insert(Environment::Staging, "-staging".to_string());
    map.insert(Environment::Prod, "-prod".to_string());
    map
}

/// The full operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Remote service connection settings
    pub server: ServerConfig,
    /// Create a production backup before every deploy
    #[serde(default = "default_backup_before_deploy")]
    pub backup_before_deploy: bool,
    /// Retention count applied by backup cleanup
    #[serde(default = "default_max_backups")]
    pub max_backups_to_keep: usize,
    /// Behavior for display names matching no configured suffix
    #[serde(default)]
    pub on_unmatched_suffix: UnmatchedSuffixPolicy,
    /// Environment suffix table; defaults to `-dev` / `-staging` / `-prod`
    #[serde(default = "default_suffixes")]
    pub suffixes: BTreeMap<Environment, String>,
    /// The workflows governed by this tool
    #[serde(default)]
    pub workflows: Vec<ManagedWorkflow>,
}

impl DeployConfig {
    /// Load and validate a configuration file.
    ///
    /// YAML is the authored format; `.json` files are accepted as well since
    /// YAML is a superset for the shapes used here.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowDeployError::Config(format!(
                "Cannot read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: DeployConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants of a configuration value.
    ///
    /// Checks that no suffix is a string-suffix of another (reverse lookup
    /// would be ambiguous otherwise) and that base names are unique.
    pub fn validate(&self) -> Result<()> {
        if self.suffixes.is_empty() {
            return Err(FlowDeployError::Config(
                "Suffix table must not be empty".to_string(),
            ));
        }
        for (env_a, suffix_a) in &self.suffixes {
            if suffix_a.is_empty() {
                return Err(FlowDeployError::Config(format!(
                    "Suffix for environment '{env_a}' must not be empty"
                )));
            }
            for (env_b, suffix_b) in &self.suffixes {
                if env_a != env_b && suffix_a.ends_with(suffix_b.as_str()) {
                    return Err(FlowDeployError::Config(format!(
                        "Suffix '{suffix_b}' ({env_b}) is a suffix of '{suffix_a}' ({env_a}); \
                         reverse lookup would be ambiguous"
                    )));
                }
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        for workflow in &self.workflows {
            if workflow.base_name.trim().is_empty() {
                return Err(FlowDeployError::Config(
                    "Workflow base_name must not be empty".to_string(),
                ));
            }
            if !seen.insert(workflow.base_name.as_str()) {
                return Err(FlowDeployError::Config(format!(
                    "Duplicate workflow base_name '{}'",
                    workflow.base_name
                )));
            }
        }
        Ok(())
    }

    /// Resolve the API key: config file value first, then the process
    /// environment.
    pub fn api_key(&self) -> Result<String> {
        if let Some(key) = &self.server.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        match std::env::var(API_KEY_ENV_VAR) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(FlowDeployError::Config(format!(
                "No API key: set server.api_key in the config file or the {API_KEY_ENV_VAR} \
                 environment variable"
            ))),
        }
    }

    /// Look up a managed workflow by base name
    pub fn find_workflow(&self, base_name: &str) -> Option<&ManagedWorkflow> {
        self.workflows.iter().find(|w| w.base_name == base_name)
    }

    /// Managed workflows configured for the given environment, in config order
    pub fn workflows_for(&self, env: Environment) -> Vec<&ManagedWorkflow> {
        self.workflows
            .iter()
            .filter(|w| w.environments().contains(&env))
            .collect()
    }

    /// The variables to inject for a workflow in an environment, if any
    pub fn variables_for(
        &self,
        base_name: &str,
        env: Environment,
    ) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.find_workflow(base_name)?.variables.get(&env)
    }
}
