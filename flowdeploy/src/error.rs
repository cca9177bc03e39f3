//! Unified error handling for the FlowDeploy library
//!
//! The taxonomy follows the operational boundaries of the tool: configuration
//! problems are fatal to the operation that needed them, remote-call and
//! validation failures are recorded per workflow inside batch summaries, and
//! precondition failures abort the whole invocation.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the FlowDeploy library
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlowDeployError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Malformed or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A call to the remote workflow service failed
    #[error("Remote call '{operation}' failed for workflow '{workflow}': {reason}")]
    Remote {
        /// The attempted operation (e.g. `list`, `get`, `create`, `update`)
        operation: String,
        /// The workflow name or id the call was made for
        workflow: String,
        /// Underlying failure description (HTTP status, transport error)
        reason: String,
    },

    /// A workflow file or entity failed structural validation
    #[error("Validation failed for {}: {reason}", file.display())]
    Validation {
        /// The file that failed validation
        file: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// A batch-level precondition was not met; aborts the whole invocation
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A git command exited non-zero
    #[error("Git command 'git {command}' failed with exit code {code}: {stderr}")]
    GitCommandFailed {
        /// The git subcommand and arguments that were run
        command: String,
        /// Process exit code (-1 when killed by a signal)
        code: i32,
        /// Captured standard error output
        stderr: String,
    },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl FlowDeployError {
    /// Build a [`FlowDeployError::Remote`] from its parts
    pub fn remote(
        operation: impl Into<String>,
        workflow: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Remote {
            operation: operation.into(),
            workflow: workflow.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`FlowDeployError::Validation`] from its parts
    pub fn validation(file: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Validation {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`FlowDeployError::GitCommandFailed`] from a finished process
    pub fn git_command_failed(command: impl Into<String>, code: i32, stderr: &str) -> Self {
        Self::GitCommandFailed {
            command: command.into(),
            code,
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type alias for FlowDeploy operations
pub type Result<T> = std::result::Result<T, FlowDeployError>;

/// Error chain formatter for detailed error reporting
pub struct ErrorChain<'a>(&'a dyn std::error::Error);

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.0)?;

        let mut current = self.0.source();
        let mut level = 1;

        while let Some(err) = current {
            writeln!(f, "{:indent$}Caused by: {}", "", err, indent = level * 2)?;
            current = err.source();
            level += 1;
        }

        Ok(())
    }
}

/// Extension trait for error types to format the full error chain
pub trait ErrorChainExt {
    /// Format the full error chain
    fn error_chain(&self) -> ErrorChain<'_>;
}

impl<E: std::error::Error> ErrorChainExt for E {
    fn error_chain(&self) -> ErrorChain<'_> {
        ErrorChain(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = FlowDeployError::remote("update", "Order Sync-prod", "HTTP 502 Bad Gateway");
        let msg = err.to_string();
        assert!(msg.contains("update"));
        assert!(msg.contains("Order Sync-prod"));
        assert!(msg.contains("502"));
    }

    #[test]
    fn test_git_command_failed_trims_stderr() {
        let err = FlowDeployError::git_command_failed("tag -l", 128, "fatal: not a git repo\n");
        match err {
            FlowDeployError::GitCommandFailed { stderr, code, .. } => {
                assert_eq!(code, 128);
                assert_eq!(stderr, "fatal: not a git repo");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_error_chain_display() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = FlowDeployError::Io(io_err);

        let chain = err.error_chain().to_string();
        assert!(chain.contains("file not found"));
    }
}
