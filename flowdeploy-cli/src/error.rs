//! Error handling for the FlowDeploy CLI
//!
//! Command implementations return [`CliResult`]; the error carries the exit
//! code so `main` can report the full error chain and terminate with the
//! right status.

use crate::exit_codes::EXIT_FAILURE;
use std::error::Error;
use std::fmt;

/// CLI-specific result type that preserves error information
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type that includes both error information and the exit code
#[derive(Debug)]
pub struct CliError {
    /// Message shown to the operator
    pub message: String,
    /// Process exit code to use
    pub exit_code: i32,
    /// Underlying error, when there is one
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl CliError {
    /// Create a CLI error with a message and the failure exit code
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exit_code: EXIT_FAILURE,
            source: None,
        }
    }

    /// Create a CLI error from another error
    pub fn from_error<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Self {
            message: error.to_string(),
            exit_code: EXIT_FAILURE,
            source: Some(Box::new(error)),
        }
    }

    /// Get the full error chain as a formatted string
    pub fn full_chain(&self) -> String {
        let mut result = self.message.clone();

        let mut current_source = self.source();
        while let Some(err) = current_source {
            result.push_str(&format!("\n  Caused by: {err}"));
            current_source = err.source();
        }

        result
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<flowdeploy::FlowDeployError> for CliError {
    fn from(error: flowdeploy::FlowDeployError) -> Self {
        Self::from_error(error)
    }
}

/// Convert a CliResult to an exit code, printing the full error chain if
/// needed
pub fn handle_cli_result(result: CliResult<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e.full_chain());
            e.exit_code
        }
    }
}
