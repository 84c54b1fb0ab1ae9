//! CLI error types.

use std::fmt;

use baseliner::config::ConfigError;
use baseliner::OptimizerError;

/// Exit code for errors. Exit code 1 is reserved for check runs that found
/// changes.
pub const ERROR_EXIT_CODE: i32 = 2;

/// Errors surfaced to the user.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded or is incomplete.
    Config(ConfigError),
    /// The optimizer could not be set up.
    Optimizer(OptimizerError),
    /// Output could not be rendered.
    Output(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        ERROR_EXIT_CODE
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Optimizer(e) => write!(f, "{}", e),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Optimizer(e) => Some(e),
            CliError::Output(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<OptimizerError> for CliError {
    fn from(e: OptimizerError) -> Self {
        CliError::Optimizer(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e.to_string())
    }
}
