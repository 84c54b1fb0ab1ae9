//! Error types for baseline optimization.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for optimizer operations.
pub type OptimizerResult<T> = Result<T, OptimizerError>;

/// Errors that abort a single optimization pass.
///
/// Recoverable conditions (undecodable text baselines, failed expectation
/// lookups) are handled where they occur and never surface here.
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// A structural invariant of the fallback graph or digest map was broken.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Failed to read a baseline or support file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write (copy) a baseline.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to remove a baseline.
    #[error("failed to remove {}: {source}", path.display())]
    RemoveFailed { path: PathBuf, source: io::Error },

    /// A path handed to the codec does not live under the web tests root.
    #[error("{} is not under the web tests directory {}", path.display(), web_tests.display())]
    OutsideWebTests { path: PathBuf, web_tests: PathBuf },

    /// The virtual test suites file is malformed.
    #[error("invalid virtual test suites file {}: {reason}", path.display())]
    VirtualSuites { path: PathBuf, reason: String },

    /// A WPT manifest is not valid JSON.
    #[error("invalid WPT manifest {}: {reason}", path.display())]
    WptManifest { path: PathBuf, reason: String },

    /// A test pattern is not a valid glob.
    #[error("invalid test pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The optimizer was constructed without any ports.
    #[error("no ports configured")]
    NoPorts,

    /// Ports disagree on the web tests directory.
    #[error(
        "port {port} uses web tests directory {}, expected {}",
        actual.display(),
        expected.display()
    )]
    InconsistentPorts {
        port: String,
        expected: PathBuf,
        actual: PathBuf,
    },
}

impl OptimizerError {
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        OptimizerError::Invariant(msg.into())
    }
}
