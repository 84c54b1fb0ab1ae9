//! Creates the set of ports the optimizer checks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::OptimizerResult;

use super::configured::ConfiguredPort;
use super::types::{Port, PortSpec};
use super::virtual_suites::VirtualTestSuites;

/// Builds [`ConfiguredPort`]s over one web tests directory.
///
/// The virtual suites file is read once and shared by every port.
#[derive(Debug, Clone)]
pub struct PortFactory {
    web_tests: PathBuf,
    suites: Arc<VirtualTestSuites>,
}

impl PortFactory {
    /// Load the virtual suites under `web_tests`.
    ///
    /// # Errors
    ///
    /// Returns an error if the virtual suites file exists but is invalid.
    pub fn new(web_tests: impl Into<PathBuf>) -> OptimizerResult<Self> {
        let web_tests = web_tests.into();
        let suites = VirtualTestSuites::load(&web_tests)?;
        info!(
            web_tests = %web_tests.display(),
            virtual_suites = suites.len(),
            "Port factory ready"
        );
        Ok(Self {
            web_tests,
            suites: Arc::new(suites),
        })
    }

    /// Use already-loaded virtual suites.
    pub fn with_suites(web_tests: impl Into<PathBuf>, suites: VirtualTestSuites) -> Self {
        Self {
            web_tests: web_tests.into(),
            suites: Arc::new(suites),
        }
    }

    pub fn web_tests_dir(&self) -> &Path {
        &self.web_tests
    }

    pub fn virtual_test_suites(&self) -> &VirtualTestSuites {
        &self.suites
    }

    /// Create one port.
    pub fn create(&self, spec: &PortSpec) -> ConfiguredPort {
        let port = ConfiguredPort::new(spec.clone(), self.web_tests.clone(), self.suites.clone());
        debug!(port = %port.name(), search_path = ?port.baseline_search_path(), "Created port");
        port
    }

    /// Create every port, as trait objects for the optimizer.
    pub fn create_all(&self, specs: &[PortSpec]) -> Vec<Arc<dyn Port>> {
        specs
            .iter()
            .map(|spec| Arc::new(self.create(spec)) as Arc<dyn Port>)
            .collect()
    }
}
