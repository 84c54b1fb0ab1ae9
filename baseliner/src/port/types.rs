//! The `Port` trait and its configuration record.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::OptimizerResult;
use crate::expectations::{ExpectationsError, SKIP};
use crate::location::BaselineLocation;

use super::virtual_suites::VirtualTestSuites;

/// Static description of one port.
///
/// `fallback` lists directories under `platform/`, most specific first. The
/// generic web tests directory is implied at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub name: String,
    pub os: String,
    pub fallback: Vec<String>,
    pub flag_specific: Option<String>,
}

impl PortSpec {
    /// Create a port description with no flag-specific configuration.
    pub fn new(name: impl Into<String>, os: impl Into<String>, fallback: &[&str]) -> Self {
        Self {
            name: name.into(),
            os: os.into(),
            fallback: fallback.iter().map(|dir| dir.to_string()).collect(),
            flag_specific: None,
        }
    }

    /// Run this port with a named flag bundle.
    pub fn with_flag_specific(mut self, flag_specific: impl Into<String>) -> Self {
        self.flag_specific = Some(flag_specific.into());
        self
    }

    /// Display name, `<name>` or `<name>:<flag-specific>`.
    pub fn display_name(&self) -> String {
        match &self.flag_specific {
            Some(flag) => format!("{}:{}", self.name, flag),
            None => self.name.clone(),
        }
    }
}

/// One configuration of the test runner.
///
/// A port knows where it looks for baselines, which virtual suites exist,
/// and which tests it does not run. The optimizer consumes ports only
/// through this trait.
///
/// # Implementors
///
/// - [`ConfiguredPort`](super::ConfiguredPort) - Port built from a [`PortSpec`]
///   and the files under the web tests directory
pub trait Port: Send + Sync {
    /// Unique name, including the flag-specific suffix if any.
    fn name(&self) -> String;

    /// Operating system, lowercase (`linux`, `mac`, `win`).
    fn os(&self) -> &str;

    fn flag_specific(&self) -> Option<&str>;

    /// Absolute web tests directory.
    fn web_tests_dir(&self) -> &Path;

    /// Directories searched for a baseline, most specific first.
    ///
    /// The last entry is always [`Port::web_tests_dir`].
    fn baseline_search_path(&self) -> Vec<PathBuf>;

    /// Decode an absolute baseline path (or directory) into its location.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is outside the web tests directory.
    fn baseline_location(&self, path: &Path) -> OptimizerResult<BaselineLocation>;

    fn virtual_test_suites(&self) -> &VirtualTestSuites;

    /// Statuses the port's expectations list for a test.
    ///
    /// # Errors
    ///
    /// Returns the error from loading the port's expectations, if any.
    fn expected_statuses(&self, test: &str) -> Result<BTreeSet<String>, ExpectationsError>;

    /// The nonvirtual base of a virtual test.
    fn lookup_virtual_test_base(&self, test: &str) -> Option<String> {
        self.virtual_test_suites().lookup_virtual_test_base(test)
    }

    /// Whether the port never runs this test.
    ///
    /// # Errors
    ///
    /// Propagates expectation lookup failures. The virtual-suite rules are
    /// still consulted first, so a test skipped by them is reported as
    /// skipped even when the expectations are broken.
    fn skips_test(&self, test: &str) -> Result<bool, ExpectationsError> {
        if self.skipped_by_platform_config(test)
            || self.skipped_by_disabled_suite(test)
            || self.skipped_by_exclusive_tests(test)
            || self.skipped_by_skip_base_tests(test)
        {
            return Ok(true);
        }
        Ok(self.expected_statuses(test)?.contains(SKIP))
    }

    /// A virtual test whose suite does not list this port's OS.
    fn skipped_by_platform_config(&self, test: &str) -> bool {
        self.virtual_test_suites()
            .lookup_suite(test)
            .is_some_and(|suite| !suite.runs_on(self.os()))
    }

    fn skipped_by_disabled_suite(&self, test: &str) -> bool {
        self.virtual_test_suites()
            .lookup_suite(test)
            .is_some_and(|suite| suite.is_disabled())
    }

    /// A test claimed by some suite's `exclusive_tests` only runs in the
    /// suites that claim it.
    fn skipped_by_exclusive_tests(&self, test: &str) -> bool {
        let suites = self.virtual_test_suites();
        let base = match self.lookup_virtual_test_base(test) {
            Some(base) => {
                if let Some(own) = suites.lookup_suite(test) {
                    let claimed = own
                        .exclusive_tests()
                        .any(|e| base.starts_with(e) || e.starts_with(base.as_str()));
                    if claimed {
                        return false;
                    }
                }
                base
            }
            None => test.to_string(),
        };
        suites
            .iter()
            .flat_map(|suite| suite.exclusive_tests())
            .any(|e| base.starts_with(e))
    }

    /// A nonvirtual test listed in `skip_base_tests` of a suite that runs
    /// on this OS.
    fn skipped_by_skip_base_tests(&self, test: &str) -> bool {
        if self.lookup_virtual_test_base(test).is_some() {
            return false;
        }
        self.virtual_test_suites()
            .iter()
            .filter(|suite| suite.runs_on(self.os()))
            .flat_map(|suite| suite.skip_base_tests())
            .any(|skipped| test.starts_with(skipped))
    }
}
