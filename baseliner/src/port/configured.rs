//! Ports built from configuration and the web tests tree.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::OptimizerResult;
use crate::expectations::{
    ExpectationsError, TestExpectations, FLAG_EXPECTATIONS_DIR, NEVER_FIX_TESTS_FILE,
    TEST_EXPECTATIONS_FILE,
};
use crate::location::BaselineLocation;
use crate::paths::BaselinePaths;

use super::types::{Port, PortSpec};
use super::virtual_suites::VirtualTestSuites;

/// A [`Port`] described by a [`PortSpec`].
///
/// Virtual suites are shared between all ports of one factory. A failed
/// expectations load is kept and reported by every lookup.
#[derive(Debug, Clone)]
pub struct ConfiguredPort {
    spec: PortSpec,
    paths: BaselinePaths,
    suites: Arc<VirtualTestSuites>,
    expectations: Result<TestExpectations, ExpectationsError>,
    tags: Vec<String>,
}

impl ConfiguredPort {
    /// Create a port and load its expectations files.
    pub fn new(
        spec: PortSpec,
        web_tests: impl Into<PathBuf>,
        suites: Arc<VirtualTestSuites>,
    ) -> Self {
        let paths = BaselinePaths::new(web_tests);
        let expectations = TestExpectations::load(&expectation_files(&spec, paths.web_tests_dir()));

        let mut tags = vec![spec.name.to_lowercase(), spec.os.to_lowercase()];
        if let Some(flag) = &spec.flag_specific {
            tags.push(flag.to_lowercase());
        }

        Self {
            spec,
            paths,
            suites,
            expectations,
            tags,
        }
    }

    /// Replace the expectations with already-parsed ones.
    pub fn with_expectations(mut self, expectations: TestExpectations) -> Self {
        self.expectations = Ok(expectations);
        self
    }

    pub fn spec(&self) -> &PortSpec {
        &self.spec
    }

    /// Lowercase tags matched against expectation lines.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

fn expectation_files(spec: &PortSpec, web_tests: &Path) -> Vec<PathBuf> {
    let mut files = vec![
        web_tests.join(TEST_EXPECTATIONS_FILE),
        web_tests.join(NEVER_FIX_TESTS_FILE),
    ];
    if let Some(flag) = &spec.flag_specific {
        files.push(web_tests.join(FLAG_EXPECTATIONS_DIR).join(flag));
    }
    files
}

impl Port for ConfiguredPort {
    fn name(&self) -> String {
        self.spec.display_name()
    }

    fn os(&self) -> &str {
        &self.spec.os
    }

    fn flag_specific(&self) -> Option<&str> {
        self.spec.flag_specific.as_deref()
    }

    fn web_tests_dir(&self) -> &Path {
        self.paths.web_tests_dir()
    }

    fn baseline_search_path(&self) -> Vec<PathBuf> {
        let web_tests = self.paths.web_tests_dir();
        let mut dirs = Vec::with_capacity(self.spec.fallback.len() + 2);
        if let Some(flag) = &self.spec.flag_specific {
            dirs.push(web_tests.join("flag-specific").join(flag));
        }
        dirs.extend(
            self.spec
                .fallback
                .iter()
                .map(|dir| web_tests.join("platform").join(dir)),
        );
        dirs.push(web_tests.to_path_buf());
        dirs
    }

    fn baseline_location(&self, path: &Path) -> OptimizerResult<BaselineLocation> {
        self.paths.parse(path).map(|(location, _)| location)
    }

    fn virtual_test_suites(&self) -> &VirtualTestSuites {
        &self.suites
    }

    fn expected_statuses(&self, test: &str) -> Result<BTreeSet<String>, ExpectationsError> {
        match &self.expectations {
            Ok(expectations) => Ok(expectations.statuses_for(test, &self.tags)),
            Err(e) => Err(e.clone()),
        }
    }
}
