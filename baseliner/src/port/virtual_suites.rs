//! Virtual test suites.
//!
//! A virtual suite reruns a set of base tests under extra runtime flags. Its
//! tests live under `virtual/<prefix>/` and reuse the base tests' sources.
//! Suites are declared in the JSON file `<web-tests>/VirtualTestSuites`:
//!
//! ```json
//! [
//!   "Comments are plain strings.",
//!   {
//!     "prefix": "gpu",
//!     "platforms": ["Linux", "Mac"],
//!     "bases": ["fast/canvas"],
//!     "args": ["--enable-gpu"]
//!   }
//! ]
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{OptimizerError, OptimizerResult};

/// Filename of the suite declarations, relative to the web tests directory.
pub const VIRTUAL_TEST_SUITES_FILE: &str = "VirtualTestSuites";

/// A list of tests, or every base of the suite.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
enum TestList {
    All(String),
    Tests(Vec<String>),
}

impl Default for TestList {
    fn default() -> Self {
        TestList::Tests(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct RawSuite {
    prefix: String,
    #[serde(default)]
    platforms: Vec<String>,
    #[serde(default)]
    bases: Vec<String>,
    #[serde(default)]
    exclusive_tests: TestList,
    #[serde(default)]
    skip_base_tests: TestList,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    args: Vec<String>,
}

/// One declared virtual suite.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualTestSuite {
    prefix: String,
    full_prefix: String,
    platforms: Vec<String>,
    bases: Vec<String>,
    exclusive_tests: Vec<String>,
    skip_base_tests: Vec<String>,
    disabled: bool,
    args: Vec<String>,
}

impl VirtualTestSuite {
    /// Create a suite over the given bases, enabled on every listed platform.
    pub fn new(prefix: impl Into<String>, bases: Vec<String>) -> Self {
        let prefix = prefix.into();
        Self {
            full_prefix: format!("virtual/{}/", prefix),
            prefix,
            platforms: Vec::new(),
            bases,
            exclusive_tests: Vec::new(),
            skip_base_tests: Vec::new(),
            disabled: false,
            args: Vec::new(),
        }
    }

    /// Restrict the suite to these operating systems (case-insensitive).
    pub fn with_platforms(mut self, platforms: &[&str]) -> Self {
        self.platforms = platforms.iter().map(|p| p.to_lowercase()).collect();
        self
    }

    pub fn with_exclusive_tests(mut self, tests: Vec<String>) -> Self {
        self.exclusive_tests = tests;
        self
    }

    pub fn with_skip_base_tests(mut self, tests: Vec<String>) -> Self {
        self.skip_base_tests = tests;
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    fn from_raw(raw: RawSuite) -> Result<Self, String> {
        static VALID_PREFIX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        let valid = VALID_PREFIX
            .get_or_init(|| Regex::new(r"^[\w\-=]+$").expect("valid regex literal"));
        if !valid.is_match(&raw.prefix) {
            return Err(format!(
                "virtual test suite prefix '{}' contains invalid characters",
                raw.prefix
            ));
        }

        let expand = |list: TestList, field: &str| match list {
            TestList::Tests(tests) => Ok(tests),
            TestList::All(s) if s == "ALL" => Ok(raw.bases.clone()),
            TestList::All(s) => Err(format!(
                "suite '{}': {} must be a list or \"ALL\", got {:?}",
                raw.prefix, field, s
            )),
        };
        let exclusive_tests = expand(raw.exclusive_tests, "exclusive_tests")?;
        let skip_base_tests = expand(raw.skip_base_tests, "skip_base_tests")?;

        let mut args = raw.args;
        args.sort();

        Ok(Self {
            full_prefix: format!("virtual/{}/", raw.prefix),
            prefix: raw.prefix,
            platforms: raw.platforms.iter().map(|p| p.to_lowercase()).collect(),
            bases: raw.bases,
            exclusive_tests,
            skip_base_tests,
            disabled: raw.disabled,
            args,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `virtual/<prefix>/`.
    pub fn full_prefix(&self) -> &str {
        &self.full_prefix
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Whether the suite runs on an operating system.
    pub fn runs_on(&self, os: &str) -> bool {
        let os = os.to_lowercase();
        self.platforms.iter().any(|p| *p == os)
    }

    pub fn exclusive_tests(&self) -> impl Iterator<Item = &str> {
        self.exclusive_tests.iter().map(|t| strip_js(t))
    }

    pub fn skip_base_tests(&self) -> impl Iterator<Item = &str> {
        self.skip_base_tests.iter().map(|t| strip_js(t))
    }

    /// Whether a nonvirtual test is one of this suite's bases.
    pub fn covers(&self, test: &str) -> bool {
        self.bases.iter().any(|base| test.starts_with(strip_js(base)))
    }
}

/// WPT `.js` bases expand to several tests; match on the stem instead.
fn strip_js(test: &str) -> &str {
    if is_wpt_test(test) {
        test.strip_suffix("js").unwrap_or(test)
    } else {
        test
    }
}

fn is_wpt_test(test: &str) -> bool {
    test.starts_with("external/wpt/") || test.starts_with("wpt_internal/")
}

/// The set of declared virtual suites.
#[derive(Debug, Clone, Default)]
pub struct VirtualTestSuites {
    suites: Vec<VirtualTestSuite>,
}

impl VirtualTestSuites {
    /// Build from already-constructed suites.
    pub fn new(suites: Vec<VirtualTestSuite>) -> Self {
        Self { suites }
    }

    /// Load `<web-tests>/VirtualTestSuites`.
    ///
    /// A missing file yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// declares the same prefix twice.
    pub fn load(web_tests: &Path) -> OptimizerResult<Self> {
        let path = web_tests.join(VIRTUAL_TEST_SUITES_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "No virtual test suites file");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| OptimizerError::ReadFailed {
            path: path.clone(),
            source: e,
        })?;
        Self::parse(&content).map_err(|reason| OptimizerError::VirtualSuites { path, reason })
    }

    /// Parse the JSON contents of a suites file.
    pub fn parse(content: &str) -> Result<Self, String> {
        let entries: Vec<Value> = serde_json::from_str(content).map_err(|e| e.to_string())?;

        let mut suites: Vec<VirtualTestSuite> = Vec::new();
        let mut seen = HashSet::new();
        for entry in entries {
            if entry.is_string() {
                continue;
            }
            let raw: RawSuite = serde_json::from_value(entry).map_err(|e| e.to_string())?;
            let suite = VirtualTestSuite::from_raw(raw)?;
            if !seen.insert(suite.full_prefix.clone()) {
                return Err(format!(
                    "multiple entries with the same prefix {:?}; combine them",
                    suite.prefix
                ));
            }
            suites.push(suite);
        }

        debug!(suites = suites.len(), "Loaded virtual test suites");
        Ok(Self { suites })
    }

    pub fn iter(&self) -> impl Iterator<Item = &VirtualTestSuite> {
        self.suites.iter()
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    /// The suite a virtual test belongs to.
    pub fn lookup_suite(&self, test: &str) -> Option<&VirtualTestSuite> {
        if !test.starts_with("virtual/") {
            return None;
        }
        self.suites.iter().find(|s| test.starts_with(s.full_prefix()))
    }

    /// The nonvirtual base of a virtual test, if the suite declares it.
    pub fn lookup_virtual_test_base(&self, test: &str) -> Option<String> {
        let suite = self.lookup_suite(test)?;
        let maybe_base = &test[suite.full_prefix().len()..];
        suite
            .bases
            .iter()
            .map(|base| strip_js(base))
            .any(|base| base.starts_with(maybe_base) || maybe_base.starts_with(base))
            .then(|| maybe_base.to_string())
    }

    /// Virtual tests generated from a nonvirtual test by every covering suite.
    pub fn virtual_siblings(&self, test: &str) -> Vec<String> {
        self.suites
            .iter()
            .filter(|suite| suite.covers(test))
            .map(|suite| format!("{}{}", suite.full_prefix(), test))
            .collect()
    }
}
