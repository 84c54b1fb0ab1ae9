//! Reference test lookup.
//!
//! A reference test compares its rendering against another page instead of
//! a pixel baseline, so any `-expected.png` it has is ignored by the runner.
//! Outside WPT, references sit next to the test. WPT tests list theirs in the
//! `MANIFEST.json` of their WPT directory.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{OptimizerError, OptimizerResult};
use crate::paths::{output_filename, BASELINE_MISMATCH_SUFFIX, BASELINE_SUFFIX};

/// Extensions a reference file may have.
pub const REFERENCE_EXTENSIONS: &[&str] = &[".html", ".htm", ".xht", ".xhtml", ".svg"];

/// WPT directories under the web tests root, with the URL prefix their
/// manifest uses.
pub const WPT_DIRS: &[(&str, &str)] = &[("wpt_internal", "/wpt_internal/"), ("external/wpt", "/")];

/// File name of a WPT manifest.
pub const WPT_MANIFEST: &str = "MANIFEST.json";

fn wpt_test_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:virtual/[^/]+/)?(external/wpt|wpt_internal)/(.*)$")
            .expect("valid regex literal")
    })
}

/// Splits a test into its WPT directory and its path inside that directory.
///
/// Returns `None` for tests outside WPT. A virtual prefix is ignored.
pub fn split_wpt_test(test: &str) -> Option<(&str, &str)> {
    let captures = wpt_test_regex().captures(test)?;
    match (captures.get(1), captures.get(2)) {
        (Some(dir), Some(path)) => Some((dir.as_str(), path.as_str())),
        _ => None,
    }
}

/// Answers whether a nonvirtual test is a reference test.
///
/// # Implementors
///
/// - [`FsReferenceTests`] reads the web tests tree.
/// - [`StaticReferenceTests`] holds a fixed set, for tests.
pub trait ReferenceTests: Send + Sync {
    fn is_reftest(&self, test: &str) -> bool;
}

/// The reference tests listed in one WPT manifest.
///
/// Entries are keyed by their path inside the WPT directory. A test with
/// variants is listed both under its file path and under each variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WptManifest {
    reftests: HashSet<String>,
}

impl WptManifest {
    /// Parses a manifest. `url_prefix` is stripped from the item URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON.
    pub fn parse(json: &str, url_prefix: &str) -> Result<Self, serde_json::Error> {
        let root: Value = serde_json::from_str(json)?;
        let mut manifest = Self::default();
        if let Some(tree) = root.pointer("/items/reftest") {
            let mut dirs = Vec::new();
            manifest.collect(tree, &mut dirs, url_prefix);
        }
        Ok(manifest)
    }

    /// Loads the manifest at `path`. A missing file is an empty manifest.
    ///
    /// # Errors
    ///
    /// Returns `ReadFailed` if the file cannot be read and `WptManifest` if
    /// it cannot be parsed.
    pub fn load(path: &Path, url_prefix: &str) -> OptimizerResult<Self> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(OptimizerError::ReadFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&json, url_prefix).map_err(|e| OptimizerError::WptManifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Walks the directory tree of `items.reftest`. A key mapping to an array
    /// is a file: `[hash, [url, references, extras], ...]`.
    fn collect<'a>(&mut self, node: &'a Value, dirs: &mut Vec<&'a str>, url_prefix: &str) {
        let Value::Object(children) = node else {
            return;
        };
        for (name, child) in children {
            dirs.push(name);
            match child {
                Value::Array(entry) => {
                    let file = dirs.join("/");
                    for item in entry.iter().skip(1) {
                        if let Some(url) = item.get(0).and_then(Value::as_str) {
                            let path = url
                                .strip_prefix(url_prefix)
                                .or_else(|| url.strip_prefix('/'))
                                .unwrap_or(url);
                            self.reftests.insert(path.to_string());
                        }
                    }
                    self.reftests.insert(file);
                }
                Value::Object(_) => self.collect(child, dirs, url_prefix),
                _ => {}
            }
            dirs.pop();
        }
    }

    /// Whether `path_in_wpt` is listed as a reference test.
    pub fn is_reftest(&self, path_in_wpt: &str) -> bool {
        self.reftests.contains(path_in_wpt)
    }

    pub fn len(&self) -> usize {
        self.reftests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reftests.is_empty()
    }
}

/// Detects reference tests on disk.
///
/// A test is a reference test if an `-expected` or `-expected-mismatch`
/// reference file sits next to it, or, for WPT tests, if its manifest lists
/// it under `items.reftest`. Manifests are read once, on first use.
#[derive(Debug)]
pub struct FsReferenceTests {
    web_tests: PathBuf,
    manifests: OnceLock<Vec<(&'static str, WptManifest)>>,
}

impl FsReferenceTests {
    pub fn new(web_tests: impl Into<PathBuf>) -> Self {
        Self {
            web_tests: web_tests.into(),
            manifests: OnceLock::new(),
        }
    }

    fn reference_candidates(test: &str) -> impl Iterator<Item = String> + '_ {
        [BASELINE_SUFFIX, BASELINE_MISMATCH_SUFFIX]
            .into_iter()
            .flat_map(move |suffix| {
                REFERENCE_EXTENSIONS
                    .iter()
                    .map(move |ext| output_filename(test, suffix, ext))
            })
    }

    fn manifests(&self) -> &[(&'static str, WptManifest)] {
        self.manifests.get_or_init(|| {
            WPT_DIRS
                .iter()
                .map(|&(dir, url_prefix)| {
                    let path = self.web_tests.join(dir).join(WPT_MANIFEST);
                    let manifest = match WptManifest::load(&path, url_prefix) {
                        Ok(manifest) => {
                            debug!(
                                path = %path.display(),
                                reftests = manifest.len(),
                                "Loaded WPT manifest"
                            );
                            manifest
                        }
                        Err(e) => {
                            warn!(
                                path = %path.display(),
                                error = %e,
                                "Ignoring unreadable WPT manifest"
                            );
                            WptManifest::default()
                        }
                    };
                    (dir, manifest)
                })
                .collect()
        })
    }

    fn is_wpt_reftest(&self, test: &str) -> bool {
        let Some((dir, path_in_wpt)) = split_wpt_test(test) else {
            return false;
        };
        self.manifests()
            .iter()
            .filter(|(name, _)| *name == dir)
            .any(|(_, manifest)| manifest.is_reftest(path_in_wpt))
    }
}

impl ReferenceTests for FsReferenceTests {
    fn is_reftest(&self, test: &str) -> bool {
        Self::reference_candidates(test).any(|candidate| self.web_tests.join(candidate).is_file())
            || self.is_wpt_reftest(test)
    }
}

/// A fixed set of reference tests.
#[derive(Debug, Clone, Default)]
pub struct StaticReferenceTests {
    tests: HashSet<String>,
}

impl StaticReferenceTests {
    pub fn new<I, S>(tests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tests: tests.into_iter().map(Into::into).collect(),
        }
    }
}

impl ReferenceTests for StaticReferenceTests {
    fn is_reftest(&self, test: &str) -> bool {
        self.tests.contains(test)
    }
}
