//! Baseline naming and the path ↔ location codec.
//!
//! Every baseline lives at
//!
//! ```text
//! <web-tests>/[platform/<P>/ | flag-specific/<F>/]?[virtual/<V>/]?<baseline-name>
//! ```
//!
//! [`BaselinePaths`] converts between that layout and
//! ([`BaselineLocation`], baseline name) pairs.

use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{OptimizerError, OptimizerResult};
use crate::location::BaselineLocation;

/// Suffix inserted between a test's stem and the baseline extension.
pub const BASELINE_SUFFIX: &str = "-expected";

/// Suffix of mismatch references next to reference tests.
pub const BASELINE_MISMATCH_SUFFIX: &str = "-expected-mismatch";

const PLATFORM_DIR: &str = "platform";
const FLAG_SPECIFIC_DIR: &str = "flag-specific";
const VIRTUAL_DIR: &str = "virtual";

/// Characters that are illegal in a filename on at least one host OS.
fn illegal_filename_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1f]"#).expect("valid regex literal"))
}

/// Replace characters that cannot appear in filenames with `_`.
pub fn sanitize_filename(name: &str) -> String {
    illegal_filename_chars().replace_all(name, "_").into_owned()
}

/// Strip the final extension from the last segment of a test path.
fn strip_extension(test: &str) -> &str {
    let segment_start = test.rfind('/').map_or(0, |i| i + 1);
    match test[segment_start..].rfind('.') {
        Some(dot) if dot > 0 => &test[..segment_start + dot],
        _ => test,
    }
}

/// Build an output filename for a test.
///
/// `external/wpt/foo.html` with suffix `-expected` and extension `.txt`
/// becomes `external/wpt/foo-expected.txt`. A query string is folded into the
/// stem: `variant.html?foo=baz` becomes `variant_foo=baz-expected.txt`.
pub fn output_filename(test: &str, suffix: &str, extension: &str) -> String {
    let stem = match test.find('?') {
        Some(index) => {
            let mut stem = strip_extension(&test[..index]).to_string();
            stem.push_str(&sanitize_filename(&test[index..]));
            stem
        }
        None => strip_extension(test).to_string(),
    };
    format!("{}{}{}", stem, suffix, extension)
}

/// The `-expected` baseline name of a test for an extension such as `.txt`.
pub fn baseline_name(test: &str, extension: &str) -> String {
    output_filename(test, BASELINE_SUFFIX, extension)
}

/// Codec between absolute baseline paths and locations.
#[derive(Debug, Clone)]
pub struct BaselinePaths {
    web_tests: PathBuf,
}

impl BaselinePaths {
    /// Create a codec rooted at the web tests directory.
    pub fn new(web_tests: impl Into<PathBuf>) -> Self {
        Self {
            web_tests: web_tests.into(),
        }
    }

    pub fn web_tests_dir(&self) -> &Path {
        &self.web_tests
    }

    /// The directory holding baselines for a location.
    ///
    /// # Errors
    ///
    /// Sentinel locations have no directory and yield an invariant error.
    pub fn directory(&self, location: &BaselineLocation) -> OptimizerResult<PathBuf> {
        if location.is_sentinel() {
            return Err(OptimizerError::invariant(format!(
                "sentinel location {} has no directory",
                location
            )));
        }

        let mut dir = self.web_tests.clone();
        if let Some(platform) = location.platform_name() {
            dir.push(PLATFORM_DIR);
            dir.push(platform);
        } else if let Some(flag_specific) = location.flag_specific_name() {
            dir.push(FLAG_SPECIFIC_DIR);
            dir.push(flag_specific);
        }
        if let Some(suite) = location.virtual_suite() {
            dir.push(VIRTUAL_DIR);
            dir.push(suite);
        }
        Ok(dir)
    }

    /// The absolute path of a baseline at a location.
    pub fn path(
        &self,
        location: &BaselineLocation,
        baseline_name: &str,
    ) -> OptimizerResult<PathBuf> {
        let mut path = self.directory(location)?;
        path.extend(baseline_name.split('/').filter(|s| !s.is_empty()));
        Ok(path)
    }

    /// Split a baseline path into its location and the remaining name.
    ///
    /// Relative paths are taken relative to the web tests directory.
    ///
    /// # Errors
    ///
    /// Returns an error for absolute paths outside the web tests directory.
    pub fn parse(&self, path: &Path) -> OptimizerResult<(BaselineLocation, String)> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.web_tests)
                .map_err(|_| OptimizerError::OutsideWebTests {
                    path: path.to_path_buf(),
                    web_tests: self.web_tests.clone(),
                })?
        } else {
            path
        };

        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let mut rest = parts.as_slice();

        let mut location = BaselineLocation::generic();
        if rest.len() >= 2 {
            if rest[0] == PLATFORM_DIR {
                location = BaselineLocation::platform(rest[1].clone());
                rest = &rest[2..];
            } else if rest[0] == FLAG_SPECIFIC_DIR {
                location = BaselineLocation::flag_specific(rest[1].clone());
                rest = &rest[2..];
            }
        }
        if rest.len() >= 2 && rest[0] == VIRTUAL_DIR {
            location = location.with_virtual_suite(rest[1].clone());
            rest = &rest[2..];
        }

        Ok((location, rest.join("/")))
    }
}
