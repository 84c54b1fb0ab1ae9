//! Content equality for baseline files.
//!
//! A [`ResultDigest`] summarizes one baseline as a SHA-1 of its canonical
//! contents plus an "extra result" flag. Extra results (empty files, all-pass
//! testharness output, reftest PNGs) carry no information the runner needs,
//! so they compare equal to the implicit all-pass sentinel.
//!
//! The equality relation is reflexive and symmetric but **not** transitive:
//! two distinct extra results each match the sentinel without matching one
//! another. Compare against one reference value, never chain comparisons.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::{OptimizerError, OptimizerResult};
use crate::testharness;

/// Sentinel SHA value of the implicit all-pass result.
pub const IMPLICIT_EXTRA_RESULT: &str = "<extra>";

/// Digest of one baseline file (or of a sentinel location).
#[derive(Debug, Clone)]
pub struct ResultDigest {
    sha: String,
    path: Option<PathBuf>,
    is_extra_result: bool,
}

impl ResultDigest {
    /// Create a digest from its parts.
    pub fn new(sha: impl Into<String>, path: Option<PathBuf>, is_extra_result: bool) -> Self {
        Self {
            sha: sha.into(),
            path,
            is_extra_result,
        }
    }

    /// The digest of the implicit all-pass sink.
    pub fn implicit_extra() -> Self {
        Self::new(IMPLICIT_EXTRA_RESULT, None, true)
    }

    /// A digest that matches nothing but itself.
    ///
    /// Used for the block sentinel. A fresh random identifier is drawn on
    /// every call, so no real file can share it.
    pub fn unique() -> Self {
        Self::new(format!("<block:{:016x}>", rand::random::<u64>()), None, false)
    }

    /// Digest a baseline file on disk.
    ///
    /// `.png` baselines of reference tests are extra results regardless of
    /// content. Text baselines recognized as testharness or wdspec output are
    /// whitespace-stripped before hashing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be read.
    pub fn from_file(path: &Path, is_reftest: bool) -> OptimizerResult<Self> {
        if !path.exists() {
            return Err(OptimizerError::invariant(format!(
                "digest requested for missing baseline {}",
                path.display()
            )));
        }
        if is_reftest && has_extension(path, "png") {
            return Ok(Self::new("", Some(path.to_path_buf()), true));
        }

        let contents = fs::read(path).map_err(|e| OptimizerError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::from_contents(path, &contents, is_reftest))
    }

    /// Digest in-memory contents as if they were read from `path`.
    ///
    /// Only the extension of `path` is consulted.
    pub fn from_contents(path: &Path, contents: &[u8], is_reftest: bool) -> Self {
        if is_reftest && has_extension(path, "png") {
            return Self::new("", Some(path.to_path_buf()), true);
        }

        let mut is_extra_result = contents.is_empty();
        let mut canonical: Cow<'_, [u8]> = Cow::Borrowed(contents);

        if has_extension(path, "txt") {
            match std::str::from_utf8(contents) {
                Ok(text) => {
                    if testharness::is_testharness_output(text)
                        || testharness::is_wdspec_output(text)
                    {
                        let stripped = text.trim();
                        if testharness::is_all_pass_test_result(stripped) {
                            is_extra_result = true;
                        }
                        canonical = Cow::Owned(stripped.as_bytes().to_vec());
                    }
                }
                Err(e) => {
                    debug!(
                        path = %path.display(),
                        error = %e,
                        "Baseline is not valid UTF-8, hashing raw bytes"
                    );
                }
            }
        }

        let mut hasher = Sha1::new();
        hasher.update(&canonical);
        let sha = format!("{:x}", hasher.finalize());

        Self::new(sha, Some(path.to_path_buf()), is_extra_result)
    }

    /// Compare two digests under the baseline equality relation.
    ///
    /// If either side is the implicit extra sentinel, the two match exactly
    /// when both are extra results. Otherwise the SHA values must be equal.
    pub fn matches(&self, other: &ResultDigest) -> bool {
        if self.sha == IMPLICIT_EXTRA_RESULT || other.sha == IMPLICIT_EXTRA_RESULT {
            return self.is_extra_result && other.is_extra_result;
        }
        self.sha == other.sha
    }

    pub fn sha(&self) -> &str {
        &self.sha
    }

    /// The file this digest was computed from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_extra_result(&self) -> bool {
        self.is_extra_result
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ALL_PASS: &str = "This is a testharness.js-based test.\n\
        All subtests passed and are omitted for brevity.\n\
        Harness: the test ran to completion.\n";

    fn txt(contents: &str) -> ResultDigest {
        ResultDigest::from_contents(Path::new("foo-expected.txt"), contents.as_bytes(), false)
    }

    #[test]
    fn test_same_contents_match() {
        assert!(txt("a").matches(&txt("a")));
        assert!(!txt("a").matches(&txt("b")));
    }

    #[test]
    fn test_sha_is_hex_sha1() {
        let digest = txt("a");
        assert_eq!(digest.sha(), "86f7e437faa5a7fce15d1ddcb9eaeaea377667b8");
        assert!(!digest.is_extra_result());
    }

    #[test]
    fn test_empty_file_is_extra() {
        assert!(txt("").is_extra_result());
        let wav = ResultDigest::from_contents(Path::new("foo-expected.wav"), b"", false);
        assert!(wav.is_extra_result());
        assert!(wav.matches(&ResultDigest::implicit_extra()));
    }

    #[test]
    fn test_testharness_output_is_whitespace_stripped() {
        let body =
            "This is a testharness.js-based test.\n[FAIL] x\nHarness: the test ran to completion.";
        let padded = format!("\n\n  {}  \n\n", body);
        assert!(txt(body).matches(&txt(&padded)));
    }

    #[test]
    fn test_plain_text_is_not_stripped() {
        assert!(!txt("layer at (0,0)").matches(&txt("layer at (0,0)\n")));
    }

    #[test]
    fn test_all_pass_is_extra() {
        let digest = txt(ALL_PASS);
        assert!(digest.is_extra_result());
        assert!(digest.matches(&ResultDigest::implicit_extra()));
    }

    #[test]
    fn test_reftest_png_is_extra_with_empty_sha() {
        let a = ResultDigest::from_contents(Path::new("foo-expected.png"), b"\x89PNG one", true);
        let b = ResultDigest::from_contents(Path::new("foo-expected.png"), b"\x89PNG two", true);
        assert!(a.is_extra_result());
        assert_eq!(a.sha(), "");
        assert!(a.matches(&b));
        assert!(a.matches(&ResultDigest::implicit_extra()));
    }

    #[test]
    fn test_non_reftest_png_compares_bytes() {
        let a = ResultDigest::from_contents(Path::new("foo-expected.png"), b"\x89PNG one", false);
        let b = ResultDigest::from_contents(Path::new("foo-expected.png"), b"\x89PNG two", false);
        assert!(!a.is_extra_result());
        assert!(!a.matches(&b));
    }

    #[test]
    fn test_invalid_utf8_hashes_raw_bytes() {
        let raw = b"This is a testharness.js-based test.\n\xff\xfe";
        let digest = ResultDigest::from_contents(Path::new("foo-expected.txt"), raw, false);
        let mut hasher = Sha1::new();
        hasher.update(raw);
        assert_eq!(digest.sha(), format!("{:x}", hasher.finalize()));
    }

    #[test]
    fn test_equality_is_not_transitive() {
        // Two real extra results with different contents.
        let a = txt(ALL_PASS);
        let c = txt("");
        let b = ResultDigest::implicit_extra();
        assert!(a.matches(&b));
        assert!(b.matches(&c));
        assert!(!a.matches(&c));
    }

    #[test]
    fn test_implicit_extra_rejects_non_extra() {
        assert!(!txt("a").matches(&ResultDigest::implicit_extra()));
        assert!(!ResultDigest::implicit_extra().matches(&txt("a")));
    }

    #[test]
    fn test_unique_matches_only_itself() {
        let block = ResultDigest::unique();
        assert!(block.matches(&block));
        assert!(!block.matches(&ResultDigest::unique()));
        assert!(!block.matches(&ResultDigest::implicit_extra()));
        assert!(!block.matches(&txt("a")));
    }

    #[test]
    fn test_from_file_reads_contents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("foo-expected.txt");
        fs::write(&path, "a").unwrap();

        let digest = ResultDigest::from_file(&path, false).unwrap();
        assert!(digest.matches(&txt("a")));
        assert_eq!(digest.path(), Some(path.as_path()));
    }

    #[test]
    fn test_from_file_missing_is_error() {
        let temp = TempDir::new().unwrap();
        let result = ResultDigest::from_file(&temp.path().join("nope-expected.txt"), false);
        assert!(matches!(result, Err(OptimizerError::Invariant(_))));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn digest_strategy() -> impl Strategy<Value = ResultDigest> {
            prop_oneof![
                Just(ResultDigest::implicit_extra()),
                "[a-c]{0,3}".prop_map(|s| txt(&s)),
                prop::collection::vec(any::<u8>(), 0..8).prop_map(|bytes| {
                    ResultDigest::from_contents(Path::new("foo-expected.png"), &bytes, false)
                }),
            ]
        }

        proptest! {
            #[test]
            fn test_matches_is_reflexive(a in digest_strategy()) {
                prop_assert!(a.matches(&a));
            }

            #[test]
            fn test_matches_is_symmetric(a in digest_strategy(), b in digest_strategy()) {
                prop_assert_eq!(a.matches(&b), b.matches(&a));
            }
        }
    }
}
