//! Expansion of test arguments into test names.
//!
//! Arguments without glob metacharacters are taken as test names verbatim,
//! as are query variants (`a.any.html?wss`) of a test file that exists.
//! Patterns are matched against the web tests tree; a `virtual/<suite>/`
//! prefix is kept aside and the remainder is matched against the base tests,
//! since virtual tests have no files of their own.

use std::collections::BTreeSet;
use std::path::{Component, Path};

use tracing::{debug, warn};

use crate::error::{OptimizerError, OptimizerResult};

/// Extensions of files the runner treats as tests.
pub const TEST_EXTENSIONS: &[&str] =
    &["html", "htm", "xht", "xhtml", "svg", "xml", "php", "pl", "js"];

/// Directories holding helpers rather than tests.
const SUPPORT_DIRS: &[&str] = &["resources", "support"];

/// Top-level directories holding baselines.
const BASELINE_DIRS: &[&str] = &["platform", "flag-specific"];

fn is_pattern(arg: &str) -> bool {
    arg.contains(['*', '?', '['])
}

/// Whether `arg` is `<test>?<query>` for an existing test file, rather than a
/// pattern using `?` as a wildcard.
fn is_query_variant(web_tests: &Path, arg: &str) -> bool {
    let Some((file, _)) = arg.split_once('?') else {
        return false;
    };
    if is_pattern(file) {
        return false;
    }
    let (_, rest) = split_virtual_prefix(file);
    web_tests.join(rest).is_file()
}

/// Split `virtual/<suite>/rest` into (`virtual/<suite>/`, `rest`).
fn split_virtual_prefix(arg: &str) -> (&str, &str) {
    if let Some(rest) = arg.strip_prefix("virtual/") {
        if let Some(slash) = rest.find('/') {
            let split = "virtual/".len() + slash + 1;
            return (&arg[..split], &arg[split..]);
        }
    }
    ("", arg)
}

/// Whether a path relative to the web tests directory names a test file.
pub fn is_test_file(relative: &Path) -> bool {
    let Some(ext) = relative.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !TEST_EXTENSIONS.contains(&ext) {
        return false;
    }
    let stem = relative.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    if stem.ends_with("-expected") || stem.ends_with("-expected-mismatch") {
        return false;
    }

    let dirs: Vec<&str> = relative
        .parent()
        .into_iter()
        .flat_map(|p| p.components())
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    if dirs.first().is_some_and(|d| BASELINE_DIRS.contains(d)) {
        return false;
    }
    !dirs.iter().any(|d| SUPPORT_DIRS.contains(d))
}

/// Expand test arguments against the web tests directory.
///
/// Output order follows the arguments; matches of one pattern are sorted.
/// Duplicates are dropped.
///
/// # Errors
///
/// Returns [`OptimizerError::InvalidPattern`] for malformed glob patterns.
pub fn expand_tests(web_tests: &Path, args: &[String]) -> OptimizerResult<Vec<String>> {
    let mut seen = BTreeSet::new();
    let mut tests = Vec::new();

    for arg in args {
        if !is_pattern(arg) || is_query_variant(web_tests, arg) {
            if seen.insert(arg.clone()) {
                tests.push(arg.clone());
            }
            continue;
        }

        let (prefix, rest) = split_virtual_prefix(arg);
        let full = web_tests.join(rest);
        let entries = glob::glob(&full.to_string_lossy()).map_err(|e| {
            OptimizerError::InvalidPattern {
                pattern: arg.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut matched = BTreeSet::new();
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    debug!(pattern = %arg, error = %e, "Unreadable glob entry");
                    continue;
                }
            };
            let Ok(relative) = path.strip_prefix(web_tests) else {
                continue;
            };
            if path.is_file() && is_test_file(relative) {
                let name = relative
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("/");
                matched.insert(format!("{}{}", prefix, name));
            }
        }

        if matched.is_empty() {
            warn!(pattern = %arg, "Pattern matched no tests");
        } else {
            debug!(pattern = %arg, count = matched.len(), "Expanded test pattern");
        }
        for test in matched {
            if seen.insert(test.clone()) {
                tests.push(test);
            }
        }
    }

    Ok(tests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_is_test_file() {
        assert!(is_test_file(Path::new("fast/a.html")));
        assert!(is_test_file(Path::new("external/wpt/a.any.js")));
        assert!(!is_test_file(Path::new("fast/a-expected.txt")));
        assert!(!is_test_file(Path::new("fast/a-expected.html")));
        assert!(!is_test_file(Path::new("fast/a-expected-mismatch.svg")));
        assert!(!is_test_file(Path::new("fast/resources/helper.js")));
        assert!(!is_test_file(Path::new("platform/win/fast/a.html")));
        assert!(!is_test_file(Path::new("fast/README")));
    }

    #[test]
    fn test_split_virtual_prefix() {
        assert_eq!(
            split_virtual_prefix("virtual/gpu/fast/*.html"),
            ("virtual/gpu/", "fast/*.html")
        );
        assert_eq!(split_virtual_prefix("fast/*.html"), ("", "fast/*.html"));
        assert_eq!(split_virtual_prefix("virtual/"), ("", "virtual/"));
    }

    #[test]
    fn test_plain_arguments_pass_through() {
        let temp = TempDir::new().unwrap();
        let tests =
            expand_tests(temp.path(), &args(&["missing.html", "b.html", "missing.html"])).unwrap();
        assert_eq!(tests, vec!["missing.html", "b.html"]);
    }

    #[test]
    fn test_expand_glob() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "fast/b.html");
        touch(temp.path(), "fast/a.html");
        touch(temp.path(), "fast/a-expected.txt");
        touch(temp.path(), "fast/resources/r.html");
        touch(temp.path(), "other/c.html");

        let tests = expand_tests(temp.path(), &args(&["fast/*"])).unwrap();
        assert_eq!(tests, vec!["fast/a.html", "fast/b.html"]);
    }

    #[test]
    fn test_expand_virtual_glob() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "fast/a.html");

        let patterns = args(&["virtual/gpu/fast/*.html", "fast/a.html"]);
        let tests = expand_tests(temp.path(), &patterns).unwrap();
        assert_eq!(tests, vec!["virtual/gpu/fast/a.html", "fast/a.html"]);
    }

    #[test]
    fn test_query_variants_pass_through() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "external/wpt/ws.any.html");

        let tests = expand_tests(
            temp.path(),
            &args(&[
                "external/wpt/ws.any.html?wss",
                "virtual/gpu/external/wpt/ws.any.html?wpt_flags=h2",
            ]),
        )
        .unwrap();
        assert_eq!(
            tests,
            vec![
                "external/wpt/ws.any.html?wss",
                "virtual/gpu/external/wpt/ws.any.html?wpt_flags=h2",
            ]
        );
    }

    #[test]
    fn test_question_mark_wildcard_still_globs() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "fast/a1.html");
        touch(temp.path(), "fast/a2.html");

        let tests = expand_tests(temp.path(), &args(&["fast/a?.html"])).unwrap();
        assert_eq!(tests, vec!["fast/a1.html", "fast/a2.html"]);
        assert!(!is_query_variant(temp.path(), "fast/a?.html"));
    }

    #[test]
    fn test_invalid_pattern() {
        let temp = TempDir::new().unwrap();
        let result = expand_tests(temp.path(), &args(&["fast/[*.html"]));
        assert!(matches!(result, Err(OptimizerError::InvalidPattern { .. })));
    }
}
