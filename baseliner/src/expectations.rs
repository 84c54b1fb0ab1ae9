//! Test expectations files.
//!
//! Only enough of the expectations format is understood to answer "which
//! statuses does this port expect for this test". Each line reads
//!
//! ```text
//! [reason] [ '[' tags ']' ] test ['[' statuses ']']
//! ```
//!
//! where `reason` is a bug link, `tags` restrict the line to matching ports,
//! and a test ending in `*` matches every test under that prefix.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Generic expectations file at the web tests root.
pub const TEST_EXPECTATIONS_FILE: &str = "TestExpectations";

/// Tests that will never pass on some ports.
pub const NEVER_FIX_TESTS_FILE: &str = "NeverFixTests";

/// Directory holding one expectations file per flag-specific configuration.
pub const FLAG_EXPECTATIONS_DIR: &str = "FlagExpectations";

/// Status that removes a test from a port's run.
pub const SKIP: &str = "Skip";

/// Errors reading or parsing expectations.
///
/// Cloneable so a port can hold a failed load and report it on every lookup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpectationsError {
    /// The file exists but could not be read.
    #[error("failed to read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },
    /// A line does not follow the expectations grammar.
    #[error("{}:{line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// One parsed expectation line.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectationLine {
    tags: Vec<String>,
    test: String,
    is_glob: bool,
    statuses: Vec<String>,
}

impl ExpectationLine {
    pub fn test(&self) -> &str {
        &self.test
    }

    pub fn statuses(&self) -> &[String] {
        &self.statuses
    }

    /// Whether this line names `test`, exactly or through a trailing `*`.
    fn matches_test(&self, test: &str) -> bool {
        if self.is_glob {
            test.starts_with(&self.test)
        } else {
            test == self.test
        }
    }

    /// Untagged lines apply everywhere; tagged lines need every tag present.
    fn applies_to(&self, port_tags: &[String]) -> bool {
        self.tags.iter().all(|tag| port_tags.iter().any(|t| t == tag))
    }

    /// Higher wins. Exact names outrank every glob.
    fn specificity(&self) -> usize {
        if self.is_glob {
            self.test.len()
        } else {
            usize::MAX
        }
    }
}

/// A port's combined expectations.
#[derive(Debug, Clone, Default)]
pub struct TestExpectations {
    lines: Vec<ExpectationLine>,
}

impl TestExpectations {
    /// Parse the contents of one expectations file.
    ///
    /// `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ExpectationsError::Parse`] for the first malformed line.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ExpectationsError> {
        let mut lines = Vec::new();
        for (index, raw) in content.lines().enumerate() {
            let parsed = parse_line(raw).map_err(|reason| ExpectationsError::Parse {
                path: path.to_path_buf(),
                line: index + 1,
                reason,
            })?;
            if let Some(line) = parsed {
                lines.push(line);
            }
        }
        Ok(Self { lines })
    }

    /// Load and merge the given files. Missing files are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load(paths: &[PathBuf]) -> Result<Self, ExpectationsError> {
        let mut merged = Self::default();
        for path in paths {
            if !path.exists() {
                debug!(path = %path.display(), "Expectations file not found, skipping");
                continue;
            }
            let content = fs::read_to_string(path).map_err(|e| ExpectationsError::Read {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            let parsed = Self::parse(path, &content)?;
            debug!(path = %path.display(), lines = parsed.len(), "Loaded expectations");
            merged.lines.extend(parsed.lines);
        }
        Ok(merged)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Statuses expected for `test` on a port with the given lowercase tags.
    ///
    /// Only the most specific applicable lines contribute; statuses of equally
    /// specific lines are merged. An empty set means no line applies.
    pub fn statuses_for(&self, test: &str, port_tags: &[String]) -> BTreeSet<String> {
        let applicable: Vec<&ExpectationLine> = self
            .lines
            .iter()
            .filter(|line| line.matches_test(test) && line.applies_to(port_tags))
            .collect();

        let Some(best) = applicable.iter().map(|line| line.specificity()).max() else {
            return BTreeSet::new();
        };

        applicable
            .into_iter()
            .filter(|line| line.specificity() == best)
            .flat_map(|line| line.statuses.iter().cloned())
            .collect()
    }
}

/// Parse a single line; `Ok(None)` for blank and comment lines.
fn parse_line(raw: &str) -> Result<Option<ExpectationLine>, String> {
    let content = raw.split('#').next().unwrap_or("");
    let spaced = content.replace('[', " [ ").replace(']', " ] ");
    let tokens: Vec<&str> = spaced.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(None);
    }

    // A leading bug reference is present when a test name still follows it,
    // possibly after a tag group.
    let has_reason = tokens[0] != "["
        && match tokens.get(1) {
            None => false,
            Some(&"[") => tokens
                .iter()
                .position(|t| *t == "]")
                .and_then(|close| tokens.get(close + 1))
                .is_some_and(|t| *t != "["),
            Some(_) => true,
        };
    let mut pos = usize::from(has_reason);

    let mut tags = Vec::new();
    if tokens.get(pos) == Some(&"[") {
        let (group, next) = bracket_group(&tokens, pos)?;
        tags = group.iter().map(|t| t.to_lowercase()).collect();
        pos = next;
    }

    let test = match tokens.get(pos) {
        Some(&t) if t != "[" && t != "]" => t,
        _ => return Err("missing test name".to_string()),
    };
    pos += 1;

    let mut statuses = Vec::new();
    if tokens.get(pos) == Some(&"[") {
        let (group, next) = bracket_group(&tokens, pos)?;
        statuses = group.iter().map(|s| s.to_string()).collect();
        pos = next;
    }

    if pos != tokens.len() {
        return Err(format!("unexpected token '{}'", tokens[pos]));
    }

    let (test, is_glob) = match test.strip_suffix('*') {
        Some(prefix) => (prefix.to_string(), true),
        None => (test.to_string(), false),
    };

    Ok(Some(ExpectationLine {
        tags,
        test,
        is_glob,
        statuses,
    }))
}

/// Collect the tokens of a `[ ... ]` group starting at `open`.
fn bracket_group<'a>(tokens: &[&'a str], open: usize) -> Result<(Vec<&'a str>, usize), String> {
    let mut group = Vec::new();
    for (offset, token) in tokens[open + 1..].iter().enumerate() {
        match *token {
            "]" => return Ok((group, open + offset + 2)),
            "[" => return Err("nested '['".to_string()),
            t => group.push(t),
        }
    }
    Err("unterminated '['".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn parse(content: &str) -> TestExpectations {
        TestExpectations::parse(Path::new("TestExpectations"), content).unwrap()
    }

    #[test]
    fn test_parse_full_line() {
        let line = parse_line("crbug.com/123 [ Win Debug ] fast/a.html [ Failure Skip ]")
            .unwrap()
            .unwrap();
        assert_eq!(line.tags, vec!["win", "debug"]);
        assert_eq!(line.test(), "fast/a.html");
        assert!(!line.is_glob);
        assert_eq!(line.statuses(), &["Failure".to_string(), "Skip".to_string()]);
    }

    #[test]
    fn test_parse_minimal_lines() {
        let line = parse_line("fast/a.html [ Skip ]").unwrap().unwrap();
        assert!(line.tags.is_empty());
        assert_eq!(line.test(), "fast/a.html");

        let line = parse_line("fast/a.html").unwrap().unwrap();
        assert!(line.statuses().is_empty());

        let line = parse_line("crbug.com/1 fast/a.html").unwrap().unwrap();
        assert_eq!(line.test(), "fast/a.html");
    }

    #[test]
    fn test_parse_glob_and_comments() {
        let line = parse_line("[ Mac ] fast/dom/* [ Skip ] # flaky").unwrap().unwrap();
        assert!(line.is_glob);
        assert_eq!(line.test(), "fast/dom/");

        assert!(parse_line("# a comment").unwrap().is_none());
        assert!(parse_line("   ").unwrap().is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("[ Win fast/a.html").is_err());
        assert!(parse_line("fast/a.html [ Skip ] [ Pass ]").is_err());
        assert!(parse_line("[ Win ]").is_err());

        let err = TestExpectations::parse(Path::new("TE"), "ok.html\n[ Win bad").unwrap_err();
        assert!(matches!(err, ExpectationsError::Parse { line: 2, .. }));
        assert!(err.to_string().starts_with("TE:2:"));
    }

    #[test]
    fn test_read_error_message() {
        let err = ExpectationsError::Read {
            path: PathBuf::from("/w/TestExpectations"),
            reason: "permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "failed to read /w/TestExpectations: permission denied");
        let cloned = err.clone();
        assert_eq!(cloned, err);
    }

    #[test]
    fn test_tags_restrict_lines() {
        let exp = parse("[ Win ] fast/a.html [ Skip ]\n");
        assert!(exp.statuses_for("fast/a.html", &tags(&["win11", "win"])).contains(SKIP));
        assert!(exp.statuses_for("fast/a.html", &tags(&["linux"])).is_empty());
    }

    #[test]
    fn test_most_specific_line_wins() {
        let exp = parse(
            "fast/* [ Skip ]\n\
             fast/dom/* [ Failure ]\n\
             fast/dom/a.html [ Pass ]\n\
             [ Linux ] fast/dom/a.html [ Timeout ]\n",
        );
        let linux = tags(&["linux"]);
        let win = tags(&["win"]);

        let statuses = exp.statuses_for("fast/dom/a.html", &linux);
        assert_eq!(statuses.into_iter().collect::<Vec<_>>(), vec!["Pass", "Timeout"]);
        let statuses = exp.statuses_for("fast/dom/a.html", &win);
        assert_eq!(statuses.into_iter().collect::<Vec<_>>(), vec!["Pass"]);
        let statuses = exp.statuses_for("fast/dom/b.html", &win);
        assert_eq!(statuses.into_iter().collect::<Vec<_>>(), vec!["Failure"]);
        let statuses = exp.statuses_for("fast/css/b.html", &win);
        assert_eq!(statuses.into_iter().collect::<Vec<_>>(), vec!["Skip"]);
        assert!(exp.statuses_for("other/a.html", &win).is_empty());
    }

    #[test]
    fn test_load_merges_and_skips_missing() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join(TEST_EXPECTATIONS_FILE);
        let second = temp.path().join(NEVER_FIX_TESTS_FILE);
        fs::write(&first, "a.html [ Failure ]\n").unwrap();
        fs::write(&second, "b.html [ Skip ]\n").unwrap();

        let exp = TestExpectations::load(&[
            first,
            temp.path().join("missing"),
            second,
        ])
        .unwrap();
        assert_eq!(exp.len(), 2);
        assert!(exp.statuses_for("b.html", &[]).contains(SKIP));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(TEST_EXPECTATIONS_FILE);
        fs::write(&path, "[ Win\n").unwrap();
        assert!(TestExpectations::load(&[path]).is_err());
    }
}
