//! Heuristics for recognizing testharness.js and wdspec text output.
//!
//! Detection is substring and prefix based, mirroring how the test runner
//! itself classifies `-expected.txt` files. These are not parsers.

/// First line emitted by testharness.js-based tests.
pub const TESTHARNESS_HEADER: &str = "This is a testharness.js-based test.";

/// First line emitted by wdspec tests.
pub const WDSPEC_HEADER: &str = "This is a wdspec test.";

/// Line written in abbreviated baselines whose subtests all passed.
pub const ALL_PASS_MARKER: &str = "All subtests passed and are omitted for brevity.";

/// Trailing line of a harness run that completed normally.
pub const HARNESS_COMPLETED: &str = "Harness: the test ran to completion.";

const PASS_PREFIXES: &[&str] = &["PASS", "[PASS]"];

const FAIL_PREFIXES: &[&str] = &[
    "FAIL",
    "TIMEOUT",
    "NOTRUN",
    "[FAIL]",
    "[TIMEOUT]",
    "[NOTRUN]",
    "[PRECONDITION_FAILED]",
    "Harness Error.",
];

/// Lines that carry information beyond subtest results.
const USEFUL_OUTPUT_PREFIXES: &[&str] = &["CONSOLE ", "ALERT:", "CONFIRM:", "PROMPT:"];

/// Whether the text looks like testharness.js output.
pub fn is_testharness_output(content: &str) -> bool {
    content.lines().any(|line| line.trim() == TESTHARNESS_HEADER)
}

/// Whether the text looks like wdspec output.
pub fn is_wdspec_output(content: &str) -> bool {
    content.lines().any(|line| line.trim() == WDSPEC_HEADER)
}

/// Whether the text is a testharness or wdspec result with only passing
/// subtests and nothing else worth keeping.
///
/// Every non-blank line must be one of the header, a passing subtest, the
/// abbreviated all-pass marker, a `See ...` pointer, or the completion line.
/// At least one pass indication is required.
pub fn is_all_pass_test_result(content: &str) -> bool {
    if !is_testharness_output(content) && !is_wdspec_output(content) {
        return false;
    }

    let mut passed = false;
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if FAIL_PREFIXES.iter().any(|p| line.starts_with(p))
            || USEFUL_OUTPUT_PREFIXES.iter().any(|p| line.starts_with(p))
        {
            return false;
        }
        if line == ALL_PASS_MARKER || PASS_PREFIXES.iter().any(|p| line.starts_with(p)) {
            passed = true;
            continue;
        }
        let known = line == TESTHARNESS_HEADER
            || line == WDSPEC_HEADER
            || line == HARNESS_COMPLETED
            || line.starts_with("See ");
        if !known {
            return false;
        }
    }
    passed
}
