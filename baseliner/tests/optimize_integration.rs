//! Integration tests for the public optimizer API.
//!
//! These tests build a small web tests tree on disk, including a
//! `VirtualTestSuites` file and expectations, and drive the optimizer the
//! way the CLI does:
//! - config → ports → optimizer
//! - pattern expansion over the tree
//! - check runs followed by real runs, aggregated into a report
//!
//! Run with: `cargo test --test optimize_integration`

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use baseliner::config::OptimizerConfig;
use baseliner::discovery::expand_tests;
use baseliner::manifest::FsReferenceTests;
use baseliner::optimizer::{BaselineOptimizer, BaselineSuffix, FsWriter};
use baseliner::port::PortFactory;
use baseliner::{OptimizeReport, RunStatus};

// ============================================================================
// Helper Functions
// ============================================================================

const SUITES: &str = r#"[
    "Suites used by the integration tests.",
    {
        "prefix": "gpu",
        "platforms": ["Linux", "Mac", "Win"],
        "bases": ["fast/canvas"],
        "args": ["--enable-gpu"]
    }
]"#;

const CONFIG: &str = "\
[port.linux]
os = linux
fallback = linux

[port.mac15]
os = mac
fallback = mac

[port.win11]
os = win
fallback = win
";

fn write(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A web tests tree with two canvas tests and one reftest.
fn web_tests() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write(root, "VirtualTestSuites", SUITES.as_bytes());
    write(
        root,
        "TestExpectations",
        b"# Flaky on Windows.\n\
          [ Win ] fast/canvas/skipped.html [ Skip ]\n\
          [ Win ] virtual/gpu/fast/canvas/skipped.html [ Skip ]\n",
    );

    write(root, "fast/canvas/a.html", b"<canvas>");
    write(root, "fast/canvas/b.html", b"<canvas>");
    write(root, "fast/canvas/skipped.html", b"<canvas>");
    write(root, "fast/canvas/ref.html", b"<div>");
    write(root, "fast/canvas/ref-expected.html", b"<div>");
    write(root, "fast/canvas/resources/helper.js", b"");

    // a: identical everywhere, duplicated in the gpu suite.
    for dir in ["platform/linux/", "platform/mac/", "platform/win/", "platform/win/virtual/gpu/"] {
        write(root, &format!("{}fast/canvas/a-expected.txt", dir), b"PASS\n");
    }

    // b: already optimal.
    write(root, "fast/canvas/b-expected.txt", b"generic\n");
    write(root, "platform/win/fast/canvas/b-expected.txt", b"win\n");

    // skipped: win's copy is never read, linux and mac agree.
    write(root, "platform/linux/fast/canvas/skipped-expected.txt", b"same\n");
    write(root, "platform/mac/fast/canvas/skipped-expected.txt", b"same\n");
    write(root, "platform/win/fast/canvas/skipped-expected.txt", b"other\n");

    // ref: reftest screenshots are never needed.
    write(root, "platform/linux/fast/canvas/ref-expected.png", b"\x89PNG linux");

    temp
}

fn optimizer(root: &Path) -> BaselineOptimizer {
    let config = OptimizerConfig::parse(Path::new("config.ini"), CONFIG)
        .unwrap()
        .with_web_tests(root);
    let factory = PortFactory::new(config.require_web_tests().unwrap()).unwrap();
    let ports = factory.create_all(&config.ports());
    BaselineOptimizer::new(ports, Arc::new(FsReferenceTests::new(root))).unwrap()
}

fn run(optimizer: &BaselineOptimizer, tests: &[String], check: bool) -> OptimizeReport {
    let mut report = OptimizeReport::new(check);
    for test in tests {
        for suffix in BaselineSuffix::ALL {
            let result = if check {
                optimizer.check(test, suffix)
            } else {
                optimizer.optimize(test, suffix, &FsWriter)
            };
            match result {
                Ok(outcome) => report.record(outcome),
                Err(e) => report.record_failure(test, suffix, &e),
            }
        }
    }
    report
}

fn exists(root: &Path, relative: &str) -> bool {
    root.join(relative).is_file()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_pattern_expansion_finds_tests() {
    let temp = web_tests();
    let tests = expand_tests(temp.path(), &["fast/canvas/*.html".to_string()]).unwrap();
    assert_eq!(
        tests,
        vec![
            "fast/canvas/a.html",
            "fast/canvas/b.html",
            "fast/canvas/ref.html",
            "fast/canvas/skipped.html",
        ]
    );
}

#[test]
fn test_check_then_optimize() {
    let temp = web_tests();
    let root = temp.path();
    let optimizer = optimizer(root);
    let tests = expand_tests(root, &["fast/canvas/*.html".to_string()]).unwrap();

    let check = run(&optimizer, &tests, true);
    assert_eq!(check.status(), RunStatus::PendingChanges);
    assert!(exists(root, "platform/linux/fast/canvas/a-expected.txt"));

    let applied = run(&optimizer, &tests, false);
    assert_eq!(applied.status(), RunStatus::Changed);
    assert_eq!(applied.totals(), check.totals());

    // a collapses to one generic baseline.
    assert!(exists(root, "fast/canvas/a-expected.txt"));
    for dir in ["platform/linux/", "platform/mac/", "platform/win/", "platform/win/virtual/gpu/"] {
        assert!(!exists(root, &format!("{}fast/canvas/a-expected.txt", dir)), "{}", dir);
    }

    // b is untouched.
    assert!(exists(root, "fast/canvas/b-expected.txt"));
    assert!(exists(root, "platform/win/fast/canvas/b-expected.txt"));

    // skipped: win does not run it, so linux and mac's value moves up.
    assert_eq!(
        fs::read(root.join("fast/canvas/skipped-expected.txt")).unwrap(),
        b"same\n"
    );
    assert!(!exists(root, "platform/linux/fast/canvas/skipped-expected.txt"));

    // ref: the screenshot is gone.
    assert!(!exists(root, "platform/linux/fast/canvas/ref-expected.png"));

    let again = run(&optimizer, &tests, true);
    assert_eq!(again.status(), RunStatus::Clean);
}

#[test]
fn test_json_report_lists_changes() {
    let temp = web_tests();
    let optimizer = optimizer(temp.path());

    let report = run(&optimizer, &["fast/canvas/a.html".to_string()], true);
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["check"], true);
    assert_eq!(json["totals"]["passes"], 3);
    assert_eq!(json["totals"]["changed"], 1);
    assert_eq!(json["outcomes"][0]["test"], "fast/canvas/a.html");
    assert_eq!(json["outcomes"][0]["changes"][0]["action"], "promote");
}

#[test]
fn test_virtual_test_is_optimized_alone() {
    let temp = web_tests();
    let root = temp.path();
    let optimizer = optimizer(root);

    let outcome = optimizer
        .optimize("virtual/gpu/fast/canvas/a.html", BaselineSuffix::Txt, &FsWriter)
        .unwrap();

    // The gpu copy falls back to an equal win baseline and goes; the
    // nonvirtual platform copies stay.
    assert_eq!(outcome.removals(), 1);
    assert!(!exists(root, "platform/win/virtual/gpu/fast/canvas/a-expected.txt"));
    assert!(exists(root, "platform/linux/fast/canvas/a-expected.txt"));
    assert!(exists(root, "platform/win/fast/canvas/a-expected.txt"));
}
