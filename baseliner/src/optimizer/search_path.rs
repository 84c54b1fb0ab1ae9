//! Search paths through the baseline fallback graph.
//!
//! Each (port, test) pair yields one [`SearchPath`]: the locations the runner
//! consults, in order, to find that test's baseline. A virtual test searches
//! its virtual directories first and then falls back to the nonvirtual path.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::error::{OptimizerError, OptimizerResult};
use crate::location::BaselineLocation;
use crate::port::Port;

/// Virtual suite whose tests never share baselines with their bases when
/// the test lives under a `webexposed` directory.
pub const STABLE_SUITE: &str = "stable";

const WEBEXPOSED_SEGMENT: &str = "webexposed";

/// The fallback sequence one port follows for one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    port: String,
    test: String,
    locations: Vec<BaselineLocation>,
}

impl SearchPath {
    pub fn new(
        port: impl Into<String>,
        test: impl Into<String>,
        locations: Vec<BaselineLocation>,
    ) -> Self {
        Self {
            port: port.into(),
            test: test.into(),
            locations,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn test(&self) -> &str {
        &self.test
    }

    pub fn locations(&self) -> &[BaselineLocation] {
        &self.locations
    }

    /// The first location searched.
    pub fn head(&self) -> Option<&BaselineLocation> {
        self.locations.first()
    }

    /// The locations followed by the all-pass sink.
    pub fn with_all_pass(&self) -> impl Iterator<Item = &BaselineLocation> + '_ {
        self.locations.iter().chain(std::iter::once(all_pass()))
    }
}

fn all_pass() -> &'static BaselineLocation {
    static ALL_PASS: std::sync::OnceLock<BaselineLocation> = std::sync::OnceLock::new();
    ALL_PASS.get_or_init(BaselineLocation::all_pass)
}

/// Whether a test path has a `webexposed` directory segment.
fn is_webexposed(test: &str) -> bool {
    test.split('/').any(|segment| segment == WEBEXPOSED_SEGMENT)
}

/// Build the search paths of every (port, test) pair that runs.
///
/// `tests` may mix a nonvirtual test and its virtual siblings. Ports that
/// skip a test contribute no path for it. A failed skip lookup counts as
/// "not skipped".
///
/// # Errors
///
/// Returns an invariant error if a path repeats a location or a virtual
/// path mixes suites.
pub fn generate(ports: &[Arc<dyn Port>], tests: &[String]) -> OptimizerResult<Vec<SearchPath>> {
    let mut paths = Vec::new();
    let mut skipped: BTreeMap<&str, Vec<String>> = BTreeMap::new();

    for test in tests {
        for port in ports {
            match port.skips_test(test) {
                Ok(true) => {
                    skipped.entry(test.as_str()).or_default().push(port.name());
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    debug!(
                        port = %port.name(),
                        test = %test,
                        error = %e,
                        "Skip lookup failed, treating test as not skipped"
                    );
                }
            }

            let path = search_path_for(port.as_ref(), test)?;
            validate(&path)?;
            paths.push(path);
        }
    }

    for (test, mut names) in skipped {
        names.sort();
        debug!(test = %test, ports = %names.join(", "), "Skipped on ports");
    }

    Ok(paths)
}

/// The search path of one test on one port.
fn search_path_for(port: &dyn Port, test: &str) -> OptimizerResult<SearchPath> {
    let mut physical = Vec::new();
    for dir in port.baseline_search_path() {
        physical.push(port.baseline_location(&dir)?);
    }

    let suite = port
        .virtual_test_suites()
        .lookup_suite(test)
        .map(|suite| suite.prefix().to_string());

    let locations = match suite {
        Some(suite) => {
            let mut locations: Vec<BaselineLocation> = physical
                .iter()
                .map(|location| location.clone().with_virtual_suite(suite.clone()))
                .collect();
            if suite == STABLE_SUITE && is_webexposed(test) {
                locations.push(BaselineLocation::block());
            }
            locations.extend(physical);
            locations
        }
        None => physical,
    };

    Ok(SearchPath::new(port.name(), test, locations))
}

/// Check the structural invariants of one path.
fn validate(path: &SearchPath) -> OptimizerResult<()> {
    let mut seen = HashSet::new();
    for location in path.with_all_pass() {
        if !seen.insert(location) {
            return Err(OptimizerError::invariant(format!(
                "location {} repeats in the search path of {} on {}",
                location,
                path.test(),
                path.port()
            )));
        }
    }

    let suites: BTreeSet<&str> = path
        .locations()
        .iter()
        .filter_map(|location| location.virtual_suite())
        .collect();
    if suites.len() > 1 {
        return Err(OptimizerError::invariant(format!(
            "search path of {} on {} mixes virtual suites {:?}",
            path.test(),
            path.port(),
            suites
        )));
    }

    match path.locations().iter().rev().find(|l| !l.is_sentinel()) {
        Some(last) if last.is_root() && !last.is_virtual() => Ok(()),
        _ => Err(OptimizerError::invariant(format!(
            "search path of {} on {} does not end at the generic root",
            path.test(),
            path.port()
        ))),
    }
}

/// Reverse adjacency: for each location, the locations directly before it
/// in some path. Every path is extended with the all-pass sink.
pub fn predecessor_map(
    paths: &[SearchPath],
) -> BTreeMap<BaselineLocation, BTreeSet<BaselineLocation>> {
    let mut predecessors: BTreeMap<BaselineLocation, BTreeSet<BaselineLocation>> =
        BTreeMap::new();
    for path in paths {
        let locations: Vec<&BaselineLocation> = path.with_all_pass().collect();
        for pair in locations.windows(2) {
            predecessors
                .entry(pair[1].clone())
                .or_default()
                .insert(pair[0].clone());
        }
    }
    predecessors
}
