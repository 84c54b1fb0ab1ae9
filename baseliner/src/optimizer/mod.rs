//! Baseline optimization.
//!
//! For one test and one baseline kind, the optimizer:
//!
//! 1. Collects the test and its virtual siblings.
//! 2. Builds every port's search path ([`search_path`]).
//! 3. Digests each location on those paths that has a file.
//! 4. Promotes agreed values into roots and drops unreachable roots ([`root`]).
//! 5. Removes redundant baselines until nothing changes ([`redundancy`]).
//!
//! All decisions are made against an in-memory digest map. Every change is
//! handed to a [`BaselineWriter`], which either applies it or only reports
//! it, so a check run proposes exactly what a real run would do.
//!
//! ```ignore
//! use baseliner::optimizer::{BaselineOptimizer, BaselineSuffix, FsWriter};
//!
//! let optimizer = BaselineOptimizer::new(ports, references)?;
//! let outcome = optimizer.optimize("fast/dom/a.html", BaselineSuffix::Txt, &FsWriter)?;
//! ```

pub mod redundancy;
pub mod root;
pub mod search_path;
mod types;
pub mod writer;


use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use crate::digest::ResultDigest;
use crate::error::{OptimizerError, OptimizerResult};
use crate::location::BaselineLocation;
use crate::manifest::ReferenceTests;
use crate::paths::{baseline_name, BaselinePaths};
use crate::port::Port;

pub use redundancy::{find_redundant, DigestMap, RemovalOrder};
pub use root::RootAction;
pub use search_path::SearchPath;
pub use types::{BaselineSuffix, ChangeScope, OptimizeOutcome};
pub use writer::{BaselineChange, BaselineWriter, CheckWriter, FsWriter, RemovalReason};

/// Optimizes baselines across a fixed set of ports.
pub struct BaselineOptimizer {
    ports: Vec<Arc<dyn Port>>,
    paths: BaselinePaths,
    references: Arc<dyn ReferenceTests>,
}

/// Per-pass state: what the optimizer is working on.
struct Pass<'a> {
    baseline_name: String,
    is_reftest: bool,
    scope: ChangeScope,
    writer: &'a dyn BaselineWriter,
    outcome: OptimizeOutcome,
}

impl BaselineOptimizer {
    /// Create an optimizer.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError::NoPorts`] for an empty port list and
    /// [`OptimizerError::InconsistentPorts`] if ports disagree on the web
    /// tests directory.
    pub fn new(
        ports: Vec<Arc<dyn Port>>,
        references: Arc<dyn ReferenceTests>,
    ) -> OptimizerResult<Self> {
        let web_tests = ports
            .first()
            .ok_or(OptimizerError::NoPorts)?
            .web_tests_dir()
            .to_path_buf();

        for port in &ports[1..] {
            if port.web_tests_dir() != web_tests {
                return Err(OptimizerError::InconsistentPorts {
                    port: port.name(),
                    expected: web_tests,
                    actual: port.web_tests_dir().to_path_buf(),
                });
            }
        }

        Ok(Self {
            ports,
            paths: BaselinePaths::new(web_tests),
            references,
        })
    }

    pub fn web_tests_dir(&self) -> &Path {
        self.paths.web_tests_dir()
    }

    pub fn ports(&self) -> &[Arc<dyn Port>] {
        &self.ports
    }

    /// Report the changes an optimization would make, without making them.
    pub fn check(&self, test: &str, suffix: BaselineSuffix) -> OptimizerResult<OptimizeOutcome> {
        self.optimize(test, suffix, &CheckWriter)
    }

    /// Whether optimizing the test would change nothing.
    pub fn is_clean(&self, test: &str, suffix: BaselineSuffix) -> OptimizerResult<bool> {
        Ok(self.check(test, suffix)?.is_clean())
    }

    /// Optimize one test's baselines of one kind.
    ///
    /// A nonvirtual test is optimized together with its virtual siblings. A
    /// virtual test is optimized alone: only baselines under its own suite
    /// may change.
    ///
    /// # Errors
    ///
    /// Returns an error on the first failed write or broken invariant. Changes
    /// applied before the failure stay on disk.
    pub fn optimize(
        &self,
        test: &str,
        suffix: BaselineSuffix,
        writer: &dyn BaselineWriter,
    ) -> OptimizerResult<OptimizeOutcome> {
        let span = info_span!("optimize", test = %test, suffix = %suffix);
        let _enter = span.enter();

        let check = writer.is_check_only();
        let outcome = OptimizeOutcome::new(test, suffix, check);

        let Some((nonvirtual, tests, scope)) = self.tests_to_optimize(test) else {
            warn!("Virtual test has no base test in any suite, skipping");
            return Ok(outcome);
        };
        info!(tests = tests.len(), "Optimizing {} ({})", test, suffix);

        let search_paths = search_path::generate(&self.ports, &tests)?;
        if search_paths.is_empty() {
            debug!("No port runs this test");
            return Ok(outcome);
        }

        let mut pass = Pass {
            baseline_name: baseline_name(&nonvirtual, suffix.extension()),
            is_reftest: self.references.is_reftest(&nonvirtual),
            scope,
            writer,
            outcome,
        };
        let mut digests = self.digest_map(&search_paths, &pass)?;
        let predecessors = search_path::predecessor_map(&search_paths);
        let roots = root::candidate_roots(&search_paths, &predecessors);

        loop {
            let mut changed = self.handle_roots(&roots, &mut digests, &mut pass)?;
            loop {
                let (removed, order) = find_redundant(&search_paths, &digests, &pass.scope);
                if removed.is_empty() {
                    break;
                }
                debug!(order = ?order, count = removed.len(), "Removing redundant baselines");
                for location in removed {
                    self.remove(&location, RemovalReason::Redundant, &mut digests, &mut pass)?;
                }
                changed = true;
            }
            if !changed {
                break;
            }
        }

        let outcome = pass.outcome;
        if outcome.is_clean() {
            info!("Baselines already optimal");
        } else {
            info!(
                promoted = outcome.promotions(),
                removed = outcome.removals(),
                check,
                "Optimization finished"
            );
        }
        Ok(outcome)
    }

    /// The nonvirtual base, every test sharing its baselines, and the scope
    /// of allowed changes. `None` for a virtual test with no known base.
    fn tests_to_optimize(&self, test: &str) -> Option<(String, Vec<String>, ChangeScope)> {
        let port = &self.ports[0];
        let suites = port.virtual_test_suites();

        if let Some(suite) = suites.lookup_suite(test) {
            let base = port.lookup_virtual_test_base(test)?;
            return Some((
                base,
                vec![test.to_string()],
                ChangeScope::VirtualSuite(suite.prefix().to_string()),
            ));
        }
        if test.starts_with("virtual/") {
            return None;
        }

        let mut tests = vec![test.to_string()];
        tests.extend(suites.virtual_siblings(test));
        Some((test.to_string(), tests, ChangeScope::All))
    }

    /// Digest every on-disk location that appears in a search path, plus the
    /// sentinels.
    fn digest_map(
        &self,
        search_paths: &[SearchPath],
        pass: &Pass<'_>,
    ) -> OptimizerResult<DigestMap> {
        let locations: BTreeSet<&BaselineLocation> = search_paths
            .iter()
            .flat_map(|p| p.locations())
            .collect();

        let mut digests = BTreeMap::new();
        digests.insert(BaselineLocation::all_pass(), ResultDigest::implicit_extra());
        for location in locations {
            if location.is_block() {
                digests.insert(location.clone(), ResultDigest::unique());
                continue;
            }
            if location.is_sentinel() {
                continue;
            }
            let path = self.paths.path(location, &pass.baseline_name)?;
            if !path.is_file() {
                continue;
            }
            let digest = ResultDigest::from_file(&path, pass.is_reftest)?;
            debug!(
                location = %location,
                sha = %digest.sha(),
                extra = digest.is_extra_result(),
                "Digested baseline"
            );
            digests.insert(location.clone(), digest);
        }
        Ok(digests)
    }

    /// Apply the root rules once to every candidate root.
    fn handle_roots(
        &self,
        roots: &[(BaselineLocation, BTreeSet<BaselineLocation>)],
        digests: &mut DigestMap,
        pass: &mut Pass<'_>,
    ) -> OptimizerResult<bool> {
        let mut changed = false;
        for (root, predecessors) in roots {
            if !pass.scope.allows(root) {
                continue;
            }
            match root::decide(root, predecessors, digests) {
                Some(RootAction::Promote { source, sources }) => {
                    self.promote(root, &source, &sources, digests, pass)?;
                    changed = true;
                }
                Some(RootAction::RemoveUnreachable) => {
                    self.remove(root, RemovalReason::Unreachable, digests, pass)?;
                    changed = true;
                }
                None => debug!(root = %root, "Root unchanged"),
            }
        }
        Ok(changed)
    }

    fn promote(
        &self,
        root: &BaselineLocation,
        source: &BaselineLocation,
        sources: &[BaselineLocation],
        digests: &mut DigestMap,
        pass: &mut Pass<'_>,
    ) -> OptimizerResult<()> {
        let value = digests.get(source).cloned().ok_or_else(|| {
            OptimizerError::invariant(format!("promotion source {} has no digest", source))
        })?;

        let mut source_paths = Vec::with_capacity(sources.len());
        for location in sources {
            source_paths.push(self.paths.path(location, &pass.baseline_name)?);
        }
        let change = BaselineChange::Promote {
            dest: self.paths.path(root, &pass.baseline_name)?,
            source: self.paths.path(source, &pass.baseline_name)?,
            sources: source_paths,
        };

        pass.writer.apply(&change)?;
        pass.outcome.changes.push(change);
        digests.insert(root.clone(), value);
        Ok(())
    }

    fn remove(
        &self,
        location: &BaselineLocation,
        reason: RemovalReason,
        digests: &mut DigestMap,
        pass: &mut Pass<'_>,
    ) -> OptimizerResult<()> {
        if digests.remove(location).is_none() {
            return Err(OptimizerError::invariant(format!(
                "removing {} which has no baseline",
                location
            )));
        }

        let change = BaselineChange::Remove {
            path: self.paths.path(location, &pass.baseline_name)?,
            reason,
        };
        pass.writer.apply(&change)?;
        pass.outcome.changes.push(change);
        Ok(())
    }
}
