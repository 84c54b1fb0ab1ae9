//! Root baseline handling.
//!
//! A root (the generic location or a virtual root) is only reached through
//! its predecessors. When all of them have the same baseline, that value can
//! move up into the root so the predecessors become redundant. When all of
//! them have baselines that differ from the root, the root is dead weight.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::digest::ResultDigest;
use crate::location::BaselineLocation;

use super::redundancy::DigestMap;
use super::search_path::SearchPath;

/// What to do with one root.
#[derive(Debug, Clone, PartialEq)]
pub enum RootAction {
    /// Copy the agreed predecessor value into the root. `source` is the
    /// predecessor the file is copied from.
    Promote {
        source: BaselineLocation,
        sources: Vec<BaselineLocation>,
    },
    /// Delete the root: every predecessor shadows it with a different value.
    RemoveUnreachable,
}

/// Decide the action for one root given its predecessors.
///
/// Returns `None` when an absent predecessor falls through to the root, or
/// when the predecessors disagree while one of them matches the root.
pub fn decide(
    root: &BaselineLocation,
    predecessors: &BTreeSet<BaselineLocation>,
    digests: &DigestMap,
) -> Option<RootAction> {
    if predecessors.is_empty() {
        return None;
    }

    let mut present: Vec<(&BaselineLocation, &ResultDigest)> =
        Vec::with_capacity(predecessors.len());
    for pred in predecessors {
        match digests.get(pred) {
            Some(digest) => present.push((pred, digest)),
            None => {
                trace!(root = %root, predecessor = %pred, "Predecessor absent, root reachable");
                return None;
            }
        }
    }

    let (first, value) = present[0];
    let unanimous = present.iter().all(|(_, digest)| value.matches(digest));
    let root_value = digests.get(root);

    if unanimous && !first.is_sentinel() {
        if value.is_extra_result() {
            // An absent root already falls through to the all-pass sink.
            trace!(root = %root, "Predecessors agree on an extra result, not promoting");
        } else if root_value.is_some_and(|current| current.matches(value)) {
            trace!(root = %root, "Root already holds the agreed value");
            return None;
        } else {
            return Some(RootAction::Promote {
                source: first.clone(),
                sources: present.iter().map(|(pred, _)| (*pred).clone()).collect(),
            });
        }
    }

    let root_value = root_value?;
    if present.iter().all(|(_, digest)| !digest.matches(root_value)) {
        return Some(RootAction::RemoveUnreachable);
    }
    None
}

/// Roots that have predecessors and never head a search path, with their
/// predecessor sets, in location order.
pub fn candidate_roots(
    paths: &[SearchPath],
    predecessors: &BTreeMap<BaselineLocation, BTreeSet<BaselineLocation>>,
) -> Vec<(BaselineLocation, BTreeSet<BaselineLocation>)> {
    let heads: BTreeSet<&BaselineLocation> = paths.iter().filter_map(|p| p.head()).collect();

    predecessors
        .iter()
        .filter(|(location, _)| location.is_root())
        .filter(|(location, _)| {
            let heads_a_path = heads.contains(location);
            if heads_a_path {
                debug!(root = %location, "Root is searched first by some port, leaving it alone");
            }
            !heads_a_path
        })
        .map(|(location, preds)| (location.clone(), preds.clone()))
        .collect()
}
