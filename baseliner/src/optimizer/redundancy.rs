//! Redundant baseline detection.
//!
//! A present location is redundant when every search path that resolves to
//! it would, without it, resolve to an equal baseline. Removing one
//! redundant location can make another one non-redundant, so candidates are
//! visited in an explicit order. Two orders are simulated, postorder and
//! preorder from the all-pass sink over the predecessor graph, and the one
//! removing more wins. Postorder wins ties: it removes the most specific
//! baselines first.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::digest::ResultDigest;
use crate::location::BaselineLocation;

use super::search_path::{predecessor_map, SearchPath};
use super::ChangeScope;

/// Locations that currently have a baseline, with their digests.
pub type DigestMap = BTreeMap<BaselineLocation, ResultDigest>;

type Graph = BTreeMap<BaselineLocation, BTreeSet<BaselineLocation>>;

/// Traversal order used to visit removal candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOrder {
    Postorder,
    Preorder,
}

/// For each path, the first present location and the next present one
/// after it. Paths resolving straight to the sink contribute nothing.
fn dependency_edges(paths: &[SearchPath], digests: &DigestMap) -> Graph {
    let mut edges: Graph = BTreeMap::new();
    for path in paths {
        let mut present = path.with_all_pass().filter(|l| digests.contains_key(*l));
        let (Some(source), Some(next_source)) = (present.next(), present.next()) else {
            continue;
        };
        edges
            .entry(source.clone())
            .or_default()
            .insert(next_source.clone());
    }
    edges
}

/// Whether `location` can go: it has a file, it is the resolved baseline of
/// at least one path, and it equals every fallback it would expose.
fn is_redundant(
    location: &BaselineLocation,
    edges: &Graph,
    digests: &DigestMap,
    scope: &ChangeScope,
) -> bool {
    if !scope.allows(location) {
        return false;
    }
    let (Some(value), Some(successors)) = (digests.get(location), edges.get(location)) else {
        return false;
    };
    // Compare each successor against this one value; equality is not transitive.
    successors.iter().all(|successor| {
        digests
            .get(successor)
            .is_some_and(|digest| value.matches(digest))
    })
}

/// Depth-first walk from the all-pass sink along predecessor edges.
fn traversal(predecessors: &Graph, order: RemovalOrder) -> Vec<BaselineLocation> {
    fn visit(
        location: &BaselineLocation,
        predecessors: &Graph,
        order: RemovalOrder,
        visited: &mut BTreeSet<BaselineLocation>,
        out: &mut Vec<BaselineLocation>,
    ) {
        if !visited.insert(location.clone()) {
            return;
        }
        if order == RemovalOrder::Preorder {
            out.push(location.clone());
        }
        if let Some(preds) = predecessors.get(location) {
            for pred in preds {
                visit(pred, predecessors, order, visited, out);
            }
        }
        if order == RemovalOrder::Postorder {
            out.push(location.clone());
        }
    }

    let mut visited = BTreeSet::new();
    let mut out = Vec::new();
    visit(&BaselineLocation::all_pass(), predecessors, order, &mut visited, &mut out);
    out
}

/// Visit locations in `order`, removing each redundant one from a scratch
/// copy of the digest map. Returns the removals in visit order.
fn simulate(
    paths: &[SearchPath],
    digests: &DigestMap,
    scope: &ChangeScope,
    visit_order: &[BaselineLocation],
) -> Vec<BaselineLocation> {
    let mut remaining = digests.clone();
    let mut removed = Vec::new();
    for location in visit_order {
        let edges = dependency_edges(paths, &remaining);
        if is_redundant(location, &edges, &remaining, scope) {
            trace!(location = %location, "Redundant in simulation");
            remaining.remove(location);
            removed.push(location.clone());
        }
    }
    removed
}

/// One round of redundancy detection.
///
/// Returns the locations to remove, in removal order, and the order that
/// produced them. The caller applies the removals and calls again until the
/// result is empty.
pub fn find_redundant(
    paths: &[SearchPath],
    digests: &DigestMap,
    scope: &ChangeScope,
) -> (Vec<BaselineLocation>, RemovalOrder) {
    let predecessors = predecessor_map(paths);

    let postorder = simulate(
        paths,
        digests,
        scope,
        &traversal(&predecessors, RemovalOrder::Postorder),
    );
    let preorder = simulate(
        paths,
        digests,
        scope,
        &traversal(&predecessors, RemovalOrder::Preorder),
    );
    debug!(
        postorder = postorder.len(),
        preorder = preorder.len(),
        "Simulated removal orders"
    );

    if preorder.len() > postorder.len() {
        (preorder, RemovalOrder::Preorder)
    } else {
        (postorder, RemovalOrder::Postorder)
    }
}
