/// Split planning — the probability-diffusion proportion rule.
///
/// A node's entire current mass is divided among its UNVISITED
/// neighbors in proportion to edge weight. Largest-remainder
/// apportionment keeps the shares summing to exactly the mass taken,
/// so conservation never drifts.

use std::collections::BTreeSet;

use crate::arithmetic::apportion;
use crate::domain::DiffusionState;
use crate::events::{StepEvent, SCHEMA_VERSION};

/// Plan the steps that diffuse `node`'s current mass outward.
///
/// Returns one event per unvisited weighted neighbor, in node index
/// order, with consecutive sequence numbers starting at
/// `first_sequence` and `depth` stamped on every step. A node with no
/// mass, no unvisited neighbor, or zero connecting weight plans
/// nothing — its mass stays put.
///
/// Panics if `node` is not a graph node (caller contract violation).
pub fn plan_splits(
    state: &DiffusionState,
    node: &str,
    depth: u32,
    first_sequence: u64,
) -> Vec<StepEvent> {
    let idx = state
        .graph
        .index_of(node)
        .unwrap_or_else(|| panic!("plan_splits: {:?} is not a graph node", node));

    let available = *state.mass.get(node).unwrap_or(&0);
    if available == 0 {
        return Vec::new();
    }

    let visited: BTreeSet<&str> = state.visited.iter().map(|s| s.as_str()).collect();

    let mut targets: Vec<(usize, i64)> = Vec::new();
    for (j, w) in state.graph.neighbors(idx) {
        if !visited.contains(state.graph.name(j)) {
            targets.push((j, w));
        }
    }
    if targets.is_empty() {
        return Vec::new();
    }

    // Graph validation guarantees every surviving weight is positive,
    // so the apportionment total is never zero here.
    let weights: Vec<i64> = targets.iter().map(|&(_, w)| w).collect();
    let shares = apportion(available, &weights);

    targets
        .iter()
        .zip(shares)
        .enumerate()
        .map(|(k, (&(j, _), share))| StepEvent {
            sequence: first_sequence + k as u64,
            depth,
            from_node: node.to_string(),
            to_node: state.graph.name(j).to_string(),
            mass: share,
            schema_version: SCHEMA_VERSION,
        })
        .collect()
}
