/// State construction.
///
/// All mass values: i64 fixed-point (real * SCALE).

use std::collections::BTreeMap;

use crate::domain::DiffusionState;
use crate::graph::WeightedGraph;

/// Create the initial state of a run: the whole `total_mass` sits on
/// `source`, which is the first (and only) visited node.
///
/// Panics if `source` is not a graph node or `total_mass` is negative —
/// both are caller contract violations.
pub fn create_initial_state(
    graph: WeightedGraph,
    source: &str,
    total_mass: i64,
) -> DiffusionState {
    if !graph.contains(source) {
        panic!("Source {:?} is not a node of the graph", source);
    }
    if total_mass < 0 {
        panic!("Total mass must be non-negative, got {}", total_mass);
    }

    let mut mass = BTreeMap::new();
    for name in graph.names() {
        mass.insert(name.clone(), 0);
    }
    mass.insert(source.to_string(), total_mass);

    DiffusionState {
        graph,
        mass,
        source: source.to_string(),
        total_mass,
        visited: vec![source.to_string()],
        step_history: Vec::new(),
    }
}
