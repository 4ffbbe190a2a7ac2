//! Drift detection — determinism verification and state comparison.
//!
//! All numeric values are fixed-point i64 (SCALE = 10_000).
//! No float arithmetic anywhere.

use std::collections::BTreeSet;

use diffusion_engine::domain::DiffusionState;
use diffusion_engine::events::StepEvent;
use diffusion_engine::graph::WeightedGraph;

use crate::replay;

/// Verify determinism by replaying the same steps twice and asserting
/// identical hashes. Panics on failure.
pub fn verify_determinism(
    graph: &WeightedGraph,
    source: &str,
    total_mass: i64,
    steps: &[StepEvent],
) {
    let hash1 = replay::rebuild_hash(graph.clone(), source, total_mass, steps);
    let hash2 = replay::rebuild_hash(graph.clone(), source, total_mass, steps);

    if hash1 != hash2 {
        panic!(
            "DETERMINISM FAILURE: two replays produced different hashes.\n\
             Run 1: {}\n\
             Run 2: {}",
            hash1, hash2
        );
    }
}

/// Structured state comparison — all values are integers.
pub fn compare_states(state_a: &DiffusionState, state_b: &DiffusionState) -> DriftReport {
    let visited_a: BTreeSet<&str> =
        state_a.visited.iter().map(|s| s.as_str()).collect();
    let visited_b: BTreeSet<&str> =
        state_b.visited.iter().map(|s| s.as_str()).collect();

    let newly_visited: Vec<String> = visited_b
        .difference(&visited_a)
        .map(|s| s.to_string())
        .collect();
    let no_longer_visited: Vec<String> = visited_a
        .difference(&visited_b)
        .map(|s| s.to_string())
        .collect();

    // Mass deltas for nodes present in either state, non-zero only.
    let mut mass_deltas: Vec<(String, i64)> = Vec::new();
    let names: BTreeSet<&String> =
        state_a.mass.keys().chain(state_b.mass.keys()).collect();
    for name in names {
        let a = *state_a.mass.get(name).unwrap_or(&0);
        let b = *state_b.mass.get(name).unwrap_or(&0);
        if a != b {
            mass_deltas.push((name.clone(), b - a));
        }
    }

    DriftReport {
        node_count_a: state_a.graph.node_count() as i64,
        node_count_b: state_b.graph.node_count() as i64,
        visited_count_a: state_a.visited.len() as i64,
        visited_count_b: state_b.visited.len() as i64,
        visited_count_delta: state_b.visited.len() as i64 - state_a.visited.len() as i64,
        total_mass_a: state_a.total_mass,
        total_mass_b: state_b.total_mass,
        mass_deltas,
        newly_visited,
        no_longer_visited,
    }
}

/// Structured drift report — all numeric fields are i64.
#[derive(Debug, Clone)]
pub struct DriftReport {
    pub node_count_a: i64,
    pub node_count_b: i64,
    pub visited_count_a: i64,
    pub visited_count_b: i64,
    pub visited_count_delta: i64,
    pub total_mass_a: i64,
    pub total_mass_b: i64,
    /// `(node, mass_b - mass_a)` for every node whose mass changed,
    /// sorted by name.
    pub mass_deltas: Vec<(String, i64)>,
    pub newly_visited: Vec<String>,
    /// Non-empty only when comparing unrelated runs — a single run's
    /// history is append-only.
    pub no_longer_visited: Vec<String>,
}
