/// Core domain types.
///
/// Pure data. No transition logic. All mass values: i64 fixed-point
/// (SCALE = 10_000).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::WeightedGraph;

/// Complete diffusion state for one run.
///
/// `mass` holds an entry for every graph node; the values sum to
/// `total_mass` at all times (conservation is validated after every
/// transition). `visited` is the visitation history: append-only, no
/// duplicates, first element is the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiffusionState {
    pub graph: WeightedGraph,
    pub mass: BTreeMap<String, i64>,
    pub source: String,
    pub total_mass: i64,
    pub visited: Vec<String>,
    pub step_history: Vec<serde_json::Value>,
}

/// Structured, immutable outcome of one applied step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepOutcome {
    pub sequence: u64,
    pub depth: u32,
    pub from_node: String,
    pub to_node: String,
    pub mass_moved: i64,
    /// Mass left on the node that diffused.
    pub from_remaining: i64,
    /// Mass on the receiving node after the step.
    pub to_total: i64,
    pub visited_count: usize,
}

impl Default for StepOutcome {
    fn default() -> Self {
        Self {
            sequence: 0,
            depth: 0,
            from_node: String::new(),
            to_node: String::new(),
            mass_moved: 0,
            from_remaining: 0,
            to_total: 0,
            visited_count: 0,
        }
    }
}
