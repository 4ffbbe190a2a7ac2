//! Replay orchestrator — rebuild diffusion state from a step log.
//!
//! Delegates all diffusion logic to the kernel. No shortcuts, no
//! cached state logic.

use diffusion_engine::domain::DiffusionState;
use diffusion_engine::engine::DiffusionEngine;
use diffusion_engine::events::StepEvent;
use diffusion_engine::graph::WeightedGraph;
use diffusion_engine::hashing::canonical_hash;

/// Rebuild the diffusion state from a run's parameters and its steps.
///
/// 1. Begin a fresh run (all mass on the source)
/// 2. Pass each step sequentially to the kernel
/// 3. Return (final_state, canonical_hash)
///
/// This is a pure function on the step stream — deterministic by the
/// kernel's guarantee.
pub fn rebuild_state(
    graph: WeightedGraph,
    source: &str,
    total_mass: i64,
    steps: &[StepEvent],
) -> (DiffusionState, String) {
    let mut engine = DiffusionEngine::new();
    engine.replay(graph, source, total_mass, steps);

    let state = engine.state().clone();
    let hash = canonical_hash(&state);
    (state, hash)
}

/// Rebuild state and return only the canonical hash.
pub fn rebuild_hash(
    graph: WeightedGraph,
    source: &str,
    total_mass: i64,
    steps: &[StepEvent],
) -> String {
    let (_, hash) = rebuild_state(graph, source, total_mass, steps);
    hash
}
