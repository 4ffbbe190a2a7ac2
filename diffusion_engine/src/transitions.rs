/// Centralized transition logic.
///
/// ALL state-mutation logic lives here. Pure integer math, no float,
/// no implicit casting. Hard-fail on caller contract violations.

use std::collections::BTreeSet;

use crate::arithmetic::{checked_add, checked_sub};
use crate::domain::{DiffusionState, StepOutcome};
use crate::events::StepEvent;

/// Apply *event* to *state* and return `(new_state, outcome)`.
/// The original state is never mutated — a deep clone is made first.
///
/// Panics when the event violates the step contract: unknown nodes,
/// a target already visited, no edge between the pair, or a share
/// exceeding the mass available on the source node.
pub fn apply_step(
    state: &DiffusionState,
    event: &StepEvent,
) -> (DiffusionState, StepOutcome) {
    let mut new_state = state.clone();

    let from = event.from_node.as_str();
    let to = event.to_node.as_str();

    if !new_state.graph.contains(from) {
        panic!("Step {}: from_node {:?} is not a graph node", event.sequence, from);
    }
    if !new_state.graph.contains(to) {
        panic!("Step {}: to_node {:?} is not a graph node", event.sequence, to);
    }
    let already: BTreeSet<&str> =
        new_state.visited.iter().map(|s| s.as_str()).collect();
    if already.contains(to) {
        panic!("Step {}: to_node {:?} was already visited", event.sequence, to);
    }
    match new_state.graph.weight_between(from, to) {
        Some(w) if w > 0 => {}
        _ => panic!(
            "Step {}: no edge between {:?} and {:?}",
            event.sequence, from, to
        ),
    }
    if event.mass < 0 {
        panic!("Step {}: negative mass {}", event.sequence, event.mass);
    }

    let available = *new_state.mass.get(from).unwrap_or(&0);
    if event.mass > available {
        panic!(
            "Step {}: share {} exceeds available mass {} on {:?}",
            event.sequence, event.mass, available, from
        );
    }

    let from_remaining = checked_sub(available, event.mass);
    new_state.mass.insert(from.to_string(), from_remaining);
    let to_total = checked_add(*new_state.mass.get(to).unwrap_or(&0), event.mass);
    new_state.mass.insert(to.to_string(), to_total);
    new_state.visited.push(to.to_string());

    // Record event in history
    new_state.step_history.push(event.to_dict());

    let outcome = StepOutcome {
        sequence: event.sequence,
        depth: event.depth,
        from_node: from.to_string(),
        to_node: to.to_string(),
        mass_moved: event.mass,
        from_remaining,
        to_total,
        visited_count: new_state.visited.len(),
    };

    (new_state, outcome)
}
