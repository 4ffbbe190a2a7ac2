/// Invariant checks.
///
/// Hard-fail validation: `validate_invariants` panics on the first
/// failure. The non-panicking `try_` variant is used by snapshot
/// restore to validate without aborting the process.

use std::collections::BTreeSet;

use crate::domain::DiffusionState;

/// Run all invariant checks. Panics on the first failure.
pub fn validate_invariants(state: &DiffusionState) {
    if let Err(msg) = try_validate_invariants(state) {
        panic!("Invariant violation: {}", msg);
    }
}

/// Non-panicking variant of `validate_invariants`.
/// Returns `Err(message)` on the first failure, `Ok(())` if all pass.
pub fn try_validate_invariants(state: &DiffusionState) -> Result<(), String> {
    check_graph_well_formed(state)?;
    check_state_covers_graph(state)?;
    check_non_negative_mass(state)?;
    check_mass_conservation(state)?;
    check_history_refs(state)?;
    check_history_unique(state)?;
    check_history_starts_at_source(state)?;
    Ok(())
}

/// INV-1: The adjacency structure is square, symmetric, zero-diagonal,
/// non-negative.
fn check_graph_well_formed(state: &DiffusionState) -> Result<(), String> {
    state
        .graph
        .try_validate()
        .map_err(|e| format!("[INVARIANT:graph_well_formed] {}", e))
}

/// INV-2: The mass map has exactly one entry per graph node.
fn check_state_covers_graph(state: &DiffusionState) -> Result<(), String> {
    for name in state.graph.names() {
        if !state.mass.contains_key(name) {
            return Err(format!(
                "[INVARIANT:state_covers_graph] No mass entry for node {:?}",
                name
            ));
        }
    }
    if state.mass.len() != state.graph.node_count() {
        for key in state.mass.keys() {
            if !state.graph.contains(key) {
                return Err(format!(
                    "[INVARIANT:state_covers_graph] Mass entry {:?} is not a graph node",
                    key
                ));
            }
        }
    }
    Ok(())
}

/// INV-3: Every mass value is non-negative.
fn check_non_negative_mass(state: &DiffusionState) -> Result<(), String> {
    for (name, &m) in &state.mass {
        if m < 0 {
            return Err(format!(
                "[INVARIANT:non_negative_mass] Node {:?} holds negative mass {}",
                name, m
            ));
        }
    }
    Ok(())
}

/// INV-4: Mass is conserved — the values sum to the injected total.
fn check_mass_conservation(state: &DiffusionState) -> Result<(), String> {
    let sum: i64 = state.mass.values().sum();
    if sum != state.total_mass {
        return Err(format!(
            "[INVARIANT:mass_conservation] Mass sums to {} but {} was injected",
            sum, state.total_mass
        ));
    }
    Ok(())
}

/// INV-5: Every visited name is a graph node.
fn check_history_refs(state: &DiffusionState) -> Result<(), String> {
    for name in &state.visited {
        if !state.graph.contains(name) {
            return Err(format!(
                "[INVARIANT:history_refs] Visited node {:?} is not a graph node",
                name
            ));
        }
    }
    Ok(())
}

/// INV-6: The visitation history contains no duplicates.
fn check_history_unique(state: &DiffusionState) -> Result<(), String> {
    let unique: BTreeSet<&str> = state.visited.iter().map(|s| s.as_str()).collect();
    if unique.len() != state.visited.len() {
        return Err(
            "[INVARIANT:history_unique] Visitation history repeats a node".to_string()
        );
    }
    Ok(())
}

/// INV-7: The history is non-empty and starts at the diffusion source.
fn check_history_starts_at_source(state: &DiffusionState) -> Result<(), String> {
    match state.visited.first() {
        Some(first) if *first == state.source => Ok(()),
        Some(first) => Err(format!(
            "[INVARIANT:history_source] History starts at {:?}, source is {:?}",
            first, state.source
        )),
        None => Err(
            "[INVARIANT:history_source] Visitation history is empty".to_string()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arithmetic::SCALE;
    use crate::graph::WeightedGraph;
    use crate::state::create_initial_state;

    fn pair_graph() -> WeightedGraph {
        WeightedGraph::from_matrix(
            vec!["A".into(), "B".into()],
            vec![vec![0, SCALE], vec![SCALE, 0]],
        )
        .unwrap()
    }

    #[test]
    fn fresh_state_passes() {
        let state = create_initial_state(pair_graph(), "A", SCALE);
        validate_invariants(&state);
    }

    #[test]
    fn detects_conservation_break() {
        let mut state = create_initial_state(pair_graph(), "A", SCALE);
        state.mass.insert("B".to_string(), 1);
        let err = try_validate_invariants(&state).unwrap_err();
        assert!(err.contains("mass_conservation"));
    }

    #[test]
    fn detects_missing_entry() {
        let mut state = create_initial_state(pair_graph(), "A", SCALE);
        state.mass.remove("B");
        let err = try_validate_invariants(&state).unwrap_err();
        assert!(err.contains("state_covers_graph"));
    }

    #[test]
    fn detects_duplicate_history() {
        let mut state = create_initial_state(pair_graph(), "A", SCALE);
        state.visited.push("A".to_string());
        let err = try_validate_invariants(&state).unwrap_err();
        assert!(err.contains("history_unique"));
    }

    #[test]
    fn detects_wrong_history_head() {
        let mut state = create_initial_state(pair_graph(), "A", SCALE);
        state.visited[0] = "B".to_string();
        let err = try_validate_invariants(&state).unwrap_err();
        assert!(err.contains("history_source"));
    }
}
