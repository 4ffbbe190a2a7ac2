/// Engine — top-level orchestrator.
///
/// Delegates mutation to transitions, validates via invariants.
/// Strict sequence enforcement: step numbers are gap-free and
/// strictly increasing within a run.

use crate::domain::{DiffusionState, StepOutcome};
use crate::events::{StepEvent, SCHEMA_VERSION};
use crate::graph::WeightedGraph;
use crate::invariants::validate_invariants;
use crate::state::create_initial_state;
use crate::transitions::apply_step as transition_apply;

/// Stateful engine wrapping the pure functional transition layer.
pub struct DiffusionEngine {
    state: Option<DiffusionState>,
    last_sequence: u64,
}

impl DiffusionEngine {
    /// Create a new, uninitialized engine.
    pub fn new() -> Self {
        Self {
            state: None,
            last_sequence: 0,
        }
    }

    /// Access the current state (panics if no run has begun).
    pub fn state(&self) -> &DiffusionState {
        self.state
            .as_ref()
            .expect("Engine has no run — call begin_run() first")
    }

    /// Sequence number of the last applied step (0 before any step).
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Start a run: all of `total_mass` on `source`, source visited.
    pub fn begin_run(
        &mut self,
        graph: WeightedGraph,
        source: &str,
        total_mass: i64,
    ) -> &DiffusionState {
        let state = create_initial_state(graph, source, total_mass);
        validate_invariants(&state);
        self.state = Some(state);
        self.last_sequence = 0;
        self.state.as_ref().unwrap()
    }

    /// Apply a single step:
    ///   1. Validate schema version (must be 1)
    ///   2. Validate sequence (strictly increasing, no gaps)
    ///   3. Delegate to transitions::apply_step
    ///   4. Validate invariants on the new state
    ///   5. Store and return
    pub fn apply_step(&mut self, event: &StepEvent) -> (&DiffusionState, StepOutcome) {
        if event.schema_version != SCHEMA_VERSION {
            panic!(
                "Schema version mismatch: expected {}, got {}. \
                 Future schema changes require format v2.",
                SCHEMA_VERSION, event.schema_version
            );
        }

        let expected = self.last_sequence + 1;
        if event.sequence != expected {
            panic!(
                "Sequence violation: expected {}, got {}",
                expected, event.sequence
            );
        }

        let current = self
            .state
            .as_ref()
            .expect("Engine has no run — call begin_run() first");

        let (new_state, outcome) = transition_apply(current, event);
        validate_invariants(&new_state);
        self.state = Some(new_state);
        self.last_sequence = event.sequence;

        (self.state.as_ref().unwrap(), outcome)
    }

    /// Apply an ordered sequence of steps deterministically.
    pub fn apply_sequence(&mut self, events: &[StepEvent]) -> &DiffusionState {
        for event in events {
            self.apply_step(event);
        }
        self.state()
    }

    /// Event-sourced reconstruction: reset to the initial state and
    /// replay every step.
    pub fn replay(
        &mut self,
        graph: WeightedGraph,
        source: &str,
        total_mass: i64,
        events: &[StepEvent],
    ) -> &DiffusionState {
        self.begin_run(graph, source, total_mass);
        self.apply_sequence(events)
    }
}

impl Default for DiffusionEngine {
    fn default() -> Self {
        Self::new()
    }
}
