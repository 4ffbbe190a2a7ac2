/// Canonical hashing.
///
/// Deterministic canonical serialization + SHA-256 hashing.
/// Produces byte-identical output across platforms.
///
/// Rules:
///   - format_version is the first field (identity binding)
///   - node names in matrix order, weights row-major
///   - mass entries sorted by node name (BTreeMap order)
///   - visited in visitation order
///   - step_history is EXCLUDED — the hash covers state, not provenance
///   - UTF-8 JSON, no whitespace, no float

use sha2::{Digest, Sha256};
use serde_json::{Map, Value};

use crate::domain::DiffusionState;
use crate::FORMAT_VERSION;

/// Canonical serialization of a DiffusionState to UTF-8 JSON bytes.
pub fn canonical_serialize(state: &DiffusionState) -> Vec<u8> {
    let obj = build_canonical_value(state);
    serde_json::to_string(&obj)
        .expect("canonical_serialize: JSON serialization failed")
        .into_bytes()
}

/// SHA-256 of the canonical serialization. Lowercase hex string.
pub fn canonical_hash(state: &DiffusionState) -> String {
    let bytes = canonical_serialize(state);
    let digest = Sha256::digest(&bytes);
    digest
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
}

/// Build the canonical serde_json::Value in strict field order.
///
/// Uses serde_json::Map which preserves insertion order.
///
/// Field order: format_version, nodes, weights, source, total_mass,
///              mass, visited
fn build_canonical_value(state: &DiffusionState) -> Value {
    let n = state.graph.node_count();

    let nodes: Vec<Value> = state
        .graph
        .names()
        .iter()
        .map(|s| Value::String(s.clone()))
        .collect();

    let mut weights: Vec<Value> = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            weights.push(Value::Number(state.graph.weight(i, j).into()));
        }
    }

    // BTreeMap is already sorted by key
    let mut mass_map = Map::new();
    for (name, &m) in &state.mass {
        mass_map.insert(name.clone(), Value::Number(m.into()));
    }

    let visited: Vec<Value> = state
        .visited
        .iter()
        .map(|s| Value::String(s.clone()))
        .collect();

    let mut root = Map::new();
    root.insert(
        "format_version".to_string(),
        Value::Number((FORMAT_VERSION as i64).into()),
    );
    root.insert("nodes".to_string(), Value::Array(nodes));
    root.insert("weights".to_string(), Value::Array(weights));
    root.insert("source".to_string(), Value::String(state.source.clone()));
    root.insert(
        "total_mass".to_string(),
        Value::Number(state.total_mass.into()),
    );
    root.insert("mass".to_string(), Value::Object(mass_map));
    root.insert("visited".to_string(), Value::Array(visited));

    Value::Object(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arithmetic::SCALE;
    use crate::graph::WeightedGraph;
    use crate::state::create_initial_state;

    fn make_state() -> DiffusionState {
        let graph = WeightedGraph::from_matrix(
            vec!["A".into(), "B".into()],
            vec![vec![0, SCALE], vec![SCALE, 0]],
        )
        .unwrap();
        create_initial_state(graph, "A", SCALE)
    }

    #[test]
    fn hash_is_stable_for_equal_states() {
        assert_eq!(canonical_hash(&make_state()), canonical_hash(&make_state()));
    }

    #[test]
    fn hash_changes_with_mass() {
        let a = make_state();
        let mut b = make_state();
        b.mass.insert("A".to_string(), SCALE / 2);
        b.mass.insert("B".to_string(), SCALE / 2);
        assert_ne!(canonical_hash(&a), canonical_hash(&b));
    }

    #[test]
    fn step_history_does_not_affect_hash() {
        let a = make_state();
        let mut b = make_state();
        b.step_history.push(serde_json::json!({"sequence": 1}));
        assert_eq!(canonical_hash(&a), canonical_hash(&b));
    }

    #[test]
    fn hash_is_sha256_hex() {
        let h = canonical_hash(&make_state());
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
