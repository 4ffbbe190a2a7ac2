/// Step event definitions.
///
/// Events are pure data: one event moves one share of mass across one
/// edge. They contain ZERO transition logic.
///
/// Schema version is locked at 1. Events with schema_version != 1 are
/// rejected by the engine.

use serde_json::Value;

/// Schema version for v1 step events. Hardcoded, never changes.
pub const SCHEMA_VERSION: u32 = 1;

/// One diffusion step: `mass` fixed-point units move from `from_node`
/// to `to_node`, visiting `to_node`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEvent {
    pub sequence: u64,
    /// Recursion depth of this step, for display only.
    pub depth: u32,
    pub from_node: String,
    pub to_node: String,
    pub mass: i64,
    pub schema_version: u32,
}

impl StepEvent {
    /// Convert to a serde_json::Value for the state's step history.
    pub fn to_dict(&self) -> Value {
        serde_json::json!({
            "sequence": self.sequence,
            "depth": self.depth,
            "from_node": self.from_node,
            "to_node": self.to_node,
            "mass": self.mass,
        })
    }

    /// Parse a StepEvent from a serde_json::Value (for loading fixtures
    /// and reading a state's step history back).
    pub fn from_value(v: &Value) -> Self {
        Self {
            sequence: v["sequence"].as_u64().unwrap_or(0),
            depth: v["depth"].as_u64().unwrap_or(0) as u32,
            from_node: v["from_node"].as_str().unwrap_or("").to_string(),
            to_node: v["to_node"].as_str().unwrap_or("").to_string(),
            mass: v["mass"].as_i64().unwrap_or(0),
            schema_version: v
                .get("schema_version")
                .and_then(|v| v.as_u64())
                .unwrap_or(SCHEMA_VERSION as u64) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dict_roundtrip_preserves_fields() {
        let event = StepEvent {
            sequence: 3,
            depth: 2,
            from_node: "B".to_string(),
            to_node: "C".to_string(),
            mass: 2_500,
            schema_version: SCHEMA_VERSION,
        };
        let back = StepEvent::from_value(&event.to_dict());
        assert_eq!(back, event);
    }
}
