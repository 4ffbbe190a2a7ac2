//! Conversions between kernel step events and their protobuf frames.

use diffusion_engine::events::StepEvent;

use crate::proto_types::ProtoStepEnvelope;

/// Kernel event → protobuf frame.
pub fn step_to_proto(event: &StepEvent) -> ProtoStepEnvelope {
    ProtoStepEnvelope {
        sequence: event.sequence,
        depth: event.depth,
        from_node: event.from_node.clone(),
        to_node: event.to_node.clone(),
        mass: event.mass,
        schema_version: event.schema_version,
    }
}

/// Protobuf frame → kernel event.
pub fn proto_to_step(proto: &ProtoStepEnvelope) -> StepEvent {
    StepEvent {
        sequence: proto.sequence,
        depth: proto.depth,
        from_node: proto.from_node.clone(),
        to_node: proto.to_node.clone(),
        mass: proto.mass,
        schema_version: proto.schema_version,
    }
}
