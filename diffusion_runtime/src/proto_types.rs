//! Hand-written protobuf types for the step log.
//!
//! Uses prost derive macros for encode/decode without prost-build.

use prost::Message;

/// One logged diffusion step. Field numbers are frozen — the log is an
/// append-only archive format.
#[derive(Clone, PartialEq, Message)]
pub struct ProtoStepEnvelope {
    #[prost(uint64, tag = "1")]
    pub sequence: u64,
    #[prost(uint32, tag = "2")]
    pub depth: u32,
    #[prost(string, tag = "3")]
    pub from_node: String,
    #[prost(string, tag = "4")]
    pub to_node: String,
    #[prost(int64, tag = "5")]
    pub mass: i64,
    #[prost(uint32, tag = "6")]
    pub schema_version: u32,
}
