#![forbid(unsafe_code)]

//! Diffusion runtime.
//!
//! Wraps the pure kernel with persistence (append-only step log),
//! replay, state snapshots, layout, frame rendering, run sessions,
//! and drift detection.
//!
//! No diffusion logic lives here — all transitions and invariants are
//! delegated to the kernel.

pub mod proto_types;
pub mod proto_bridge;
pub mod step_log;
pub mod replay;
pub mod snapshot;
pub mod layout;
pub mod raster;
pub mod frame;
pub mod session;
pub mod drift;
