// src/batch/mod.rs

//! Batch domain: data model and the registry that owns all batch state.
//!
//! - [`model`] holds statuses, progress counters, run slots and snapshots.
//! - [`registry`] creates and looks up batches; it is pure bookkeeping and
//!   never spawns processes or blocks on scheduling.

pub mod model;
pub mod registry;

pub use model::{
    BatchId, BatchSnapshot, BatchState, BatchStatus, Progress, Run, RunId, RunResult, RunStatus,
};
pub use registry::{BatchHandle, BatchRegistry};
