// src/exec/mod.rs

//! Process supervision layer.
//!
//! This module is responsible for actually running the external scan
//! executor with `tokio::process::Command`, streaming its output to the
//! batch event bus as it arrives, and reporting a terminal result back to
//! the scheduler.
//!
//! - [`backend`] provides the `ScanExecutor` trait and a concrete
//!   `ProcessExecutor` used in production; tests replace it with a fake
//!   implementation that never spawns real processes.
//! - [`supervisor`] handles a single scan process: spawn, line-granular
//!   stdout/stderr streaming, raw output persistence, exit status capture.

pub mod backend;
pub mod supervisor;

pub use backend::{ProcessExecutor, ScanExecutor, ScanRequest};
pub use supervisor::ExecutionResult;
