// src/exec/backend.rs

//! Pluggable scan executor abstraction.
//!
//! The scheduler talks to a `ScanExecutor` instead of spawning processes
//! directly. This makes it easy to swap in a fake executor in tests while
//! keeping the production process supervision in [`supervisor`].

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::batch::model::{BatchId, RunId};
use crate::config::ScanTool;
use crate::errors::Result;
use crate::events::Bus;

use super::supervisor::{self, ExecutionResult};

/// Everything the executor needs to perform one scan run.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub batch_id: BatchId,
    pub run_id: RunId,
    pub run_index: u32,
    pub tool: ScanTool,
    pub target_url: String,
    /// Program to invoke; comes from the settings file or `--executor`.
    pub executor_path: String,
    /// Where the supervisor persists the raw captured stdout.
    pub raw_output_path: PathBuf,
}

/// Trait abstracting how a scan run is executed.
///
/// Production code uses [`ProcessExecutor`]; tests provide their own
/// implementation that emits canned output lines and scripted results.
pub trait ScanExecutor: Send + Sync {
    /// Execute one scan run to completion.
    ///
    /// The implementation must publish `stdout`/`stderr` events on `events`
    /// as lines arrive, in the order the child produced them, and must not
    /// lose captured output on failure.
    fn execute(
        &self,
        request: ScanRequest,
        events: Bus,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionResult>> + Send + '_>>;
}

/// Real executor used in production: spawns the external scan runner as a
/// child process and supervises it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl ScanExecutor for ProcessExecutor {
    fn execute(
        &self,
        request: ScanRequest,
        events: Bus,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionResult>> + Send + '_>> {
        Box::pin(supervisor::run_scan(request, events))
    }
}
