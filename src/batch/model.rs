// src/batch/model.rs

//! Batch and run state.
//!
//! A batch owns N run slots created up front. Run status only ever moves
//! forward (`pending → running → completed | failed`); the transition
//! methods on [`BatchState`] enforce this and keep the aggregate
//! [`Progress`] counters in sync, so that
//! `completed + failed + running + pending == total` holds at all times.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BatchConfig;
use crate::errors::{Result, ScanbatchError};

/// Canonical batch identifier type used throughout the engine.
pub type BatchId = String;

/// Canonical run identifier type (`"{batch_id}-run-{index}"`).
pub type RunId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Created,
    Running,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// Aggregate progress counters for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: u32,
    pub completed: u32,
    pub running: u32,
    pub failed: u32,
}

impl Progress {
    pub fn pending(&self) -> u32 {
        self.total - self.completed - self.running - self.failed
    }
}

/// Compact, serializable summary of an executor result, stored on the run
/// and carried in events. The full captured output lives in the raw output
/// artifact, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    /// True when the exit status classified as "findings present" rather
    /// than a clean pass.
    pub findings_present: bool,
}

/// One scan invocation within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// 0-based, stable index within the batch.
    pub index: u32,
    pub id: RunId,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub result: Option<RunResult>,
    /// Set only when `status == Failed`.
    pub error: Option<String>,
}

impl Run {
    fn new(batch_id: &str, index: u32) -> Self {
        Self {
            index,
            id: format!("{batch_id}-run-{index}"),
            status: RunStatus::Pending,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            result: None,
            error: None,
        }
    }
}

/// Read-only snapshot of a batch, safe to hand to callers and observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub batch_id: BatchId,
    pub config: BatchConfig,
    pub status: BatchStatus,
    pub progress: Progress,
    pub runs: Vec<Run>,
}

/// Mutable batch state, guarded by a per-batch mutex in the registry.
#[derive(Debug)]
pub struct BatchState {
    pub status: BatchStatus,
    pub progress: Progress,
    pub runs: Vec<Run>,
}

impl BatchState {
    pub fn new(batch_id: &str, total: u32) -> Self {
        Self {
            status: BatchStatus::Created,
            progress: Progress {
                total,
                ..Progress::default()
            },
            runs: (0..total).map(|i| Run::new(batch_id, i)).collect(),
        }
    }

    /// Transition `pending → running`, recording the start time.
    pub fn mark_running(&mut self, index: u32) -> Result<Run> {
        let run = self.run_mut(index)?;
        if run.status != RunStatus::Pending {
            return Err(ScanbatchError::Config(format!(
                "run {index} cannot start from state {:?}",
                run.status
            )));
        }
        run.status = RunStatus::Running;
        run.started_at = Some(Utc::now());
        let run = run.clone();
        self.progress.running += 1;
        Ok(run)
    }

    /// Transition `running → completed`, recording result and timing.
    pub fn mark_completed(&mut self, index: u32, result: RunResult) -> Result<Run> {
        let run = Self::terminal_transition(self.run_mut(index)?, RunStatus::Completed)?;
        run.duration_ms = Some(result.duration_ms);
        run.result = Some(result);
        let run = run.clone();
        self.progress.running -= 1;
        self.progress.completed += 1;
        Ok(run)
    }

    /// Transition `running → failed`, recording the error. A result summary
    /// may still be present (e.g. a crash exit code with captured output).
    pub fn mark_failed(&mut self, index: u32, error: String, result: Option<RunResult>) -> Result<Run> {
        let run = Self::terminal_transition(self.run_mut(index)?, RunStatus::Failed)?;
        run.duration_ms = result.as_ref().map(|r| r.duration_ms);
        run.result = result;
        run.error = Some(error);
        let run = run.clone();
        self.progress.running -= 1;
        self.progress.failed += 1;
        Ok(run)
    }

    pub fn all_terminal(&self) -> bool {
        self.runs.iter().all(|r| r.status.is_terminal())
    }

    fn run_mut(&mut self, index: u32) -> Result<&mut Run> {
        let msg = format!("run index {index} out of range");
        self.runs
            .get_mut(index as usize)
            .ok_or(ScanbatchError::Config(msg))
    }

    fn terminal_transition(run: &mut Run, to: RunStatus) -> Result<&mut Run> {
        if run.status != RunStatus::Running {
            return Err(ScanbatchError::Config(format!(
                "run {} cannot reach {to:?} from state {:?}",
                run.index, run.status
            )));
        }
        run.status = to;
        run.completed_at = Some(Utc::now());
        Ok(run)
    }
}
