// src/events.rs

//! Event bus for batch observers.
//!
//! Every batch owns a [`Bus`]: a `tokio::sync::broadcast` channel that fans
//! events out to however many observers are currently subscribed. Delivery
//! is best-effort: publishing with no observers (or to an observer that has
//! fallen behind past the channel capacity) simply drops the event for that
//! observer. The bus never controls observer lifecycle; dropping the
//! receiver is the unsubscribe.
//!
//! Events for a given batch are published in the order the scheduler and
//! supervisor produced them. There is no replay: a new subscriber gets a
//! `batch_status` snapshot and then only events published after it joined.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::batch::model::{BatchId, BatchStatus, Progress, Run, RunId, RunResult, RunStatus};

/// Events published to batch observers. Field names are part of the wire
/// format consumed by the UI layer; serialized as `{"type": "...", ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    BatchStarted {
        batch_id: BatchId,
        total: u32,
    },
    RunStarted {
        batch_id: BatchId,
        run_index: u32,
        run_id: RunId,
    },
    RunStatusUpdate {
        batch_id: BatchId,
        run_index: u32,
        run_id: RunId,
        status: RunStatus,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
        duration_ms: Option<u64>,
        result: Option<RunResult>,
        error: Option<String>,
    },
    Stdout {
        run_id: RunId,
        line: String,
        timestamp: DateTime<Utc>,
    },
    Stderr {
        run_id: RunId,
        line: String,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        batch_id: BatchId,
        run_index: u32,
        run_id: RunId,
        result: RunResult,
    },
    RunFailed {
        batch_id: BatchId,
        run_index: u32,
        run_id: RunId,
        error: String,
    },
    MarkdownGenerated {
        batch_id: BatchId,
        run_id: RunId,
        report_path: String,
    },
    MarkdownError {
        batch_id: BatchId,
        run_id: RunId,
        error: String,
    },
    BatchCompleted {
        batch_id: BatchId,
    },
    /// Full snapshot, sent to each observer at subscribe time.
    BatchStatus {
        batch_id: BatchId,
        status: BatchStatus,
        progress: Progress,
        run_statuses: Vec<Run>,
    },
}

impl Event {
    /// Build a `run_status_update` from a run snapshot.
    pub fn run_status_update(batch_id: &str, run: &Run) -> Self {
        Event::RunStatusUpdate {
            batch_id: batch_id.to_string(),
            run_index: run.index,
            run_id: run.id.clone(),
            status: run.status,
            started_at: run.started_at,
            completed_at: run.completed_at,
            duration_ms: run.duration_ms,
            result: run.result.clone(),
            error: run.error.clone(),
        }
    }
}

/// Per-batch broadcast bus.
#[derive(Debug, Clone)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

/// Capacity per observer before a slow observer starts missing events.
const BUS_CAPACITY: usize = 256;

impl Bus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Fan an event out to all current observers. Best-effort: with no
    /// observers the event is dropped.
    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Register a new observer. The caller is responsible for immediately
    /// delivering a `batch_status` snapshot alongside the receiver; the
    /// registry's `subscribe` does exactly that.
    pub fn add_observer(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of currently subscribed observers.
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience for supervisor output streaming.
pub fn stdout_event(run_id: &str, line: String) -> Event {
    Event::Stdout {
        run_id: run_id.to_string(),
        line,
        timestamp: Utc::now(),
    }
}

pub fn stderr_event(run_id: &str, line: String) -> Event {
    Event::Stderr {
        run_id: run_id.to_string(),
        line,
        timestamp: Utc::now(),
    }
}
