// src/batch/registry.rs

//! Batch registry: owns all batch state and hands out handles.
//!
//! Pure bookkeeping. No operation here blocks on processes or performs any
//! scheduling; the only side effect is provisioning the batch-scoped output
//! directory at creation time. Mutable state sits behind a per-batch mutex,
//! with a separate registry-level lock for the id → handle map, so
//! concurrent run completions in one batch never contend with lookups of
//! another.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::info;

use crate::batch::model::{BatchId, BatchSnapshot, BatchState, BatchStatus};
use crate::config::BatchConfig;
use crate::errors::{Result, ScanbatchError};
use crate::events::{Bus, Event};

/// Shared handle to one batch: immutable configuration plus the event bus
/// and the mutex-guarded mutable state.
#[derive(Debug)]
pub struct BatchHandle {
    pub id: BatchId,
    pub config: BatchConfig,
    /// Batch-scoped directory for per-run artifacts.
    pub output_dir: PathBuf,
    pub events: Bus,
    state: Mutex<BatchState>,
}

impl BatchHandle {
    /// Run a closure against the locked batch state.
    ///
    /// The lock is strictly for short, synchronous mutations; never held
    /// across an await point.
    pub fn with_state<T>(&self, f: impl FnOnce(&mut BatchState) -> T) -> T {
        let mut state = self.state.lock().expect("batch state lock poisoned");
        f(&mut state)
    }

    /// Immutable snapshot of the current status, counters and run states.
    pub fn snapshot(&self) -> BatchSnapshot {
        self.with_state(|s| BatchSnapshot {
            batch_id: self.id.clone(),
            config: self.config.clone(),
            status: s.status,
            progress: s.progress,
            runs: s.runs.clone(),
        })
    }

    /// Register an observer, returning the snapshot event to deliver first
    /// plus the live receiver. The snapshot is taken atomically with the
    /// subscription so a late subscriber misses nothing in between.
    pub fn subscribe(&self) -> (Event, tokio::sync::broadcast::Receiver<Event>) {
        let rx = self.events.add_observer();
        let snap = self.snapshot();
        let event = Event::BatchStatus {
            batch_id: snap.batch_id,
            status: snap.status,
            progress: snap.progress,
            run_statuses: snap.runs,
        };
        (event, rx)
    }
}

/// Registry of all batches known to this process.
#[derive(Debug)]
pub struct BatchRegistry {
    output_root: PathBuf,
    batches: Mutex<HashMap<BatchId, Arc<BatchHandle>>>,
}

impl BatchRegistry {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            batches: Mutex::new(HashMap::new()),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Create a batch with N pending run slots and provision its output
    /// directory. Validates `repetitions >= 1`.
    pub fn create_batch(&self, config: BatchConfig) -> Result<Arc<BatchHandle>> {
        config.validate()?;

        let id = generate_batch_id(config.tool.as_str());
        let output_dir = self.output_root.join(&id);
        std::fs::create_dir_all(&output_dir)?;

        let handle = Arc::new(BatchHandle {
            state: Mutex::new(BatchState::new(&id, config.repetitions)),
            id: id.clone(),
            config,
            output_dir,
            events: Bus::new(),
        });

        let mut batches = self.batches.lock().expect("registry lock poisoned");
        batches.insert(id.clone(), Arc::clone(&handle));

        info!(
            batch_id = %id,
            tool = %handle.config.tool,
            repetitions = handle.config.repetitions,
            "batch created"
        );
        Ok(handle)
    }

    /// Look up a batch handle.
    pub fn get(&self, batch_id: &str) -> Result<Arc<BatchHandle>> {
        let batches = self.batches.lock().expect("registry lock poisoned");
        batches
            .get(batch_id)
            .cloned()
            .ok_or_else(|| ScanbatchError::BatchNotFound(batch_id.to_string()))
    }

    /// Read-only status snapshot, or `BatchNotFound`.
    pub fn get_status(&self, batch_id: &str) -> Result<BatchSnapshot> {
        Ok(self.get(batch_id)?.snapshot())
    }

    /// Snapshots of all batches still in `created` or `running` state.
    pub fn list_active(&self) -> Vec<BatchSnapshot> {
        let handles: Vec<Arc<BatchHandle>> = {
            let batches = self.batches.lock().expect("registry lock poisoned");
            batches.values().cloned().collect()
        };

        let mut active: Vec<BatchSnapshot> = handles
            .iter()
            .map(|h| h.snapshot())
            .filter(|s| matches!(s.status, BatchStatus::Created | BatchStatus::Running))
            .collect();
        active.sort_by(|a, b| a.batch_id.cmp(&b.batch_id));
        active
    }
}

/// Batch ids are unique within the process: UTC second timestamp, a random
/// alphanumeric token, and the tool name. Collisions need the same second
/// and the same 6-char token, which is negligible for this use.
fn generate_batch_id(tool: &str) -> BatchId {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let token: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!("{stamp}-{token}-{tool}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanTool;

    fn registry() -> (tempfile::TempDir, BatchRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let reg = BatchRegistry::new(dir.path());
        (dir, reg)
    }

    #[test]
    fn create_batch_provisions_directory_and_slots() {
        let (_dir, reg) = registry();
        let cfg = BatchConfig::new(ScanTool::Nikto, "http://example.test", 4);
        let handle = reg.create_batch(cfg).unwrap();

        assert!(handle.output_dir.is_dir());
        let snap = handle.snapshot();
        assert_eq!(snap.status, BatchStatus::Created);
        assert_eq!(snap.progress.total, 4);
        assert_eq!(snap.runs.len(), 4);
        assert!(snap.batch_id.ends_with("-nikto"));
        assert_eq!(snap.runs[2].id, format!("{}-run-2", snap.batch_id));
    }

    #[test]
    fn create_batch_rejects_invalid_config() {
        let (_dir, reg) = registry();
        let cfg = BatchConfig::new(ScanTool::Nikto, "http://example.test", 0);
        assert!(reg.create_batch(cfg).is_err());
    }

    #[test]
    fn get_status_unknown_batch_is_not_found() {
        let (_dir, reg) = registry();
        let err = reg.get_status("nope").unwrap_err();
        assert!(matches!(err, ScanbatchError::BatchNotFound(_)));
    }

    #[test]
    fn list_active_excludes_completed_batches() {
        let (_dir, reg) = registry();
        let a = reg
            .create_batch(BatchConfig::new(ScanTool::Nikto, "http://a.test", 1))
            .unwrap();
        let _b = reg
            .create_batch(BatchConfig::new(ScanTool::Nuclei, "http://b.test", 1))
            .unwrap();

        a.with_state(|s| s.status = BatchStatus::Completed);

        let active = reg.list_active();
        assert_eq!(active.len(), 1);
        assert!(active[0].batch_id.ends_with("-nuclei"));
    }

    #[test]
    fn batch_ids_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(generate_batch_id("nikto")));
        }
    }
}
