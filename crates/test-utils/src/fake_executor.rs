use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scanbatch::errors::{Result, ScanbatchError};
use scanbatch::events::{Bus, stderr_event, stdout_event};
use scanbatch::exec::{ExecutionResult, ScanExecutor, ScanRequest};

/// Scripted behaviour for one fake run.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    pub exit_code: Option<i32>,
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
    /// How long the fake "scan" stays in flight.
    pub hold: Duration,
    /// Simulate an executor that cannot even start.
    pub fail_spawn: bool,
}

impl Default for ScriptedRun {
    fn default() -> Self {
        Self {
            exit_code: Some(0),
            stdout_lines: Vec::new(),
            stderr_lines: Vec::new(),
            hold: Duration::from_millis(10),
            fail_spawn: false,
        }
    }
}

impl ScriptedRun {
    pub fn exiting(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Self::default()
        }
    }

    pub fn with_stdout(mut self, lines: &[&str]) -> Self {
        self.stdout_lines = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_stderr(mut self, lines: &[&str]) -> Self {
        self.stderr_lines = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn holding(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    pub fn failing_spawn() -> Self {
        Self {
            fail_spawn: true,
            ..Self::default()
        }
    }
}

/// Concurrency bookkeeping shared with the test body.
#[derive(Debug, Default)]
pub struct ExecStats {
    /// `(run_index, completions_observed_at_admission)` in admission order.
    pub admissions: Mutex<Vec<(u32, usize)>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    completed: AtomicUsize,
}

impl ExecStats {
    /// Highest number of fake scans that were in flight at the same time.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn admission_order(&self) -> Vec<u32> {
        self.admissions
            .lock()
            .unwrap()
            .iter()
            .map(|(idx, _)| *idx)
            .collect()
    }
}

/// A fake scan executor that:
/// - records admissions and tracks how many runs were in flight at once
/// - publishes its scripted output lines as live stdout/stderr events
/// - writes the accumulated stdout to the raw output artifact, like the
///   real supervisor does
/// - reports the scripted exit code.
pub struct FakeScanExecutor {
    default: ScriptedRun,
    per_run: HashMap<u32, ScriptedRun>,
    pub stats: Arc<ExecStats>,
}

impl FakeScanExecutor {
    pub fn new(default: ScriptedRun) -> Self {
        Self {
            default,
            per_run: HashMap::new(),
            stats: Arc::new(ExecStats::default()),
        }
    }

    /// Override the script for a specific run index.
    pub fn with_run(mut self, index: u32, script: ScriptedRun) -> Self {
        self.per_run.insert(index, script);
        self
    }

    fn script_for(&self, index: u32) -> ScriptedRun {
        self.per_run.get(&index).cloned().unwrap_or_else(|| self.default.clone())
    }
}

impl ScanExecutor for FakeScanExecutor {
    fn execute(
        &self,
        request: ScanRequest,
        events: Bus,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionResult>> + Send + '_>> {
        let script = self.script_for(request.run_index);
        let stats = Arc::clone(&self.stats);

        Box::pin(async move {
            if script.fail_spawn {
                return Err(ScanbatchError::Spawn(format!(
                    "fake executor refused to start run '{}'",
                    request.run_id
                )));
            }

            {
                let mut admissions = stats.admissions.lock().unwrap();
                admissions.push((request.run_index, stats.completed.load(Ordering::SeqCst)));
            }
            let active = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
            stats.max_active.fetch_max(active, Ordering::SeqCst);

            let mut stdout = String::new();
            for line in &script.stdout_lines {
                events.publish(stdout_event(&request.run_id, line.clone()));
                stdout.push_str(line);
                stdout.push('\n');
            }
            let mut stderr = String::new();
            for line in &script.stderr_lines {
                events.publish(stderr_event(&request.run_id, line.clone()));
                stderr.push_str(line);
                stderr.push('\n');
            }

            tokio::time::sleep(script.hold).await;

            // Mirror the supervisor contract: raw stdout is persisted even
            // when the exit code will classify as a failure.
            tokio::fs::write(&request.raw_output_path, &stdout)
                .await
                .map_err(|e| ScanbatchError::Spawn(format!("fake artifact write: {e}")))?;

            stats.active.fetch_sub(1, Ordering::SeqCst);
            stats.completed.fetch_add(1, Ordering::SeqCst);

            Ok(ExecutionResult {
                exit_code: script.exit_code,
                stdout,
                stderr,
                duration: script.hold,
            })
        })
    }
}
