// src/scheduler.rs

//! Run scheduler: drives a batch from `created` to `completed`.
//!
//! One Tokio task per run, all admitted through a process-wide counting
//! semaphore so that at most `concurrency` runs are executing at any
//! moment, across every batch this scheduler owns. Admission is not FIFO:
//! whichever waiting run the semaphore wakes first gets the freed slot, so
//! completion order is unrelated to index order.
//!
//! A failing run never cancels its siblings; failures are isolated to the
//! run's own status and the batch's `failed` counter. Once every run is
//! terminal the report stage synthesizes one document per run, and the
//! batch reaches `completed` regardless of how many runs failed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::artifacts;
use crate::batch::model::{BatchStatus, Run, RunResult};
use crate::batch::registry::{BatchHandle, BatchRegistry};
use crate::config::{ExitOutcome, Settings};
use crate::errors::{Result, ScanbatchError};
use crate::events::Event;
use crate::exec::{ExecutionResult, ScanExecutor, ScanRequest};
use crate::report::{self, ReportContext};

pub struct Scheduler {
    registry: Arc<BatchRegistry>,
    executor: Arc<dyn ScanExecutor>,
    settings: Settings,
    /// Process-wide concurrency cap.
    permits: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(
        registry: Arc<BatchRegistry>,
        executor: Arc<dyn ScanExecutor>,
        settings: Settings,
    ) -> Arc<Self> {
        let permits = Arc::new(Semaphore::new(settings.concurrency));
        Arc::new(Self {
            registry,
            executor,
            settings,
            permits,
        })
    }

    pub fn registry(&self) -> &Arc<BatchRegistry> {
        &self.registry
    }

    /// Start driving a batch. Publishes `batch_started` before any run
    /// begins, then returns; the runs proceed on background tasks and the
    /// returned handle resolves when the batch has completed.
    ///
    /// Starting a batch that is no longer in `created` state is a caller
    /// error and is rejected rather than re-entering scheduling.
    pub fn start_batch(
        self: &Arc<Self>,
        batch_id: &str,
    ) -> Result<tokio::task::JoinHandle<()>> {
        let batch = self.registry.get(batch_id)?;

        batch.with_state(|s| {
            if s.status != BatchStatus::Created {
                return Err(ScanbatchError::Config(format!(
                    "batch {batch_id} already started"
                )));
            }
            s.status = BatchStatus::Running;
            Ok(())
        })?;

        batch.events.publish(Event::BatchStarted {
            batch_id: batch.id.clone(),
            total: batch.config.repetitions,
        });
        info!(batch_id = %batch.id, total = batch.config.repetitions, "batch started");

        let this = Arc::clone(self);
        Ok(tokio::spawn(async move {
            this.drive_batch(batch).await;
        }))
    }

    async fn drive_batch(self: Arc<Self>, batch: Arc<BatchHandle>) {
        let total = batch.config.repetitions;

        let mut tasks = JoinSet::new();
        for index in 0..total {
            let this = Arc::clone(&self);
            let batch = Arc::clone(&batch);
            tasks.spawn(async move {
                this.drive_run(batch, index).await;
            });
        }

        // Fan-in over all scheduling tasks. Individual failures (including
        // panics) are logged and tolerated; the batch still completes.
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(batch_id = %batch.id, error = %e, "run task aborted");
            }
        }

        self.report_stage(&batch).await;

        batch.with_state(|s| s.status = BatchStatus::Completed);
        batch.events.publish(Event::BatchCompleted {
            batch_id: batch.id.clone(),
        });
        info!(batch_id = %batch.id, "batch completed");
    }

    /// Drive a single run through its lifecycle.
    async fn drive_run(&self, batch: Arc<BatchHandle>, index: u32) {
        // Stagger launches: run i waits i times the configured delay
        // before first attempting admission.
        let delay = batch.config.delay_between_runs;
        if !delay.is_zero() && index > 0 {
            tokio::time::sleep(delay * index).await;
        }

        // Block until a process-wide slot frees up.
        let Ok(_permit) = Arc::clone(&self.permits).acquire_owned().await else {
            // Semaphore closed only at shutdown.
            return;
        };

        let run = match batch.with_state(|s| s.mark_running(index)) {
            Ok(run) => run,
            Err(e) => {
                error!(batch_id = %batch.id, index, error = %e, "run admission failed");
                return;
            }
        };

        batch.events.publish(Event::run_status_update(&batch.id, &run));
        batch.events.publish(Event::RunStarted {
            batch_id: batch.id.clone(),
            run_index: run.index,
            run_id: run.id.clone(),
        });
        debug!(batch_id = %batch.id, run_id = %run.id, "run admitted");

        let request = ScanRequest {
            batch_id: batch.id.clone(),
            run_id: run.id.clone(),
            run_index: run.index,
            tool: batch.config.tool,
            target_url: batch.config.target_url.clone(),
            executor_path: self.settings.executor_path.clone(),
            raw_output_path: artifacts::raw_output_path(&batch.output_dir, run.index),
        };

        let outcome = self
            .executor
            .execute(request, batch.events.clone())
            .await;

        self.finish_run(&batch, &run, outcome);
    }

    /// Record the terminal transition for a run and publish its events.
    fn finish_run(
        &self,
        batch: &BatchHandle,
        run: &Run,
        outcome: Result<ExecutionResult>,
    ) {
        match outcome {
            Ok(exec) => {
                let classification = self
                    .settings
                    .classify_exit(batch.config.tool, exec.exit_code);
                let result = RunResult {
                    exit_code: exec.exit_code,
                    duration_ms: exec.duration.as_millis() as u64,
                    findings_present: classification == ExitOutcome::FindingsPresent,
                };

                match classification {
                    ExitOutcome::Clean | ExitOutcome::FindingsPresent => {
                        match batch.with_state(|s| s.mark_completed(run.index, result.clone())) {
                            Ok(updated) => {
                                batch
                                    .events
                                    .publish(Event::run_status_update(&batch.id, &updated));
                                batch.events.publish(Event::RunCompleted {
                                    batch_id: batch.id.clone(),
                                    run_index: updated.index,
                                    run_id: updated.id.clone(),
                                    result,
                                });
                                info!(run_id = %run.id, "run completed");
                            }
                            Err(e) => error!(run_id = %run.id, error = %e, "completion lost"),
                        }
                    }
                    ExitOutcome::Crash => {
                        let message = ScanbatchError::ExecutionFailure {
                            code: exec.exit_code,
                            message: format!(
                                "{} exited with a code outside its clean/findings sets",
                                batch.config.tool
                            ),
                        }
                        .to_string();
                        self.fail_run(batch, run, message, Some(result));
                    }
                }
            }
            Err(e) => {
                self.fail_run(batch, run, e.to_string(), None);
            }
        }
    }

    fn fail_run(
        &self,
        batch: &BatchHandle,
        run: &Run,
        error: String,
        result: Option<RunResult>,
    ) {
        warn!(run_id = %run.id, error = %error, "run failed");
        match batch.with_state(|s| s.mark_failed(run.index, error.clone(), result)) {
            Ok(updated) => {
                batch
                    .events
                    .publish(Event::run_status_update(&batch.id, &updated));
                batch.events.publish(Event::RunFailed {
                    batch_id: batch.id.clone(),
                    run_index: updated.index,
                    run_id: updated.id.clone(),
                    error,
                });
            }
            Err(e) => error!(run_id = %run.id, error = %e, "failure lost"),
        }
    }

    /// Extract findings and synthesize one report per run, after every run
    /// is terminal. Extraction problems degrade to placeholder findings;
    /// report write failures are reported via `markdown_error` events and
    /// never block batch completion.
    async fn report_stage(&self, batch: &BatchHandle) {
        let snapshot = batch.snapshot();
        let tool = batch.config.tool;

        for run in &snapshot.runs {
            let raw_path = artifacts::raw_output_path(&batch.output_dir, run.index);
            let raw = tokio::fs::read_to_string(&raw_path)
                .await
                .unwrap_or_default();

            let mut findings = report::extract_findings(tool, &raw);

            // Structured report supplement: appended, not deduplicated.
            let structured_path = artifacts::structured_report_path(&batch.output_dir, run.index);
            let mut artifact_paths = vec![raw_path.display().to_string()];
            if let Ok(structured_raw) = tokio::fs::read_to_string(&structured_path).await {
                match report::parse_zap_report(&structured_raw) {
                    Ok(mut extra) => findings.append(&mut extra),
                    Err(e) => {
                        warn!(run_id = %run.id, error = %e, "structured report unparseable");
                        findings.push(report::placeholder(
                            tool,
                            format!("structured report unreadable: {e}"),
                        ));
                    }
                }
                artifact_paths.push(structured_path.display().to_string());
            }

            let report_path = artifacts::report_path(&batch.output_dir, run.index);
            artifact_paths.push(report_path.display().to_string());

            let ctx = ReportContext {
                batch_id: &batch.id,
                tool,
                target_url: &batch.config.target_url,
            };
            let document = report::synthesize_report(&ctx, run, &findings, &artifact_paths);

            match tokio::fs::write(&report_path, document).await {
                Ok(()) => {
                    batch.events.publish(Event::MarkdownGenerated {
                        batch_id: batch.id.clone(),
                        run_id: run.id.clone(),
                        report_path: report_path.display().to_string(),
                    });
                }
                Err(e) => {
                    let err = ScanbatchError::Synthesis(format!(
                        "writing {}: {e}",
                        report_path.display()
                    ));
                    warn!(run_id = %run.id, error = %err, "report write failed");
                    batch.events.publish(Event::MarkdownError {
                        batch_id: batch.id.clone(),
                        run_id: run.id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
    }
}
