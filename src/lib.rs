// src/lib.rs

pub mod artifacts;
pub mod batch;
pub mod cli;
pub mod config;
pub mod errors;
pub mod events;
pub mod exec;
pub mod logging;
pub mod report;
pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::info;

use crate::batch::BatchRegistry;
use crate::cli::CliArgs;
use crate::config::{BatchConfig, ScanTool, Settings, load_settings};
use crate::events::Event;
use crate::exec::ProcessExecutor;
use crate::scheduler::Scheduler;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings loading (with CLI overrides)
/// - registry / scheduler / process executor
/// - an observer subscription that prints the event stream as JSON lines
pub async fn run(args: CliArgs) -> Result<()> {
    let mut settings: Settings = load_settings(&args.settings)?;
    if let Some(executor) = &args.executor {
        settings.executor_path = executor.clone();
    }
    if let Some(cap) = args.concurrency {
        settings.concurrency = cap;
    }

    let tool: ScanTool = args
        .tool
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .context("invalid --tool")?;

    let config = BatchConfig::new(tool, &args.target, args.repetitions)
        .with_delay(Duration::from_millis(args.delay_ms));

    if args.dry_run {
        print_dry_run(&config, &settings, &args.output_dir);
        return Ok(());
    }

    let registry = Arc::new(BatchRegistry::new(&args.output_dir));
    let scheduler = Scheduler::new(
        Arc::clone(&registry),
        Arc::new(ProcessExecutor),
        settings,
    );

    let batch = registry.create_batch(config)?;
    info!(batch_id = %batch.id, "created batch");

    // Subscribe before starting so no lifecycle event is missed; print the
    // stream as JSON lines, the same wire format a remote observer gets.
    // A lagged receiver keeps consuming: the skipped events are gone, but
    // the stream (and `batch_completed`) must still arrive.
    let (snapshot, mut rx) = batch.subscribe();
    let printer = tokio::spawn(async move {
        print_event(&snapshot);
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let done = matches!(event, Event::BatchCompleted { .. });
                    print_event(&event);
                    if done {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "observer fell behind; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let driver = scheduler.start_batch(&batch.id)?;
    driver.await.context("batch driver task failed")?;
    printer.await.context("event printer task failed")?;

    let status = registry.get_status(&batch.id)?;
    info!(
        batch_id = %status.batch_id,
        completed = status.progress.completed,
        failed = status.progress.failed,
        "batch finished"
    );

    Ok(())
}

fn print_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
    }
}

/// Simple dry-run output: print the batch plan without executing anything.
fn print_dry_run(config: &BatchConfig, settings: &Settings, output_dir: &str) {
    println!("scanbatch dry-run");
    println!("  tool: {}", config.tool);
    println!("  target: {}", config.target_url);
    println!("  repetitions: {}", config.repetitions);
    println!("  delay between runs: {:?}", config.delay_between_runs);
    println!("  concurrency cap: {}", settings.concurrency);
    println!("  executor: {}", settings.executor_path);
    println!("  output dir: {output_dir}");
}
