// tests/event_stream.rs

mod common;
use common::{harness, with_timeout};

use std::collections::HashMap;
use std::time::Duration;

use scanbatch::batch::{BatchStatus, RunStatus};
use scanbatch::config::ScanTool;
use scanbatch::events::Event;
use scanbatch_test_utils::builders::BatchConfigBuilder;
use scanbatch_test_utils::fake_executor::{FakeScanExecutor, ScriptedRun};

/// Drain a receiver until (and including) `batch_completed`. A lagged
/// receiver skips the dropped events and keeps consuming.
async fn collect_until_completed(
    mut rx: tokio::sync::broadcast::Receiver<Event>,
) -> Vec<Event> {
    use tokio::sync::broadcast::error::RecvError;

    let mut events = Vec::new();
    loop {
        match rx.recv().await {
            Ok(event) => {
                let done = matches!(event, Event::BatchCompleted { .. });
                events.push(event);
                if done {
                    return events;
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => panic!("event stream closed early"),
        }
    }
}

#[tokio::test]
async fn lifecycle_events_bracket_the_batch() {
    let h = harness(2, FakeScanExecutor::new(ScriptedRun::default()));
    let cfg = BatchConfigBuilder::new(ScanTool::Nikto).repetitions(3).build();
    let batch = h.registry.create_batch(cfg).unwrap();

    let (_snapshot, rx) = batch.subscribe();
    let driver = h.scheduler.start_batch(&batch.id).unwrap();
    let events = with_timeout(collect_until_completed(rx)).await;
    with_timeout(driver).await.unwrap();

    assert!(matches!(events.first(), Some(Event::BatchStarted { total: 3, .. })));
    assert!(matches!(events.last(), Some(Event::BatchCompleted { .. })));

    let started = events
        .iter()
        .filter(|e| matches!(e, Event::RunStarted { .. }))
        .count();
    let completed = events
        .iter()
        .filter(|e| matches!(e, Event::RunCompleted { .. }))
        .count();
    let reports = events
        .iter()
        .filter(|e| matches!(e, Event::MarkdownGenerated { .. }))
        .count();
    assert_eq!(started, 3);
    assert_eq!(completed, 3);
    assert_eq!(reports, 3);
}

#[tokio::test]
async fn run_status_updates_never_regress() {
    let h = harness(
        2,
        FakeScanExecutor::new(ScriptedRun::default()).with_run(1, ScriptedRun::exiting(99)),
    );
    let cfg = BatchConfigBuilder::new(ScanTool::Nikto).repetitions(4).build();
    let batch = h.registry.create_batch(cfg).unwrap();

    let (_snapshot, rx) = batch.subscribe();
    let driver = h.scheduler.start_batch(&batch.id).unwrap();
    let events = with_timeout(collect_until_completed(rx)).await;
    with_timeout(driver).await.unwrap();

    let mut last: HashMap<u32, RunStatus> = HashMap::new();
    for event in &events {
        if let Event::RunStatusUpdate { run_index, status, .. } = event {
            if let Some(prev) = last.get(run_index) {
                assert!(
                    !(prev.is_terminal() && !status.is_terminal()),
                    "run {run_index} regressed from {prev:?} to {status:?}"
                );
            }
            last.insert(*run_index, *status);
        }
    }
    // Every run's final observed update is terminal.
    assert_eq!(last.len(), 4);
    assert!(last.values().all(|s| s.is_terminal()));
}

#[tokio::test]
async fn subscriber_snapshot_matches_registry_state() {
    let h = harness(1, FakeScanExecutor::new(ScriptedRun::default()));
    let cfg = BatchConfigBuilder::new(ScanTool::Nikto).repetitions(2).build();
    let batch = h.registry.create_batch(cfg).unwrap();

    // Before start: snapshot shows a created batch with all runs pending.
    let (snapshot, _rx) = batch.subscribe();
    let status = h.registry.get_status(&batch.id).unwrap();
    match snapshot {
        Event::BatchStatus {
            status: snap_status,
            progress,
            run_statuses,
            ..
        } => {
            assert_eq!(snap_status, status.status);
            assert_eq!(progress, status.progress);
            assert_eq!(run_statuses.len(), 2);
            assert!(run_statuses.iter().all(|r| r.status == RunStatus::Pending));
        }
        other => panic!("expected batch_status snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn late_subscriber_gets_final_snapshot_not_replay() {
    let h = harness(2, FakeScanExecutor::new(ScriptedRun::default()));
    let cfg = BatchConfigBuilder::new(ScanTool::Nikto).repetitions(2).build();
    let batch = h.registry.create_batch(cfg).unwrap();

    let driver = h.scheduler.start_batch(&batch.id).unwrap();
    with_timeout(driver).await.unwrap();

    let (snapshot, mut rx) = batch.subscribe();
    match snapshot {
        Event::BatchStatus { status, progress, .. } => {
            assert_eq!(status, BatchStatus::Completed);
            assert_eq!(progress.completed, 2);
        }
        other => panic!("expected batch_status snapshot, got {other:?}"),
    }

    // No historical events are replayed to the late subscriber.
    let replayed = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
    assert!(replayed.is_err(), "late subscriber received a replayed event");
}

#[tokio::test]
async fn lagged_observer_still_sees_batch_completed() {
    use scanbatch::events::{Bus, stdout_event};

    // Publish far more events than the bus buffers before the observer
    // reads anything, then complete. The observer loses the overflow but
    // must still reach batch_completed instead of dying on the lag.
    let bus = Bus::new();
    let rx = bus.add_observer();
    for i in 0..300 {
        bus.publish(stdout_event("r-0", format!("line {i}")));
    }
    bus.publish(Event::BatchCompleted {
        batch_id: "b".to_string(),
    });

    let events = with_timeout(collect_until_completed(rx)).await;
    assert!(matches!(events.last(), Some(Event::BatchCompleted { .. })));
    // Some of the burst survived in the buffer alongside the completion.
    assert!(events.len() > 1);
}

#[tokio::test]
async fn stdout_lines_stream_in_order() {
    let fake = FakeScanExecutor::new(
        ScriptedRun::default()
            .with_stdout(&["line one", "line two", "line three"])
            .with_stderr(&["noise"]),
    );
    let h = harness(1, fake);
    let cfg = BatchConfigBuilder::new(ScanTool::Nikto).repetitions(1).build();
    let batch = h.registry.create_batch(cfg).unwrap();

    let (_snapshot, rx) = batch.subscribe();
    let driver = h.scheduler.start_batch(&batch.id).unwrap();
    let events = with_timeout(collect_until_completed(rx)).await;
    with_timeout(driver).await.unwrap();

    let stdout_lines: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            Event::Stdout { line, .. } => Some(line.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(stdout_lines, vec!["line one", "line two", "line three"]);

    let stderr_lines: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            Event::Stderr { line, .. } => Some(line.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(stderr_lines, vec!["noise"]);
}
