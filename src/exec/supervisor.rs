// src/exec/supervisor.rs

//! Individual scan process supervision.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{Result, ScanbatchError};
use crate::events::{Bus, Event, stderr_event, stdout_event};

use super::backend::ScanRequest;

/// Terminal result of one supervised scan process.
///
/// `exit_code` is `None` when the process was killed by a signal. The
/// caller (scheduler) classifies the code per tool; the supervisor itself
/// makes no success/failure judgement beyond "it spawned and exited".
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// Run one scan process to completion.
///
/// - Spawns `<executor> <tool> <run_index> <run_id> <target_url>
///   <batch_id>` with piped stdio.
/// - Each stdout line is published as a `stdout` event the moment it
///   arrives (mirrored for stderr); this is a live stream, not a final
///   buffer dump.
/// - The full captured stdout is persisted verbatim to the raw output
///   artifact, whether or not the process succeeded.
/// - No timeout is imposed; the process runs until it exits.
pub async fn run_scan(request: ScanRequest, events: Bus) -> Result<ExecutionResult> {
    info!(
        batch_id = %request.batch_id,
        run_id = %request.run_id,
        tool = %request.tool,
        executor = %request.executor_path,
        "starting scan process"
    );

    let started = Instant::now();

    let mut cmd = Command::new(&request.executor_path);
    cmd.arg(request.tool.as_str())
        .arg(request.run_index.to_string())
        .arg(&request.run_id)
        .arg(&request.target_url)
        .arg(&request.batch_id)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
        ScanbatchError::Spawn(format!(
            "executor '{}' for run '{}': {e}",
            request.executor_path, request.run_id
        ))
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let stdout_task = stream_lines(stdout, events.clone(), request.run_id.clone(), false);
    let stderr_task = stream_lines(stderr, events.clone(), request.run_id.clone(), true);

    let status = child.wait().await?;

    // Streams end at process exit; join them to get the accumulated text.
    let stdout_text = stdout_task.await.unwrap_or_default();
    let stderr_text = stderr_task.await.unwrap_or_default();

    let duration = started.elapsed();
    let exit_code = status.code();

    info!(
        run_id = %request.run_id,
        exit_code = ?exit_code,
        duration_ms = duration.as_millis() as u64,
        "scan process exited"
    );

    // Persist the raw output before returning, so a run classified as
    // failed still leaves its captured output on disk.
    if let Err(e) = tokio::fs::write(&request.raw_output_path, &stdout_text).await {
        warn!(
            run_id = %request.run_id,
            path = %request.raw_output_path.display(),
            error = %e,
            "failed to persist raw scan output"
        );
        return Err(e.into());
    }

    Ok(ExecutionResult {
        exit_code,
        stdout: stdout_text,
        stderr: stderr_text,
        duration,
    })
}

/// Read lines from a child stream, publishing each as an event and
/// accumulating the full text. Returns the accumulated text when the
/// stream closes at process exit.
fn stream_lines(
    stream: Option<impl AsyncRead + Unpin + Send + 'static>,
    events: Bus,
    run_id: String,
    is_stderr: bool,
) -> tokio::task::JoinHandle<String> {
    tokio::spawn(async move {
        let mut buffer = String::new();
        let Some(stream) = stream else {
            return buffer;
        };

        let reader = BufReader::new(stream);
        let mut lines = reader.lines();

        while let Ok(Some(line)) = lines.next_line().await {
            debug!(
                run_id = %run_id,
                channel = if is_stderr { "stderr" } else { "stdout" },
                "{line}"
            );
            let event: Event = if is_stderr {
                stderr_event(&run_id, line.clone())
            } else {
                stdout_event(&run_id, line.clone())
            };
            events.publish(event);

            buffer.push_str(&line);
            buffer.push('\n');
        }

        buffer
    })
}
