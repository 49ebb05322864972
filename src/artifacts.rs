// src/artifacts.rs

//! Artifact path addressing.
//!
//! All per-run files live under the batch output directory and are
//! addressed by run index:
//!
//! - `run-{index}-output.txt` — raw stdout captured by the supervisor
//! - `run-{index}-report.md` — synthesized report
//! - `run-{index}-report.json` — structured report the tool itself may
//!   leave behind (read if present, never written by us)

use std::path::{Path, PathBuf};

/// Raw captured stdout for a run.
pub fn raw_output_path(batch_dir: &Path, run_index: u32) -> PathBuf {
    batch_dir.join(format!("run-{run_index}-output.txt"))
}

/// Synthesized markdown report for a run.
pub fn report_path(batch_dir: &Path, run_index: u32) -> PathBuf {
    batch_dir.join(format!("run-{run_index}-report.md"))
}

/// Tool-produced structured report, if the executor left one.
pub fn structured_report_path(batch_dir: &Path, run_index: u32) -> PathBuf {
    batch_dir.join(format!("run-{run_index}-report.json"))
}
