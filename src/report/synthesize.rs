// src/report/synthesize.rs

//! Report synthesis.
//!
//! `synthesize_report` is pure: no I/O, no clock reads, and byte-identical
//! output for identical inputs. Everything time-like in the document comes
//! from the run snapshot itself, which makes the output suitable for
//! golden-file testing. Writing the document to disk is the scheduler's
//! job.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::batch::model::Run;
use crate::config::ScanTool;
use crate::report::finding::{Finding, Severity};

/// Run-independent metadata carried into the report header.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub batch_id: &'a str,
    pub tool: ScanTool,
    pub target_url: &'a str,
}

/// Render the report document for one run.
pub fn synthesize_report(
    ctx: &ReportContext<'_>,
    run: &Run,
    findings: &[Finding],
    artifact_paths: &[String],
) -> String {
    let mut out = String::new();

    // Header + run metadata.
    let _ = writeln!(out, "# Scan Report: {} run {}", ctx.tool, run.index);
    out.push('\n');
    let _ = writeln!(out, "## Run");
    out.push('\n');
    let _ = writeln!(out, "- batch: {}", ctx.batch_id);
    let _ = writeln!(out, "- run id: {}", run.id);
    let _ = writeln!(out, "- tool: {}", ctx.tool);
    let _ = writeln!(out, "- target: {}", ctx.target_url);
    let _ = writeln!(out, "- status: {}", status_label(run));
    let _ = writeln!(out, "- started: {}", fmt_time(run.started_at));
    let _ = writeln!(out, "- completed: {}", fmt_time(run.completed_at));
    let _ = writeln!(out, "- duration: {}", fmt_duration(run.duration_ms));
    let _ = writeln!(out, "- exit code: {}", fmt_exit_code(run));
    if let Some(error) = &run.error {
        let _ = writeln!(out, "- error: {error}");
    }
    out.push('\n');

    // Findings summary.
    let _ = writeln!(out, "## Findings ({})", findings.len());
    out.push('\n');
    if findings.is_empty() {
        let _ = writeln!(out, "No findings were extracted from this run.");
        out.push('\n');
    } else {
        let _ = write!(out, "{}", severity_counts_line(findings));
        out.push('\n');
        let _ = writeln!(out, "| # | severity | title | tool |");
        let _ = writeln!(out, "|---|----------|-------|------|");
        for (i, f) in findings.iter().enumerate() {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                i + 1,
                f.severity,
                escape_pipes(&f.title),
                f.tool
            );
        }
        out.push('\n');

        // Detail sections, in extraction order.
        for (i, f) in findings.iter().enumerate() {
            let _ = writeln!(out, "### {}. {}", i + 1, f.title);
            out.push('\n');
            let _ = writeln!(out, "- severity: {}", f.severity);
            let _ = writeln!(out, "- tool: {}", f.tool);
            let _ = writeln!(out, "- type: {}", f.finding_type);
            if let Some(id) = &f.plugin_id {
                let _ = writeln!(out, "- plugin id: {id}");
            }
            if let Some(confidence) = &f.confidence {
                let _ = writeln!(out, "- confidence: {confidence}");
            }
            let _ = writeln!(out, "- source: `{}`", f.source);
            out.push('\n');
        }
    }

    // Artifact manifest.
    let _ = writeln!(out, "## Artifacts");
    out.push('\n');
    if artifact_paths.is_empty() {
        let _ = writeln!(out, "None.");
    } else {
        for path in artifact_paths {
            let _ = writeln!(out, "- {path}");
        }
    }

    out
}

fn severity_counts_line(findings: &[Finding]) -> String {
    let mut line = String::new();
    let mut first = true;
    for sev in Severity::DESCENDING {
        let count = findings.iter().filter(|f| f.severity == sev).count();
        if count == 0 {
            continue;
        }
        if !first {
            line.push_str(", ");
        }
        let _ = write!(line, "{sev}: {count}");
        first = false;
    }
    line.push('\n');
    line
}

fn status_label(run: &Run) -> String {
    serde_json::to_value(run.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", run.status))
}

fn fmt_time(t: Option<DateTime<Utc>>) -> String {
    match t {
        Some(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => "-".to_string(),
    }
}

fn fmt_duration(ms: Option<u64>) -> String {
    match ms {
        Some(ms) => format!("{ms} ms"),
        None => "-".to_string(),
    }
}

fn fmt_exit_code(run: &Run) -> String {
    match run.result.as_ref().and_then(|r| r.exit_code) {
        Some(code) => code.to_string(),
        None => "-".to_string(),
    }
}

/// Titles land in a markdown table; keep pipes from breaking the row.
fn escape_pipes(s: &str) -> String {
    s.replace('|', "\\|")
}
