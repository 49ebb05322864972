// src/report/parsers.rs

//! Tool-specific text parsers.
//!
//! Each parser is line-oriented, order-preserving and tolerant: lines that
//! don't match the tool's markers are skipped, and no input ever causes a
//! panic or an error. Empty or fully unmatched input yields an empty list;
//! the extraction stage decides whether to substitute a placeholder.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::ScanTool;
use crate::report::finding::{Finding, Severity};

/// Dispatch to the parser for the given tool.
pub fn extract_findings(tool: ScanTool, raw: &str) -> Vec<Finding> {
    match tool {
        ScanTool::ZapBaseline => parse_zap_baseline(raw),
        ScanTool::Nikto => parse_nikto(raw),
        ScanTool::Nuclei => parse_nuclei(raw),
    }
}

/// `WARN-NEW: <title> [<plugin id>]` / `FAIL-NEW: <title> [<plugin id>]`
/// lines from zap-baseline output. WARN maps to MEDIUM, FAIL to HIGH; the
/// trailing bracketed number is the ZAP plugin id.
static ZAP_ALERT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(WARN-NEW|FAIL-NEW):\s+(.+?)(?:\s+\[(\d+)\])?\s*$")
        .expect("zap alert regex is valid")
});

fn parse_zap_baseline(raw: &str) -> Vec<Finding> {
    raw.lines()
        .filter_map(|line| {
            let caps = ZAP_ALERT.captures(line)?;
            let severity = match &caps[1] {
                "FAIL-NEW" => Severity::High,
                _ => Severity::Medium,
            };
            let mut finding = Finding::new(
                ScanTool::ZapBaseline,
                severity,
                caps[2].trim(),
                "alert",
                line,
            );
            if let Some(id) = caps.get(3) {
                finding = finding.with_plugin_id(id.as_str());
            }
            Some(finding)
        })
        .collect()
}

/// Nikto prefixes each observation with `+ `. Nikto does not report a
/// severity, so one is inferred from keyword presence.
fn parse_nikto(raw: &str) -> Vec<Finding> {
    raw.lines()
        .filter_map(|line| {
            let body = line.strip_prefix("+ ")?.trim();
            if body.is_empty() {
                return None;
            }
            Some(Finding::new(
                ScanTool::Nikto,
                infer_severity(body),
                body,
                "observation",
                line,
            ))
        })
        .collect()
}

/// Keyword heuristic for tools that don't report severity explicitly.
fn infer_severity(text: &str) -> Severity {
    let lower = text.to_lowercase();
    const HIGH: [&str; 7] = [
        "injection",
        "xss",
        "cross-site",
        "traversal",
        "remote code",
        "overflow",
        "vulnerable",
    ];
    const MEDIUM: [&str; 4] = ["outdated", "disclosure", "leak", "deprecated"];
    const LOW: [&str; 3] = ["header", "cookie", "banner"];

    if HIGH.iter().any(|k| lower.contains(k)) {
        Severity::High
    } else if MEDIUM.iter().any(|k| lower.contains(k)) {
        Severity::Medium
    } else if LOW.iter().any(|k| lower.contains(k)) {
        Severity::Low
    } else {
        Severity::Info
    }
}

/// Nuclei match lines: `[template-id] [protocol] [severity] <target> ...`.
/// The severity token is tool-reported.
static NUCLEI_MATCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([^\]]+)\]\s+\[([^\]]+)\]\s+\[([^\]]+)\]\s+(\S.*)$")
        .expect("nuclei match regex is valid")
});

fn parse_nuclei(raw: &str) -> Vec<Finding> {
    raw.lines()
        .filter_map(|line| {
            let caps = NUCLEI_MATCH.captures(line)?;
            let severity = match caps[3].to_lowercase().as_str() {
                "critical" | "high" => Severity::High,
                "medium" => Severity::Medium,
                "low" => Severity::Low,
                _ => Severity::Info,
            };
            Some(
                Finding::new(
                    ScanTool::Nuclei,
                    severity,
                    caps[1].trim(),
                    caps[2].trim().to_lowercase(),
                    line,
                )
                .with_plugin_id(caps[1].trim()),
            )
        })
        .collect()
}
