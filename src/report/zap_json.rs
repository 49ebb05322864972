// src/report/zap_json.rs

//! Structured ZAP JSON report parser.
//!
//! zap-baseline can leave a JSON report next to its text output. Alerts in
//! it carry richer metadata than the text stream (risk code, confidence,
//! plugin id), so when the artifact is present its findings are appended
//! after the text-derived ones. The two sources are not deduplicated;
//! duplicates across them are an accepted limitation.

use serde::Deserialize;

use crate::config::ScanTool;
use crate::errors::{Result, ScanbatchError};
use crate::report::finding::{Finding, Severity};

#[derive(Debug, Deserialize)]
struct ZapReport {
    #[serde(default)]
    site: Vec<ZapSite>,
}

#[derive(Debug, Deserialize)]
struct ZapSite {
    #[serde(default)]
    alerts: Vec<ZapAlert>,
}

#[derive(Debug, Deserialize)]
struct ZapAlert {
    #[serde(default)]
    alert: String,
    #[serde(default)]
    riskcode: String,
    #[serde(default)]
    confidence: String,
    #[serde(default)]
    pluginid: String,
}

/// Parse a ZAP JSON report into findings, in report order.
///
/// Fails only on undecodable JSON; the extraction stage degrades that to a
/// placeholder finding rather than aborting synthesis.
pub fn parse_zap_report(raw: &str) -> Result<Vec<Finding>> {
    let report: ZapReport = serde_json::from_str(raw)
        .map_err(|e| ScanbatchError::Parse(format!("ZAP JSON report: {e}")))?;

    let findings = report
        .site
        .into_iter()
        .flat_map(|site| site.alerts)
        .map(|alert| {
            let severity = severity_from_riskcode(&alert.riskcode);
            let title = if alert.alert.is_empty() {
                "Unnamed ZAP alert".to_string()
            } else {
                alert.alert.clone()
            };
            let source = format!(
                "pluginid={} riskcode={} confidence={} alert={}",
                alert.pluginid, alert.riskcode, alert.confidence, alert.alert
            );
            let mut finding =
                Finding::new(ScanTool::ZapBaseline, severity, title, "alert", source)
                    .with_confidence(confidence_label(&alert.confidence));
            if !alert.pluginid.is_empty() {
                finding = finding.with_plugin_id(alert.pluginid);
            }
            finding
        })
        .collect();

    Ok(findings)
}

/// ZAP risk codes: 3 high, 2 medium, 1 low, 0 informational.
fn severity_from_riskcode(code: &str) -> Severity {
    match code.trim() {
        "3" => Severity::High,
        "2" => Severity::Medium,
        "1" => Severity::Low,
        _ => Severity::Info,
    }
}

/// ZAP confidence codes: 0 false positive, 1 low, 2 medium, 3 high,
/// 4 user confirmed. Unknown codes pass through verbatim.
fn confidence_label(code: &str) -> String {
    match code.trim() {
        "0" => "false-positive".to_string(),
        "1" => "low".to_string(),
        "2" => "medium".to_string(),
        "3" => "high".to_string(),
        "4" => "confirmed".to_string(),
        other => other.to_string(),
    }
}
