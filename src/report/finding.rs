// src/report/finding.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ScanTool;

/// Ordered severity scale. Derived `Ord` follows declaration order, so
/// `Info < Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        }
    }

    /// All severities, highest first. Used for stable summary ordering.
    pub const DESCENDING: [Severity; 4] = [
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized security observation extracted from a run's output.
/// Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub title: String,
    pub tool: ScanTool,
    /// Free-form classification tag ("alert", "observation", protocol name,
    /// "parse-error", ...).
    pub finding_type: String,
    /// Verbatim source line or record the finding was derived from.
    pub source: String,
    /// Tool-reported identifier (e.g. ZAP plugin id), when available.
    pub plugin_id: Option<String>,
    /// Tool-reported confidence, when available.
    pub confidence: Option<String>,
}

impl Finding {
    pub fn new(
        tool: ScanTool,
        severity: Severity,
        title: impl Into<String>,
        finding_type: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            title: title.into(),
            tool,
            finding_type: finding_type.into(),
            source: source.into(),
            plugin_id: None,
            confidence: None,
        }
    }

    pub fn with_plugin_id(mut self, id: impl Into<String>) -> Self {
        self.plugin_id = Some(id.into());
        self
    }

    pub fn with_confidence(mut self, confidence: impl Into<String>) -> Self {
        self.confidence = Some(confidence.into());
        self
    }
}

/// Placeholder finding used when output could not be interpreted; the raw
/// artifact still holds everything the tool printed.
pub fn placeholder(tool: ScanTool, detail: impl Into<String>) -> Finding {
    Finding::new(
        tool,
        Severity::Info,
        "Unparsed scanner output",
        "parse-error",
        detail,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_high_above_info() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }
}
