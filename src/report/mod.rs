// src/report/mod.rs

//! Findings extraction and report synthesis.
//!
//! - [`finding`] defines the ordered severity scale and the normalized
//!   [`Finding`] record.
//! - [`parsers`] holds the per-tool text parsers (line-oriented, order
//!   preserving, panic-free).
//! - [`zap_json`] parses the richer structured report zap-baseline can
//!   leave on disk; its findings are appended after the text-derived ones.
//! - [`synthesize`] renders the deterministic report document.

pub mod finding;
pub mod parsers;
pub mod synthesize;
pub mod zap_json;

pub use finding::{Finding, Severity, placeholder};
pub use parsers::extract_findings;
pub use synthesize::{ReportContext, synthesize_report};
pub use zap_json::parse_zap_report;
