// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ScanbatchError};

/// The closed set of scan tools the engine knows how to drive.
///
/// Each variant carries an explicit exit-code classification; there is
/// deliberately no universal "non-zero means failure" rule, because several
/// of these tools use a non-zero exit status to mean "findings present"
/// rather than "crashed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanTool {
    /// OWASP ZAP baseline scan. Exits 1 on FAIL-NEW alerts, 2 on WARN-NEW.
    ZapBaseline,
    /// Nikto web server scanner. Exits 1 when findings are reported.
    Nikto,
    /// Nuclei template scanner. Exits 1 when configured to fail on matches.
    Nuclei,
}

/// How an executor exit status is interpreted for a given tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Scan ran to completion and reported nothing.
    Clean,
    /// Scan ran to completion and reported findings; the run still counts
    /// as completed, not failed.
    FindingsPresent,
    /// The tool itself broke; the run is failed.
    Crash,
}

impl ScanTool {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanTool::ZapBaseline => "zap-baseline",
            ScanTool::Nikto => "nikto",
            ScanTool::Nuclei => "nuclei",
        }
    }

    /// Built-in exit-code classification for this tool.
    ///
    /// A missing exit code (killed by signal) is always a crash.
    pub fn classify_exit(&self, code: Option<i32>) -> ExitOutcome {
        let Some(code) = code else {
            return ExitOutcome::Crash;
        };
        match self {
            ScanTool::ZapBaseline => match code {
                0 => ExitOutcome::Clean,
                1 | 2 => ExitOutcome::FindingsPresent,
                _ => ExitOutcome::Crash,
            },
            ScanTool::Nikto | ScanTool::Nuclei => match code {
                0 => ExitOutcome::Clean,
                1 => ExitOutcome::FindingsPresent,
                _ => ExitOutcome::Crash,
            },
        }
    }
}

impl fmt::Display for ScanTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanTool {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zap-baseline" | "zap" => Ok(ScanTool::ZapBaseline),
            "nikto" => Ok(ScanTool::Nikto),
            "nuclei" => Ok(ScanTool::Nuclei),
            other => Err(format!(
                "unknown scan tool: {other} (expected \"zap-baseline\", \"nikto\" or \"nuclei\")"
            )),
        }
    }
}

/// Immutable configuration for one batch of repeated scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub tool: ScanTool,
    pub target_url: String,
    pub repetitions: u32,
    /// Stagger between consecutive run launches. Zero means launch as fast
    /// as the concurrency cap allows.
    #[serde(default)]
    pub delay_between_runs: Duration,
}

impl BatchConfig {
    pub fn new(tool: ScanTool, target_url: impl Into<String>, repetitions: u32) -> Self {
        Self {
            tool,
            target_url: target_url.into(),
            repetitions,
            delay_between_runs: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_between_runs = delay;
        self
    }

    /// Validate the configuration before a batch is created from it.
    pub fn validate(&self) -> Result<()> {
        if self.repetitions < 1 {
            return Err(ScanbatchError::Config(
                "repetitions must be at least 1".to_string(),
            ));
        }
        if self.target_url.trim().is_empty() {
            return Err(ScanbatchError::Config("target URL is empty".to_string()));
        }
        Ok(())
    }
}

/// Per-tool override for exit-code classification, from the settings file.
///
/// Codes listed in neither set classify as a crash.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolOverride {
    #[serde(default)]
    pub clean_exit_codes: Vec<i32>,
    #[serde(default)]
    pub findings_exit_codes: Vec<i32>,
}

/// Raw settings file as deserialized from TOML, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    #[serde(default)]
    pub executor: ExecutorSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub tools: BTreeMap<String, ToolOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSection {
    /// Program invoked to actually perform a scan.
    #[serde(default = "default_executor_path")]
    pub path: String,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            path: default_executor_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsSection {
    /// Process-wide cap on concurrently running scans.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_executor_path() -> String {
    "scan-runner".to_string()
}

fn default_concurrency() -> usize {
    3
}

/// Validated settings, produced via `TryFrom<RawSettings>`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub executor_path: String,
    pub concurrency: usize,
    tool_overrides: BTreeMap<ScanTool, ToolOverride>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::try_from(RawSettings::default())
            .expect("default settings are valid")
    }
}

impl TryFrom<RawSettings> for Settings {
    type Error = ScanbatchError;

    fn try_from(raw: RawSettings) -> Result<Self> {
        if raw.limits.concurrency < 1 {
            return Err(ScanbatchError::Config(
                "limits.concurrency must be at least 1".to_string(),
            ));
        }

        let mut tool_overrides = BTreeMap::new();
        for (name, over) in raw.tools {
            let tool: ScanTool = name
                .parse()
                .map_err(|e: String| ScanbatchError::Config(format!("[tools.{name}]: {e}")))?;
            tool_overrides.insert(tool, over);
        }

        Ok(Self {
            executor_path: raw.executor.path,
            concurrency: raw.limits.concurrency,
            tool_overrides,
        })
    }
}

impl Settings {
    /// Classify an executor exit status for the given tool, consulting any
    /// settings-file override before falling back to the built-in mapping.
    pub fn classify_exit(&self, tool: ScanTool, code: Option<i32>) -> ExitOutcome {
        if let Some(over) = self.tool_overrides.get(&tool) {
            if let Some(code) = code {
                if over.clean_exit_codes.contains(&code) {
                    return ExitOutcome::Clean;
                }
                if over.findings_exit_codes.contains(&code) {
                    return ExitOutcome::FindingsPresent;
                }
                if !over.clean_exit_codes.is_empty() || !over.findings_exit_codes.is_empty() {
                    return ExitOutcome::Crash;
                }
            }
        }
        tool.classify_exit(code)
    }

    pub fn override_tool(&mut self, tool: ScanTool, over: ToolOverride) {
        self.tool_overrides.insert(tool, over);
    }
}
