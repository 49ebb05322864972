// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_settings_path;

/// Command-line arguments for `scanbatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scanbatch",
    version,
    about = "Run repeated security scans against a target with bounded concurrency.",
    long_about = None
)]
pub struct CliArgs {
    /// Scan tool to run (zap-baseline, nikto, nuclei).
    #[arg(long, value_name = "TOOL")]
    pub tool: String,

    /// Target URL to scan.
    #[arg(long, value_name = "URL")]
    pub target: String,

    /// Number of times to repeat the scan.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub repetitions: u32,

    /// Delay between run launches, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub delay_ms: u64,

    /// Maximum number of runs executing at the same time (process-wide).
    ///
    /// If omitted, the value from the settings file (or its default of 3)
    /// is used.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Directory where per-run artifacts (raw output, reports) are written.
    #[arg(long, value_name = "PATH", default_value = "scan-results")]
    pub output_dir: String,

    /// Path to the settings file (TOML).
    ///
    /// Default: `Scanbatch.toml` in the current working directory; missing
    /// files fall back to built-in defaults.
    #[arg(long, value_name = "PATH", default_value_os_t = default_settings_path())]
    pub settings: PathBuf,

    /// Path to the external scan executor program.
    ///
    /// Overrides the settings file. The executor is invoked as:
    /// `<executor> <tool> <run_index> <run_id> <target_url> <batch_id>`.
    #[arg(long, value_name = "PATH")]
    pub executor: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SCANBATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate configuration and print the batch plan, but execute nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_flag_defaults_to_standard_path() {
        let args =
            CliArgs::parse_from(["scanbatch", "--tool", "nikto", "--target", "http://t.test"]);
        assert_eq!(args.settings, default_settings_path());
    }

    #[test]
    fn settings_flag_overrides_default() {
        let args = CliArgs::parse_from([
            "scanbatch",
            "--tool",
            "nikto",
            "--target",
            "http://t.test",
            "--settings",
            "/etc/scanbatch/custom.toml",
        ]);
        assert_eq!(args.settings, PathBuf::from("/etc/scanbatch/custom.toml"));
    }
}
