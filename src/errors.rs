// src/errors.rs

//! Crate-wide error taxonomy and `Result` alias.
//!
//! Run-level failures (`Spawn`, `ExecutionFailure`) are terminal for a single
//! run only and never abort sibling runs or the batch. `Parse` degrades to a
//! placeholder finding at the extraction stage; `Synthesis` is reported via a
//! `markdown_error` event and does not affect batch completion.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanbatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    #[error("Failed to spawn scan executor: {0}")]
    Spawn(String),

    #[error("Scan executor failed (exit code {code:?}): {message}")]
    ExecutionFailure { code: Option<i32>, message: String },

    #[error("Failed to parse scan output: {0}")]
    Parse(String),

    #[error("Failed to synthesize report: {0}")]
    Synthesis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ScanbatchError>;
