// src/config/mod.rs

//! Configuration layer.
//!
//! - [`model`] holds the batch configuration, the closed set of supported
//!   scan tools with their exit-code classification, and the optional
//!   settings file schema.
//! - [`loader`] reads and validates the TOML settings file.

pub mod loader;
pub mod model;

pub use loader::{default_settings_path, load_settings};
pub use model::{
    BatchConfig, ExecutorSection, ExitOutcome, LimitsSection, RawSettings, ScanTool, Settings,
    ToolOverride,
};
