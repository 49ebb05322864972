// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawSettings, Settings};
use crate::errors::Result;

/// Load the settings file from a given path and run validation.
///
/// A missing file is not an error: the engine runs fine on built-in
/// defaults, and most deployments only add a `Scanbatch.toml` once they
/// need a custom executor path or per-tool exit-code overrides.
pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();

    if !path.exists() {
        debug!(path = %path.display(), "no settings file; using defaults");
        return Ok(Settings::default());
    }

    let contents = fs::read_to_string(path)?;
    let raw: RawSettings = toml::from_str(&contents)?;
    let settings = Settings::try_from(raw)?;
    Ok(settings)
}

/// `Scanbatch.toml` in the current working directory.
pub fn default_settings_path() -> PathBuf {
    PathBuf::from("Scanbatch.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{ExitOutcome, ScanTool};

    #[test]
    fn missing_file_yields_defaults() {
        let settings = load_settings("does/not/exist.toml").unwrap();
        assert_eq!(settings.concurrency, 3);
        assert_eq!(settings.executor_path, "scan-runner");
    }

    #[test]
    fn settings_file_round_trips_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Scanbatch.toml");
        fs::write(
            &path,
            r#"
[executor]
path = "/opt/scan/run.sh"

[limits]
concurrency = 5

[tools.nuclei]
clean_exit_codes = [0]
findings_exit_codes = [1, 2]
"#,
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.executor_path, "/opt/scan/run.sh");
        assert_eq!(settings.concurrency, 5);
        assert_eq!(
            settings.classify_exit(ScanTool::Nuclei, Some(2)),
            ExitOutcome::FindingsPresent
        );
    }

    #[test]
    fn unknown_tool_section_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Scanbatch.toml");
        fs::write(&path, "[tools.acunetix]\nclean_exit_codes = [0]\n").unwrap();

        assert!(load_settings(&path).is_err());
    }
}
