#![allow(dead_code)]

use std::time::Duration;

use scanbatch::config::{BatchConfig, ScanTool, Settings, RawSettings, LimitsSection};

/// Settings with a given concurrency cap and a fake executor path, for
/// tests that never spawn a real process.
pub fn settings_with_cap(concurrency: usize) -> Settings {
    let raw = RawSettings {
        limits: LimitsSection { concurrency },
        ..RawSettings::default()
    };
    Settings::try_from(raw).expect("test settings are valid")
}

/// Builder for `BatchConfig` to simplify test setup.
pub struct BatchConfigBuilder {
    tool: ScanTool,
    target_url: String,
    repetitions: u32,
    delay: Duration,
}

impl BatchConfigBuilder {
    pub fn new(tool: ScanTool) -> Self {
        Self {
            tool,
            target_url: "http://target.test".to_string(),
            repetitions: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn target(mut self, url: &str) -> Self {
        self.target_url = url.to_string();
        self
    }

    pub fn repetitions(mut self, n: u32) -> Self {
        self.repetitions = n;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn build(self) -> BatchConfig {
        BatchConfig::new(self.tool, self.target_url, self.repetitions).with_delay(self.delay)
    }
}
