use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

pub const DEFAULT_BASE_URL: &str = "https://leoconnect.rexosphere.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Values substituted when a chained upstream probe yields nothing usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Fallbacks {
    pub post_id: String,
    pub district: String,
    pub id_token: String,
}

impl Default for Fallbacks {
    fn default() -> Self {
        Self {
            post_id: "test-post-123".to_string(),
            district: "test-district".to_string(),
            id_token: "mock_token_12345".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Exit non-zero when any outcome failed.
    pub fail_on_error: bool,
    /// How many districts the detailed suite follows into the clubs probe.
    pub district_sample: usize,
    pub fallbacks: Fallbacks,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            fail_on_error: false,
            district_sample: 1,
            fallbacks: Fallbacks::default(),
        }
    }
}

impl Config {
    /// Load a config file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Defaults, then the `--config` file, then flags and env.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(cli);
        Ok(config)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(base_url) = &cli.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(secs) = cli.timeout {
            self.timeout_secs = secs;
        }
        if cli.strict {
            self.fail_on_error = true;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
