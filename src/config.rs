use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::retry::DEFAULT_MAX_LOAD_RETRIES;

pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:8080";
pub const DEFAULT_STATE_FILE: &str = "noir-frame-state.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Base URL of the noir search service.
    pub api_endpoint: String,
    /// Per-request timeout for API calls and image fetches.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// JSON file holding persisted preferences and expression history.
    pub state_file: PathBuf,
    /// Where the visible image is written; when unset frames are only logged.
    pub output_path: Option<PathBuf>,
    /// Consecutive image-load retries before showing the error state.
    pub max_load_retries: u32,
    /// Maximum number of image fetches in flight at once.
    pub loader_max_concurrent_fetches: usize,
    /// Time zone for the clock overlay; local time when unset.
    pub clock_timezone: Option<Tz>,
    /// Optional deterministic seed for random navigation.
    pub random_seed: Option<u64>,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Configuration file if present, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_yaml_file(path)
                .with_context(|| format!("failed to load configuration from {}", path.display())),
            None => Ok(Self::default()),
        }
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        self.api_endpoint = self.api_endpoint.trim().trim_end_matches('/').to_string();
        ensure!(
            !self.api_endpoint.is_empty(),
            "api-endpoint must not be empty"
        );
        ensure!(
            self.api_endpoint.starts_with("http://") || self.api_endpoint.starts_with("https://"),
            "api-endpoint must be an http(s) URL"
        );
        ensure!(
            !self.request_timeout.is_zero(),
            "request-timeout must be greater than zero"
        );
        ensure!(
            self.loader_max_concurrent_fetches > 0,
            "loader-max-concurrent-fetches must be greater than zero"
        );
        ensure!(
            !self.state_file.as_os_str().is_empty(),
            "state-file must not be empty"
        );
        if let Some(output) = &self.output_path {
            ensure!(
                output.file_name().is_some(),
                "output-path must include a file name"
            );
        }
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(30),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            output_path: None,
            max_load_retries: DEFAULT_MAX_LOAD_RETRIES,
            loader_max_concurrent_fetches: 4,
            clock_timezone: None,
            random_seed: None,
        }
    }
}
