use crate::error::{GraphitiError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_INTERVAL_SECONDS: u64 = 30;
pub const DEFAULT_GROUP_ID: &str = "screengraph-vibe";
pub const DEFAULT_COOL_DOWN_MS: u64 = 120_000;

/// Retry, escalation and cool-down settings for one connectivity target.
///
/// `interval_seconds` is in seconds while `cool_down_ms_after_max` is in
/// milliseconds. Both are kept as configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub interval_seconds: u64,
    pub group_id: String,
    pub cool_down_ms_after_max: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_file_dir: Option<PathBuf>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            group_id: DEFAULT_GROUP_ID.to_string(),
            cool_down_ms_after_max: DEFAULT_COOL_DOWN_MS,
            ping_file_dir: None,
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(GraphitiError::Config(
                "maxAttempts must be at least 1".into(),
            ));
        }
        if self.interval_seconds == 0 {
            return Err(GraphitiError::Config(
                "intervalSeconds must be at least 1".into(),
            ));
        }
        if self.group_id.trim().is_empty() {
            return Err(GraphitiError::Config("groupId must not be empty".into()));
        }
        Ok(())
    }

    /// Directory the recovery marker goes to, `<cwd>/docs/.graphiti` unless overridden.
    pub fn resolved_ping_dir(&self) -> PathBuf {
        match &self.ping_file_dir {
            Some(dir) => dir.clone(),
            None => env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("docs")
                .join(".graphiti"),
        }
    }

    pub fn retry_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_seconds.saturating_mul(1000))
    }

    pub fn cool_down(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.cool_down_ms_after_max)
    }
}

pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_HEALTH_PATH: &str = "/healthcheck";

/// Where and how the HTTP probe reaches the Graphiti server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_health_path")]
    pub health_path: String,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}

fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.to_string()
}

impl ProbeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(GraphitiError::Config(format!(
                "Graphiti url must be http:// or https://, got: {}",
                self.url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(GraphitiError::Config("timeoutMs must be at least 1".into()));
        }
        Ok(())
    }
}

/// Everything the `graphiti` binary needs: retry policy plus an optional probe target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeConfig>,
}

impl MonitorConfig {
    /// Load from a JSON file, or fall back to defaults when it is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<MonitorConfig>(&content) {
                    Ok(config) => {
                        tracing::info!(
                            "Loaded graphiti config from {:?}: group_id={}, max_attempts={}",
                            path,
                            config.retry.group_id,
                            config.retry.max_attempts
                        );
                        return config;
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse {:?}: {}, using defaults", path, e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to read {:?}: {}, using defaults", path, e);
                }
            }
        }

        tracing::debug!("No graphiti config at {:?}, using defaults", path);
        MonitorConfig::default()
    }

    /// Apply `GRAPHITI_*` environment overrides on top of the loaded values.
    ///
    /// Optional: GRAPHITI_MAX_ATTEMPTS, GRAPHITI_INTERVAL_SECONDS, GRAPHITI_GROUP_ID,
    /// GRAPHITI_COOLDOWN_MS, GRAPHITI_PING_DIR, GRAPHITI_URL, GRAPHITI_API_KEY,
    /// GRAPHITI_TIMEOUT_MS
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_parse::<u32>("GRAPHITI_MAX_ATTEMPTS")? {
            self.retry.max_attempts = v;
        }
        if let Some(v) = env_parse::<u64>("GRAPHITI_INTERVAL_SECONDS")? {
            self.retry.interval_seconds = v;
        }
        if let Some(v) = env_nonempty("GRAPHITI_GROUP_ID") {
            self.retry.group_id = v;
        }
        if let Some(v) = env_parse::<u64>("GRAPHITI_COOLDOWN_MS")? {
            self.retry.cool_down_ms_after_max = v;
        }
        if let Some(v) = env_nonempty("GRAPHITI_PING_DIR") {
            self.retry.ping_file_dir = Some(PathBuf::from(v));
        }

        if let Some(url) = env_nonempty("GRAPHITI_URL") {
            self.set_probe_url(url);
        }
        if let Some(probe) = self.probe.as_mut() {
            if let Some(key) = env_nonempty("GRAPHITI_API_KEY") {
                probe.api_key = Some(key);
            }
            if let Some(ms) = env_parse::<u64>("GRAPHITI_TIMEOUT_MS")? {
                probe.timeout_ms = ms;
            }
        }
        Ok(())
    }

    /// Point the probe at `url`, creating a default probe if none is configured.
    pub fn set_probe_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        match self.probe.as_mut() {
            Some(probe) => probe.url = url,
            None => self.probe = Some(ProbeConfig::new(url)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.retry.validate()?;
        if let Some(probe) = &self.probe {
            probe.validate()?;
        }
        Ok(())
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env_nonempty(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| GraphitiError::Config(format!("Invalid {}: {}", key, raw))),
        None => Ok(None),
    }
}
