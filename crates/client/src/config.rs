//! Client configuration from the environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

const ENV_API_URL: &str = "ENCORE_API_URL";
const ENV_CREDENTIAL_FILE: &str = "ENCORE_CREDENTIAL_FILE";
const ENV_TIMEOUT: &str = "ENCORE_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the remote gateway, without a trailing `/`.
    pub api_url: String,
    /// File holding the persisted credential.
    pub credential_file: PathBuf,
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Reads `ENCORE_API_URL`, `ENCORE_CREDENTIAL_FILE` and
    /// `ENCORE_REQUEST_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config = config.with_api_url(url);
        }
        if let Some(path) = lookup(ENV_CREDENTIAL_FILE).filter(|v| !v.trim().is_empty()) {
            config = config.with_credential_file(path);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT} must be a whole number of seconds, got {raw:?}"))?;
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_credential_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential_file = path.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            credential_file: std::env::temp_dir().join("encore").join("credential"),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}
