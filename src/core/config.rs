use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use log::{debug, warn};

use crate::core::error::{IssuanceError, IssuanceResult};

pub const DEFAULT_BASE_URL: &str = "https://api.zerossl.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const API_KEY_VAR: &str = "API_KEY";
pub const BASE_URL_VAR: &str = "ZEROSSL_API_URL";
pub const TIMEOUT_VAR: &str = "ZEROSSL_HTTP_TIMEOUT_SECS";
pub const DOTENV_FILE: &str = ".env";

/// Connection settings for the ZeroSSL API.
#[derive(Clone)]
pub struct IssuerConfig {
    pub api_key: String,
    /// Base URL without a trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for IssuerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl IssuerConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Loads settings from the process environment, with `.env` in the working
    /// directory as a fallback. A missing `API_KEY` is fatal.
    pub fn from_env() -> IssuanceResult<Self> {
        Self::from_env_file(Path::new(DOTENV_FILE))
    }

    /// Like [`IssuerConfig::from_env`] with an explicit dotenv path. Variables set in
    /// the process environment take precedence over the file.
    pub fn from_env_file(path: &Path) -> IssuanceResult<Self> {
        Self::from_layers(|key| std::env::var(key).ok(), path)
    }

    fn from_layers(
        env: impl Fn(&str) -> Option<String>,
        dotenv_path: &Path,
    ) -> IssuanceResult<Self> {
        let file = read_dotenv(dotenv_path);
        Self::from_lookup(|key| env(key).or_else(|| file.get(key).cloned()))
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> IssuanceResult<Self> {
        let api_key = lookup(API_KEY_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                IssuanceError::Config(format!("{API_KEY_VAR} environment variable is not set"))
            })?;
        let base_url = lookup(BASE_URL_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self::new(api_key, base_url).with_timeout(resolve_timeout(lookup(TIMEOUT_VAR))))
    }
}

/// Reads `KEY=value` pairs from a dotenv file. A missing file yields nothing and
/// a malformed one is skipped with a warning.
fn read_dotenv(path: &Path) -> HashMap<String, String> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(err) if err.not_found() => return HashMap::new(),
        Err(err) => {
            warn!("[config] ignoring {}: {err}", path.display());
            return HashMap::new();
        }
    };
    match entries.collect::<Result<HashMap<_, _>, _>>() {
        Ok(vars) => {
            debug!("[config] loaded {} variables from {}", vars.len(), path.display());
            vars
        }
        Err(err) => {
            warn!("[config] ignoring {}: {err}", path.display());
            HashMap::new()
        }
    }
}

fn resolve_timeout(raw: Option<String>) -> Duration {
    let Some(raw) = raw else {
        return Duration::from_secs(DEFAULT_TIMEOUT_SECS);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => {
            warn!("[config] invalid {TIMEOUT_VAR} value '{raw}'; using default");
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        }
        Ok(secs) => Duration::from_secs(secs),
    }
}
