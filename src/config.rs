use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::usage::DEFAULT_USAGE_FILE;

/// Free-tier daily limit of the Custom Search JSON API.
pub const DEFAULT_DAILY_QUOTA: u32 = 100;
pub const DEFAULT_CALL_DELAY: Duration = Duration::from_millis(500);

const API_KEY_VARS: &[&str] = &["INDEXCHECK_API_KEY", "GOOGLE_API_KEY"];
const ENGINE_ID_VARS: &[&str] = &["INDEXCHECK_CX", "GOOGLE_CSE_ID"];
const QUOTA_VAR: &str = "INDEXCHECK_DAILY_QUOTA";
const DELAY_VAR: &str = "INDEXCHECK_DELAY_MS";
const USAGE_FILE_VAR: &str = "INDEXCHECK_USAGE_FILE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API key not set. Export INDEXCHECK_API_KEY (or GOOGLE_API_KEY)")]
    MissingApiKey,

    #[error("search engine id not set. Export INDEXCHECK_CX (or GOOGLE_CSE_ID)")]
    MissingSearchEngineId,

    #[error("invalid value for {var}: '{value}' (expected {expected})")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Static credentials for the search provider.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: ApiKey,
    pub search_engine_id: String,
}

/// Runtime configuration.
///
/// Environment variables:
/// - `INDEXCHECK_API_KEY` / `GOOGLE_API_KEY`: Custom Search API key
/// - `INDEXCHECK_CX` / `GOOGLE_CSE_ID`: programmable search engine id
/// - `INDEXCHECK_DAILY_QUOTA`: calls allowed per calendar day (default 100)
/// - `INDEXCHECK_DELAY_MS`: pause between calls (default 500)
/// - `INDEXCHECK_USAGE_FILE`: usage counter path (default `api_usage.json`)
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<ApiKey>,
    pub search_engine_id: Option<String>,
    pub daily_quota: u32,
    pub call_delay: Duration,
    pub usage_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            search_engine_id: None,
            daily_quota: DEFAULT_DAILY_QUOTA,
            call_delay: DEFAULT_CALL_DELAY,
            usage_path: PathBuf::from(DEFAULT_USAGE_FILE),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    pub(crate) fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let first_of = |names: &[&str]| names.iter().find_map(|&n| var(n));

        let default = Self::default();
        let daily_quota = match var(QUOTA_VAR) {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                var: QUOTA_VAR,
                value: v,
                expected: "a non-negative integer",
            })?,
            None => default.daily_quota,
        };
        let call_delay = match var(DELAY_VAR) {
            Some(v) => v
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidValue {
                    var: DELAY_VAR,
                    value: v,
                    expected: "milliseconds",
                })?,
            None => default.call_delay,
        };

        Ok(Self {
            api_key: first_of(API_KEY_VARS).map(ApiKey::new),
            search_engine_id: first_of(ENGINE_ID_VARS),
            daily_quota,
            call_delay,
            usage_path: var(USAGE_FILE_VAR)
                .map(PathBuf::from)
                .unwrap_or(default.usage_path),
        })
    }

    /// Credentials needed by commands that call the search API.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let api_key = self.api_key.clone().ok_or(ConfigError::MissingApiKey)?;
        let search_engine_id = self
            .search_engine_id
            .clone()
            .ok_or(ConfigError::MissingSearchEngineId)?;
        Ok(Credentials {
            api_key,
            search_engine_id,
        })
    }
}
