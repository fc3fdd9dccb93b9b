//! Runtime configuration, loaded from the environment at startup.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory for the key file and quota database | `./data` |
//! | `JWT_SECRET` | HS256 secret for bearer token verification | required |
//! | `INFERENCE_FREE_TIER_DAILY_LIMIT` | Daily ceiling, free tier | `10` |
//! | `INFERENCE_ELEVATED_TIER_DAILY_LIMIT` | Daily ceiling, elevated tier | `5000` |
//! | `ELEVATED_PRINCIPALS` | Comma-separated elevated principal ids | empty |
//! | `GEMINI_API_KEY` | Google Gemini credential | optional |
//! | `OPENAI_API_KEY` | OpenAI credential | optional |
//! | `ANTHROPIC_API_KEY` | Anthropic credential | optional |
//! | `PROVIDER_TIMEOUT_SECS` | Outbound LLM call timeout | `30` |
//! | `KEY_ROTATION_DAYS` | Server identity rotation period | `30` |
//!
//! At least one provider API key must be set; selection prefers Gemini,
//! then OpenAI, then Anthropic.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Error loading configuration from the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but does not parse.
    #[error("invalid value for environment variable {0}")]
    Invalid(&'static str),
}

/// Typed runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the identity key file and the quota database.
    pub data_dir: PathBuf,
    /// HS256 secret for verifying bearer tokens.
    pub jwt_secret: String,
    /// Daily request ceiling for the free tier.
    pub free_daily_limit: u64,
    /// Daily request ceiling for the elevated tier.
    pub elevated_daily_limit: u64,
    /// Principals on the elevated tier.
    pub elevated_principals: HashSet<String>,
    /// Google Gemini API key.
    pub gemini_api_key: Option<String>,
    /// OpenAI API key.
    pub openai_api_key: Option<String>,
    /// Anthropic API key.
    pub anthropic_api_key: Option<String>,
    /// Timeout for one outbound provider call.
    pub provider_timeout: Duration,
    /// Server identity rotation period in days.
    pub key_rotation_days: i64,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `JWT_SECRET` is absent or a numeric
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            data_dir: PathBuf::from(var_or("DATA_DIR", "./data")),
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            free_daily_limit: parse_or("INFERENCE_FREE_TIER_DAILY_LIMIT", 10)?,
            elevated_daily_limit: parse_or("INFERENCE_ELEVATED_TIER_DAILY_LIMIT", 5_000)?,
            elevated_principals: var_optional("ELEVATED_PRINCIPALS")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            gemini_api_key: var_optional("GEMINI_API_KEY"),
            openai_api_key: var_optional("OPENAI_API_KEY"),
            anthropic_api_key: var_optional("ANTHROPIC_API_KEY"),
            provider_timeout: Duration::from_secs(parse_or("PROVIDER_TIMEOUT_SECS", 30)?),
            key_rotation_days: parse_or("KEY_ROTATION_DAYS", 30)?,
        })
    }

    /// Path of the persisted identity key file.
    pub fn key_path(&self) -> PathBuf {
        self.data_dir.join("inference_key.bin")
    }

    /// Path of the quota ledger database.
    pub fn quota_path(&self) -> PathBuf {
        self.data_dir.join("quota.redb")
    }
}

fn var_optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn var_or(name: &'static str, default: &str) -> String {
    var_optional(name).unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match var_optional(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}
