// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Every section is optional and falls back to the documented defaults.
//! Any invalid field results in a HardValidationError that prevents startup.
//! `REDIS_URL` and `CONFIRM_TOKEN_TTL_SECONDS` override the file when set.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{GateError, GateResult, HardValidationError};

/// Environment variable overriding `store.url`.
pub const ENV_REDIS_URL: &str = "REDIS_URL";
/// Environment variable overriding `proposals.confirm_token_ttl_seconds`.
pub const ENV_CONFIRM_TOKEN_TTL: &str = "CONFIRM_TOKEN_TTL_SECONDS";

const MAX_TIMEOUT_MS: u64 = 600_000;
const MAX_CACHE_TTL_SECONDS: u64 = 7 * 24 * 3600;
const MIN_CONFIRM_TTL_SECONDS: u64 = 10;
const MAX_CONFIRM_TTL_SECONDS: u64 = 3600;

/// Raw store section as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStoreConfig {
    #[serde(default = "default_store_url")]
    url: String,
    #[serde(default = "default_key_prefix")]
    key_prefix: String,
    #[serde(default = "default_op_timeout_ms")]
    op_timeout_ms: u64,
}

fn default_store_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_key_prefix() -> String {
    "mcp".to_string()
}

fn default_op_timeout_ms() -> u64 {
    5000
}

impl Default for RawStoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            key_prefix: default_key_prefix(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

/// Raw cache section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCacheConfig {
    #[serde(default = "default_identity_ttl")]
    identity_ttl_seconds: u64,
    #[serde(default = "default_schema_ttl")]
    schema_ttl_seconds: u64,
    #[serde(default = "default_table_list_ttl")]
    table_list_ttl_seconds: u64,
    #[serde(default = "default_fetch_timeout_ms")]
    fetch_timeout_ms: u64,
}

fn default_identity_ttl() -> u64 {
    86_400 // 24 hours
}

fn default_schema_ttl() -> u64 {
    3600 // 1 hour
}

fn default_table_list_ttl() -> u64 {
    86_400 // 24 hours
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

impl Default for RawCacheConfig {
    fn default() -> Self {
        Self {
            identity_ttl_seconds: default_identity_ttl(),
            schema_ttl_seconds: default_schema_ttl(),
            table_list_ttl_seconds: default_table_list_ttl(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

/// Raw proposals section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProposalConfig {
    #[serde(default = "default_confirm_ttl")]
    confirm_token_ttl_seconds: u64,
}

fn default_confirm_ttl() -> u64 {
    120
}

impl Default for RawProposalConfig {
    fn default() -> Self {
        Self {
            confirm_token_ttl_seconds: default_confirm_ttl(),
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    store: RawStoreConfig,
    #[serde(default)]
    cache: RawCacheConfig,
    #[serde(default)]
    proposals: RawProposalConfig,
}

/// Which backend a validated store URL selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// Validated store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub backend: StoreBackend,
    pub key_prefix: String,
    pub op_timeout: Duration,
}

/// Validated cache configuration. A zero TTL disables caching for that namespace.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub identity_ttl: Duration,
    pub schema_ttl: Duration,
    pub table_list_ttl: Duration,
    pub fetch_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let raw = RawCacheConfig::default();
        Self {
            identity_ttl: Duration::from_secs(raw.identity_ttl_seconds),
            schema_ttl: Duration::from_secs(raw.schema_ttl_seconds),
            table_list_ttl: Duration::from_secs(raw.table_list_ttl_seconds),
            fetch_timeout: Duration::from_millis(raw.fetch_timeout_ms),
        }
    }
}

/// Validated proposal configuration.
#[derive(Debug, Clone)]
pub struct ProposalConfig {
    pub confirm_token_ttl: Duration,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            confirm_token_ttl: Duration::from_secs(default_confirm_ttl()),
        }
    }
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub proposals: ProposalConfig,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file, applying process
    /// environment overrides.
    pub fn load_file(path: impl AsRef<Path>) -> GateResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(GateError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| GateError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string_with_env(&content, |key| std::env::var(key).ok())
    }

    /// Load and validate configuration from a YAML string, without overrides.
    pub fn load_string(content: &str) -> GateResult<Config> {
        Self::load_string_with_env(content, |_| None)
    }

    /// Load from a YAML string, resolving overrides through `env`.
    pub fn load_string_with_env(
        content: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> GateResult<Config> {
        let mut raw: RawConfig = if content.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| GateError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?
        };

        Self::apply_overrides(&mut raw, env)?;
        Self::validate(raw)
    }

    /// Defaults only, with process environment overrides.
    pub fn from_env() -> GateResult<Config> {
        Self::load_string_with_env("", |key| std::env::var(key).ok())
    }

    fn apply_overrides(
        raw: &mut RawConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), HardValidationError> {
        if let Some(url) = env(ENV_REDIS_URL) {
            if !url.trim().is_empty() {
                raw.store.url = url.trim().to_string();
            }
        }

        if let Some(ttl) = env(ENV_CONFIRM_TOKEN_TTL) {
            raw.proposals.confirm_token_ttl_seconds =
                ttl.trim()
                    .parse()
                    .map_err(|_| HardValidationError::InvalidFieldValue {
                        field: "confirm_token_ttl_seconds",
                        value: ttl.clone(),
                        reason: format!("{} must be a whole number of seconds", ENV_CONFIRM_TOKEN_TTL),
                    })?;
        }

        Ok(())
    }

    /// Validate raw configuration and convert to validated types.
    fn validate(raw: RawConfig) -> GateResult<Config> {
        Ok(Config {
            store: Self::validate_store(raw.store)?,
            cache: Self::validate_cache(raw.cache)?,
            proposals: Self::validate_proposals(raw.proposals)?,
        })
    }

    fn validate_store(raw: RawStoreConfig) -> GateResult<StoreConfig> {
        if raw.url.is_empty() {
            return Err(HardValidationError::MissingRequiredField {
                field: "url",
                context: "store section".to_string(),
            }
            .into());
        }

        let backend = if raw.url.starts_with("redis://")
            || raw.url.starts_with("rediss://")
            || raw.url.starts_with("redis+unix://")
        {
            StoreBackend::Redis
        } else if raw.url.starts_with("memory://") {
            StoreBackend::Memory
        } else {
            return Err(HardValidationError::UnsupportedStoreUrl { url: raw.url }.into());
        };

        if raw.key_prefix.is_empty()
            || raw.key_prefix.len() > 64
            || !raw
                .key_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(HardValidationError::InvalidFieldValue {
                field: "key_prefix",
                value: raw.key_prefix,
                reason: "Must be 1-64 ASCII letters, digits, hyphens or underscores".to_string(),
            }
            .into());
        }

        let op_timeout = Self::validate_timeout("op_timeout_ms", raw.op_timeout_ms)?;

        Ok(StoreConfig {
            url: raw.url,
            backend,
            key_prefix: raw.key_prefix,
            op_timeout,
        })
    }

    fn validate_cache(raw: RawCacheConfig) -> GateResult<CacheConfig> {
        let identity_ttl =
            Self::validate_ttl("identity_ttl_seconds", raw.identity_ttl_seconds, 1)?;
        // Schema caching may be switched off entirely with 0.
        let schema_ttl = Self::validate_ttl("schema_ttl_seconds", raw.schema_ttl_seconds, 0)?;
        let table_list_ttl =
            Self::validate_ttl("table_list_ttl_seconds", raw.table_list_ttl_seconds, 1)?;
        let fetch_timeout = Self::validate_timeout("fetch_timeout_ms", raw.fetch_timeout_ms)?;

        Ok(CacheConfig {
            identity_ttl,
            schema_ttl,
            table_list_ttl,
            fetch_timeout,
        })
    }

    fn validate_proposals(raw: RawProposalConfig) -> GateResult<ProposalConfig> {
        let ttl = raw.confirm_token_ttl_seconds;
        if !(MIN_CONFIRM_TTL_SECONDS..=MAX_CONFIRM_TTL_SECONDS).contains(&ttl) {
            return Err(HardValidationError::InvalidFieldValue {
                field: "confirm_token_ttl_seconds",
                value: ttl.to_string(),
                reason: format!(
                    "Must be between {} and {} seconds",
                    MIN_CONFIRM_TTL_SECONDS, MAX_CONFIRM_TTL_SECONDS
                ),
            }
            .into());
        }

        Ok(ProposalConfig {
            confirm_token_ttl: Duration::from_secs(ttl),
        })
    }

    fn validate_ttl(field: &'static str, seconds: u64, min: u64) -> GateResult<Duration> {
        if !(min..=MAX_CACHE_TTL_SECONDS).contains(&seconds) {
            return Err(HardValidationError::InvalidFieldValue {
                field,
                value: seconds.to_string(),
                reason: format!("Must be between {} and {} seconds", min, MAX_CACHE_TTL_SECONDS),
            }
            .into());
        }
        Ok(Duration::from_secs(seconds))
    }

    fn validate_timeout(field: &'static str, ms: u64) -> GateResult<Duration> {
        if ms == 0 || ms > MAX_TIMEOUT_MS {
            return Err(HardValidationError::InvalidFieldValue {
                field,
                value: ms.to_string(),
                reason: format!("Must be between 1 and {}ms", MAX_TIMEOUT_MS),
            }
            .into());
        }
        Ok(Duration::from_millis(ms))
    }
}
