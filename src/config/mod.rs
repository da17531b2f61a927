//! Configuration loading for the larder harvester.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `LARDER_`, producing a typed [`AppConfig`]. Validation happens
//! synchronously at load time, before any I/O is attempted.

use std::{collections::BTreeMap, env, path::PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application configuration derived from `LARDER_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// Base URL of the upstream catalog API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Application key the upstream requires on every request.
    #[serde(default)]
    pub app_key: String,
    /// Session token for listing calls, when the upstream demands one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Store whose catalog is harvested.
    #[serde(default = "default_store_id")]
    pub store_id: i64,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub retry: RetryPolicyConfig,
}

/// Defaults for the fetch pipeline, overridable per run from the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Concurrent department listings in flight (stage A)
    #[serde(default = "default_dept_concurrency")]
    pub dept_concurrency: usize,
    /// Concurrent detail fetches in flight (stage B)
    #[serde(default = "default_detail_concurrency")]
    pub detail_concurrency: usize,
    #[serde(default)]
    pub resume: bool,
    /// Reserved incremental-filter date; not consumed by the pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<NaiveDate>,
    /// Fetch details but skip storage writes
    #[serde(default)]
    pub dry_run: bool,
    /// Which job statuses a resumed run rebuilds its department list from
    #[serde(default)]
    pub resume_scan: ResumeScan,
}

/// Which job statuses participate in department-list reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeScan {
    /// PENDING and IN_PROGRESS jobs only; completed departments stay done
    #[default]
    Active,
    /// Every status; re-confirms departments that already finished
    All,
}

/// Outbound request pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default)]
    pub mode: PacingMode,
    /// Minimum spacing between call starts in serialized mode
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,
}

/// How outbound calls are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    /// Stage-bounded concurrent pipeline
    #[default]
    Concurrent,
    /// At most one outbound call in flight, with fixed spacing between starts
    Serialized,
}

/// Retry policy for throttle-shaped upstream responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    /// Retries before the throttled response is handed back (default: 8)
    #[serde(default = "default_retry_max_retries")]
    pub max_retries: u32,
    /// Starting fallback delay in milliseconds (default: 500)
    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Ceiling for the fallback delay in milliseconds (default: 30000)
    #[serde(default = "default_retry_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Jitter ratio applied to every wait, in [0, 1] (default: 0.2)
    #[serde(default = "default_retry_jitter_ratio")]
    pub jitter_ratio: f64,
    /// Use the server's Retry-After hint when present (default: true)
    #[serde(default = "default_retry_respect_retry_after")]
    pub respect_retry_after: bool,
    /// Fallback delay growth factor, must be >= 1.0 (default: 2.0)
    #[serde(default = "default_retry_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Statuses treated as throttling. 400 is included because this upstream
    /// signals rate limiting with Bad Request rather than 429.
    #[serde(default = "default_retry_throttle_status_codes")]
    pub throttle_status_codes: Vec<u16>,
}

fn default_profile() -> String {
    "dev".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://larder.sqlite?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_api_base() -> String {
    "https://api.freshop.ncrcloud.com".to_string()
}

fn default_store_id() -> i64 {
    7442
}

fn default_dept_concurrency() -> usize {
    4
}

fn default_detail_concurrency() -> usize {
    8
}

fn default_min_spacing_ms() -> u64 {
    5000
}

fn default_retry_max_retries() -> u32 {
    8
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}

fn default_retry_jitter_ratio() -> f64 {
    0.2
}

fn default_retry_respect_retry_after() -> bool {
    true
}

fn default_retry_backoff_multiplier() -> f64 {
    2.0
}

fn default_retry_throttle_status_codes() -> Vec<u16> {
    vec![429, 400]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            api_base: default_api_base(),
            app_key: String::new(),
            api_token: None,
            store_id: default_store_id(),
            fetch: FetchConfig::default(),
            pacing: PacingConfig::default(),
            retry: RetryPolicyConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            dept_concurrency: default_dept_concurrency(),
            detail_concurrency: default_detail_concurrency(),
            resume: false,
            since: None,
            dry_run: false,
            resume_scan: ResumeScan::default(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            mode: PacingMode::default(),
            min_spacing_ms: default_min_spacing_ms(),
        }
    }
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_retries: default_retry_max_retries(),
            base_delay_ms: default_retry_base_delay_ms(),
            max_delay_ms: default_retry_max_delay_ms(),
            jitter_ratio: default_retry_jitter_ratio(),
            respect_retry_after: default_retry_respect_retry_after(),
            backoff_multiplier: default_retry_backoff_multiplier(),
            throttle_status_codes: default_retry_throttle_status_codes(),
        }
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("app key is missing; set LARDER_APP_KEY environment variable")]
    MissingAppKey,
    #[error("{field} must be greater than zero, got {value}")]
    InvalidConcurrency { field: &'static str, value: usize },
    #[error("retry base delay ({base}ms) cannot be greater than max delay ({max}ms)")]
    InvalidRetryBounds { base: u64, max: u64 },
    #[error("retry jitter ratio must be between 0.0 and 1.0, got {value}")]
    InvalidRetryJitter { value: f64 },
    #[error("retry backoff multiplier must be at least 1.0, got {value}")]
    InvalidBackoffMultiplier { value: f64 },
    #[error("retry throttle status code set must not be empty")]
    EmptyThrottleStatusCodes,
    #[error("pacing min spacing must be greater than zero in serialized mode")]
    InvalidPacingSpacing,
    #[error("unknown pacing mode '{value}'; expected 'concurrent' or 'serialized'")]
    InvalidPacingMode { value: String },
    #[error("unknown resume scan '{value}'; expected 'active' or 'all'")]
    InvalidResumeScan { value: String },
    #[error("invalid since date '{value}'; expected YYYY-MM-DD")]
    InvalidSinceDate { value: String },
}

impl RetryPolicyConfig {
    /// Validate retry policy bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvalidRetryBounds {
                base: self.base_delay_ms,
                max: self.max_delay_ms,
            });
        }
        if !(0.0..=1.0).contains(&self.jitter_ratio) {
            return Err(ConfigError::InvalidRetryJitter {
                value: self.jitter_ratio,
            });
        }
        if self.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoffMultiplier {
                value: self.backoff_multiplier,
            });
        }
        if self.throttle_status_codes.is_empty() {
            return Err(ConfigError::EmptyThrottleStatusCodes);
        }
        Ok(())
    }
}

impl AppConfig {
    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.dept_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency {
                field: "dept_concurrency",
                value: self.fetch.dept_concurrency,
            });
        }
        if self.fetch.detail_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency {
                field: "detail_concurrency",
                value: self.fetch.detail_concurrency,
            });
        }
        if self.pacing.mode == PacingMode::Serialized && self.pacing.min_spacing_ms == 0 {
            return Err(ConfigError::InvalidPacingSpacing);
        }
        self.retry.validate()
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if !config.app_key.is_empty() {
            config.app_key = "[REDACTED]".to_string();
        }
        if config.api_token.is_some() {
            config.api_token = Some("[REDACTED]".to_string());
        }
        serde_json::to_string(&config)
    }
}

/// Loads configuration using layered `.env` files and `LARDER_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads and validates the configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("LARDER_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections = layered
            .remove("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = layered
            .remove("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);

        let api_base = layered
            .remove("API_BASE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_base);
        let app_key = layered.remove("APP_KEY").unwrap_or_default();
        if app_key.trim().is_empty() {
            return Err(ConfigError::MissingAppKey);
        }
        let api_token = layered.remove("API_TOKEN").filter(|v| !v.is_empty());
        let store_id = layered
            .remove("STORE_ID")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_store_id);

        let dept_concurrency = layered
            .remove("DEPT_CONCURRENCY")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_dept_concurrency);
        let detail_concurrency = layered
            .remove("DETAIL_CONCURRENCY")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_detail_concurrency);
        let resume = layered
            .remove("RESUME")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);
        let dry_run = layered
            .remove("DRY_RUN")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);
        let since = match layered.remove("SINCE").filter(|v| !v.is_empty()) {
            Some(raw) => Some(
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|_| ConfigError::InvalidSinceDate { value: raw })?,
            ),
            None => None,
        };
        let resume_scan = match layered.remove("RESUME_SCAN").filter(|v| !v.is_empty()) {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "active" => ResumeScan::Active,
                "all" => ResumeScan::All,
                _ => return Err(ConfigError::InvalidResumeScan { value: raw }),
            },
            None => ResumeScan::default(),
        };

        let pacing_mode = match layered.remove("PACING_MODE").filter(|v| !v.is_empty()) {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "concurrent" => PacingMode::Concurrent,
                "serialized" => PacingMode::Serialized,
                _ => return Err(ConfigError::InvalidPacingMode { value: raw }),
            },
            None => PacingMode::default(),
        };
        let min_spacing_ms = layered
            .remove("PACING_MIN_SPACING_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_min_spacing_ms);

        let retry_max_retries = layered
            .remove("RETRY_MAX_RETRIES")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_retry_max_retries);
        let retry_base_delay_ms = layered
            .remove("RETRY_BASE_DELAY_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_retry_base_delay_ms);
        let retry_max_delay_ms = layered
            .remove("RETRY_MAX_DELAY_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_retry_max_delay_ms);
        let retry_jitter_ratio = layered
            .remove("RETRY_JITTER_RATIO")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_retry_jitter_ratio);
        let retry_respect_retry_after = layered
            .remove("RETRY_RESPECT_RETRY_AFTER")
            .map(|v| parse_bool(&v))
            .unwrap_or_else(default_retry_respect_retry_after);
        let retry_backoff_multiplier = layered
            .remove("RETRY_BACKOFF_MULTIPLIER")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_retry_backoff_multiplier);
        let retry_throttle_status_codes = layered
            .remove("RETRY_THROTTLE_STATUS_CODES")
            .map(|codes| {
                codes
                    .split(',')
                    .filter_map(|s| s.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_else(default_retry_throttle_status_codes);

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            api_base,
            app_key,
            api_token,
            store_id,
            fetch: FetchConfig {
                dept_concurrency,
                detail_concurrency,
                resume,
                since,
                dry_run,
                resume_scan,
            },
            pacing: PacingConfig {
                mode: pacing_mode,
                min_spacing_ms,
            },
            retry: RetryPolicyConfig {
                max_retries: retry_max_retries,
                base_delay_ms: retry_base_delay_ms,
                max_delay_ms: retry_max_delay_ms,
                jitter_ratio: retry_jitter_ratio,
                respect_retry_after: retry_respect_retry_after,
                backoff_multiplier: retry_backoff_multiplier,
                throttle_status_codes: retry_throttle_status_codes,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("LARDER_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("LARDER_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
