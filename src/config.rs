//! Configuration Module
//!
//! Loads function configuration from environment variables once per
//! execution environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::api::CorsPolicy;
use crate::error::ConfigError;
use crate::storage::{ObjectLocation, RetryPolicy};

/// Bucket name used when serving a local file instead of S3.
const LOCAL_BUCKET: &str = "local";

/// How the binary receives requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Invoked by the Lambda runtime API
    Lambda,
    /// Standalone HTTP server for development
    Local,
}

impl RunMode {
    /// Lambda when the runtime API endpoint is advertised.
    pub fn detect() -> Self {
        Self::from_runtime_api(env::var("AWS_LAMBDA_RUNTIME_API").ok())
    }

    fn from_runtime_api(value: Option<String>) -> Self {
        match value {
            Some(api) if !api.is_empty() => RunMode::Lambda,
            _ => RunMode::Local,
        }
    }
}

/// Function configuration.
///
/// Unparseable numbers fall back to their defaults; missing required values
/// and zero budgets are rejected.
#[derive(Debug, Clone)]
pub struct Config {
    pub bucket: String,
    pub key: String,
    pub stage: String,
    /// Overall per-request budget
    pub function_timeout: Duration,
    /// Validity window of the cached document
    pub cache_max_age: Duration,
    pub fetch_max_attempts: u32,
    /// Base delay of the exponential fetch backoff
    pub fetch_backoff: Duration,
    /// Limit on each storage call; must stay below `function_timeout`
    pub fetch_attempt_timeout: Duration,
    /// `max-age` advertised to clients on successful reads
    pub response_max_age: u64,
    pub cors_allow_origin: String,
    /// Custom S3 endpoint (LocalStack, MinIO)
    pub s3_endpoint_url: Option<String>,
    /// Serve this file instead of reading S3
    pub local_data_file: Option<PathBuf>,
    pub server_port: u16,
    pub run_mode: RunMode,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `S3_BUCKET_NAME` - Bucket holding the document (required unless `LOCAL_DATA_FILE` is set)
    /// - `S3_DATA_KEY` - Object key (default: data.json)
    /// - `STAGE` - Deployment stage (default: dev)
    /// - `FUNCTION_TIMEOUT_MS` - Per-request budget (default: 10000)
    /// - `CACHE_MAX_AGE_SECS` - Cache validity window (default: 60)
    /// - `FETCH_MAX_ATTEMPTS` - Storage attempts per refresh (default: 3)
    /// - `FETCH_BACKOFF_MS` - Base retry delay (default: 100)
    /// - `FETCH_ATTEMPT_TIMEOUT_MS` - Limit per storage call (default: 2000)
    /// - `RESPONSE_MAX_AGE` - Client `Cache-Control` max-age (default: 3600)
    /// - `CORS_ALLOW_ORIGIN` - Allowed origin (default: *)
    /// - `S3_ENDPOINT_URL` - Optional endpoint override
    /// - `LOCAL_DATA_FILE` - Optional local document
    /// - `SERVER_PORT` - Local server port (default: 3000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|name| env::var(name).ok())?;
        config.run_mode = RunMode::detect();
        Ok(config)
    }

    /// Builds a Config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let number = |name: &str, default| parse_or(text(name), default);

        let local_data_file = text("LOCAL_DATA_FILE").map(PathBuf::from);
        let bucket = match (text("S3_BUCKET_NAME"), &local_data_file) {
            (Some(bucket), _) => bucket,
            (None, Some(_)) => LOCAL_BUCKET.to_string(),
            (None, None) => return Err(ConfigError::Missing("S3_BUCKET_NAME")),
        };

        let config = Self {
            bucket,
            key: text("S3_DATA_KEY").unwrap_or(defaults.key),
            stage: text("STAGE").unwrap_or(defaults.stage),
            function_timeout: Duration::from_millis(number(
                "FUNCTION_TIMEOUT_MS",
                defaults.function_timeout.as_millis() as u64,
            )),
            cache_max_age: Duration::from_secs(number(
                "CACHE_MAX_AGE_SECS",
                defaults.cache_max_age.as_secs(),
            )),
            fetch_max_attempts: parse_or(
                text("FETCH_MAX_ATTEMPTS"),
                defaults.fetch_max_attempts,
            ),
            fetch_backoff: Duration::from_millis(number(
                "FETCH_BACKOFF_MS",
                defaults.fetch_backoff.as_millis() as u64,
            )),
            fetch_attempt_timeout: Duration::from_millis(number(
                "FETCH_ATTEMPT_TIMEOUT_MS",
                defaults.fetch_attempt_timeout.as_millis() as u64,
            )),
            response_max_age: number("RESPONSE_MAX_AGE", defaults.response_max_age),
            cors_allow_origin: text("CORS_ALLOW_ORIGIN").unwrap_or(defaults.cors_allow_origin),
            s3_endpoint_url: text("S3_ENDPOINT_URL"),
            local_data_file,
            server_port: parse_or(text("SERVER_PORT"), defaults.server_port),
            run_mode: defaults.run_mode,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.function_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "FUNCTION_TIMEOUT_MS",
                reason: "must be greater than zero".into(),
            });
        }
        if self.fetch_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "FETCH_MAX_ATTEMPTS",
                reason: "must be at least 1".into(),
            });
        }
        if self.fetch_attempt_timeout.is_zero()
            || self.fetch_attempt_timeout >= self.function_timeout
        {
            return Err(ConfigError::Invalid {
                name: "FETCH_ATTEMPT_TIMEOUT_MS",
                reason: format!(
                    "must be between 1 and {}ms (FUNCTION_TIMEOUT_MS)",
                    self.function_timeout.as_millis().saturating_sub(1)
                ),
            });
        }
        self.cors().map(|_| ())
    }

    pub fn location(&self) -> ObjectLocation {
        ObjectLocation::new(&self.bucket, &self.key)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.fetch_max_attempts,
            base_delay: self.fetch_backoff,
            attempt_timeout: self.fetch_attempt_timeout,
            ..RetryPolicy::default()
        }
    }

    pub fn cors(&self) -> Result<CorsPolicy, ConfigError> {
        CorsPolicy::new(&self.cors_allow_origin)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: LOCAL_BUCKET.to_string(),
            key: "data.json".to_string(),
            stage: "dev".to_string(),
            function_timeout: Duration::from_millis(10_000),
            cache_max_age: Duration::from_secs(60),
            fetch_max_attempts: 3,
            fetch_backoff: Duration::from_millis(100),
            fetch_attempt_timeout: Duration::from_millis(2000),
            response_max_age: 3600,
            cors_allow_origin: "*".to_string(),
            s3_endpoint_url: None,
            local_data_file: None,
            server_port: 3000,
            run_mode: RunMode::Local,
        }
    }
}
