//! Session configuration
//!
//! Every knob a session recognises lives in [`SessionConfig`]. A config is
//! immutable once handed to a session. Values can come from the builder,
//! from a YAML file, or (for the API key, caller and BE GEO id) from
//! environment variables.

use crate::error::{Error, Result, ResultExt};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the Dashboard API key
pub const API_KEY_ENVIRONMENT_VARIABLE: &str = "MERAKI_DASHBOARD_API_KEY";

/// Environment variable holding the caller identification string
pub const CALLER_ENVIRONMENT_VARIABLE: &str = "MERAKI_PYTHON_SDK_CALLER";

/// Environment variable holding the partner BE GEO id
pub const BE_GEO_ID_ENVIRONMENT_VARIABLE: &str = "BE_GEO_ID";

/// Default Dashboard API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.meraki.com/api/v1";

// ============================================================================
// Logging Config
// ============================================================================

/// Logging options for a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write a log file
    pub output_log: bool,
    /// Directory for the log file (current directory when unset)
    pub log_path: Option<PathBuf>,
    /// Prefix of the log file name
    pub log_file_prefix: String,
    /// Print log lines to the console
    pub print_console: bool,
    /// Install no log output at all
    pub suppress_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            output_log: true,
            log_path: None,
            log_file_prefix: "meraki_api_".to_string(),
            print_console: true,
            suppress_logging: false,
        }
    }
}

impl LoggingConfig {
    /// Config that installs nothing
    pub fn suppressed() -> Self {
        Self {
            suppress_logging: true,
            ..Self::default()
        }
    }
}

// ============================================================================
// Session Config
// ============================================================================

/// Configuration for a REST session
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Dashboard API key, sent as a bearer token
    pub api_key: Option<String>,
    /// Base URL all resource paths are appended to
    pub base_url: String,
    /// Timeout of one HTTP call (not of a whole retried/paged operation)
    #[serde(with = "duration_secs")]
    pub single_request_timeout: Duration,
    /// PEM file with an extra root certificate
    pub certificate_path: Option<PathBuf>,
    /// Proxy URL used for every scheme
    pub requests_proxy: Option<String>,
    /// Sleep and retry on 429 instead of failing
    pub wait_on_rate_limit: bool,
    /// Wait used for 429 responses without a Retry-After header
    #[serde(with = "duration_secs")]
    pub nginx_429_retry_wait_time: Duration,
    /// Wait used for action batch concurrency conflicts
    #[serde(with = "duration_secs")]
    pub action_batch_retry_wait_time: Duration,
    /// Wait used for concurrent network deletion conflicts
    #[serde(with = "duration_secs")]
    pub network_delete_retry_wait_time: Duration,
    /// Retry ordinary 4xx responses
    pub retry_4xx_error: bool,
    /// Wait between retried 4xx responses
    #[serde(with = "duration_secs")]
    pub retry_4xx_error_wait_time: Duration,
    /// Retries allowed after the first attempt
    pub maximum_retries: u32,
    /// Backoff for server errors and transport failures
    pub backoff_type: BackoffType,
    /// First backoff delay
    #[serde(with = "duration_secs")]
    pub initial_backoff: Duration,
    /// Upper bound on the backoff delay
    #[serde(with = "duration_secs")]
    pub max_backoff: Duration,
    /// Do not send POST/PUT/DELETE requests
    pub simulate: bool,
    /// In-flight request bound of an async session
    pub maximum_concurrent_requests: usize,
    /// Optional client-side token bucket (requests per second)
    pub requests_per_second: Option<u32>,
    /// Partner BE GEO id header
    pub be_geo_id: Option<String>,
    /// Caller identification appended to the User-Agent
    pub caller: Option<String>,
    /// Return paginated GETs as lazy item sequences
    pub use_iterator_for_get_pages: bool,
    /// Log output options
    pub logging: LoggingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            single_request_timeout: Duration::from_secs(60),
            certificate_path: None,
            requests_proxy: None,
            wait_on_rate_limit: true,
            nginx_429_retry_wait_time: Duration::from_secs(60),
            action_batch_retry_wait_time: Duration::from_secs(60),
            network_delete_retry_wait_time: Duration::from_secs(240),
            retry_4xx_error: false,
            retry_4xx_error_wait_time: Duration::from_secs(60),
            maximum_retries: 2,
            backoff_type: BackoffType::Exponential,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            simulate: false,
            maximum_concurrent_requests: 8,
            requests_per_second: None,
            be_geo_id: None,
            caller: None,
            use_iterator_for_get_pages: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("api_key", &self.api_key.as_ref().map(|key| redact(key)))
            .field("base_url", &self.base_url)
            .field("single_request_timeout", &self.single_request_timeout)
            .field("certificate_path", &self.certificate_path)
            .field("requests_proxy", &self.requests_proxy)
            .field("wait_on_rate_limit", &self.wait_on_rate_limit)
            .field("retry_4xx_error", &self.retry_4xx_error)
            .field("maximum_retries", &self.maximum_retries)
            .field("simulate", &self.simulate)
            .field("maximum_concurrent_requests", &self.maximum_concurrent_requests)
            .field("caller", &self.caller)
            .field("use_iterator_for_get_pages", &self.use_iterator_for_get_pages)
            .finish_non_exhaustive()
    }
}

/// Keep only the last four characters of a secret
fn redact(secret: &str) -> String {
    let tail: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{tail}")
}

impl SessionConfig {
    /// Create a new config builder
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Load a config from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a config from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading session config {}", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    /// Fill unset credentials from the process environment
    #[must_use]
    pub fn with_env_fallbacks(self) -> Self {
        self.with_env_fallbacks_from(|name| std::env::var(name).ok())
    }

    /// Fill unset credentials from a variable lookup
    #[must_use]
    pub fn with_env_fallbacks_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if self.api_key.as_deref().map_or(true, str::is_empty) {
            self.api_key = non_empty(API_KEY_ENVIRONMENT_VARIABLE);
        }
        if self.caller.is_none() {
            self.caller = non_empty(CALLER_ENVIRONMENT_VARIABLE);
        }
        if self.be_geo_id.is_none() {
            self.be_geo_id = non_empty(BE_GEO_ID_ENVIRONMENT_VARIABLE);
        }
        self
    }

    /// Check the config is usable, returning the API key
    pub fn validate(&self) -> Result<&str> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::MissingApiKey {
                env_var: API_KEY_ENVIRONMENT_VARIABLE.to_string(),
            })?;

        let base = url::Url::parse(&self.base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "base_url",
                format!("unsupported scheme '{}'", base.scheme()),
            ));
        }

        if self.single_request_timeout.is_zero() {
            return Err(Error::invalid_value(
                "single_request_timeout",
                "must be greater than zero",
            ));
        }

        if self.maximum_concurrent_requests == 0 {
            return Err(Error::invalid_value(
                "maximum_concurrent_requests",
                "must be at least 1",
            ));
        }

        if self.requests_per_second == Some(0) {
            return Err(Error::invalid_value(
                "requests_per_second",
                "must be at least 1",
            ));
        }

        if let Some(proxy) = &self.requests_proxy {
            url::Url::parse(proxy)
                .map_err(|e| Error::invalid_value("requests_proxy", e.to_string()))?;
        }

        Ok(api_key)
    }

    /// User-Agent header value identifying this crate and the caller
    pub fn user_agent(&self) -> String {
        let base = format!("{}/{}", crate::NAME, crate::VERSION);
        match self.caller.as_deref().map(str::trim) {
            Some(caller) if !caller.is_empty() => format!("{base} {caller}"),
            _ => base,
        }
    }
}

/// Builder for session config
#[derive(Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the single request timeout
    pub fn single_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.single_request_timeout = timeout;
        self
    }

    /// Trust an extra root certificate
    pub fn certificate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.certificate_path = Some(path.into());
        self
    }

    /// Route requests through a proxy
    pub fn requests_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.requests_proxy = Some(proxy.into());
        self
    }

    /// Enable or disable waiting on 429
    pub fn wait_on_rate_limit(mut self, enabled: bool) -> Self {
        self.config.wait_on_rate_limit = enabled;
        self
    }

    /// Set the fallback 429 wait
    pub fn nginx_429_retry_wait_time(mut self, wait: Duration) -> Self {
        self.config.nginx_429_retry_wait_time = wait;
        self
    }

    /// Set the action batch conflict wait
    pub fn action_batch_retry_wait_time(mut self, wait: Duration) -> Self {
        self.config.action_batch_retry_wait_time = wait;
        self
    }

    /// Set the network deletion conflict wait
    pub fn network_delete_retry_wait_time(mut self, wait: Duration) -> Self {
        self.config.network_delete_retry_wait_time = wait;
        self
    }

    /// Enable retrying ordinary 4xx responses
    pub fn retry_4xx_error(mut self, enabled: bool, wait: Duration) -> Self {
        self.config.retry_4xx_error = enabled;
        self.config.retry_4xx_error_wait_time = wait;
        self
    }

    /// Set max retries
    pub fn maximum_retries(mut self, retries: u32) -> Self {
        self.config.maximum_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Enable simulate mode
    pub fn simulate(mut self, enabled: bool) -> Self {
        self.config.simulate = enabled;
        self
    }

    /// Set the in-flight request bound
    pub fn maximum_concurrent_requests(mut self, max: usize) -> Self {
        self.config.maximum_concurrent_requests = max;
        self
    }

    /// Enable a client-side token bucket
    pub fn requests_per_second(mut self, rps: u32) -> Self {
        self.config.requests_per_second = Some(rps);
        self
    }

    /// Set the BE GEO id
    pub fn be_geo_id(mut self, id: impl Into<String>) -> Self {
        self.config.be_geo_id = Some(id.into());
        self
    }

    /// Set the caller identification
    pub fn caller(mut self, caller: impl Into<String>) -> Self {
        self.config.caller = Some(caller.into());
        self
    }

    /// Return paginated GETs as lazy sequences
    pub fn use_iterator_for_get_pages(mut self, enabled: bool) -> Self {
        self.config.use_iterator_for_get_pages = enabled;
        self
    }

    /// Set logging options
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Build the config
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

/// Serde helpers for durations written as (fractional) seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.single_request_timeout, Duration::from_secs(60));
        assert!(config.wait_on_rate_limit);
        assert!(!config.retry_4xx_error);
        assert_eq!(config.maximum_retries, 2);
        assert_eq!(config.maximum_concurrent_requests, 8);
        assert_eq!(config.network_delete_retry_wait_time, Duration::from_secs(240));
        assert!(!config.use_iterator_for_get_pages);
        assert!(config.requests_per_second.is_none());
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::builder()
            .api_key("abc123")
            .base_url("https://api.meraki.ca/api/v1")
            .maximum_retries(5)
            .retry_4xx_error(true, Duration::from_secs(3))
            .maximum_concurrent_requests(2)
            .caller("Inventory/1.0 Acme")
            .simulate(true)
            .build();

        assert_eq!(config.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.maximum_retries, 5);
        assert!(config.retry_4xx_error);
        assert_eq!(config.retry_4xx_error_wait_time, Duration::from_secs(3));
        assert_eq!(config.maximum_concurrent_requests, 2);
        assert!(config.simulate);
        assert_eq!(config.validate().unwrap(), "abc123");
    }

    #[test]
    fn test_validate_missing_api_key() {
        let err = SessionConfig::default().validate().unwrap_err();
        assert!(matches!(err, Error::MissingApiKey { .. }));

        let err = SessionConfig::builder().api_key("   ").build().validate().unwrap_err();
        assert!(matches!(err, Error::MissingApiKey { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = SessionConfig::builder()
            .api_key("k")
            .maximum_concurrent_requests(0)
            .build()
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "maximum_concurrent_requests"));

        let err = SessionConfig::builder()
            .api_key("k")
            .base_url("ftp://api.meraki.com")
            .build()
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "base_url"));

        let err = SessionConfig::builder()
            .api_key("k")
            .base_url("not a url")
            .build()
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_env_fallbacks() {
        let config = SessionConfig::default().with_env_fallbacks_from(env(&[
            (API_KEY_ENVIRONMENT_VARIABLE, "from-env"),
            (CALLER_ENVIRONMENT_VARIABLE, "Tool/2.0 Vendor"),
            (BE_GEO_ID_ENVIRONMENT_VARIABLE, "geo-1"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.caller.as_deref(), Some("Tool/2.0 Vendor"));
        assert_eq!(config.be_geo_id.as_deref(), Some("geo-1"));
    }

    #[test]
    fn test_explicit_values_win_over_env() {
        let config = SessionConfig::builder()
            .api_key("explicit")
            .build()
            .with_env_fallbacks_from(env(&[(API_KEY_ENVIRONMENT_VARIABLE, "from-env")]));
        assert_eq!(config.api_key.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_user_agent() {
        let config = SessionConfig::default();
        assert_eq!(config.user_agent(), format!("{}/{}", crate::NAME, crate::VERSION));

        let config = SessionConfig::builder().caller("Inventory/1.0 Acme").build();
        assert!(config.user_agent().ends_with(" Inventory/1.0 Acme"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = SessionConfig::builder().api_key("supersecret1234").build();
        let debug = format!("{config:?}");
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("****1234"));
    }

    #[test]
    fn test_from_yaml() {
        let config = SessionConfig::from_yaml_str(
            r#"
api_key: yaml-key
maximum_retries: 4
nginx_429_retry_wait_time: 0.5
use_iterator_for_get_pages: true
logging:
  output_log: false
"#,
        )
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("yaml-key"));
        assert_eq!(config.maximum_retries, 4);
        assert_eq!(config.nginx_429_retry_wait_time, Duration::from_millis(500));
        assert!(config.use_iterator_for_get_pages);
        assert!(!config.logging.output_log);
        assert!(config.logging.print_console);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meraki.yaml");
        std::fs::write(&path, "api_key: file-key\nsimulate: true\n").unwrap();

        let config = SessionConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("file-key"));
        assert!(config.simulate);

        assert!(SessionConfig::from_yaml_file(dir.path().join("missing.yaml")).is_err());
    }
}
