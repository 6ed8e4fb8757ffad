//! Error types for the Meraki Dashboard session
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! Retryable conditions never surface directly: the retry policy absorbs
//! them and only reports one of the `*Exhausted` variants once it gives up.

use thiserror::Error;

/// The main error type for the Meraki Dashboard session
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Dashboard API key must be supplied via the api_key option or the {env_var} environment variable")]
    MissingApiKey { env_var: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Invalid value '{value}' for '{option}', expected one of: {allowed}")]
    InvalidOption {
        option: String,
        value: String,
        allowed: String,
    },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // API Errors (terminal outcomes of the retry policy)
    // ============================================================================
    #[error("{method} {path}: rate limited (429) after {attempts} attempt(s): {body}")]
    RateLimitExhausted {
        method: String,
        path: String,
        attempts: u32,
        body: String,
    },

    #[error("{method} {path}: HTTP {status}: {body}")]
    ClientError {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("{method} {path}: HTTP {status} persisted after {attempts} attempt(s): {body}")]
    ClientErrorExhausted {
        method: String,
        path: String,
        status: u16,
        attempts: u32,
        body: String,
    },

    #[error("{method} {path}: HTTP {status} persisted after {attempts} attempt(s): {body}")]
    ServerErrorExhausted {
        method: String,
        path: String,
        status: u16,
        attempts: u32,
        body: String,
    },

    #[error("{method} {path}: redirect not followed: {message}")]
    Redirect {
        method: String,
        path: String,
        message: String,
    },

    #[error("{method} {path}: transport failure after {attempts} attempt(s): {message}")]
    TransportExhausted {
        method: String,
        path: String,
        attempts: u32,
        message: String,
    },

    // ============================================================================
    // HTTP / Data Errors
    // ============================================================================
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid option error listing the accepted values
    pub fn invalid_option(option: impl Into<String>, value: impl Into<String>, allowed: &[&str]) -> Self {
        Self::InvalidOption {
            option: option.into(),
            value: value.into(),
            allowed: allowed.join(", "),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// HTTP status carried by an API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RateLimitExhausted { .. } => Some(429),
            Error::ClientError { status, .. }
            | Error::ClientErrorExhausted { status, .. }
            | Error::ServerErrorExhausted { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body carried by an API error, if any
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::RateLimitExhausted { body, .. }
            | Error::ClientError { body, .. }
            | Error::ClientErrorExhausted { body, .. }
            | Error::ServerErrorExhausted { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Number of attempts made before the error surfaced
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Error::RateLimitExhausted { attempts, .. }
            | Error::ClientErrorExhausted { attempts, .. }
            | Error::ServerErrorExhausted { attempts, .. }
            | Error::TransportExhausted { attempts, .. } => Some(*attempts),
            Error::ClientError { .. } => Some(1),
            _ => None,
        }
    }

    /// Check if this error came from exhausting the retry budget
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            Error::RateLimitExhausted { .. }
                | Error::ClientErrorExhausted { .. }
                | Error::ServerErrorExhausted { .. }
                | Error::TransportExhausted { .. }
        )
    }

    /// Check if the condition behind this error is transient
    ///
    /// Callers that wrap the session in their own outer retry loop can use
    /// this to decide whether trying again later makes sense.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimitExhausted { .. } | Error::TransportExhausted { .. } => true,
            Error::ServerErrorExhausted { .. } => true,
            _ => false,
        }
    }
}

/// Result type alias for the Meraki Dashboard session
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
