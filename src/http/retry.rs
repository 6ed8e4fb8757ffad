//! Retry and backoff policy
//!
//! The policy is pure: given the classified outcome of one attempt it says
//! whether to accept the response, wait and try again, or give up with a
//! typed error. The async and blocking sessions each run their own loop
//! around [`RetryPolicy::decide`] and differ only in how they sleep.
//!
//! | Outcome                              | Retried when                 | Wait                              |
//! |--------------------------------------|------------------------------|-----------------------------------|
//! | 429                                  | `wait_on_rate_limit`         | `Retry-After`, else nginx default |
//! | action batch concurrency conflict    | always                       | `action_batch_retry_wait_time`    |
//! | concurrent network deletion conflict | always                       | `network_delete_retry_wait_time`  |
//! | other 4xx                            | `retry_4xx_error`            | `retry_4xx_error_wait_time`       |
//! | 5xx, transport failure               | always                       | backoff                           |
//!
//! Every retry consumes one unit of `maximum_retries`, so a request makes at
//! most `maximum_retries + 1` attempts. A 3xx is not an attempt: the session
//! re-sends the same request to `Location`, up to [`MAX_REDIRECTS`] hops.

use super::transport::{HttpResponse, Outcome};
use crate::config::SessionConfig;
use crate::error::Error;
use crate::http::RequestDescriptor;
use crate::types::BackoffType;
use std::time::Duration;

/// Redirect hops followed for one logical request
pub const MAX_REDIRECTS: u32 = 10;

/// Why an attempt is being retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// 429 Too Many Requests
    RateLimited,
    /// Too many concurrently executing action batches
    ActionBatchConflict,
    /// Concurrent network deletions
    NetworkDeleteConflict,
    /// Ordinary 4xx with `retry_4xx_error` enabled
    ClientError,
    /// 5xx
    ServerError,
    /// Timeout or connection failure
    TransportFailure,
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RetryReason::RateLimited => "rate limited",
            RetryReason::ActionBatchConflict => "action batch concurrency conflict",
            RetryReason::NetworkDeleteConflict => "concurrent network deletion",
            RetryReason::ClientError => "client error",
            RetryReason::ServerError => "server error",
            RetryReason::TransportFailure => "transport failure",
        };
        f.write_str(s)
    }
}

/// What to do after one attempt
#[derive(Debug)]
pub enum Decision {
    /// Hand the response to the caller
    Accept(HttpResponse),
    /// Sleep, then attempt again
    Retry {
        /// How long to sleep
        wait: Duration,
        /// Why
        reason: RetryReason,
        /// Status of the rejected attempt
        status: Option<u16>,
    },
    /// Re-send the request to another URL without waiting
    Redirect {
        /// `Location` header, possibly relative
        location: String,
        /// Redirect status
        status: u16,
    },
    /// Give up
    Fail(Error),
}

/// Retry settings extracted from a session config
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub maximum_retries: u32,
    /// Retry 429s
    pub wait_on_rate_limit: bool,
    /// 429 wait without Retry-After
    pub nginx_429_retry_wait_time: Duration,
    /// Action batch conflict wait
    pub action_batch_retry_wait_time: Duration,
    /// Network deletion conflict wait
    pub network_delete_retry_wait_time: Duration,
    /// Retry other 4xx
    pub retry_4xx_error: bool,
    /// Other 4xx wait
    pub retry_4xx_error_wait_time: Duration,
    /// Backoff strategy for 5xx and transport failures
    pub backoff_type: BackoffType,
    /// First backoff delay
    pub initial_backoff: Duration,
    /// Backoff cap
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl RetryPolicy {
    /// Take retry settings from a session config
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            maximum_retries: config.maximum_retries,
            wait_on_rate_limit: config.wait_on_rate_limit,
            nginx_429_retry_wait_time: config.nginx_429_retry_wait_time,
            action_batch_retry_wait_time: config.action_batch_retry_wait_time,
            network_delete_retry_wait_time: config.network_delete_retry_wait_time,
            retry_4xx_error: config.retry_4xx_error,
            retry_4xx_error_wait_time: config.retry_4xx_error_wait_time,
            backoff_type: config.backoff_type,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
        }
    }

    /// Decide what follows attempt number `attempt` (1-based)
    pub fn decide(&self, request: &RequestDescriptor, outcome: Outcome, attempt: u32) -> Decision {
        let can_retry = attempt <= self.maximum_retries;

        match outcome {
            Outcome::Success(response) => Decision::Accept(response),

            Outcome::Redirect(response) => {
                let status = response.status.as_u16();
                match response.header("location") {
                    Some(location) => Decision::Redirect {
                        location: location.to_string(),
                        status,
                    },
                    None => Decision::Fail(Error::Redirect {
                        method: request.method.to_string(),
                        path: request.path.clone(),
                        message: format!("HTTP {status} without a Location header"),
                    }),
                }
            }

            Outcome::ClientError(response) if response.status.as_u16() == 429 => {
                if self.wait_on_rate_limit && can_retry {
                    Decision::Retry {
                        wait: extract_retry_after(&response)
                            .unwrap_or(self.nginx_429_retry_wait_time),
                        reason: RetryReason::RateLimited,
                        status: Some(429),
                    }
                } else {
                    Decision::Fail(Error::RateLimitExhausted {
                        method: request.method.to_string(),
                        path: request.path.clone(),
                        attempts: attempt,
                        body: response.text(),
                    })
                }
            }

            Outcome::ClientError(response) => {
                let status = response.status.as_u16();
                let (reason, wait) = match conflict_kind(&response) {
                    Some(RetryReason::ActionBatchConflict) => (
                        Some(RetryReason::ActionBatchConflict),
                        self.action_batch_retry_wait_time,
                    ),
                    Some(RetryReason::NetworkDeleteConflict) => (
                        Some(RetryReason::NetworkDeleteConflict),
                        self.network_delete_retry_wait_time,
                    ),
                    _ if self.retry_4xx_error => {
                        (Some(RetryReason::ClientError), self.retry_4xx_error_wait_time)
                    }
                    _ => (None, Duration::ZERO),
                };

                match reason {
                    None => Decision::Fail(Error::ClientError {
                        method: request.method.to_string(),
                        path: request.path.clone(),
                        status,
                        body: response.text(),
                    }),
                    Some(reason) if can_retry => Decision::Retry {
                        wait,
                        reason,
                        status: Some(status),
                    },
                    Some(_) => Decision::Fail(Error::ClientErrorExhausted {
                        method: request.method.to_string(),
                        path: request.path.clone(),
                        status,
                        attempts: attempt,
                        body: response.text(),
                    }),
                }
            }

            Outcome::ServerError(response) => {
                if can_retry {
                    Decision::Retry {
                        wait: self.calculate_backoff(attempt - 1),
                        reason: RetryReason::ServerError,
                        status: Some(response.status.as_u16()),
                    }
                } else {
                    Decision::Fail(Error::ServerErrorExhausted {
                        method: request.method.to_string(),
                        path: request.path.clone(),
                        status: response.status.as_u16(),
                        attempts: attempt,
                        body: response.text(),
                    })
                }
            }

            Outcome::TransportFailure(err) => {
                if can_retry {
                    Decision::Retry {
                        wait: self.calculate_backoff(attempt - 1),
                        reason: RetryReason::TransportFailure,
                        status: None,
                    }
                } else {
                    Decision::Fail(Error::TransportExhausted {
                        method: request.method.to_string(),
                        path: request.path.clone(),
                        attempts: attempt,
                        message: err.to_string(),
                    })
                }
            }
        }
    }

    /// Calculate backoff delay for a given retry (0-based)
    pub fn calculate_backoff(&self, retry: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self.initial_backoff.saturating_mul(retry.saturating_add(1)),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(retry);
                self.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max_backoff)
    }
}

/// Extract a `Retry-After` wait given in (possibly fractional) seconds
pub fn extract_retry_after(response: &HttpResponse) -> Option<Duration> {
    response
        .header("retry-after")
        .and_then(|s| s.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Recognise the 4xx bodies the API uses for transient concurrency conflicts
///
/// The API reports both as `{"errors": ["..."]}`.
pub fn conflict_kind(response: &HttpResponse) -> Option<RetryReason> {
    let body: serde_json::Value = serde_json::from_slice(&response.body).ok()?;
    let errors = body.get("errors")?.as_array()?;

    for message in errors.iter().filter_map(serde_json::Value::as_str) {
        let message = message.to_ascii_lowercase();
        if message.contains("concurrently executing batches") {
            return Some(RetryReason::ActionBatchConflict);
        }
        if message.contains("concurrent") && message.contains("delete") && message.contains("network") {
            return Some(RetryReason::NetworkDeleteConflict);
        }
    }
    None
}
