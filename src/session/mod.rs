//! REST sessions
//!
//! Two session flavours share one configuration, one retry policy and one
//! pager; they differ only in how they wait:
//!
//! - [`AsyncRestSession`] runs on tokio, bounds in-flight requests with a
//!   [`ConcurrencyGate`](crate::http::ConcurrencyGate) and exposes lazy
//!   pagination as a [`PageStream`].
//! - [`RestSession`] blocks the calling thread and exposes lazy pagination
//!   as a [`PageIter`].
//!
//! Both send every request through the same loop: optional token bucket,
//! one transport call, [`RetryPolicy::decide`], sleep or return.

mod async_session;
mod blocking;

pub use async_session::{AsyncRestSession, PageStream};
pub use blocking::{PageIter, RestSession};

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::http::{
    build_url, default_headers, resolve_location, HttpRequest, HttpResponse, RateLimiter,
    RequestDescriptor, RetryPolicy, RetryReason, MAX_REDIRECTS,
};
use crate::logging;
use crate::types::JsonValue;
use reqwest::header::HeaderMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Response handed back to callers
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status (200 for simulated calls)
    pub status: u16,
    /// Response headers (empty for simulated calls)
    pub headers: HeaderMap,
    /// Parsed JSON body; `None` when the response had no body
    pub body: Option<JsonValue>,
    /// True when simulate mode suppressed the call
    pub simulated: bool,
}

impl ApiResponse {
    /// Parse a successful HTTP response
    pub fn from_http(response: HttpResponse) -> Result<Self> {
        let body = if response.body.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(serde_json::from_slice(&response.body).map_err(|e| {
                Error::decode(format!("HTTP {} body is not JSON: {e}", response.status.as_u16()))
            })?)
        };

        Ok(Self {
            status: response.status.as_u16(),
            headers: response.headers,
            body,
            simulated: false,
        })
    }

    /// Synthetic success returned in simulate mode
    pub fn simulated() -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            body: None,
            simulated: true,
        }
    }

    /// Take the body
    pub fn into_body(self) -> Option<JsonValue> {
        self.body
    }
}

/// State shared by both session flavours
pub(crate) struct SessionCore {
    config: SessionConfig,
    headers: HeaderMap,
    policy: RetryPolicy,
    limiter: Option<RateLimiter>,
}

impl SessionCore {
    /// Resolve credentials, validate and install log output
    pub(crate) fn new(config: SessionConfig) -> Result<Self> {
        let config = config.with_env_fallbacks();
        let api_key = config.validate()?;
        let headers = default_headers(&config, api_key)?;
        let log_file = logging::install(&config.logging)?;

        info!(
            base_url = %config.base_url,
            maximum_retries = config.maximum_retries,
            wait_on_rate_limit = config.wait_on_rate_limit,
            retry_4xx_error = config.retry_4xx_error,
            simulate = config.simulate,
            log_file = ?log_file,
            "Dashboard API session initialized"
        );

        Ok(Self {
            policy: RetryPolicy::from_config(&config),
            limiter: config.requests_per_second.map(RateLimiter::per_second),
            headers,
            config,
        })
    }

    pub(crate) fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub(crate) fn limiter(&self) -> Option<&RateLimiter> {
        self.limiter.as_ref()
    }

    /// Resolve a descriptor into a transport request
    ///
    /// `redirected_to` replaces the URL after a redirect; a target that
    /// carries its own query string replaces the descriptor's query too.
    pub(crate) fn prepare(&self, request: &RequestDescriptor, redirected_to: Option<&str>) -> HttpRequest {
        let (url, query) = match redirected_to {
            Some(target) if target.contains('?') => (target.to_string(), Vec::new()),
            Some(target) => (target.to_string(), request.query.clone()),
            None => (build_url(&self.config.base_url, &request.path), request.query.clone()),
        };

        HttpRequest {
            method: request.method.into(),
            url,
            query,
            headers: self.headers.clone(),
            body: request.body.clone(),
            timeout: self.config.single_request_timeout,
        }
    }

    /// Absolute URL of the next redirect hop
    pub(crate) fn follow_redirect(
        &self,
        request: &RequestDescriptor,
        from: &str,
        location: &str,
        hops: &mut u32,
    ) -> Result<String> {
        *hops += 1;
        if *hops > MAX_REDIRECTS {
            let err = Error::Redirect {
                method: request.method.to_string(),
                path: request.path.clone(),
                message: format!("more than {MAX_REDIRECTS} redirects"),
            };
            self.log_failure(request, &err);
            return Err(err);
        }

        let target = resolve_location(from, location)?;
        debug!(method = %request.method, path = %request.path, %target, "Following redirect");
        Ok(target)
    }

    /// Synthetic response when simulate mode suppresses a mutating call
    pub(crate) fn simulated(&self, request: &RequestDescriptor) -> Option<ApiResponse> {
        if self.config.simulate && request.method.is_mutating() {
            info!(
                method = %request.method,
                path = %request.path,
                body = ?request.body,
                "Simulated request, not sent"
            );
            Some(ApiResponse::simulated())
        } else {
            None
        }
    }

    pub(crate) fn log_retry(
        &self,
        request: &RequestDescriptor,
        attempt: u32,
        wait: Duration,
        reason: RetryReason,
        status: Option<u16>,
    ) {
        warn!(
            method = %request.method,
            path = %request.path,
            status = ?status,
            "{reason}, attempt {attempt}/{}, retrying in {wait:?}",
            self.policy.maximum_retries + 1
        );
    }

    pub(crate) fn log_failure(&self, request: &RequestDescriptor, err: &Error) {
        warn!(method = %request.method, path = %request.path, "Request failed: {err}");
    }
}

impl std::fmt::Debug for SessionCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCore")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.limiter.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
