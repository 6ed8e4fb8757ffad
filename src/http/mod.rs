//! HTTP layer
//!
//! Everything below the pager: request descriptors, single-shot transports,
//! the retry/backoff policy and client-side pacing.
//!
//! # Features
//!
//! - **Transports**: async and blocking reqwest adapters behind small traits
//! - **Retry Policy**: rate-limit aware, asymmetric 4xx/5xx handling
//! - **Concurrency Gate**: bounded in-flight requests per async session
//! - **Rate Limiting**: optional token bucket using governor

mod rate_limit;
mod request;
mod retry;
mod transport;

pub use rate_limit::{ConcurrencyGate, RateLimiter};
pub use request::{build_url, encode_segment, resolve_location, resource_path, RequestDescriptor};
pub use retry::{conflict_kind, extract_retry_after, Decision, RetryPolicy, RetryReason, MAX_REDIRECTS};
pub use transport::{
    default_headers, BlockingReqwestTransport, BlockingTransport, HttpRequest, HttpResponse,
    Outcome, ReqwestTransport, Transport, TransportError,
};
