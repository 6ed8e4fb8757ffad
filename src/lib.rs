// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Meraki Dashboard API session
//!
//! The request core of a Meraki Dashboard REST client: one HTTP call at a
//! time through a pluggable transport, a retry policy that knows the API's
//! rate limiting and transient conflicts, a concurrency gate for async use,
//! and Link-header pagination in eager or lazy form.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meraki_dashboard::api::{organizations, PageOptions};
//! use meraki_dashboard::{AsyncRestSession, Result, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // API key falls back to MERAKI_DASHBOARD_API_KEY
//!     let session = AsyncRestSession::new(SessionConfig::default())?;
//!
//!     let orgs = session
//!         .get_pages(organizations::get_organizations(&PageOptions::all()))
//!         .await?;
//!     println!("{orgs:#}");
//!
//!     // Lazy: pages are fetched as items are consumed
//!     let mut devices = session.iter_pages(organizations::get_organization_devices(
//!         "549236",
//!         &Default::default(),
//!     )?);
//!     while let Some(device) = devices.next().await? {
//!         println!("{}", device["serial"]);
//!     }
//!
//!     session.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  api / batch: typed options → RequestDescriptor, PageRequest │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┴───────────────────────────────┐
//! │      AsyncRestSession (gate, tokio)  RestSession (thread)    │
//! ├───────────────┬────────────────┬──────────────┬──────────────┤
//! │   Transport   │  RetryPolicy   │    Pager     │  RateLimiter │
//! │ reqwest async │ 429 / conflict │ Link cursors │  (optional)  │
//! │ reqwest block │ 4xx / 5xx      │ eager / lazy │   governor   │
//! └───────────────┴────────────────┴──────────────┴──────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: document error variant fields and enum variants

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the session
pub mod error;

/// Common types and type aliases
pub mod types;

/// Session configuration
pub mod config;

/// Log output
pub mod logging;

/// Transport, request descriptors, retry policy and pacing
pub mod http;

/// Link-header pagination
pub mod pagination;

/// Async and blocking REST sessions
pub mod session;

/// Endpoint descriptor builders
pub mod api;

/// Action batch actions
pub mod batch;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{LoggingConfig, SessionConfig};
pub use http::RequestDescriptor;
pub use pagination::{PageRequest, Pages};
pub use session::{ApiResponse, AsyncRestSession, PageIter, PageStream, RestSession};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
