//! Common types used throughout the crate
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
}

impl Method {
    /// Whether the method changes server-side state
    pub fn is_mutating(self) -> bool {
        !matches!(self, Method::GET)
    }

    /// Upper-case method name
    pub fn as_str(self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::DELETE => reqwest::Method::DELETE,
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Backoff strategy used between retries of server errors and transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Pagination Types
// ============================================================================

/// Which Link relation drives the next page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow `rel=next` (`startingAfter` cursor)
    #[default]
    Next,
    /// Follow `rel=prev` (`endingBefore` cursor)
    Prev,
}

impl Direction {
    /// Link relation name for this direction
    pub fn rel(self) -> &'static str {
        match self {
            Direction::Next => "next",
            Direction::Prev => "prev",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "next" => Ok(Direction::Next),
            "prev" => Ok(Direction::Prev),
            other => Err(Error::invalid_option("direction", other, &["next", "prev"])),
        }
    }
}

/// Page budget for a `get_pages` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalPages {
    /// Follow cursors until the server stops providing one
    All,
    /// Fetch at most this many pages; 0 and 1 both mean a single page
    Limit(u32),
}

impl TotalPages {
    /// Whether another page may be fetched after `fetched` pages
    pub fn allows_more(self, fetched: u32) -> bool {
        match self {
            TotalPages::All => true,
            TotalPages::Limit(limit) => fetched < limit.max(1),
        }
    }
}

impl From<i64> for TotalPages {
    fn from(value: i64) -> Self {
        if value < 0 {
            TotalPages::All
        } else {
            TotalPages::Limit(u32::try_from(value).unwrap_or(u32::MAX))
        }
    }
}

impl FromStr for TotalPages {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(TotalPages::All);
        }
        s.parse::<i64>()
            .map(TotalPages::from)
            .map_err(|_| Error::invalid_value("total_pages", format!("expected 'all' or an integer, got '{s}'")))
    }
}
