//! Pagination types
//!
//! Defines the page request, the cursor pair and the result shape shared by
//! both session flavours.

use crate::http::RequestDescriptor;
use crate::types::{Direction, JsonValue, TotalPages};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use tracing::warn;

/// Query keys that carry the cursor
pub const CURSOR_KEYS: [&str; 2] = ["startingAfter", "endingBefore"];

/// A paginated GET
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// First-page request; cursor keys are replaced on later pages
    pub request: RequestDescriptor,
    /// Page budget
    pub total_pages: TotalPages,
    /// Link relation to follow
    pub direction: Direction,
    /// Drop events after this instant and stop once a page passes it
    pub event_log_end_time: Option<DateTime<Utc>>,
}

impl PageRequest {
    /// Single-page request following `next`
    pub fn new(request: RequestDescriptor) -> Self {
        Self {
            request,
            total_pages: TotalPages::Limit(1),
            direction: Direction::Next,
            event_log_end_time: None,
        }
    }

    /// Set the page budget
    #[must_use]
    pub fn total_pages(mut self, total_pages: TotalPages) -> Self {
        self.total_pages = total_pages;
        self
    }

    /// Follow every page
    #[must_use]
    pub fn all_pages(self) -> Self {
        self.total_pages(TotalPages::All)
    }

    /// Set the direction
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the event log end boundary
    #[must_use]
    pub fn event_log_end_time(mut self, end: DateTime<Utc>) -> Self {
        self.event_log_end_time = Some(end);
        self
    }
}

/// Opaque cursor pair taken from a `Link` URL
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageCursor {
    /// `startingAfter` token
    pub starting_after: Option<String>,
    /// `endingBefore` token
    pub ending_before: Option<String>,
}

impl PageCursor {
    /// Extract the cursor for `direction` from response headers
    pub fn from_headers(headers: &HeaderMap, direction: Direction) -> Option<Self> {
        let link = headers.get("link").and_then(|v| v.to_str().ok())?;
        let target = parse_link_header(link, direction.rel())?;
        let cursor = Self::from_link_url(&target);
        if cursor.is_none() {
            warn!(link = %target, "Link header carries no cursor token, stopping pagination");
        }
        cursor
    }

    /// Extract the cursor tokens from a link URL (absolute or relative)
    pub fn from_link_url(link: &str) -> Option<Self> {
        let parsed = url::Url::parse(link)
            .or_else(|_| url::Url::parse("http://localhost/").and_then(|base| base.join(link)))
            .ok()?;

        let mut cursor = PageCursor::default();
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "startingAfter" => cursor.starting_after = Some(value.into_owned()),
                "endingBefore" => cursor.ending_before = Some(value.into_owned()),
                _ => {}
            }
        }

        if cursor.starting_after.is_none() && cursor.ending_before.is_none() {
            None
        } else {
            Some(cursor)
        }
    }

    /// Query pairs to put on the next request
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(token) = &self.starting_after {
            pairs.push(("startingAfter".to_string(), token.clone()));
        }
        if let Some(token) = &self.ending_before {
            pairs.push(("endingBefore".to_string(), token.clone()));
        }
        pairs
    }
}

/// Parse a Link header and extract the URL for the given rel
pub fn parse_link_header(header: &str, target_rel: &str) -> Option<String> {
    // Link header format: <url>; rel="next", <url>; rel="prev"
    for part in header.split(',') {
        let part = part.trim();
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(stripped) = segment.strip_prefix("rel=") {
                let rel_value = stripped.trim_matches('"').trim_matches('\'');
                rel = Some(rel_value);
            }
        }

        if let (Some(u), Some(r)) = (url, rel) {
            if r == target_rel {
                return Some(u.to_string());
            }
        }
    }

    None
}

/// Result of a paginated call: merged eagerly or left as a lazy sequence
#[derive(Debug)]
pub enum Pages<L> {
    /// All pages merged into one value
    Collected(JsonValue),
    /// Single-pass item sequence fetching pages on demand
    Lazy(L),
}

impl<L> Pages<L> {
    /// The merged value, if eager
    pub fn collected(self) -> Option<JsonValue> {
        match self {
            Pages::Collected(value) => Some(value),
            Pages::Lazy(_) => None,
        }
    }

    /// The lazy sequence, if lazy
    pub fn lazy(self) -> Option<L> {
        match self {
            Pages::Collected(_) => None,
            Pages::Lazy(sequence) => Some(sequence),
        }
    }
}
