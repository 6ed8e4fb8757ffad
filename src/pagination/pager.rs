//! Pager state machine and page merging

use super::types::{PageCursor, PageRequest, CURSOR_KEYS};
use crate::error::{Error, Result};
use crate::http::RequestDescriptor;
use crate::types::{Direction, JsonValue};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use tracing::{debug, warn};

/// Drives one `get_pages` invocation
///
/// The pager owns the cursor and page count; the session owns I/O. Call
/// [`Pager::next_request`] until it returns `None`, passing every response
/// to [`Pager::record_page`].
#[derive(Debug, Clone)]
pub struct Pager {
    request: PageRequest,
    cursor: Option<PageCursor>,
    pages_fetched: u32,
    done: bool,
}

impl Pager {
    /// Start a pagination sequence
    pub fn new(request: PageRequest) -> Self {
        Self {
            request,
            cursor: None,
            pages_fetched: 0,
            done: false,
        }
    }

    /// Pages recorded so far
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Whether the sequence has ended
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Direction being followed
    pub fn direction(&self) -> Direction {
        self.request.direction
    }

    /// Request for the next page, or `None` when finished
    pub fn next_request(&self) -> Option<RequestDescriptor> {
        if self.done {
            return None;
        }
        match &self.cursor {
            None => Some(self.request.request.clone()),
            Some(cursor) => Some(
                self.request
                    .request
                    .with_replaced_query(&CURSOR_KEYS, cursor.query_pairs()),
            ),
        }
    }

    /// Record a fetched page and return its (normalised) body
    ///
    /// Event log pages have their events put in chronological order when
    /// moving forward and are clipped at the configured end time.
    pub fn record_page(&mut self, headers: &HeaderMap, body: Option<JsonValue>) -> JsonValue {
        self.pages_fetched += 1;
        let mut page = body.unwrap_or(JsonValue::Null);
        let boundary_reached = self.shape_event_page(&mut page);

        if boundary_reached {
            debug!(page = self.pages_fetched, "Event log end time reached");
            self.done = true;
        } else if !self.request.total_pages.allows_more(self.pages_fetched) {
            debug!(page = self.pages_fetched, "Page budget exhausted");
            self.done = true;
        } else {
            match PageCursor::from_headers(headers, self.request.direction) {
                None => self.done = true,
                Some(next) if self.cursor.as_ref() == Some(&next) => {
                    warn!(page = self.pages_fetched, "Server repeated the previous cursor, stopping pagination");
                    self.done = true;
                }
                Some(next) => self.cursor = Some(next),
            }
        }

        page
    }

    /// Returns true when the event log end time has been reached
    fn shape_event_page(&self, page: &mut JsonValue) -> bool {
        let forward = self.request.direction == Direction::Next;
        let end = self.request.event_log_end_time;

        let clipped = {
            let Some(events) = page.get_mut("events").and_then(JsonValue::as_array_mut) else {
                return false;
            };
            if forward {
                events.reverse();
            }
            match end {
                Some(end) if forward => {
                    let before = events.len();
                    events.retain(|event| {
                        event
                            .get("occurredAt")
                            .and_then(parse_time)
                            .map_or(true, |at| at <= end)
                    });
                    events.len() < before
                }
                _ => false,
            }
        };

        let page_ends_past = match end {
            Some(end) if forward => page
                .get("pageEndAt")
                .and_then(parse_time)
                .is_some_and(|at| at > end),
            _ => false,
        };

        clipped || page_ends_past
    }
}

fn parse_time(value: &JsonValue) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Merges page bodies for eager pagination
///
/// Array pages are concatenated. Object pages have every array-valued field
/// concatenated; the event log boundary field for the direction of travel
/// (`pageEndAt` forward, `pageStartAt` backward) tracks the latest page.
#[derive(Debug)]
pub struct PageAccumulator {
    direction: Direction,
    merged: Option<JsonValue>,
}

impl PageAccumulator {
    /// Create an empty accumulator
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            merged: None,
        }
    }

    /// Merge one page
    pub fn push(&mut self, page: JsonValue) -> Result<()> {
        let merged = match self.merged.as_mut() {
            // An empty leading page takes the shape of the first real one
            Some(merged) if !merged.is_null() => merged,
            _ => {
                self.merged = Some(page);
                return Ok(());
            }
        };

        let boundary_key = match self.direction {
            Direction::Next => "pageEndAt",
            Direction::Prev => "pageStartAt",
        };

        match (merged, page) {
            (_, JsonValue::Null) => {}
            (JsonValue::Array(acc), JsonValue::Array(items)) => acc.extend(items),
            (JsonValue::Object(acc), JsonValue::Object(fields)) => {
                for (key, value) in fields {
                    match value {
                        JsonValue::Array(items) => match acc.get_mut(&key) {
                            Some(JsonValue::Array(existing)) => existing.extend(items),
                            _ => {
                                acc.insert(key, JsonValue::Array(items));
                            }
                        },
                        other if key == boundary_key => {
                            acc.insert(key, other);
                        }
                        _ => {}
                    }
                }
            }
            (merged, page) => {
                return Err(Error::decode(format!(
                    "page shape changed from {} to {}",
                    shape(merged),
                    shape(&page)
                )));
            }
        }
        Ok(())
    }

    /// The merged result; an empty array if no page was pushed
    pub fn finish(self) -> JsonValue {
        self.merged.unwrap_or_else(|| JsonValue::Array(Vec::new()))
    }
}

fn shape(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Flatten one page body into the items a lazy sequence yields
///
/// Arrays yield their elements, `{"items": [...]}` and event log pages yield
/// the inner array, any other object is yielded whole.
pub fn page_items(page: JsonValue) -> Vec<JsonValue> {
    match page {
        JsonValue::Null => Vec::new(),
        JsonValue::Array(items) => items,
        JsonValue::Object(mut map) => {
            for key in ["items", "events"] {
                if matches!(map.get(key), Some(JsonValue::Array(_))) {
                    if let Some(JsonValue::Array(items)) = map.remove(key) {
                        return items;
                    }
                }
            }
            vec![JsonValue::Object(map)]
        }
        other => vec![other],
    }
}
