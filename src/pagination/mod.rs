//! Pagination module
//!
//! Cursor pagination over the Dashboard API's `Link` response header.
//!
//! # Overview
//!
//! A [`Pager`] is the transport-agnostic half of `get_pages`: it produces the
//! request for the next page, reads the cursor out of each response and
//! decides when to stop. Sessions drive it in one of two modes:
//!
//! - eager: every page body is merged by a [`PageAccumulator`] into one value
//! - lazy: pages are fetched on demand and flattened with [`page_items`]

mod pager;
mod types;

pub use pager::{page_items, PageAccumulator, Pager};
pub use types::{parse_link_header, PageCursor, PageRequest, Pages, CURSOR_KEYS};
