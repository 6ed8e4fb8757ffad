//! Endpoint descriptor builders
//!
//! Pure functions that turn typed options into [`RequestDescriptor`]s and
//! [`PageRequest`]s. Nothing here performs I/O; hand the result to either
//! session flavour.
//!
//! ```
//! use meraki_dashboard::api::organizations::{self, GetOrganizationNetworksOptions};
//!
//! let request = organizations::get_organization_networks(
//!     "549236",
//!     &GetOrganizationNetworksOptions {
//!         tags: vec!["branch".into()],
//!         tags_filter_type: Some("withAnyTags".into()),
//!         ..Default::default()
//!     },
//! )
//! .unwrap();
//! assert_eq!(request.request.path, "/organizations/549236/networks");
//! ```

pub mod action_batches;
pub mod devices;
pub mod networks;
pub mod organizations;

use crate::error::{Error, Result};
use crate::http::RequestDescriptor;
use crate::pagination::PageRequest;
use crate::types::{Direction, TotalPages};
use chrono::{DateTime, Utc};

/// Paging options shared by every paginated GET
#[derive(Debug, Clone, PartialEq)]
pub struct PageOptions {
    /// Entries per page
    pub per_page: Option<u32>,
    /// Cursor to start after
    pub starting_after: Option<String>,
    /// Cursor to end before
    pub ending_before: Option<String>,
    /// Page budget
    pub total_pages: TotalPages,
    /// Link relation to follow
    pub direction: Direction,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            per_page: None,
            starting_after: None,
            ending_before: None,
            total_pages: TotalPages::Limit(1),
            direction: Direction::Next,
        }
    }
}

impl PageOptions {
    /// Follow every page
    pub fn all() -> Self {
        Self {
            total_pages: TotalPages::All,
            ..Self::default()
        }
    }

    /// Add the paging query and wrap the request
    pub(crate) fn apply(&self, request: RequestDescriptor) -> PageRequest {
        let request = request
            .query_opt("perPage", self.per_page)
            .query_opt("startingAfter", self.starting_after.as_deref())
            .query_opt("endingBefore", self.ending_before.as_deref());

        PageRequest::new(request)
            .total_pages(self.total_pages)
            .direction(self.direction)
    }
}

/// Reject a value outside an enumerated set
pub(crate) fn check_option(option: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(Error::invalid_option(option, value, allowed))
    }
}

/// Check an optional enumerated value
pub(crate) fn check_opt(option: &str, value: Option<&str>, allowed: &[&str]) -> Result<()> {
    value.map_or(Ok(()), |value| check_option(option, value, allowed))
}

/// Check every element of an enumerated array
pub(crate) fn check_all(option: &str, values: &[String], allowed: &[&str]) -> Result<()> {
    values
        .iter()
        .try_for_each(|value| check_option(option, value, allowed))
}

/// ISO 8601 timestamp as the API expects it in query strings
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Product types accepted by network endpoints
pub const PRODUCT_TYPES: &[&str] = &[
    "appliance",
    "camera",
    "campusGateway",
    "cellularGateway",
    "secureConnect",
    "sensor",
    "switch",
    "systemsManager",
    "wireless",
    "wirelessController",
];

/// Values of `tagsFilterType`
pub const TAGS_FILTER_TYPES: &[&str] = &["withAnyTags", "withAllTags"];
