//! Network endpoints

use super::{check_opt, timestamp, PageOptions};
use crate::error::Result;
use crate::http::{resource_path, RequestDescriptor};
use crate::pagination::PageRequest;
use crate::types::{Direction, TotalPages};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Return one network
pub fn get_network(network_id: &str) -> RequestDescriptor {
    RequestDescriptor::get(resource_path(&["networks"], &[network_id]))
}

/// Body of `update_network`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNetwork {
    /// New name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// IANA time zone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    /// Replacement tag list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Enrollment string for Systems Manager
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_string: Option<String>,
    /// Free-form notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Update a network
pub fn update_network(network_id: &str, body: &UpdateNetwork) -> Result<RequestDescriptor> {
    RequestDescriptor::put(resource_path(&["networks"], &[network_id])).json_from(body)
}

/// Delete a network
///
/// Concurrent deletions in one organization are rejected by the API with a
/// transient 4xx that sessions retry on their own.
pub fn delete_network(network_id: &str) -> RequestDescriptor {
    RequestDescriptor::delete(resource_path(&["networks"], &[network_id]))
}

/// List the devices in a network
pub fn get_network_devices(network_id: &str) -> RequestDescriptor {
    RequestDescriptor::get(resource_path(&["networks", "devices"], &[network_id]))
}

/// Claim devices into a network
pub fn claim_network_devices(network_id: &str, serials: &[String]) -> RequestDescriptor {
    RequestDescriptor::post(resource_path(&["networks", "devices", "claim"], &[network_id]))
        .json(serde_json::json!({ "serials": serials }))
}

/// Filters of `get_network_clients`
#[derive(Debug, Clone, Default)]
pub struct GetNetworkClientsOptions {
    /// Window ending now, in seconds
    pub timespan: Option<u32>,
    /// Start of the window
    pub t0: Option<DateTime<Utc>>,
    /// Only clients on this VLAN
    pub vlan: Option<String>,
    /// Only clients with this SSID name
    pub named_ssid: Option<String>,
    /// Paging
    pub paging: PageOptions,
}

/// List the clients seen in a network
pub fn get_network_clients(network_id: &str, options: &GetNetworkClientsOptions) -> PageRequest {
    let request = RequestDescriptor::get(resource_path(&["networks", "clients"], &[network_id]))
        .query_opt("t0", options.t0.map(timestamp))
        .query_opt("timespan", options.timespan)
        .query_opt("vlan", options.vlan.as_deref())
        .query_opt("namedSsids[]", options.named_ssid.as_deref());

    options.paging.apply(request)
}

/// Filters of `get_network_events`
#[derive(Debug, Clone)]
pub struct GetNetworkEventsOptions {
    /// Required for networks with more than one product type
    pub product_type: Option<String>,
    /// Only these event types
    pub included_event_types: Vec<String>,
    /// Never these event types
    pub excluded_event_types: Vec<String>,
    /// Only events of this device
    pub device_serial: Option<String>,
    /// Only events of this client IP
    pub client_ip: Option<String>,
    /// Only events of this client MAC
    pub client_mac: Option<String>,
    /// Entries per page (3 - 1000)
    pub per_page: Option<u32>,
    /// Start after this time or cursor
    pub starting_after: Option<String>,
    /// End before this time or cursor
    pub ending_before: Option<String>,
    /// Page budget
    pub total_pages: TotalPages,
    /// Newest-first (`Prev`, the default) or oldest-first (`Next`)
    pub direction: Direction,
    /// Drop events after this instant when moving forward
    pub event_log_end_time: Option<DateTime<Utc>>,
}

impl Default for GetNetworkEventsOptions {
    fn default() -> Self {
        Self {
            product_type: None,
            included_event_types: Vec::new(),
            excluded_event_types: Vec::new(),
            device_serial: None,
            client_ip: None,
            client_mac: None,
            per_page: None,
            starting_after: None,
            ending_before: None,
            total_pages: TotalPages::Limit(1),
            direction: Direction::Prev,
            event_log_end_time: None,
        }
    }
}

/// Product types with an event log
pub const EVENT_LOG_PRODUCT_TYPES: &[&str] = &[
    "appliance",
    "camera",
    "campusGateway",
    "cellularGateway",
    "secureConnect",
    "switch",
    "systemsManager",
    "wireless",
    "wirelessController",
];

/// Page through the event log of a network
pub fn get_network_events(network_id: &str, options: &GetNetworkEventsOptions) -> Result<PageRequest> {
    check_opt("productType", options.product_type.as_deref(), EVENT_LOG_PRODUCT_TYPES)?;

    let request = RequestDescriptor::get(resource_path(&["networks", "events"], &[network_id]))
        .query_opt("productType", options.product_type.as_deref())
        .query_array("includedEventTypes", &options.included_event_types)
        .query_array("excludedEventTypes", &options.excluded_event_types)
        .query_opt("deviceSerial", options.device_serial.as_deref())
        .query_opt("clientIp", options.client_ip.as_deref())
        .query_opt("clientMac", options.client_mac.as_deref())
        .query_opt("perPage", options.per_page)
        .query_opt("startingAfter", options.starting_after.as_deref())
        .query_opt("endingBefore", options.ending_before.as_deref());

    let mut pages = PageRequest::new(request)
        .total_pages(options.total_pages)
        .direction(options.direction);
    if let Some(end) = options.event_log_end_time {
        pages = pages.event_log_end_time(end);
    }
    Ok(pages)
}

/// Body of `bind_network`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindNetwork {
    /// Template to bind to
    pub config_template_id: String,
    /// Move switch ports to the template's profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_bind: Option<bool>,
}

/// Bind a network to a configuration template
pub fn bind_network(network_id: &str, body: &BindNetwork) -> Result<RequestDescriptor> {
    RequestDescriptor::post(resource_path(&["networks", "bind"], &[network_id])).json_from(body)
}

/// Split a combined network into one network per product type
pub fn split_network(network_id: &str) -> RequestDescriptor {
    RequestDescriptor::post(resource_path(&["networks", "split"], &[network_id]))
}

/// Combine networks into one
pub fn combine_organization_networks(
    organization_id: &str,
    name: &str,
    network_ids: &[String],
) -> RequestDescriptor {
    RequestDescriptor::post(resource_path(&["organizations", "networks", "combine"], &[organization_id]))
        .json(serde_json::json!({ "name": name, "networkIds": network_ids }))
}

