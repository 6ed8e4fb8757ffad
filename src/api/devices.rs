//! Device endpoints

use crate::error::{Error, Result};
use crate::http::{resource_path, RequestDescriptor};
use serde::Serialize;

/// Return one device
pub fn get_device(serial: &str) -> RequestDescriptor {
    RequestDescriptor::get(resource_path(&["devices"], &[serial]))
}

/// Body of `update_device`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDevice {
    /// Device name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Replacement tag list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Latitude
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Longitude
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    /// Street address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Free-form notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Move the map marker to the new address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_map_marker: Option<bool>,
    /// Switch profile to bind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_profile_id: Option<String>,
    /// Floor plan to place the device on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_plan_id: Option<String>,
}

/// Update a device
pub fn update_device(serial: &str, body: &UpdateDevice) -> Result<RequestDescriptor> {
    if let Some(lat) = body.lat {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(Error::invalid_value("lat", format!("{lat} is out of range")));
        }
    }
    if let Some(lng) = body.lng {
        if !(-180.0..=180.0).contains(&lng) {
            return Err(Error::invalid_value("lng", format!("{lng} is out of range")));
        }
    }
    RequestDescriptor::put(resource_path(&["devices"], &[serial])).json_from(body)
}

/// Reboot a device
pub fn reboot_device(serial: &str) -> RequestDescriptor {
    RequestDescriptor::post(resource_path(&["devices", "reboot"], &[serial]))
}

/// Body of `blink_device_leds`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkDeviceLeds {
    /// Seconds to blink (5 - 120)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Milliseconds per cycle (100 - 1000)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
    /// Percentage of the period the LED is on (10 - 90)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duty: Option<u32>,
}

/// Blink the LEDs of a device
pub fn blink_device_leds(serial: &str, body: &BlinkDeviceLeds) -> Result<RequestDescriptor> {
    RequestDescriptor::post(resource_path(&["devices", "blinkLeds"], &[serial])).json_from(body)
}

/// List the LLDP/CDP neighbours of a device
pub fn get_device_lldp_cdp(serial: &str) -> RequestDescriptor {
    RequestDescriptor::get(resource_path(&["devices", "lldpCdp"], &[serial]))
}

/// Remove a device from its network
pub fn remove_network_device(network_id: &str, serial: &str) -> RequestDescriptor {
    RequestDescriptor::post(resource_path(&["networks", "devices", "remove"], &[network_id]))
        .json(serde_json::json!({ "serial": serial }))
}
