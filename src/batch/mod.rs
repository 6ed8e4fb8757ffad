//! Action batch actions
//!
//! Each builder returns one [`Action`] for
//! [`create_organization_action_batch`](crate::api::action_batches::create_organization_action_batch).
//! The body types are shared with the direct endpoints in [`crate::api`].

use crate::api::devices::UpdateDevice;
use crate::api::networks::{BindNetwork, UpdateNetwork};
use crate::api::organizations::CreateNetwork;
use crate::api::{check_all, PRODUCT_TYPES};
use crate::error::Result;
use crate::http::resource_path;
use serde::{Deserialize, Serialize};

/// Operation an action performs on its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create a child resource
    Create,
    /// Modify the resource
    Update,
    /// Delete the resource
    Destroy,
    /// Claim devices
    Claim,
    /// Bind to a template
    Bind,
    /// Split a combined network
    Split,
    /// Remove a device
    Remove,
}

/// One entry of an action batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Resource path the operation applies to
    pub resource: String,
    /// Operation name
    pub operation: Operation,
    /// Operation body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl Action {
    fn new(resource: String, operation: Operation) -> Self {
        Self {
            resource,
            operation,
            body: None,
        }
    }

    fn with_body<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// Update a device
pub fn update_device(serial: &str, body: &UpdateDevice) -> Result<Action> {
    Action::new(resource_path(&["devices"], &[serial]), Operation::Update).with_body(body)
}

/// Update a network
pub fn update_network(network_id: &str, body: &UpdateNetwork) -> Result<Action> {
    Action::new(resource_path(&["networks"], &[network_id]), Operation::Update).with_body(body)
}

/// Delete a network
pub fn delete_network(network_id: &str) -> Action {
    Action::new(resource_path(&["networks"], &[network_id]), Operation::Destroy)
}

/// Bind a network to a template
pub fn bind_network(network_id: &str, body: &BindNetwork) -> Result<Action> {
    Action::new(resource_path(&["networks", "bind"], &[network_id]), Operation::Create).with_body(body)
}

/// Claim devices into a network
pub fn claim_network_devices(network_id: &str, serials: &[String]) -> Action {
    let mut action = Action::new(
        resource_path(&["networks", "devices"], &[network_id]),
        Operation::Claim,
    );
    action.body = Some(serde_json::json!({ "serials": serials }));
    action
}

/// Remove a device from its network
pub fn remove_network_device(network_id: &str, serial: &str) -> Action {
    let mut action = Action::new(
        resource_path(&["networks", "devices"], &[network_id]),
        Operation::Remove,
    );
    action.body = Some(serde_json::json!({ "serial": serial }));
    action
}

/// Create a network in an organization
pub fn create_organization_network(organization_id: &str, body: &CreateNetwork) -> Result<Action> {
    check_all("productTypes", &body.product_types, PRODUCT_TYPES)?;
    Action::new(
        resource_path(&["organizations", "networks"], &[organization_id]),
        Operation::Create,
    )
    .with_body(body)
}
