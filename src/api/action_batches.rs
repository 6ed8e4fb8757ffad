//! Action batch endpoints
//!
//! Batches are built from [`crate::batch::Action`]s. Creating a batch while
//! too many are executing yields a transient 4xx that sessions retry on
//! their own with `action_batch_retry_wait_time`.

use super::check_opt;
use crate::batch::Action;
use crate::error::{Error, Result};
use crate::http::{resource_path, RequestDescriptor};
use serde::Serialize;

/// Most actions a synchronous batch may hold
pub const MAX_SYNCHRONOUS_ACTIONS: usize = 20;

/// Most actions any batch may hold
pub const MAX_ACTIONS: usize = 100;

/// Body of `create_organization_action_batch`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionBatch {
    /// Actions in execution order
    pub actions: Vec<Action>,
    /// Run immediately; unconfirmed batches wait for an update
    pub confirmed: bool,
    /// Respond only after the batch has run
    pub synchronous: bool,
    /// URL notified on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback: Option<serde_json::Value>,
}

/// Create an action batch
pub fn create_organization_action_batch(
    organization_id: &str,
    body: &CreateActionBatch,
) -> Result<RequestDescriptor> {
    let limit = if body.synchronous {
        MAX_SYNCHRONOUS_ACTIONS
    } else {
        MAX_ACTIONS
    };
    if body.actions.len() > limit {
        return Err(Error::invalid_value(
            "actions",
            format!("{} actions exceed the limit of {limit}", body.actions.len()),
        ));
    }

    RequestDescriptor::post(resource_path(&["organizations", "actionBatches"], &[organization_id]))
        .json_from(body)
}

/// List the action batches of an organization
pub fn get_organization_action_batches(
    organization_id: &str,
    status: Option<&str>,
) -> Result<RequestDescriptor> {
    check_opt("status", status, &["completed", "failed"])?;
    Ok(
        RequestDescriptor::get(resource_path(&["organizations", "actionBatches"], &[organization_id]))
            .query_opt("status", status),
    )
}

/// Return one action batch
pub fn get_organization_action_batch(organization_id: &str, action_batch_id: &str) -> RequestDescriptor {
    RequestDescriptor::get(resource_path(
        &["organizations", "actionBatches"],
        &[organization_id, action_batch_id],
    ))
}

/// Confirm or change the mode of an action batch
pub fn update_organization_action_batch(
    organization_id: &str,
    action_batch_id: &str,
    confirmed: Option<bool>,
    synchronous: Option<bool>,
) -> RequestDescriptor {
    let mut body = serde_json::Map::new();
    if let Some(confirmed) = confirmed {
        body.insert("confirmed".to_string(), confirmed.into());
    }
    if let Some(synchronous) = synchronous {
        body.insert("synchronous".to_string(), synchronous.into());
    }

    RequestDescriptor::put(resource_path(
        &["organizations", "actionBatches"],
        &[organization_id, action_batch_id],
    ))
    .json(serde_json::Value::Object(body))
}

/// Delete an unconfirmed action batch
pub fn delete_organization_action_batch(organization_id: &str, action_batch_id: &str) -> RequestDescriptor {
    RequestDescriptor::delete(resource_path(
        &["organizations", "actionBatches"],
        &[organization_id, action_batch_id],
    ))
}
