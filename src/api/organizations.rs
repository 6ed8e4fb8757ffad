//! Organization endpoints

use super::{check_all, check_opt, PageOptions, PRODUCT_TYPES, TAGS_FILTER_TYPES};
use crate::error::Result;
use crate::http::{resource_path, RequestDescriptor};
use crate::pagination::PageRequest;
use serde::Serialize;

/// List the organizations the API key can access
pub fn get_organizations(paging: &PageOptions) -> PageRequest {
    paging.apply(RequestDescriptor::get("/organizations"))
}

/// Return one organization
pub fn get_organization(organization_id: &str) -> RequestDescriptor {
    RequestDescriptor::get(resource_path(&["organizations"], &[organization_id]))
}

/// Body of `create_organization`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganization {
    /// Organization name
    pub name: String,
    /// Management details (`[{"name": ..., "value": ...}]`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management: Option<serde_json::Value>,
}

/// Create an organization
pub fn create_organization(body: &CreateOrganization) -> Result<RequestDescriptor> {
    RequestDescriptor::post("/organizations").json_from(body)
}

/// Body of `update_organization`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganization {
    /// New name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// API access settings (`{"enabled": bool}`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<serde_json::Value>,
}

/// Update an organization
pub fn update_organization(organization_id: &str, body: &UpdateOrganization) -> Result<RequestDescriptor> {
    RequestDescriptor::put(resource_path(&["organizations"], &[organization_id])).json_from(body)
}

/// Delete an organization
pub fn delete_organization(organization_id: &str) -> RequestDescriptor {
    RequestDescriptor::delete(resource_path(&["organizations"], &[organization_id]))
}

/// Filters of `get_organization_networks`
#[derive(Debug, Clone, Default)]
pub struct GetOrganizationNetworksOptions {
    /// Only networks bound to this template
    pub config_template_id: Option<String>,
    /// Filter on template binding
    pub is_bound_to_config_template: Option<bool>,
    /// Only networks with these tags
    pub tags: Vec<String>,
    /// `withAnyTags` or `withAllTags`
    pub tags_filter_type: Option<String>,
    /// Paging
    pub paging: PageOptions,
}

/// List the networks of an organization
pub fn get_organization_networks(
    organization_id: &str,
    options: &GetOrganizationNetworksOptions,
) -> Result<PageRequest> {
    check_opt("tagsFilterType", options.tags_filter_type.as_deref(), TAGS_FILTER_TYPES)?;

    let request = RequestDescriptor::get(resource_path(&["organizations", "networks"], &[organization_id]))
        .query_opt("configTemplateId", options.config_template_id.as_deref())
        .query_opt("isBoundToConfigTemplate", options.is_bound_to_config_template)
        .query_array("tags", &options.tags)
        .query_opt("tagsFilterType", options.tags_filter_type.as_deref());

    Ok(options.paging.apply(request))
}

/// Body of `create_organization_network`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNetwork {
    /// Network name
    pub name: String,
    /// Product types the network holds
    pub product_types: Vec<String>,
    /// Tags
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// IANA time zone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    /// Template to copy settings from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_from_network_id: Option<String>,
    /// Free-form notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Create a network in an organization
pub fn create_organization_network(organization_id: &str, body: &CreateNetwork) -> Result<RequestDescriptor> {
    check_all("productTypes", &body.product_types, PRODUCT_TYPES)?;
    RequestDescriptor::post(resource_path(&["organizations", "networks"], &[organization_id])).json_from(body)
}

/// Filters of `get_organization_devices`
#[derive(Debug, Clone, Default)]
pub struct GetOrganizationDevicesOptions {
    /// Only devices in these networks
    pub network_ids: Vec<String>,
    /// Only devices of these product types
    pub product_types: Vec<String>,
    /// Only these serials
    pub serials: Vec<String>,
    /// Only devices with these tags
    pub tags: Vec<String>,
    /// `withAnyTags` or `withAllTags`
    pub tags_filter_type: Option<String>,
    /// Case-insensitive name substring
    pub name: Option<String>,
    /// Case-insensitive model substring
    pub model: Option<String>,
    /// Paging
    pub paging: PageOptions,
}

/// List the devices of an organization
pub fn get_organization_devices(
    organization_id: &str,
    options: &GetOrganizationDevicesOptions,
) -> Result<PageRequest> {
    check_all("productTypes", &options.product_types, PRODUCT_TYPES)?;
    check_opt("tagsFilterType", options.tags_filter_type.as_deref(), TAGS_FILTER_TYPES)?;

    let request = RequestDescriptor::get(resource_path(&["organizations", "devices"], &[organization_id]))
        .query_array("networkIds", &options.network_ids)
        .query_array("productTypes", &options.product_types)
        .query_array("serials", &options.serials)
        .query_array("tags", &options.tags)
        .query_opt("tagsFilterType", options.tags_filter_type.as_deref())
        .query_opt("name", options.name.as_deref())
        .query_opt("model", options.model.as_deref());

    Ok(options.paging.apply(request))
}
