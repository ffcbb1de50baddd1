//! ARM resource representations shared across azsite crates.
//!
//! Field names follow the ARM JSON wire format (camelCase). Read-only fields
//! such as `id` are optional so the same types serve as request bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Resource tags. Ordered so printed output is stable.
pub type Tags = BTreeMap<String, String>;

/// What a resource's properties report about provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertiesView<'a> {
    /// Properties that track provisioning. The state may not be reported yet.
    Provisioned(Option<&'a str>),
    /// No properties, or properties without a provisioning state.
    Untracked,
}

/// Common view over every ARM resource the run prints.
pub trait Resource {
    fn name(&self) -> Option<&str>;
    fn id(&self) -> Option<&str>;
    fn location(&self) -> &str;
    fn tags(&self) -> Option<&Tags>;
    fn properties(&self) -> PropertiesView<'_>;
}

macro_rules! impl_resource_fields {
    () => {
        fn name(&self) -> Option<&str> {
            self.name.as_deref()
        }

        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn location(&self) -> &str {
            &self.location
        }

        fn tags(&self) -> Option<&Tags> {
            self.tags.as_ref()
        }
    };
}

// ── Resource group ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

impl ResourceGroup {
    /// Create-or-update parameters for a group in `location`.
    pub fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            ..Default::default()
        }
    }
}

impl Resource for ResourceGroup {
    impl_resource_fields!();

    fn properties(&self) -> PropertiesView<'_> {
        match &self.properties {
            Some(props) => PropertiesView::Provisioned(props.provisioning_state.as_deref()),
            None => PropertiesView::Untracked,
        }
    }
}

// ── Server farm (App Service plan) ─────────────────────────────────

/// Pricing tier of an App Service plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuDescription {
    pub name: String,
    pub tier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

impl Default for SkuDescription {
    /// One Standard S1 worker.
    fn default() -> Self {
        Self {
            name: "S1".to_string(),
            tier: "Standard".to_string(),
            capacity: Some(1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFarm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<SkuDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ServerFarmProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFarmProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_sites: Option<u32>,
}

impl ServerFarm {
    pub fn new(location: &str, sku: SkuDescription) -> Self {
        Self {
            location: location.to_string(),
            sku: Some(sku),
            ..Default::default()
        }
    }
}

impl Resource for ServerFarm {
    impl_resource_fields!();

    fn properties(&self) -> PropertiesView<'_> {
        match &self.properties {
            Some(props) => PropertiesView::Provisioned(props.provisioning_state.as_deref()),
            None => PropertiesView::Untracked,
        }
    }
}

// ── Site (Web App) ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<SiteProperties>,
}

/// Site properties. ARM does not report a provisioning state for sites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteProperties {
    /// ARM id of the hosting App Service plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_farm_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_host_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Site {
    /// Create-or-update parameters for a site hosted on `server_farm_id`.
    pub fn hosted_on(location: &str, server_farm_id: Option<String>) -> Self {
        Self {
            location: location.to_string(),
            properties: Some(SiteProperties {
                server_farm_id,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn default_host_name(&self) -> Option<&str> {
        self.properties.as_ref()?.default_host_name.as_deref()
    }

    pub fn server_farm_id(&self) -> Option<&str> {
        self.properties.as_ref()?.server_farm_id.as_deref()
    }
}

impl Resource for Site {
    impl_resource_fields!();

    fn properties(&self) -> PropertiesView<'_> {
        PropertiesView::Untracked
    }
}
