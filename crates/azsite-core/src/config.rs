//! Run configuration: region, resource names, and plan SKU.
//!
//! Built once at startup and passed by reference to every step. Defaults
//! can be overridden by an optional TOML file:
//!
//! ```toml
//! location = "westeurope"
//! group_name = "my-group"
//! server_farm_name = "my-plan"
//! site_name = "my-site"
//!
//! [sku]
//! name = "S1"
//! tier = "Standard"
//! capacity = 1
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::naming::haikunate;
use crate::types::SkuDescription;

pub const DEFAULT_LOCATION: &str = "westus";
pub const DEFAULT_GROUP_NAME: &str = "azure-sample-group";
pub const DEFAULT_SERVER_FARM_NAME: &str = "sample-server-farm";

/// Token range for generated site names.
pub const SITE_NAME_TOKEN_RANGE: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleConfig {
    pub location: String,
    pub group_name: String,
    pub server_farm_name: String,
    pub site_name: String,
    pub sku: SkuDescription,
}

/// On-disk overrides; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    location: Option<String>,
    group_name: Option<String>,
    server_farm_name: Option<String>,
    site_name: Option<String>,
    sku: Option<SkuDescription>,
}

impl SampleConfig {
    /// Defaults with the given site name.
    pub fn new(site_name: impl Into<String>) -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            group_name: DEFAULT_GROUP_NAME.to_string(),
            server_farm_name: DEFAULT_SERVER_FARM_NAME.to_string(),
            site_name: site_name.into(),
            sku: SkuDescription::default(),
        }
    }

    /// Defaults with a freshly generated site name.
    pub fn generate() -> Self {
        Self::new(generate_site_name())
    }

    /// Load overrides from a TOML file on top of the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let defaults = Self::new(String::new());
        Ok(Self {
            location: file.location.unwrap_or(defaults.location),
            group_name: file.group_name.unwrap_or(defaults.group_name),
            server_farm_name: file.server_farm_name.unwrap_or(defaults.server_farm_name),
            site_name: file.site_name.unwrap_or_else(generate_site_name),
            sku: file.sku.unwrap_or(defaults.sku),
        })
    }
}

fn generate_site_name() -> String {
    haikunate(&mut rand::rng(), SITE_NAME_TOKEN_RANGE)
}
