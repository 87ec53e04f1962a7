use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiClient, ApiError};
use crate::roles::Role;

const ENDPOINT: &str = "properties";

/// Attribute key under which parcel geometry is stored. Excluded from
/// attribute discovery and visibility rules.
pub const GEOMETRY_KEY: &str = "geometry";

/// A land-parcel record as served by the backend. Beyond the fixed
/// columns, parcels carry an open attribute map that drives attribute
/// discovery and the visibility rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub segment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Object-level restriction list. Absent or empty means visible to
    /// every role (open by default).
    #[serde(
        rename = "visibleRoles",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub visible_roles: Option<Vec<Role>>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
}

/// Read-only client for parcel records. Holds one snapshot, refreshed on
/// demand; parcels are edited elsewhere, so there is no mutation path here.
pub struct PropertyStore {
    api: ApiClient,
    cache: Option<Vec<Property>>,
}

impl PropertyStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api, cache: None }
    }

    pub async fn get_properties(&mut self) -> Result<Vec<Property>, ApiError> {
        if let Some(ref cached) = self.cache {
            return Ok(cached.clone());
        }

        let url = self.api.endpoint(ENDPOINT);
        let properties: Vec<Property> = self.api.get_json(&url).await?;
        self.cache = Some(properties.clone());
        Ok(properties)
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}
