use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiClient, ApiError};

const ENDPOINT: &str = "filter-settings";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSetting {
    pub id: i64,
    pub filter_key: String,
    pub filter_label: String,
    pub filter_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Map<String, Value>>,
    pub is_enabled: bool,
    pub display_order: i32,
    #[serde(
        default,
        deserialize_with = "super::wire::optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<NaiveDateTime>,
    #[serde(
        default,
        deserialize_with = "super::wire::optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertFilter {
    pub filter_key: String,
    pub filter_label: String,
    pub filter_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
}

/// Map filter configuration, upserted by filter key.
pub struct FilterSettingsStore {
    api: ApiClient,
    cache: Option<Vec<FilterSetting>>,
}

impl FilterSettingsStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api, cache: None }
    }

    pub async fn get_filters(&mut self) -> Result<Vec<FilterSetting>, ApiError> {
        if let Some(ref cached) = self.cache {
            return Ok(cached.clone());
        }

        let url = self.api.endpoint(ENDPOINT);
        let filters: Vec<FilterSetting> = self.api.get_json(&url).await?;
        self.cache = Some(filters.clone());
        Ok(filters)
    }

    pub async fn upsert_filter(&mut self, filter: UpsertFilter) -> Result<FilterSetting, ApiError> {
        let url = self.api.endpoint(ENDPOINT);
        let setting: FilterSetting = self.api.post_json(&url, &filter).await?;
        self.cache = None;
        Ok(setting)
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}
