use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiError};

const ENDPOINT: &str = "map-settings";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSetting {
    pub id: i64,
    pub setting_key: String,
    pub setting_value: String,
    #[serde(default)]
    pub description: Option<String>,
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

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpsertSetting<'a> {
    setting_key: &'a str,
    setting_value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

/// Key-value settings persisted on the backend, upserted by key. Also the
/// persistence channel for the visibility rule blobs.
pub struct SettingsStore {
    api: ApiClient,
    cache: Option<Vec<MapSetting>>,
}

impl SettingsStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api, cache: None }
    }

    pub async fn get_settings(&mut self) -> Result<Vec<MapSetting>, ApiError> {
        if let Some(ref cached) = self.cache {
            return Ok(cached.clone());
        }

        let url = self.api.endpoint(ENDPOINT);
        let settings: Vec<MapSetting> = self.api.get_json(&url).await?;
        self.cache = Some(settings.clone());
        Ok(settings)
    }

    pub async fn get_setting(&mut self, key: &str) -> Result<Option<String>, ApiError> {
        let settings = self.get_settings().await?;
        Ok(settings
            .into_iter()
            .find(|s| s.setting_key == key)
            .map(|s| s.setting_value))
    }

    pub async fn upsert_setting(
        &mut self,
        key: &str,
        value: &str,
        description: Option<&str>,
    ) -> Result<MapSetting, ApiError> {
        let url = self.api.endpoint(ENDPOINT);
        let body = UpsertSetting {
            setting_key: key,
            setting_value: value,
            description,
        };
        let setting: MapSetting = self.api.post_json(&url, &body).await?;
        self.cache = None;
        Ok(setting)
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}
