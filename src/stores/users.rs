use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiClient, ApiError};
use crate::roles::Role;

const ENDPOINT: &str = "users";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub full_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
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
pub struct NewUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Admin client for user records. GET list / by id, POST create, PUT
/// update with the id in the body; snapshot cache nulled on every write.
pub struct UserStore {
    api: ApiClient,
    cache: Option<Vec<User>>,
}

impl UserStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api, cache: None }
    }

    pub async fn get_users(&mut self) -> Result<Vec<User>, ApiError> {
        if let Some(ref cached) = self.cache {
            return Ok(cached.clone());
        }

        let url = self.api.endpoint(ENDPOINT);
        let users: Vec<User> = self.api.get_json(&url).await?;
        self.cache = Some(users.clone());
        Ok(users)
    }

    pub async fn get_user(&self, id: i64) -> Result<User, ApiError> {
        let url = format!("{}?id={}", self.api.endpoint(ENDPOINT), id);
        self.api.get_json(&url).await
    }

    pub async fn create_user(&mut self, user: NewUser) -> Result<User, ApiError> {
        let url = self.api.endpoint(ENDPOINT);
        let created: User = self.api.post_json(&url, &user).await?;
        self.cache = None;
        Ok(created)
    }

    /// Partial update; the backend expects the id in the request body.
    pub async fn update_user(
        &mut self,
        id: i64,
        patch: serde_json::Map<String, Value>,
    ) -> Result<User, ApiError> {
        let url = self.api.endpoint(ENDPOINT);
        let mut body = patch;
        body.insert("id".to_string(), Value::from(id));
        let updated: User = self.api.put_json(&url, &Value::Object(body)).await?;
        self.cache = None;
        Ok(updated)
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}
