use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiClient, ApiError};

const ENDPOINT: &str = "companies";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
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
pub struct NewCompany {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Admin client for company records, same shape and caching policy as the
/// user store.
pub struct CompanyStore {
    api: ApiClient,
    cache: Option<Vec<Company>>,
}

impl CompanyStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api, cache: None }
    }

    pub async fn get_companies(&mut self) -> Result<Vec<Company>, ApiError> {
        if let Some(ref cached) = self.cache {
            return Ok(cached.clone());
        }

        let url = self.api.endpoint(ENDPOINT);
        let companies: Vec<Company> = self.api.get_json(&url).await?;
        self.cache = Some(companies.clone());
        Ok(companies)
    }

    pub async fn get_company(&self, id: i64) -> Result<Company, ApiError> {
        let url = format!("{}?id={}", self.api.endpoint(ENDPOINT), id);
        self.api.get_json(&url).await
    }

    pub async fn create_company(&mut self, company: NewCompany) -> Result<Company, ApiError> {
        let url = self.api.endpoint(ENDPOINT);
        let created: Company = self.api.post_json(&url, &company).await?;
        self.cache = None;
        Ok(created)
    }

    pub async fn update_company(
        &mut self,
        id: i64,
        patch: serde_json::Map<String, Value>,
    ) -> Result<Company, ApiError> {
        let url = self.api.endpoint(ENDPOINT);
        let mut body = patch;
        body.insert("id".to_string(), Value::from(id));
        let updated: Company = self.api.put_json(&url, &Value::Object(body)).await?;
        self.cache = None;
        Ok(updated)
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}
