use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;

/// Failure talking to a backend endpoint. Non-2xx responses always carry
/// the HTTP status so callers can distinguish NotFound from the rest.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Record not found")]
    NotFound,

    #[error("Backend error ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Thin JSON transport over the backend function endpoints. Endpoints are
/// looked up by logical name through the config's endpoint map.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    config: Config,
}

impl ApiClient {
    pub fn new(config: Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn endpoint(&self, name: &str) -> String {
        self.config.endpoint_url(name)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.client.get(url).send().await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.client.post(url).json(body).send().await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.client.put(url).json(body).send().await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    /// PUT where the caller does not care about the response body.
    pub async fn put_unit<B: Serialize>(&self, url: &str, body: &B) -> Result<(), ApiError> {
        let response = self.client.put(url).json(body).send().await?;
        check(response).await?;
        Ok(())
    }

    pub async fn delete(&self, url: &str) -> Result<(), ApiError> {
        let response = self.client.delete(url).send().await?;
        check(response).await?;
        Ok(())
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status { status, body })
}
