//! REST client for a variable-set service exposing `/api/variable-sets`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::StoreError;
use crate::store::{validate_id, StoredVariableSet, VariableSet, VariableSetStore};

const STORE_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const STORE_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct HttpVariableStore {
    client: Client,
    collection: Url,
}

impl HttpVariableStore {
    pub fn new(base_url: &Url) -> Result<Self, StoreError> {
        let client = Client::builder()
            .no_proxy()
            .connect_timeout(STORE_HTTP_CONNECT_TIMEOUT)
            .timeout(STORE_HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Http(format!("Failed to create HTTP client: {}", e)))?;
        let collection = base_url
            .join("/api/variable-sets")
            .map_err(|e| StoreError::Http(format!("Invalid service URL: {}", e)))?;
        Ok(Self { client, collection })
    }

    pub fn collection_url(&self) -> &Url {
        &self.collection
    }

    fn item_url(&self, id: &str) -> Result<Url, StoreError> {
        validate_id(id)?;
        let mut url = self.collection.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Http("service URL cannot take a path".to_string()))?
            .push(id);
        Ok(url)
    }
}

#[async_trait]
impl VariableSetStore for HttpVariableStore {
    async fn list_variable_sets(&self) -> Result<BTreeMap<String, VariableSet>, StoreError> {
        let response = self
            .client
            .get(self.collection.clone())
            .send()
            .await
            .map_err(map_http_error)?;
        let response = check_status(response, None).await?;
        response.json().await.map_err(map_http_error)
    }

    async fn create_or_update(
        &self,
        id: Option<&str>,
        variable_set: VariableSet,
    ) -> Result<StoredVariableSet, StoreError> {
        variable_set.validate()?;
        let request = match id {
            Some(id) => self.client.put(self.item_url(id)?),
            None => self.client.post(self.collection.clone()),
        };
        let response = request
            .json(&variable_set)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = check_status(response, id).await?;
        let stored: StoredVariableSet = response.json().await.map_err(map_http_error)?;
        debug!(id = %stored.id, "variable set saved remotely");
        Ok(stored)
    }

    async fn delete_variable_set(&self, id: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.item_url(id)?)
            .send()
            .await
            .map_err(map_http_error)?;
        check_status(response, Some(id)).await?;
        Ok(())
    }
}

async fn check_status(response: Response, id: Option<&str>) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    Err(match (status, id) {
        (StatusCode::BAD_REQUEST, _) => StoreError::Validation(message),
        (StatusCode::NOT_FOUND, Some(id)) => StoreError::NotFound(id.to_string()),
        _ => StoreError::Http(format!("Request failed with status {}: {}", status, message)),
    })
}

fn map_http_error(error: reqwest::Error) -> StoreError {
    if error.is_timeout() {
        StoreError::Http(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        StoreError::Http(format!("Connection error: {}", error))
    } else if error.is_decode() {
        StoreError::Http(format!("Unexpected response body: {}", error))
    } else {
        StoreError::Http(format!("HTTP error: {}", error))
    }
}
