//! HTTP client for the hosted document store.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::{json, Value};

use super::{Collection, RemoteBackend};
use crate::config::RemoteConfig;
use crate::errors::AppError;

/// Header carrying the project API key.
pub const REMOTE_API_KEY_HEADER: &str = "x-api-key";

/// Document store reached over HTTP.
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: Url,
    project_id: String,
    api_key: String,
}

impl HttpRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            AppError::Remote(format!("Invalid remote URL {}: {}", config.base_url, e))
        })?;

        Ok(Self {
            client,
            base_url,
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Project endpoint under the base URL. Each segment is percent-encoded.
    fn project_url(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AppError::Remote(format!("Remote URL {} cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v1", "projects", self.project_id.as_str()])
            .extend(segments);
        Ok(url)
    }

    fn collection_url(&self, collection: Collection) -> Result<Url, AppError> {
        self.project_url(&["collections", collection.as_str(), "documents"])
    }

    fn document_url(&self, collection: Collection, id: &str) -> Result<Url, AppError> {
        self.project_url(&["collections", collection.as_str(), "documents", id])
    }
}

#[async_trait]
impl RemoteBackend for HttpRemote {
    async fn fetch_collection(&self, collection: Collection) -> Result<Vec<Value>, AppError> {
        let documents = self
            .client
            .get(self.collection_url(collection)?)
            .header(REMOTE_API_KEY_HEADER, &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Value>>()
            .await?;

        Ok(documents)
    }

    async fn upsert_document(
        &self,
        collection: Collection,
        id: &str,
        document: &Value,
    ) -> Result<(), AppError> {
        self.client
            .put(self.document_url(collection, id)?)
            .header(REMOTE_API_KEY_HEADER, &self.api_key)
            .json(document)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn delete_document(&self, collection: Collection, id: &str) -> Result<(), AppError> {
        let response = self
            .client
            .delete(self.document_url(collection, id)?)
            .header(REMOTE_API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        response.error_for_status()?;

        Ok(())
    }

    async fn sign_in(&self, username: &str, password: &str) -> Result<bool, AppError> {
        let response = self
            .client
            .post(self.project_url(&["auth", "sign-in"])?)
            .header(REMOTE_API_KEY_HEADER, &self.api_key)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            status => Err(AppError::Remote(format!(
                "Sign-in endpoint answered {}",
                status
            ))),
        }
    }
}
