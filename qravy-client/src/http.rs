//! HTTP client for the qravy-cloud tenant API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{
    BulkVisibilityRequest, BulkVisibilityResult, CatalogEntity, DeleteQuery, DeleteResult,
    EntityCreate, EntityKind, EntityUpdate, ListQuery, Location,
};

use crate::{CatalogApi, ClientConfig, ClientError, ClientResult};

/// HTTP client for making network requests to qravy-cloud
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the current token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = self.authorized(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            tracing::debug!(%status, "Request failed: {text}");
            return Err(ClientError::from_status(status, &text));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Make a GET request with query parameters
    pub async fn get<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> ClientResult<T> {
        self.send(self.client.get(self.url(path)).query(query)).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send(self.client.put(self.url(path)).json(body)).await
    }

    /// Make a DELETE request with query parameters
    pub async fn delete_with<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> ClientResult<T> {
        self.send(self.client.delete(self.url(path)).query(query)).await
    }
}

fn collection(kind: EntityKind) -> String {
    format!("/api/tenant/{}", kind.path())
}

#[async_trait]
impl CatalogApi for HttpClient {
    async fn list(&self, kind: EntityKind, query: &ListQuery) -> ClientResult<Vec<CatalogEntity>> {
        self.get(&collection(kind), query).await
    }

    async fn create(&self, kind: EntityKind, payload: &EntityCreate) -> ClientResult<CatalogEntity> {
        self.post(&collection(kind), payload).await
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: i64,
        payload: &EntityUpdate,
    ) -> ClientResult<CatalogEntity> {
        self.put(&format!("{}/{id}", collection(kind)), payload).await
    }

    async fn delete(&self, kind: EntityKind, id: i64, query: DeleteQuery) -> ClientResult<DeleteResult> {
        self.delete_with(&format!("{}/{id}", collection(kind)), &query)
            .await
    }

    async fn set_visibility(
        &self,
        kind: EntityKind,
        request: &BulkVisibilityRequest,
    ) -> ClientResult<BulkVisibilityResult> {
        self.post(&format!("{}/visibility", collection(kind)), request)
            .await
    }

    async fn locations(&self) -> ClientResult<Vec<Location>> {
        self.send(self.client.get(self.url("/api/tenant/locations")))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = ClientConfig::new("http://localhost:8080/")
            .with_token("t")
            .build_http_client()
            .unwrap();
        assert_eq!(client.url("/api/tenant/items"), "http://localhost:8080/api/tenant/items");
        assert_eq!(client.token(), Some("t"));
        assert_eq!(collection(EntityKind::Category), "/api/tenant/categories");
    }
}
