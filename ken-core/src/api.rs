//! HTTP client for the Ken backend.
//!
//! JSON endpoints wrap their payload in `{"status": …, "response": …}`; a null
//! or missing `response` is read as "nothing" (an empty list, or
//! [`ApiError::NotFound`] for single entities). Every request except workspace
//! creation carries the configured bearer credential. Non-2xx answers become
//! [`ApiError::Status`]. Nothing here retries.

use std::time::Duration;

use futures::Stream;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::chat::AgentQuery;
use crate::config::Config;
use crate::document::{ContentKind, DocumentContent};
use crate::error::{ApiError, StreamError};
use crate::pending::PendingWorkspace;
use crate::stream::{event_stream, StreamEvent};
use crate::types::{
    Activity, ApiResponse, CreatedWorkspace, Document, SearchResult, Workspace,
};

/// Cheaply clonable handle to the backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    secret: Option<String>,
}

impl ApiClient {
    /// Fails only when the TLS backend cannot be initialised.
    pub fn new(base_url: impl Into<String>, secret: Option<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            secret,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(config.api_url.clone(), config.api_secret.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.secret {
            Some(secret) => request.bearer_auth(secret),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(url = %response.url(), %status, "request failed");
            return Err(ApiError::from_status(status));
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, ApiError> {
        let body = self.send(request).await?.bytes().await?;
        let envelope: ApiResponse<T> = serde_json::from_slice(&body)?;
        Ok(envelope.response)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        let url = self.url(path);
        debug!(%url, "GET");
        self.fetch(self.authorized(self.client.get(url))).await
    }

    /// `GET /search_listed?query=`
    pub async fn search_listed(&self, query: &str) -> Result<Vec<SearchResult>, ApiError> {
        let url = self.url("/search_listed");
        debug!(%url, query, "GET");
        let request = self.authorized(self.client.get(url).query(&[("query", query)]));
        Ok(self.fetch(request).await?.unwrap_or_default())
    }

    /// `GET /data/workspace`
    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>, ApiError> {
        Ok(self.get("/data/workspace").await?.unwrap_or_default())
    }

    /// `GET /data/workspace/{id}`
    pub async fn get_workspace(&self, workspace_id: &str) -> Result<Workspace, ApiError> {
        self.get(&format!("/data/workspace/{workspace_id}"))
            .await?
            .ok_or_else(|| ApiError::NotFound("Workspace".to_owned()))
    }

    /// `POST /create_workspace` as multipart form. Sent without credentials.
    pub async fn create_workspace(
        &self,
        pending: &PendingWorkspace,
    ) -> Result<CreatedWorkspace, ApiError> {
        let mut form = Form::new().text("workspace_id", pending.workspace_id.clone());
        if let Some(ticker) = &pending.ticker {
            form = form.text("ticker", ticker.clone());
        }
        if let Some(file) = &pending.file {
            form = form.part("file", Part::bytes(file.bytes.clone()).file_name(file.name.clone()));
        }
        let url = self.url("/create_workspace");
        debug!(%url, workspace_id = %pending.workspace_id, "POST");
        self.fetch(self.client.post(url).multipart(form))
            .await?
            .ok_or_else(|| ApiError::NotFound("Workspace".to_owned()))
    }

    /// `GET /documents?workspace_id=`
    pub async fn list_documents(&self, workspace_id: &str) -> Result<Vec<Document>, ApiError> {
        let url = self.url("/documents");
        debug!(%url, workspace_id, "GET");
        let request = self.authorized(self.client.get(url).query(&[("workspace_id", workspace_id)]));
        Ok(self.fetch(request).await?.unwrap_or_default())
    }

    /// `GET /documents/{id}/download`, resolved into a content variant.
    pub async fn download_document(&self, document: &Document) -> Result<DocumentContent, ApiError> {
        let url = self.url(&format!("/documents/{}/download", document.id));
        debug!(%url, "GET");
        let response = self.send(self.authorized(self.client.get(url))).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let kind = ContentKind::resolve(content_type.as_deref(), document.file_name())?;
        let body = response.bytes().await?;
        DocumentContent::decode(kind, body)
    }

    /// `GET /data/activity?workspace_id=`
    pub async fn list_activities(&self, workspace_id: &str) -> Result<Vec<Activity>, ApiError> {
        let url = self.url("/data/activity");
        debug!(%url, workspace_id, "GET");
        let request = self.authorized(self.client.get(url).query(&[("workspace_id", workspace_id)]));
        Ok(self.fetch(request).await?.unwrap_or_default())
    }

    /// `POST /agent/query/stream`; returns the decoded event stream once the
    /// response headers arrive.
    pub async fn query_agent_stream(
        &self,
        query: &AgentQuery,
    ) -> Result<impl Stream<Item = Result<StreamEvent, StreamError>> + Send + 'static, ApiError> {
        let url = self.url("/agent/query/stream");
        debug!(%url, workspace_id = %query.workspace_id, "POST stream");
        let response = self
            .send(self.authorized(self.client.post(url).json(query)))
            .await?;
        Ok(event_stream(response.bytes_stream()))
    }
}
