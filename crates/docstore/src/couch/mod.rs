//! HTTP backend for CouchDB and IBM Cloudant.
//!
//! Talks to the service's REST API with `reqwest`, authenticating every
//! request with the account and token from [`StoreConfig`]. This client
//! never retries; see [`RetryingStore`](crate::RetryingStore).

mod models;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use urlencoding::encode;

use crate::backend::DocumentBackend;
use crate::config::StoreConfig;
use crate::errors::{DocStoreError, Result};
use crate::types::{Document, DocumentRevision, ServerInfo};

use models::{AllDocsResponse, CouchErrorResponse};

/// Client for the CouchDB/Cloudant REST API.
#[derive(Debug, Clone)]
pub struct CouchClient {
    client: reqwest::Client,
    base_url: String,
    account: String,
    auth_token: String,
}

impl CouchClient {
    /// Create a new client. No request is made until the first call.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(DocStoreError::invalid_config("service URL is empty"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            account: config.account.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn db_url(&self, db: &str) -> String {
        format!("{}/{}", self.base_url, encode(db))
    }

    fn doc_url(&self, db: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, encode(db), encode(id))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!("{} {}", method, url);
        self.client
            .request(method, url)
            .basic_auth(&self.account, Some(&self.auth_token))
    }

    /// Read an error body, falling back to the status text when it is empty
    /// or not JSON (HEAD responses carry no body).
    async fn read_error(response: Response) -> (StatusCode, CouchErrorResponse) {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!("API error response ({}): {}", status, body);

        let mut parsed = serde_json::from_str::<CouchErrorResponse>(&body).unwrap_or_default();
        if parsed.error.is_empty() {
            parsed.error = status
                .canonical_reason()
                .unwrap_or("unknown")
                .to_lowercase()
                .replace(' ', "_");
        }
        if parsed.reason.is_empty() {
            parsed.reason = body;
        }
        (status, parsed)
    }

    fn into_error(status: StatusCode, body: CouchErrorResponse) -> DocStoreError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                DocStoreError::Auth(format!("{}: {}", body.error, body.reason))
            }
            _ => DocStoreError::api(status.as_u16(), body.error, body.reason),
        }
    }

    async fn error_from(response: Response) -> DocStoreError {
        let (status, body) = Self::read_error(response).await;
        Self::into_error(status, body)
    }

    /// Parse a JSON response body, turning non-success statuses into errors.
    async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            log::error!("Failed to deserialize response. Body: {}, Error: {}", body, e);
            DocStoreError::from(e)
        })
    }
}

#[async_trait]
impl DocumentBackend for CouchClient {
    /// GET /
    async fn ping(&self) -> Result<ServerInfo> {
        let url = format!("{}/", self.base_url);
        let response = self.request(Method::GET, &url).send().await?;
        Self::parse_response(response).await
    }

    /// HEAD /{db}
    async fn database_exists(&self, db: &str) -> Result<bool> {
        let response = self.request(Method::HEAD, &self.db_url(db)).send().await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::error_from(response).await),
        }
    }

    /// PUT /{db}
    async fn create_database(&self, db: &str) -> Result<()> {
        let response = self.request(Method::PUT, &self.db_url(db)).send().await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::PRECONDITION_FAILED => {
                debug!("Database {} already exists", db);
                Ok(())
            }
            _ => Err(Self::error_from(response).await),
        }
    }

    /// DELETE /{db}
    async fn delete_database(&self, db: &str) -> Result<()> {
        let response = self.request(Method::DELETE, &self.db_url(db)).send().await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(DocStoreError::WorkspaceNotFound(db.to_string())),
            _ => Err(Self::error_from(response).await),
        }
    }

    /// GET /{db}/{id}
    async fn fetch_document(&self, db: &str, id: &str) -> Result<Option<Document>> {
        let response = self
            .request(Method::GET, &self.doc_url(db, id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            let (_, body) = Self::read_error(response).await;
            if body.is_missing_database() {
                return Err(DocStoreError::WorkspaceNotFound(db.to_string()));
            }
            return Ok(None);
        }

        Self::parse_response(response).await.map(Some)
    }

    /// GET /{db}/_all_docs?include_docs=true
    async fn all_documents(&self, db: &str) -> Result<Vec<Document>> {
        let url = format!("{}/_all_docs", self.db_url(db));
        let response = self
            .request(Method::GET, &url)
            .query(&[("include_docs", "true")])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(DocStoreError::WorkspaceNotFound(db.to_string()));
        }

        let all: AllDocsResponse = Self::parse_response(response).await?;
        Ok(all.rows.into_iter().filter_map(|row| row.doc).collect())
    }

    /// PUT /{db}/{id}
    async fn save_document(
        &self,
        db: &str,
        id: &str,
        doc: &Document,
    ) -> Result<DocumentRevision> {
        let response = self
            .request(Method::PUT, &self.doc_url(db, id))
            .json(doc)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            let (status, body) = Self::read_error(response).await;
            if body.is_missing_database() {
                return Err(DocStoreError::WorkspaceNotFound(db.to_string()));
            }
            return Err(Self::into_error(status, body));
        }

        Self::parse_response(response).await
    }

    /// DELETE /{db}/{id}?rev={rev}
    async fn delete_document(&self, db: &str, id: &str, rev: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, &self.doc_url(db, id))
            .query(&[("rev", rev)])
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!("Document {}/{} already gone", db, id);
                Ok(())
            }
            _ => Err(Self::error_from(response).await),
        }
    }
}
