//! Error types and retry classification for the document store crate.
//!
//! This module provides:
//! - [`DocStoreError`]: The error enum for all document store operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for document store operations.
pub type Result<T> = std::result::Result<T, DocStoreError>;

/// Errors that can occur during document store operations.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method, which the retry policy uses to
/// tell transient failures from logical ones.
#[derive(Error, Debug)]
pub enum DocStoreError {
    /// The workspace (database) does not exist.
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    /// The document does not exist in an existing workspace.
    #[error("Document not found: {workspace}/{document_id}")]
    DocumentNotFound {
        /// Workspace that was searched
        workspace: String,
        /// Identifier of the missing document
        document_id: String,
    },

    /// Error response returned by the database service.
    #[error("API error ({status}): {error} - {reason}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Short error code from the response body (e.g. "conflict")
        error: String,
        /// Human readable reason from the response body
        reason: String,
    },

    /// A field operation named `_id` or `_rev`, which only the store manages.
    #[error("Reserved field: {0}")]
    ReservedField(String),

    /// Credentials were rejected (HTTP 401/403).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Configuration is missing or malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A network error occurred while talking to the service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DocStoreError {
    /// Create an API error from status and the response's error/reason pair.
    pub fn api(status: u16, error: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Api {
            status,
            error: error.into(),
            reason: reason.into(),
        }
    }

    /// Create a document-not-found error.
    pub fn document_not_found(workspace: &str, document_id: &str) -> Self {
        Self::DocumentNotFound {
            workspace: workspace.to_string(),
            document_id: document_id.to_string(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// True for both workspace- and document-level not-found errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::WorkspaceNotFound(_) | Self::DocumentNotFound { .. }
        )
    }

    /// Returns the retry classification for this error.
    ///
    /// - [`RetryClass::WithBackoff`]: communication failures, server errors,
    ///   rate limiting and revision conflicts
    /// - [`RetryClass::Never`]: everything else, returned to the caller as is
    ///
    /// # Examples
    ///
    /// ```
    /// use triggerflow_docstore::errors::{DocStoreError, RetryClass};
    ///
    /// let error = DocStoreError::api(503, "service_unavailable", "try again");
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = DocStoreError::WorkspaceNotFound("tasks".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Api { status, .. } => {
                let status = *status;
                if status >= 500
                    || status == StatusCode::TOO_MANY_REQUESTS.as_u16()
                    || status == StatusCode::CONFLICT.as_u16()
                {
                    RetryClass::WithBackoff
                } else {
                    RetryClass::Never
                }
            }

            Self::Http(e) => {
                if e.is_connect() || e.is_timeout() || e.is_request() || e.is_body() {
                    RetryClass::WithBackoff
                } else {
                    RetryClass::Never
                }
            }

            Self::WorkspaceNotFound(_)
            | Self::DocumentNotFound { .. }
            | Self::ReservedField(_)
            | Self::Auth(_)
            | Self::InvalidConfig(_)
            | Self::Json(_) => RetryClass::Never,
        }
    }
}
