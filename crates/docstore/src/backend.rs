//! Backend trait definitions.
//!
//! This module defines the `DocumentBackend` trait: the primitive remote
//! calls the retrying store is built from. Implementations do not retry;
//! they report failures through [`DocStoreError`] and let the caller's
//! retry policy decide.

use async_trait::async_trait;

use crate::errors::Result;
use crate::types::{Document, DocumentRevision, ServerInfo};

/// Trait for document database backends.
///
/// The production implementation is [`CouchClient`](crate::couch::CouchClient).
/// Error contract shared by all implementations:
///
/// - missing workspace where one is required: [`DocStoreError::WorkspaceNotFound`]
/// - communication and server failures: errors classified as
///   [`RetryClass::WithBackoff`](crate::errors::RetryClass::WithBackoff)
/// - revision mismatch on save or delete: `DocStoreError::Api` with status 409
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Check that the service is reachable and the credentials are accepted.
    async fn ping(&self) -> Result<ServerInfo>;

    async fn database_exists(&self, db: &str) -> Result<bool>;

    /// Create the database. Succeeds when it already exists.
    async fn create_database(&self, db: &str) -> Result<()>;

    /// Delete the database, or fail with `WorkspaceNotFound`.
    async fn delete_database(&self, db: &str) -> Result<()>;

    /// Fetch a document including its reserved fields.
    ///
    /// Returns `Ok(None)` when the database exists but the document does not.
    async fn fetch_document(&self, db: &str, id: &str) -> Result<Option<Document>>;

    /// Every document in the database, reserved fields included.
    async fn all_documents(&self, db: &str) -> Result<Vec<Document>>;

    /// Write `doc` under `id`.
    ///
    /// A document without `_rev` is created; with `_rev` it replaces that
    /// revision. A stale or missing revision fails with a 409 conflict.
    async fn save_document(&self, db: &str, id: &str, doc: &Document)
        -> Result<DocumentRevision>;

    /// Delete revision `rev` of a document. Deleting a missing document succeeds.
    async fn delete_document(&self, db: &str, id: &str, rev: &str) -> Result<()>;
}
