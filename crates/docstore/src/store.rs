//! Workspace and document operations with bounded retries.
//!
//! [`RetryingStore`] owns one backend handle for its whole lifetime and runs
//! every operation through a single [`RetryPolicy`]. Each operation is one
//! retried unit: a transient failure anywhere inside it (say the delete step
//! of a `put`) restarts the whole sequence from the first remote call.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use serde_json::Value;

use crate::backend::DocumentBackend;
use crate::config::StoreConfig;
use crate::couch::CouchClient;
use crate::errors::{DocStoreError, Result};
use crate::retry::RetryPolicy;
use crate::types::{
    document_id, document_rev, is_reserved, strip_reserved, Document, Fetched, FieldUpdate,
    AUTH_USERS_DOCUMENT, AUTH_WORKSPACE, DESIGN_DOC_PREFIX, ID_FIELD, REV_FIELD,
};

/// Retry-wrapping adapter over a document database backend.
///
/// # Example
///
/// ```ignore
/// use triggerflow_docstore::{RetryingStore, StoreConfig};
///
/// let store = RetryingStore::connect(&StoreConfig::from_env()?).await?;
/// store.put("tasks", "t-1", &doc).await?;
/// let fields = store.get_document("tasks", "t-1").await?;
/// ```
#[derive(Clone)]
pub struct RetryingStore {
    backend: Arc<dyn DocumentBackend>,
    policy: RetryPolicy,
}

impl RetryingStore {
    /// Wrap an existing backend.
    pub fn new(backend: Arc<dyn DocumentBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Build the HTTP backend from `config` and verify the service is
    /// reachable before returning.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let backend = Arc::new(CouchClient::new(config)?);
        let store = Self::new(backend, RetryPolicy::with_config(config.retry.clone()));

        let backend = &store.backend;
        let server = store
            .policy
            .run("connect", || async move { backend.ping().await })
            .await?;
        info!(
            "Connected to document store at {} ({} {})",
            config.url,
            server.couchdb,
            server.version.as_deref().unwrap_or("unknown version")
        );

        Ok(store)
    }

    /// The shared backend handle.
    pub fn connection(&self) -> &Arc<dyn DocumentBackend> {
        &self.backend
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Workspaces
    // ─────────────────────────────────────────────────────────────────────────

    /// Create the workspace. Creating an existing workspace succeeds.
    pub async fn create_workspace(&self, workspace: &str) -> Result<()> {
        let backend = &self.backend;
        self.policy
            .run("create_workspace", || async move {
                backend.create_database(workspace).await
            })
            .await
    }

    pub async fn workspace_exists(&self, workspace: &str) -> Result<bool> {
        let backend = &self.backend;
        self.policy
            .run("workspace_exists", || async move {
                backend.database_exists(workspace).await
            })
            .await
    }

    /// Delete the workspace and everything in it; no-op if it does not exist.
    pub async fn delete_workspace(&self, workspace: &str) -> Result<()> {
        let backend = &self.backend;
        self.policy
            .run("delete_workspace", || async move {
                if !backend.database_exists(workspace).await? {
                    return Ok(());
                }
                match backend.delete_database(workspace).await {
                    // Deleted concurrently between the check and the delete
                    Err(DocStoreError::WorkspaceNotFound(_)) => Ok(()),
                    other => other,
                }
            })
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Store `data` under `document_id`, replacing any existing document.
    ///
    /// The workspace is created if needed. The previous document, if any, is
    /// deleted first, so fields absent from `data` do not survive.
    pub async fn put(&self, workspace: &str, document_id: &str, data: &Document) -> Result<()> {
        let mut body = data.clone();
        body.remove(REV_FIELD);
        body.insert(ID_FIELD.to_string(), Value::String(document_id.to_string()));

        let backend = &self.backend;
        let body = &body;
        let revision = self
            .policy
            .run("put", || async move {
                if !backend.database_exists(workspace).await? {
                    backend.create_database(workspace).await?;
                }
                if let Some(existing) = backend.fetch_document(workspace, document_id).await? {
                    if let Some(rev) = document_rev(&existing) {
                        backend.delete_document(workspace, document_id, rev).await?;
                    }
                }
                backend.save_document(workspace, document_id, body).await
            })
            .await?;

        debug!("Stored {}/{} at {}", workspace, revision.id, revision.rev);
        Ok(())
    }

    /// Fetch every document (`None`) or a single one (`Some(id)`).
    ///
    /// See [`get_all`](Self::get_all) and [`get_document`](Self::get_document).
    pub async fn get(&self, workspace: &str, document_id: Option<&str>) -> Result<Fetched> {
        match document_id {
            None => self.get_all(workspace).await.map(Fetched::All),
            Some(id) => self.get_document(workspace, id).await.map(Fetched::One),
        }
    }

    /// All documents of the workspace keyed by id, reserved fields stripped.
    ///
    /// Design documents are skipped. Fails with `WorkspaceNotFound` if the
    /// workspace does not exist.
    pub async fn get_all(&self, workspace: &str) -> Result<HashMap<String, Document>> {
        let backend = &self.backend;
        let docs = self
            .policy
            .run("get_all", || async move {
                if !backend.database_exists(workspace).await? {
                    return Err(DocStoreError::WorkspaceNotFound(workspace.to_string()));
                }
                backend.all_documents(workspace).await
            })
            .await?;

        let mut result = HashMap::with_capacity(docs.len());
        for mut doc in docs {
            let Some(id) = document_id(&doc).map(str::to_string) else {
                continue;
            };
            if id.starts_with(DESIGN_DOC_PREFIX) {
                continue;
            }
            strip_reserved(&mut doc);
            result.insert(id, doc);
        }
        Ok(result)
    }

    /// A single document's fields, reserved fields stripped.
    ///
    /// Fails with `WorkspaceNotFound` or `DocumentNotFound`.
    pub async fn get_document(&self, workspace: &str, document_id: &str) -> Result<Document> {
        let backend = &self.backend;
        let mut doc = self
            .policy
            .run("get_document", || async move {
                if !backend.database_exists(workspace).await? {
                    return Err(DocStoreError::WorkspaceNotFound(workspace.to_string()));
                }
                backend
                    .fetch_document(workspace, document_id)
                    .await?
                    .ok_or_else(|| DocStoreError::document_not_found(workspace, document_id))
            })
            .await?;

        strip_reserved(&mut doc);
        Ok(doc)
    }

    /// Delete the document; no-op if it (or its workspace) does not exist.
    pub async fn delete(&self, workspace: &str, document_id: &str) -> Result<()> {
        let backend = &self.backend;
        self.policy
            .run("delete", || async move {
                let existing = match backend.fetch_document(workspace, document_id).await {
                    Ok(doc) => doc,
                    Err(DocStoreError::WorkspaceNotFound(_)) => None,
                    Err(e) => return Err(e),
                };
                match existing.as_ref().and_then(document_rev) {
                    Some(rev) => backend.delete_document(workspace, document_id, rev).await,
                    None => {
                        debug!("Nothing to delete at {}/{}", workspace, document_id);
                        Ok(())
                    }
                }
            })
            .await
    }

    /// Whether the document exists. A missing workspace yields `false`.
    pub async fn document_exists(&self, workspace: &str, document_id: &str) -> Result<bool> {
        Ok(self.fetch_raw(workspace, document_id).await?.is_some())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fields
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether the document has `key`. A missing document or workspace, or a
    /// reserved `key`, yields `false`.
    pub async fn field_exists(&self, workspace: &str, document_id: &str, key: &str) -> Result<bool> {
        if is_reserved(key) {
            return Ok(false);
        }
        Ok(self
            .fetch_raw(workspace, document_id)
            .await?
            .is_some_and(|doc| doc.contains_key(key)))
    }

    /// The value of `key`, or `None` if the document does not have it.
    /// Reserved fields always read as `None`.
    ///
    /// Fails with `WorkspaceNotFound` or `DocumentNotFound` if the document
    /// itself is missing.
    pub async fn get_field(
        &self,
        workspace: &str,
        document_id: &str,
        key: &str,
    ) -> Result<Option<Value>> {
        let backend = &self.backend;
        let doc = self
            .policy
            .run("get_field", || async move {
                backend
                    .fetch_document(workspace, document_id)
                    .await?
                    .ok_or_else(|| DocStoreError::document_not_found(workspace, document_id))
            })
            .await?;

        if is_reserved(key) {
            return Ok(None);
        }
        Ok(doc.get(key).cloned())
    }

    /// Set `key` to `value` and save the document.
    ///
    /// A `null` value removes the field, as [`delete_field`](Self::delete_field) does.
    pub async fn set_field(
        &self,
        workspace: &str,
        document_id: &str,
        key: &str,
        value: Value,
    ) -> Result<()> {
        self.update_field(workspace, document_id, key, FieldUpdate::from(Some(value)))
            .await
    }

    /// Remove `key` from the document and save it.
    pub async fn delete_field(&self, workspace: &str, document_id: &str, key: &str) -> Result<()> {
        self.update_field(workspace, document_id, key, FieldUpdate::Remove)
            .await
    }

    /// Credentials entry for `username`, if any.
    pub async fn get_auth(&self, username: &str) -> Result<Option<Value>> {
        self.get_field(AUTH_WORKSPACE, AUTH_USERS_DOCUMENT, username)
            .await
    }

    /// Fetch-modify-save under the current revision. A concurrent writer
    /// makes the save fail with a conflict, which retries the whole cycle
    /// against the fresh revision.
    async fn update_field(
        &self,
        workspace: &str,
        document_id: &str,
        key: &str,
        update: FieldUpdate,
    ) -> Result<()> {
        if is_reserved(key) {
            return Err(DocStoreError::ReservedField(key.to_string()));
        }

        let backend = &self.backend;
        let update = &update;
        let revision = self
            .policy
            .run("update_field", || async move {
                let mut doc = backend
                    .fetch_document(workspace, document_id)
                    .await?
                    .ok_or_else(|| DocStoreError::document_not_found(workspace, document_id))?;
                update.apply(&mut doc, key);
                backend.save_document(workspace, document_id, &doc).await
            })
            .await?;

        debug!(
            "Updated field {} of {}/{} at {}",
            key, workspace, document_id, revision.rev
        );
        Ok(())
    }

    /// Fetch with reserved fields intact, treating a missing workspace as a
    /// missing document.
    async fn fetch_raw(&self, workspace: &str, document_id: &str) -> Result<Option<Document>> {
        let backend = &self.backend;
        self.policy
            .run("fetch", || async move {
                match backend.fetch_document(workspace, document_id).await {
                    Err(DocStoreError::WorkspaceNotFound(_)) => Ok(None),
                    other => other,
                }
            })
            .await
    }
}
