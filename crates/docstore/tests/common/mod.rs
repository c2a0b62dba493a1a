#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use triggerflow_docstore::backend::DocumentBackend;
use triggerflow_docstore::types::{document_rev, ID_FIELD, REV_FIELD};
use triggerflow_docstore::{
    DocStoreError, Document, DocumentRevision, Result, RetryConfig, RetryPolicy, RetryingStore,
    ServerInfo,
};

/// In-memory backend with CouchDB-like revision checks and fault injection.
#[derive(Default)]
pub struct MemoryBackend {
    databases: Mutex<HashMap<String, BTreeMap<String, Document>>>,
    calls: AtomicUsize,
    pending_failures: AtomicUsize,
    pending_conflicts: AtomicUsize,
    rev_counter: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `n` calls fail with a 503.
    pub fn fail_next(&self, n: usize) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` saves fail with a 409 conflict.
    pub fn conflict_next_saves(&self, n: usize) {
        self.pending_conflicts.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    /// Raw stored document, reserved fields included.
    pub fn raw(&self, db: &str, id: &str) -> Option<Document> {
        self.databases
            .lock()
            .unwrap()
            .get(db)
            .and_then(|docs| docs.get(id).cloned())
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(DocStoreError::api(
                503,
                "service_unavailable",
                "injected failure",
            ));
        }
        Ok(())
    }

    fn next_rev(&self, current: Option<&str>) -> String {
        let generation = current
            .and_then(|rev| rev.split('-').next())
            .and_then(|g| g.parse::<u64>().ok())
            .unwrap_or(0);
        let n = self.rev_counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{:08x}", generation + 1, n)
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn ping(&self) -> Result<ServerInfo> {
        self.enter()?;
        Ok(ServerInfo {
            couchdb: "Welcome".to_string(),
            version: Some("memory".to_string()),
        })
    }

    async fn database_exists(&self, db: &str) -> Result<bool> {
        self.enter()?;
        Ok(self.databases.lock().unwrap().contains_key(db))
    }

    async fn create_database(&self, db: &str) -> Result<()> {
        self.enter()?;
        self.databases
            .lock()
            .unwrap()
            .entry(db.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_database(&self, db: &str) -> Result<()> {
        self.enter()?;
        match self.databases.lock().unwrap().remove(db) {
            Some(_) => Ok(()),
            None => Err(DocStoreError::WorkspaceNotFound(db.to_string())),
        }
    }

    async fn fetch_document(&self, db: &str, id: &str) -> Result<Option<Document>> {
        self.enter()?;
        let databases = self.databases.lock().unwrap();
        let docs = databases
            .get(db)
            .ok_or_else(|| DocStoreError::WorkspaceNotFound(db.to_string()))?;
        Ok(docs.get(id).cloned())
    }

    async fn all_documents(&self, db: &str) -> Result<Vec<Document>> {
        self.enter()?;
        let databases = self.databases.lock().unwrap();
        let docs = databases
            .get(db)
            .ok_or_else(|| DocStoreError::WorkspaceNotFound(db.to_string()))?;
        Ok(docs.values().cloned().collect())
    }

    async fn save_document(
        &self,
        db: &str,
        id: &str,
        doc: &Document,
    ) -> Result<DocumentRevision> {
        self.enter()?;
        let injected = self
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(conflict("Document update conflict."));
        }

        let mut databases = self.databases.lock().unwrap();
        let docs = databases
            .get_mut(db)
            .ok_or_else(|| DocStoreError::WorkspaceNotFound(db.to_string()))?;

        let current = docs.get(id).and_then(document_rev).map(str::to_string);
        if current.as_deref() != document_rev(doc) {
            return Err(conflict("Document update conflict."));
        }

        let rev = self.next_rev(current.as_deref());
        let mut stored = doc.clone();
        stored.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        stored.insert(REV_FIELD.to_string(), Value::String(rev.clone()));
        docs.insert(id.to_string(), stored);

        Ok(DocumentRevision {
            id: id.to_string(),
            rev,
        })
    }

    async fn delete_document(&self, db: &str, id: &str, rev: &str) -> Result<()> {
        self.enter()?;
        let mut databases = self.databases.lock().unwrap();
        let Some(docs) = databases.get_mut(db) else {
            return Ok(());
        };
        let current = docs.get(id).and_then(document_rev).map(str::to_string);
        match current.as_deref() {
            None => Ok(()),
            Some(current) if current == rev => {
                docs.remove(id);
                Ok(())
            }
            Some(_) => Err(conflict("Document update conflict.")),
        }
    }
}

/// Conflict error as produced by the service on a revision mismatch.
fn conflict(reason: &str) -> DocStoreError {
    DocStoreError::api(409, "conflict", reason)
}

/// Store over `backend` with the default attempt budget and no pauses.
pub fn fast_store(backend: Arc<MemoryBackend>) -> RetryingStore {
    RetryingStore::new(
        backend,
        RetryPolicy::with_config(RetryConfig {
            max_attempts: 15,
            max_backoff: Duration::ZERO,
        }),
    )
}

pub fn doc(value: Value) -> Document {
    value
        .as_object()
        .cloned()
        .expect("test document must be a JSON object")
}
