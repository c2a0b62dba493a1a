//! Triggerflow Document Store - retrying client for Cloudant and CouchDB.
//!
//! This crate exposes workspace (database) and document operations over a
//! remote document database. Every operation runs in a bounded retry loop:
//! transient failures (connection errors, timeouts, 5xx, 429, revision
//! conflicts) are retried after a random pause of up to one second, for at
//! most 15 attempts; logical failures such as a missing workspace are
//! returned immediately.
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  RetryingStore   |  (workspace / document / field operations)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |   RetryPolicy    |  (attempt budget, random backoff, RetryClass)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | DocumentBackend  |  (primitive remote calls)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |   CouchClient    |  (reqwest over the CouchDB REST API)
//! +------------------+
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use triggerflow_docstore::{RetryingStore, StoreConfig};
//!
//! let config = StoreConfig::new("account", "token", "https://account.cloudant.com");
//! let store = RetryingStore::connect(&config).await?;
//!
//! store.put("workspace-1", "trigger-1", &fields).await?;
//! let state = store.get_field("workspace-1", "trigger-1", "state").await?;
//! ```

pub mod backend;
pub mod config;
pub mod couch;
pub mod errors;
pub mod retry;
pub mod store;
pub mod types;

pub use backend::DocumentBackend;
pub use config::StoreConfig;
pub use couch::CouchClient;
pub use errors::{DocStoreError, Result, RetryClass};
pub use retry::{RetryConfig, RetryPolicy};
pub use store::RetryingStore;
pub use types::{Document, DocumentRevision, Fetched, FieldUpdate, ServerInfo};
