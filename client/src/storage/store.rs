//! # Document Store Interface
//!
//! The client-side view of the append-only document store behind a
//! context's database server: put a record, get a record, run a selector
//! query. Transport, authentication, and retry policy live behind the
//! traits; this crate never retries on its own.
//!
//! [`StoreError`] keeps `NotFound` and `Conflict` distinguishable from
//! generic transport failures, because callers make different decisions on
//! each: create-on-demand, surface-the-stale-revision, and give-up
//! respectively.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::SYM_KEY_LENGTH;

/// Errors surfaced by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record does not exist (or is deleted).
    #[error("record not found: {0}")]
    NotFound(String),

    /// The write carried a stale or missing revision.
    #[error("revision conflict: {0}")]
    Conflict(String),

    /// Anything else: transport failures, malformed requests, server
    /// errors. The original cause is attached when there is one.
    #[error("{context}")]
    Upstream {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// An upstream failure with a description only.
    pub fn upstream(context: impl Into<String>) -> Self {
        StoreError::Upstream {
            context: context.into(),
            source: None,
        }
    }

    /// An upstream failure wrapping an underlying error.
    pub fn upstream_with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::Upstream {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Sort direction for a query field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// One field of a query's sort specification.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// A selector query against a store.
#[derive(Debug, Clone, Default)]
pub struct FindRequest {
    /// Mango-style selector (`{field: value}`, `$and`, `$gt`, ...).
    pub selector: Value,
    pub sort: Vec<SortSpec>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

/// The raw engine response for a find.
#[derive(Debug, Clone, Default)]
pub struct FindResponse {
    pub docs: Vec<Value>,
    /// Engine warnings (e.g. "no matching index"), when the backend
    /// produces them.
    pub warning: Option<String>,
}

/// The store's acknowledgment of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResult {
    pub id: String,
    pub rev: String,
}

/// One database binding on a document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write a record. The record must carry `_id`; it must carry the
    /// current `_rev` when updating an existing record, and no `_rev` when
    /// creating one. Violations surface as [`StoreError::Conflict`].
    async fn put(&self, record: Value) -> Result<PutResult, StoreError>;

    /// Fetch a record by id. Deleted records are [`StoreError::NotFound`].
    async fn get(&self, id: &str) -> Result<Value, StoreError>;

    /// Run a selector query.
    async fn find(&self, request: FindRequest) -> Result<FindResponse, StoreError>;
}

/// Everything a store binding needs to come into existence.
#[derive(Clone)]
pub struct StoreOpenRequest {
    pub database_name: String,
    /// The context's database server endpoint.
    pub endpoint_uri: String,
    /// The context hash the database belongs to.
    pub context_id: String,
    /// At-rest encryption key, present for owner-encrypted databases.
    pub encryption_key: Option<[u8; SYM_KEY_LENGTH]>,
}

impl std::fmt::Debug for StoreOpenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The encryption key never hits logs; report only its presence.
        f.debug_struct("StoreOpenRequest")
            .field("database_name", &self.database_name)
            .field("endpoint_uri", &self.endpoint_uri)
            .field("context_id", &self.context_id)
            .field("encrypted", &self.encryption_key.is_some())
            .finish()
    }
}

/// Constructs store bindings for (context, database, key) triples.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    async fn open(&self, request: StoreOpenRequest) -> Result<Arc<dyn DocumentStore>, StoreError>;
}
