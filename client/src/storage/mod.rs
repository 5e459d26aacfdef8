//! # Storage Module
//!
//! Permission-routed data access for secure contexts:
//!
//! - **store** — the traits an actual document-store transport implements,
//!   plus the error contract (`NotFound` and `Conflict` stay
//!   distinguishable).
//! - **memory** — an in-process store for tests and local development.
//! - **engine** — the permission-routing layer: a `(read, write)` tuple in,
//!   the right database flavor with the right key material out.
//! - **database** — the CRUD façade: read-only gating, save lifecycle,
//!   record signatures, observers, and the sort-fix query rewrite.

pub mod database;
pub mod engine;
pub mod memory;
pub mod store;

pub use database::{Database, DatabaseObserver, QueryOptions, SaveOptions};
pub use engine::{DatabaseOptions, DatabasePermission, PermissionsConfig, StorageEngine};
pub use memory::{MemoryStore, MemoryStoreProvider};
pub use store::{
    DocumentStore, FindRequest, FindResponse, PutResult, SortDirection, SortSpec, StoreError,
    StoreOpenRequest, StoreProvider,
};
