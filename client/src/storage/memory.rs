//! # In-Memory Document Store
//!
//! A [`DocumentStore`]/[`StoreProvider`] pair living entirely in process
//! memory. Ideal for unit tests: no server, no credentials, no cleanup.
//!
//! The selector engine implements the subset of the Mango query language
//! this crate's own query path produces: direct equality, `$and`, and the
//! `$gt`/`$gte`/`$lt`/`$lte` comparison operators under the standard
//! collation order (null < booleans < numbers < strings < arrays <
//! objects). That collation is what makes the `{field: {$gt: true}}`
//! sort-fix clause match every real value of a field.
//!
//! Revision handling follows the usual optimistic-concurrency contract:
//! writes must present the current `_rev` (or none, for new records), and
//! a stale or unexpected revision is a [`StoreError::Conflict`]. Deletions
//! keep a tombstone so a deleted id reads as not-found rather than blank.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use super::store::{
    DocumentStore, FindRequest, FindResponse, PutResult, SortDirection, StoreError,
    StoreOpenRequest, StoreProvider,
};

/// An in-memory database. Cheap to create, gone when dropped.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-deleted) records.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .values()
            .filter(|record| !is_deleted(record))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn put(&self, mut record: Value) -> Result<PutResult, StoreError> {
        let Some(id) = record.get("_id").and_then(Value::as_str).map(str::to_owned) else {
            return Err(StoreError::upstream("record is missing an _id"));
        };

        let mut records = self.records.lock();
        let submitted_rev = record.get("_rev").and_then(Value::as_str).map(str::to_owned);
        let current_rev = records
            .get(&id)
            .and_then(|existing| existing.get("_rev"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        // Optimistic concurrency: the submitted revision must match the
        // stored one exactly (both absent counts as a match for creation).
        if submitted_rev != current_rev {
            return Err(StoreError::Conflict(id));
        }

        let generation = current_rev
            .as_deref()
            .and_then(|rev| rev.split('-').next())
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(0);
        let new_rev = format!("{}-{}", generation + 1, Uuid::new_v4().simple());

        record["_rev"] = Value::String(new_rev.clone());
        records.insert(id.clone(), record);

        Ok(PutResult { id, rev: new_rev })
    }

    async fn get(&self, id: &str) -> Result<Value, StoreError> {
        let records = self.records.lock();
        match records.get(id) {
            Some(record) if !is_deleted(record) => Ok(record.clone()),
            _ => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn find(&self, request: FindRequest) -> Result<FindResponse, StoreError> {
        let records = self.records.lock();
        let mut docs: Vec<Value> = records
            .values()
            .filter(|record| !is_deleted(record))
            .filter(|record| matches_selector(&request.selector, record))
            .cloned()
            .collect();
        drop(records);

        for spec in request.sort.iter().rev() {
            docs.sort_by(|a, b| {
                let ordering = collate(
                    a.get(&spec.field).unwrap_or(&Value::Null),
                    b.get(&spec.field).unwrap_or(&Value::Null),
                );
                match spec.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        let skip = request.skip.unwrap_or(0);
        let docs: Vec<Value> = docs
            .into_iter()
            .skip(skip)
            .take(request.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(FindResponse {
            docs,
            warning: None,
        })
    }
}

/// Hands out one [`MemoryStore`] per `(context, database)` pair, shared
/// across opens so separate database handles observe each other's writes
/// the way they would against a real server.
#[derive(Default)]
pub struct MemoryStoreProvider {
    stores: DashMap<String, Arc<MemoryStore>>,
}

impl MemoryStoreProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreProvider for MemoryStoreProvider {
    async fn open(&self, request: StoreOpenRequest) -> Result<Arc<dyn DocumentStore>, StoreError> {
        // The at-rest encryption key is a property of the real server
        // binding; the in-memory double holds records in the clear.
        let key = format!("{}/{}", request.context_id, request.database_name);
        let store = self
            .stores
            .entry(key)
            .or_insert_with(|| Arc::new(MemoryStore::new()))
            .clone();
        Ok(store)
    }
}

// ---------------------------------------------------------------------------
// Selector evaluation
// ---------------------------------------------------------------------------

fn is_deleted(record: &Value) -> bool {
    record.get("_deleted").and_then(Value::as_bool).unwrap_or(false)
}

/// Evaluate a Mango-subset selector against a record.
fn matches_selector(selector: &Value, record: &Value) -> bool {
    match selector {
        Value::Null => true,
        Value::Object(clauses) => clauses.iter().all(|(key, condition)| match key.as_str() {
            "$and" => condition
                .as_array()
                .is_some_and(|cs| cs.iter().all(|c| matches_selector(c, record))),
            "$or" => condition
                .as_array()
                .is_some_and(|cs| cs.iter().any(|c| matches_selector(c, record))),
            field => field_matches(record.get(field), condition),
        }),
        _ => false,
    }
}

fn field_matches(actual: Option<&Value>, condition: &Value) -> bool {
    match condition {
        Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
            let Some(actual) = actual else {
                return false;
            };
            ops.iter().all(|(op, operand)| match op.as_str() {
                "$eq" => actual == operand,
                "$ne" => actual != operand,
                "$gt" => collate(actual, operand) == Ordering::Greater,
                "$gte" => collate(actual, operand) != Ordering::Less,
                "$lt" => collate(actual, operand) == Ordering::Less,
                "$lte" => collate(actual, operand) != Ordering::Greater,
                _ => false,
            })
        }
        expected => actual == Some(expected),
    }
}

/// The collation order over JSON values: null < false < true < numbers <
/// strings < arrays < objects.
fn collate(a: &Value, b: &Value) -> Ordering {
    let rank = |v: &Value| match v {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    };
    match rank(a).cmp(&rank(b)) {
        Ordering::Equal => match (a, b) {
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Array(x), Value::Array(y)) => {
                for (ex, ey) in x.iter().zip(y.iter()) {
                    let ordering = collate(ex, ey);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                x.len().cmp(&y.len())
            }
            _ => Ordering::Equal,
        },
        unequal => unequal,
    }
}
