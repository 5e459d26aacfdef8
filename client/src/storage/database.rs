//! # Database
//!
//! The CRUD façade over one store binding: read-only gating, the
//! insert/update lifecycle (timestamps, per-record signatures), the
//! default query limit, and the sort-fix selector rewrite.
//!
//! ## Save lifecycle
//!
//! A save is an insert when the record has no `_id` (or `force_insert` is
//! set), an update otherwise. `force_update` on a record with an `_id` but
//! no `_rev` fetches the stored revision first; a not-found on that fetch
//! is swallowed (the update becomes a create), any other fetch error
//! propagates. Inserts stamp `insertedAt` and `modifiedAt`; updates
//! restamp `modifiedAt` only. A revision conflict from the store surfaces
//! as [`Error::Conflict`], never retried here.
//!
//! ## Signatures
//!
//! With a connected account, every save signs the record with the
//! account's context keyring, keyed by `{did}?context={hash}`. The signing
//! input is the canonical JSON of the record minus `_rev` and the
//! `signatures` map itself, so signatures survive revision churn and
//! multiple signers never invalidate each other.
//!
//! ## Observers
//!
//! Registered observers are invoked synchronously around each mutation, in
//! registration order, and cannot alter control flow.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::config::DEFAULT_QUERY_LIMIT;
use crate::crypto::canonical_json;
use crate::error::{Error, Result};
use crate::identity::Did;
use crate::keyring::Keyring;

use super::engine::PermissionsConfig;
use super::store::{DocumentStore, FindRequest, FindResponse, SortSpec, StoreError};

/// Synchronous hook points around record mutations. Default methods are
/// no-ops; implement what you need.
#[allow(unused_variables)]
pub trait DatabaseObserver: Send + Sync {
    fn before_insert(&self, record: &Value) {}
    fn after_insert(&self, record: &Value) {}
    fn before_update(&self, record: &Value) {}
    fn after_update(&self, record: &Value) {}
}

/// Options controlling the save lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Treat the record as new even when it carries an `_id`.
    pub force_insert: bool,
    /// Update a record whose `_rev` the caller doesn't know: the stored
    /// revision is fetched first.
    pub force_update: bool,
}

/// Options for [`Database::get_many`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Result cap; [`DEFAULT_QUERY_LIMIT`] when unset.
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub sort: Vec<SortSpec>,
}

/// Signs records on behalf of the connected account.
pub(crate) struct RecordSigner {
    pub(crate) keyring: Keyring,
    /// The `signatures` map key: `{did}?context={hash}` of the signer.
    pub(crate) signer_key: String,
}

/// A permission-gated database handle.
pub struct Database {
    name: String,
    did: Did,
    store: Arc<dyn DocumentStore>,
    permissions: PermissionsConfig,
    read_only: bool,
    signer: Option<RecordSigner>,
    observers: Vec<Arc<dyn DatabaseObserver>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("did", &self.did)
            .field("permissions", &self.permissions)
            .field("read_only", &self.read_only)
            .field("signer", &self.signer.is_some())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Database {
    pub(crate) fn new(
        name: String,
        did: Did,
        store: Arc<dyn DocumentStore>,
        permissions: PermissionsConfig,
        read_only: bool,
        signer: Option<RecordSigner>,
    ) -> Self {
        Self {
            name,
            did,
            store,
            permissions,
            read_only,
            signer,
            observers: Vec::new(),
        }
    }

    /// The database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The DID whose context this database belongs to.
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// The permission tuple this handle was opened with.
    pub fn permissions(&self) -> &PermissionsConfig {
        &self.permissions
    }

    /// Whether writes are rejected on this handle.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Register an observer. Observers run synchronously, in registration
    /// order.
    pub fn register_observer(&mut self, observer: Arc<dyn DatabaseObserver>) {
        self.observers.push(observer);
    }

    // -- CRUD ---------------------------------------------------------------

    /// Save a record. See the module docs for the full lifecycle.
    /// Returns the stored record, `_id`/`_rev` included.
    pub async fn save(&self, data: Value, options: &SaveOptions) -> Result<Value> {
        if self.read_only {
            return Err(Error::Unauthorized("database is read only".into()));
        }
        if !data.is_object() {
            return Err(Error::Validation("record must be a JSON object".into()));
        }
        let mut record = data;

        let existing_id = record
            .get("_id")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let insert = existing_id.is_none() || options.force_insert;

        if !insert && options.force_update && record.get("_rev").is_none() {
            // The caller wants an update but doesn't know the revision.
            // Fetch it; a missing record just means the update becomes a
            // create, anything else is a real failure.
            let id = existing_id.as_deref().expect("update path has an _id");
            match self.store.get(id).await {
                Ok(existing) => {
                    if let Some(rev) = existing.get("_rev") {
                        record["_rev"] = rev.clone();
                    }
                }
                Err(StoreError::NotFound(_)) => {}
                Err(other) => return Err(other.into()),
            }
        }

        let now = now_timestamp();
        if insert {
            if existing_id.is_none() {
                record["_id"] = json!(Uuid::new_v4().to_string());
            }
            record["insertedAt"] = json!(now);
            record["modifiedAt"] = json!(now);
            self.sign(&mut record);

            self.notify(|observer, record| observer.before_insert(record), &record);
            let result = self.store.put(record.clone()).await?;
            record["_rev"] = json!(result.rev);
            self.notify(|observer, record| observer.after_insert(record), &record);
        } else {
            record["modifiedAt"] = json!(now);
            self.sign(&mut record);

            self.notify(|observer, record| observer.before_update(record), &record);
            let result = self.store.put(record.clone()).await?;
            record["_rev"] = json!(result.rev);
            self.notify(|observer, record| observer.after_update(record), &record);
        }

        Ok(record)
    }

    /// Fetch a record by id.
    pub async fn get(&self, id: &str) -> Result<Value> {
        Ok(self.store.get(id).await?)
    }

    /// Query records, returning the matching documents.
    ///
    /// A default limit of [`DEFAULT_QUERY_LIMIT`] applies when none is
    /// given. See [`Self::get_many_raw`] for the raw engine response.
    pub async fn get_many(&self, filter: Value, options: &QueryOptions) -> Result<Vec<Value>> {
        Ok(self.get_many_raw(filter, options).await?.docs)
    }

    /// Query records, returning the raw engine response (documents plus
    /// any engine warnings).
    pub async fn get_many_raw(
        &self,
        filter: Value,
        options: &QueryOptions,
    ) -> Result<FindResponse> {
        let selector = apply_sort_fix(filter, &options.sort);
        debug!(database = %self.name, %selector, "running query");
        Ok(self
            .store
            .find(FindRequest {
                selector,
                sort: options.sort.clone(),
                limit: Some(options.limit.unwrap_or(DEFAULT_QUERY_LIMIT)),
                skip: options.skip,
            })
            .await?)
    }

    /// Delete a record: a string id or a full record. The record is marked
    /// `_deleted` and saved, so deletion flows through the same revision
    /// checks as any update.
    pub async fn delete(&self, doc: Value) -> Result<Value> {
        if self.read_only {
            return Err(Error::Unauthorized("database is read only".into()));
        }
        let mut record = match doc {
            Value::String(id) => self.store.get(&id).await?,
            object @ Value::Object(_) => object,
            _ => {
                return Err(Error::Validation(
                    "delete takes a record id or a record object".into(),
                ))
            }
        };
        record["_deleted"] = json!(true);
        self.save(
            record,
            &SaveOptions {
                force_insert: false,
                force_update: true,
            },
        )
        .await
    }

    // -- Internals ----------------------------------------------------------

    /// Sign the record with the connected account's context keyring.
    /// The signing input excludes `_rev` and the `signatures` map; other
    /// signers' entries are preserved.
    fn sign(&self, record: &mut Value) {
        let Some(signer) = &self.signer else {
            return;
        };

        let mut unsigned = record.clone();
        if let Some(map) = unsigned.as_object_mut() {
            map.remove("_rev");
            map.remove("signatures");
        }
        let signature = signer.keyring.sign(canonical_json(&unsigned).as_bytes());

        if !record.get("signatures").map_or(false, Value::is_object) {
            record["signatures"] = Value::Object(Map::new());
        }
        record["signatures"][&signer.signer_key] = json!(signature);
    }

    fn notify<F>(&self, hook: F, record: &Value)
    where
        F: Fn(&dyn DatabaseObserver, &Value),
    {
        for observer in &self.observers {
            hook(observer.as_ref(), record);
        }
    }
}

/// The sort-fix: for every sort field, AND a `{field: {$gt: true}}` clause
/// into the selector's `$and` array. The query engine only uses an index
/// for sorted fields that also appear in the selector, and under the
/// collation order `$gt: true` matches every real value without changing
/// the result set.
fn apply_sort_fix(filter: Value, sort: &[SortSpec]) -> Value {
    if sort.is_empty() {
        return filter;
    }

    let mut clauses: Vec<Value> = match filter {
        Value::Null => Vec::new(),
        Value::Object(map) if map.is_empty() => Vec::new(),
        Value::Object(mut map) if map.len() == 1 && map.contains_key("$and") => map
            .remove("$and")
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default(),
        other => vec![other],
    };

    for spec in sort {
        let mut clause = Map::new();
        clause.insert(spec.field.clone(), json!({"$gt": true}));
        clauses.push(Value::Object(clause));
    }

    json!({ "$and": clauses })
}

/// RFC 3339 UTC timestamp at microsecond precision, so consecutive saves
/// get strictly advancing `modifiedAt` stamps.
fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crate::context::Account;
    use crate::storage::memory::MemoryStore;
    use parking_lot::Mutex;

    fn database(read_only: bool, signed: bool) -> Database {
        let account = Account::new("database test seed", Some(Network::Testnet));
        let signer = signed.then(|| RecordSigner {
            keyring: account.context_keyring("Test App"),
            signer_key: format!(
                "{}?context={}",
                account.did().canonical(),
                account.did().context_hash("Test App")
            ),
        });
        Database::new(
            "test-db".into(),
            account.did().clone(),
            Arc::new(MemoryStore::new()),
            PermissionsConfig::default(),
            read_only,
            signer,
        )
    }

    #[tokio::test]
    async fn save_assigns_id_and_timestamps() {
        let db = database(false, true);
        let saved = db.save(json!({"hello": "world"}), &Default::default()).await.unwrap();

        assert!(saved["_id"].is_string());
        assert!(saved["_rev"].is_string());
        assert_eq!(saved["insertedAt"], saved["modifiedAt"]);
        let signatures = saved["signatures"].as_object().unwrap();
        assert_eq!(signatures.len(), 1);
        assert!(signatures.values().next().unwrap().as_str().unwrap().starts_with("0x"));
    }

    #[tokio::test]
    async fn force_update_fetches_the_missing_rev() {
        let db = database(false, true);
        let saved = db.save(json!({"hello": "world"}), &Default::default()).await.unwrap();
        let id = saved["_id"].as_str().unwrap().to_string();
        let inserted_at = saved["insertedAt"].clone();

        // Same _id, no _rev: force_update must fetch the revision and
        // perform an update, not an insert.
        let updated = db
            .save(
                json!({"_id": id, "hello": "again", "insertedAt": inserted_at}),
                &SaveOptions {
                    force_insert: false,
                    force_update: true,
                },
            )
            .await
            .unwrap();

        assert!(updated["_rev"].as_str().unwrap().starts_with("2-"));
        assert_eq!(updated["insertedAt"], inserted_at);
        assert_ne!(updated["modifiedAt"], inserted_at);

        let fetched = db.get(&id).await.unwrap();
        assert_eq!(fetched["hello"], "again");
    }

    #[tokio::test]
    async fn force_update_swallows_not_found_only() {
        let db = database(false, false);
        // Updating a record that doesn't exist: the fetch 404 is swallowed
        // and the save lands as a create.
        let saved = db
            .save(
                json!({"_id": "fresh", "v": 1}),
                &SaveOptions {
                    force_insert: false,
                    force_update: true,
                },
            )
            .await
            .unwrap();
        assert!(saved["_rev"].as_str().unwrap().starts_with("1-"));
    }

    #[tokio::test]
    async fn stale_rev_propagates_as_conflict() {
        let db = database(false, false);
        let first = db.save(json!({"hello": "world"}), &Default::default()).await.unwrap();
        let id = first["_id"].as_str().unwrap();
        let stale_rev = first["_rev"].clone();

        // Advance the record once...
        db.save(first.clone(), &Default::default()).await.unwrap();

        // ...then write with the stale revision. No retry, a Conflict.
        let result = db
            .save(json!({"_id": id, "_rev": stale_rev, "v": 2}), &Default::default())
            .await;
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn read_only_database_rejects_mutations() {
        let db = database(true, false);
        let save = db.save(json!({"x": 1}), &Default::default()).await;
        match save {
            Err(Error::Unauthorized(message)) => assert!(message.contains("read only")),
            other => panic!("expected read-only rejection, got {other:?}"),
        }
        assert!(matches!(
            db.delete(json!("some-id")).await,
            Err(Error::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn delete_resolves_ids_and_tombstones() {
        let db = database(false, false);
        let saved = db.save(json!({"gone": "soon"}), &Default::default()).await.unwrap();
        let id = saved["_id"].as_str().unwrap().to_string();

        let deleted = db.delete(json!(id.clone())).await.unwrap();
        assert_eq!(deleted["_deleted"], json!(true));
        assert!(matches!(db.get(&id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn get_many_applies_default_limit() {
        let db = database(false, false);
        for i in 0..25 {
            db.save(json!({"n": i}), &Default::default()).await.unwrap();
        }
        let docs = db.get_many(Value::Null, &Default::default()).await.unwrap();
        assert_eq!(docs.len(), DEFAULT_QUERY_LIMIT);

        let all = db
            .get_many(
                Value::Null,
                &QueryOptions {
                    limit: Some(100),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 25);
    }

    #[tokio::test]
    async fn get_many_sorts_with_the_fix_applied() {
        let db = database(false, false);
        for (name, n) in [("c", 3), ("a", 1), ("b", 2)] {
            db.save(json!({"name": name, "n": n}), &Default::default()).await.unwrap();
        }
        let docs = db
            .get_many(
                json!({"n": {"$gte": 1}}),
                &QueryOptions {
                    sort: vec![SortSpec::ascending("name")],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let names: Vec<&str> = docs.iter().filter_map(|d| d["name"].as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn observers_fire_in_order_around_mutations() {
        struct Recorder(Mutex<Vec<&'static str>>);
        impl DatabaseObserver for Recorder {
            fn before_insert(&self, _: &Value) {
                self.0.lock().push("before_insert");
            }
            fn after_insert(&self, _: &Value) {
                self.0.lock().push("after_insert");
            }
            fn before_update(&self, _: &Value) {
                self.0.lock().push("before_update");
            }
            fn after_update(&self, _: &Value) {
                self.0.lock().push("after_update");
            }
        }

        let mut db = database(false, false);
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        db.register_observer(Arc::clone(&recorder) as Arc<dyn DatabaseObserver>);

        let saved = db.save(json!({"x": 1}), &Default::default()).await.unwrap();
        db.save(saved, &Default::default()).await.unwrap();

        assert_eq!(
            *recorder.0.lock(),
            vec!["before_insert", "after_insert", "before_update", "after_update"]
        );
    }

    #[tokio::test]
    async fn record_signatures_verify_and_merge() {
        let db = database(false, true);
        let account = Account::new("database test seed", Some(Network::Testnet));
        let keyring = account.context_keyring("Test App");

        let mut saved = db.save(json!({"hello": "world"}), &Default::default()).await.unwrap();

        // Reconstruct the signing input and verify against the keyring.
        let signer_key = format!(
            "{}?context={}",
            account.did().canonical(),
            account.did().context_hash("Test App")
        );
        let signature = saved["signatures"][&signer_key].as_str().unwrap().to_string();
        let mut unsigned = saved.clone();
        unsigned.as_object_mut().unwrap().remove("_rev");
        unsigned.as_object_mut().unwrap().remove("signatures");
        assert!(keyring.verify(canonical_json(&unsigned).as_bytes(), &signature));

        // A foreign signature survives a re-save; our own is refreshed.
        saved["signatures"]["someone-else"] = json!("0xother");
        let resaved = db.save(saved, &Default::default()).await.unwrap();
        let signatures = resaved["signatures"].as_object().unwrap();
        assert_eq!(signatures.len(), 2);
        assert!(signatures.contains_key("someone-else"));
    }

    #[test]
    fn sort_fix_rewrites_the_selector() {
        let rewritten = apply_sort_fix(
            json!({"status": "open"}),
            &[SortSpec::ascending("createdAt")],
        );
        assert_eq!(
            rewritten,
            json!({"$and": [{"status": "open"}, {"createdAt": {"$gt": true}}]})
        );
    }

    #[test]
    fn sort_fix_merges_into_existing_and() {
        let rewritten = apply_sort_fix(
            json!({"$and": [{"a": 1}, {"b": 2}]}),
            &[SortSpec::descending("c")],
        );
        assert_eq!(
            rewritten,
            json!({"$and": [{"a": 1}, {"b": 2}, {"c": {"$gt": true}}]})
        );
    }

    #[test]
    fn sort_fix_without_sort_is_identity() {
        let filter = json!({"status": "open"});
        assert_eq!(apply_sort_fix(filter.clone(), &[]), filter);
    }

    #[test]
    fn sort_fix_on_empty_filter_produces_only_the_clauses() {
        let rewritten = apply_sort_fix(json!({}), &[SortSpec::ascending("n")]);
        assert_eq!(rewritten, json!({"$and": [{"n": {"$gt": true}}]}));
    }
}
