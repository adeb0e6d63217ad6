// In-memory storage adapter backed by a HashMap keyed by table name.
//
// Rows are `serde_json::Value` objects behind a `tokio::sync::RwLock`.
// Writes additionally pass through a write gate (`tokio::sync::Mutex`): a
// transaction holds the gate from `begin_transaction` until commit or
// rollback, so direct writes and other transactions queue behind it and the
// read-check-write sequences in the vote and bookmark services run against
// a frozen store. Reads skip the gate and observe the last committed state.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use pitchdesk_core::db::adapter::{
    Adapter, AdapterResult, Connector, FindManyQuery, Operator, SchemaOptions, SchemaStatus,
    SortDirection, TransactionAdapter, WhereClause,
};
use pitchdesk_core::db::schema::AppSchema;
use pitchdesk_core::error::PitchdeskError;

/// Type alias for the in-memory store.
type Store = HashMap<String, Vec<serde_json::Value>>;

/// In-memory storage adapter.
///
/// All data lives in a `HashMap` wrapped in an `Arc<RwLock<...>>` and is
/// lost when the last clone is dropped. Intended for tests and development.
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    store: Arc<RwLock<Store>>,
    write_gate: Arc<Mutex<()>>,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdapter {
    /// Fresh adapter with no data.
    pub fn new() -> Self {
        Self::with_data(HashMap::new())
    }

    /// Adapter seeded with existing tables.
    pub fn with_data(data: Store) -> Self {
        Self {
            store: Arc::new(RwLock::new(data)),
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Copy of the full store contents.
    pub async fn snapshot(&self) -> Store {
        self.store.read().await.clone()
    }

    /// Drop every record in every table.
    pub async fn clear(&self) {
        let _gate = self.write_gate.lock().await;
        self.store.write().await.clear();
    }

    /// Number of records currently held for one model.
    pub async fn model_count(&self, model: &str) -> usize {
        let store = self.store.read().await;
        store.get(model).map_or(0, |records| records.len())
    }
}

// ─── Matching and record helpers ─────────────────────────────────

/// Check one record against a WHERE clause list.
///
/// The connector lives on the clause *before* the junction: the list folds
/// left to right, and each clause joins the running result with the
/// connector carried by its predecessor.
fn matches_where(record: &serde_json::Value, clauses: &[WhereClause]) -> bool {
    let mut matched = true;
    for (i, clause) in clauses.iter().enumerate() {
        let hit = clause_matches(record, clause);
        let join_or = i > 0 && matches!(clauses[i - 1].connector, Some(Connector::Or));
        matched = if join_or { matched || hit } else { matched && hit };
    }
    matched
}

/// Evaluate a single clause against a record. Absent fields behave as NULL.
fn clause_matches(record: &serde_json::Value, clause: &WhereClause) -> bool {
    let null = serde_json::Value::Null;
    let actual = record.get(&clause.field).unwrap_or(&null);

    match clause.operator {
        Operator::Eq => actual == &clause.value,
        Operator::Ne => actual != &clause.value,
        Operator::In => clause
            .value
            .as_array()
            .map_or(false, |candidates| candidates.contains(actual)),
        Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
            compare_json(actual, &clause.value).map_or(false, |ord| match clause.operator {
                Operator::Lt => ord.is_lt(),
                Operator::Lte => ord.is_le(),
                Operator::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            })
        }
        Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
            let haystack = actual.as_str().unwrap_or("");
            let needle = clause.value.as_str().unwrap_or("");
            match clause.operator {
                Operator::Contains => haystack.contains(needle),
                Operator::StartsWith => haystack.starts_with(needle),
                _ => haystack.ends_with(needle),
            }
        }
    }
}

/// Order two JSON scalars. Numbers compare numerically, strings
/// lexicographically; anything else does not compare.
fn compare_json(a: &serde_json::Value, b: &serde_json::Value) -> Option<Ordering> {
    match (a, b) {
        (serde_json::Value::Number(x), serde_json::Value::Number(y)) => {
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (serde_json::Value::String(x), serde_json::Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Sort records in place. The sort is stable, so equal keys keep insertion
/// order; records missing the sort field order before those that have it.
fn sort_records(records: &mut [serde_json::Value], query: &FindManyQuery) {
    if let Some(sort) = &query.sort_by {
        records.sort_by(|a, b| {
            let ord = match (a.get(&sort.field), b.get(&sort.field)) {
                (Some(x), Some(y)) => compare_json(x, y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            match sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }
}

/// Overlay update data onto a record, field by field.
fn merge_update(record: &mut serde_json::Value, data: &serde_json::Value) {
    if let (Some(target), Some(patch)) = (record.as_object_mut(), data.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

// Both the adapter and its transaction run the same operations, one against
// the live store and one against the snapshot. The shared logic lives in
// these synchronous helpers that operate on a locked store.

fn insert_record(
    store: &mut Store,
    model: &str,
    mut record: serde_json::Value,
) -> serde_json::Value {
    if record.get("id").map_or(true, serde_json::Value::is_null) {
        if let Some(obj) = record.as_object_mut() {
            obj.insert(
                "id".to_string(),
                serde_json::Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }
    }
    store
        .entry(model.to_string())
        .or_default()
        .push(record.clone());
    record
}

fn first_match(store: &Store, model: &str, clauses: &[WhereClause]) -> Option<serde_json::Value> {
    store
        .get(model)
        .and_then(|recs| recs.iter().find(|r| matches_where(r, clauses)).cloned())
}

fn query_records(store: &Store, model: &str, query: &FindManyQuery) -> Vec<serde_json::Value> {
    let empty = Vec::new();
    let records = store.get(model).unwrap_or(&empty);

    let mut result: Vec<serde_json::Value> = records
        .iter()
        .filter(|r| matches_where(r, &query.where_clauses))
        .cloned()
        .collect();

    sort_records(&mut result, query);

    if let Some(offset) = query.offset {
        if (offset as usize) < result.len() {
            result = result.split_off(offset as usize);
        } else {
            result.clear();
        }
    }
    if let Some(limit) = query.limit {
        result.truncate(limit as usize);
    }

    result
}

fn count_matches(store: &Store, model: &str, clauses: &[WhereClause]) -> i64 {
    store
        .get(model)
        .map(|recs| recs.iter().filter(|r| matches_where(r, clauses)).count())
        .unwrap_or(0) as i64
}

fn update_first(
    store: &mut Store,
    model: &str,
    clauses: &[WhereClause],
    data: &serde_json::Value,
) -> Option<serde_json::Value> {
    let recs = store.get_mut(model)?;
    let record = recs.iter_mut().find(|r| matches_where(r, clauses))?;
    merge_update(record, data);
    Some(record.clone())
}

fn update_all(
    store: &mut Store,
    model: &str,
    clauses: &[WhereClause],
    data: &serde_json::Value,
) -> i64 {
    let mut count = 0i64;
    if let Some(recs) = store.get_mut(model) {
        for record in recs.iter_mut() {
            if matches_where(record, clauses) {
                merge_update(record, data);
                count += 1;
            }
        }
    }
    count
}

fn delete_first(store: &mut Store, model: &str, clauses: &[WhereClause]) {
    if let Some(recs) = store.get_mut(model) {
        if let Some(pos) = recs.iter().position(|r| matches_where(r, clauses)) {
            recs.remove(pos);
        }
    }
}

fn delete_all(store: &mut Store, model: &str, clauses: &[WhereClause]) -> i64 {
    match store.get_mut(model) {
        Some(recs) => {
            let before = recs.len();
            recs.retain(|r| !matches_where(r, clauses));
            (before - recs.len()) as i64
        }
        None => 0,
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn create(&self, model: &str, data: serde_json::Value) -> AdapterResult<serde_json::Value> {
        let _gate = self.write_gate.lock().await;
        let mut store = self.store.write().await;
        Ok(insert_record(&mut store, model, data))
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>> {
        let store = self.store.read().await;
        Ok(first_match(&store, model, where_clauses))
    }

    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>> {
        let store = self.store.read().await;
        Ok(query_records(&store, model, &query))
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let store = self.store.read().await;
        Ok(count_matches(&store, model, where_clauses))
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let _gate = self.write_gate.lock().await;
        let mut store = self.store.write().await;
        Ok(update_first(&mut store, model, where_clauses, &data))
    }

    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<i64> {
        let _gate = self.write_gate.lock().await;
        let mut store = self.store.write().await;
        Ok(update_all(&mut store, model, where_clauses, &data))
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        let _gate = self.write_gate.lock().await;
        let mut store = self.store.write().await;
        delete_first(&mut store, model, where_clauses);
        Ok(())
    }

    async fn delete_many(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let _gate = self.write_gate.lock().await;
        let mut store = self.store.write().await;
        Ok(delete_all(&mut store, model, where_clauses))
    }

    async fn create_schema(
        &self,
        _schema: &AppSchema,
        _options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        // No persistent schema to migrate.
        Ok(SchemaStatus::UpToDate)
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        // Acquire the gate before snapshotting so no write can land between
        // the two steps. The guard rides inside the transaction until
        // commit or rollback drops it.
        let gate = self.write_gate.clone().lock_owned().await;
        let snapshot = self.store.read().await.clone();
        Ok(Box::new(MemoryTransactionAdapter {
            parent: self.store.clone(),
            snapshot: RwLock::new(snapshot),
            _gate: gate,
        }))
    }
}

// ─── Transaction adapter ─────────────────────────────────────────

/// Snapshot transaction over the in-memory store.
///
/// Operations run against a private copy taken at `begin_transaction`. On
/// commit the copy replaces the parent store; on rollback (or drop) it is
/// discarded. Holding the write gate for the transaction's whole lifetime
/// keeps the parent store unchanged in between, so the replace cannot
/// overwrite a concurrent write.
struct MemoryTransactionAdapter {
    parent: Arc<RwLock<Store>>,
    snapshot: RwLock<Store>,
    _gate: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for MemoryTransactionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MemoryTransactionAdapter")
    }
}

#[async_trait]
impl Adapter for MemoryTransactionAdapter {
    async fn create(&self, model: &str, data: serde_json::Value) -> AdapterResult<serde_json::Value> {
        let mut store = self.snapshot.write().await;
        Ok(insert_record(&mut store, model, data))
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>> {
        let store = self.snapshot.read().await;
        Ok(first_match(&store, model, where_clauses))
    }

    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>> {
        let store = self.snapshot.read().await;
        Ok(query_records(&store, model, &query))
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let store = self.snapshot.read().await;
        Ok(count_matches(&store, model, where_clauses))
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let mut store = self.snapshot.write().await;
        Ok(update_first(&mut store, model, where_clauses, &data))
    }

    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<i64> {
        let mut store = self.snapshot.write().await;
        Ok(update_all(&mut store, model, where_clauses, &data))
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        let mut store = self.snapshot.write().await;
        delete_first(&mut store, model, where_clauses);
        Ok(())
    }

    async fn delete_many(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let mut store = self.snapshot.write().await;
        Ok(delete_all(&mut store, model, where_clauses))
    }

    async fn create_schema(
        &self,
        _schema: &AppSchema,
        _options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        Ok(SchemaStatus::UpToDate)
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        Err(PitchdeskError::database(
            "nested transactions are not supported by the memory adapter",
        ))
    }
}

#[async_trait]
impl TransactionAdapter for MemoryTransactionAdapter {
    async fn commit(self: Box<Self>) -> AdapterResult<()> {
        let this = *self;
        let mut parent = this.parent.write().await;
        *parent = this.snapshot.into_inner();
        Ok(())
        // this._gate drops here, releasing queued writers.
    }

    async fn rollback(self: Box<Self>) -> AdapterResult<()> {
        // Snapshot and gate are dropped, discarding all changes.
        Ok(())
    }
}
