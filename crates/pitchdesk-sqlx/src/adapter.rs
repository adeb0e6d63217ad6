// SqlxAdapter — the core Adapter trait on top of sqlx::Any.
//
// One runtime-polymorphic pool covers SQLite, Postgres, and MySQL. Rows
// travel as JSON objects; the Any driver has no RETURNING support, so
// writes select the affected row back by id.

use async_trait::async_trait;
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Column, Row};

use pitchdesk_core::db::adapter::{
    Adapter, AdapterResult, FindManyQuery, SchemaOptions, SchemaStatus, TransactionAdapter,
    WhereClause,
};
use pitchdesk_core::db::schema::AppSchema;
use pitchdesk_core::error::PitchdeskError;

use crate::query_builder;
use crate::transaction::SqlxTransactionAdapter;

/// Storage adapter backed by a sqlx [`AnyPool`].
#[derive(Debug, Clone)]
pub struct SqlxAdapter {
    pool: AnyPool,
}

impl SqlxAdapter {
    /// Wrap an already-connected pool.
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Connect to a database URL and wrap the resulting pool.
    pub async fn connect(url: &str) -> Result<Self, PitchdeskError> {
        sqlx::any::install_default_drivers();

        // Each connection to "sqlite::memory:" is its own database, so an
        // in-memory pool must stay at a single connection.
        let max = if url.contains(":memory:") || url.contains("mode=memory") {
            1
        } else {
            10
        };
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(max)
            .connect(url)
            .await
            .map_err(|e| PitchdeskError::database(format!("connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// The underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    async fn run_update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: &serde_json::Value,
    ) -> AdapterResult<u64> {
        let assignments = query_builder::build_update_set(data, 0);
        let filter = query_builder::build_where(where_clauses, assignments.binds.len());
        let sql = format!(
            "UPDATE {} SET {}{}",
            query_builder::quote_identifier(model),
            assignments.sql,
            filter.sql
        );
        let mut binds = assignments.binds;
        binds.extend(filter.binds);
        execute(&self.pool, &sql, &binds).await
    }

    async fn run_delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<u64> {
        let filter = query_builder::build_where(where_clauses, 0);
        let sql = format!(
            "DELETE FROM {}{}",
            query_builder::quote_identifier(model),
            filter.sql
        );
        execute(&self.pool, &sql, &filter.binds).await
    }
}

/// Convert an `AnyRow` into a JSON object keyed by column name.
///
/// The Any driver exposes no uniform type metadata, so each column is
/// decoded by trying types in a fixed order. SQLite reports booleans as
/// integers; they come back here as 0/1 numbers and the model layer
/// tolerates both.
pub(crate) fn row_to_json(row: &AnyRow) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        map.insert(col.name().to_string(), decode_column(row, col.name()));
    }
    serde_json::Value::Object(map)
}

/// Decode priority: text, wide integer, narrow integer, float, bool.
/// Anything undecodable is NULL.
fn decode_column(row: &AnyRow, name: &str) -> serde_json::Value {
    if let Ok(text) = row.try_get::<String, _>(name) {
        return text.into();
    }
    if let Ok(whole) = row.try_get::<i64, _>(name) {
        return whole.into();
    }
    if let Ok(whole) = row.try_get::<i32, _>(name) {
        return whole.into();
    }
    if let Ok(real) = row.try_get::<f64, _>(name) {
        return serde_json::Number::from_f64(real)
            .map_or(serde_json::Value::Null, serde_json::Value::Number);
    }
    if let Ok(flag) = row.try_get::<bool, _>(name) {
        return flag.into();
    }
    serde_json::Value::Null
}

/// Typed bind value, owned to sidestep sqlx lifetime requirements.
#[derive(Debug, Clone)]
pub(crate) enum BindValue {
    Text(String),
    Int(i64),
    Float(f64),
    Null,
}

pub(crate) fn json_to_bind(v: &serde_json::Value) -> BindValue {
    match v {
        serde_json::Value::String(s) => BindValue::Text(s.clone()),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(BindValue::Int)
            .or_else(|| n.as_f64().map(BindValue::Float))
            .unwrap_or_else(|| BindValue::Text(n.to_string())),
        // Boolean columns are integer-typed on every backend.
        serde_json::Value::Bool(b) => BindValue::Int(i64::from(*b)),
        serde_json::Value::Null => BindValue::Null,
        _ => BindValue::Text(v.to_string()),
    }
}

/// Attach bind values to a query in order.
pub(crate) fn bind_query<'q>(
    sql: &'q str,
    binds: &'q [BindValue],
) -> Query<'q, Any, AnyArguments<'q>> {
    binds
        .iter()
        .fold(sqlx::query::<Any>(sql), |q, value| match value {
            BindValue::Text(s) => q.bind(s.as_str()),
            BindValue::Int(i) => q.bind(*i),
            BindValue::Float(f) => q.bind(*f),
            BindValue::Null => q.bind(Option::<String>::None),
        })
}

async fn fetch_all(
    pool: &AnyPool,
    sql: &str,
    binds: &[serde_json::Value],
) -> Result<Vec<AnyRow>, PitchdeskError> {
    let owned: Vec<BindValue> = binds.iter().map(json_to_bind).collect();
    bind_query(sql, &owned)
        .fetch_all(pool)
        .await
        .map_err(PitchdeskError::database)
}

async fn fetch_optional(
    pool: &AnyPool,
    sql: &str,
    binds: &[serde_json::Value],
) -> Result<Option<AnyRow>, PitchdeskError> {
    let owned: Vec<BindValue> = binds.iter().map(json_to_bind).collect();
    bind_query(sql, &owned)
        .fetch_optional(pool)
        .await
        .map_err(PitchdeskError::database)
}

async fn execute(
    pool: &AnyPool,
    sql: &str,
    binds: &[serde_json::Value],
) -> Result<u64, PitchdeskError> {
    let owned: Vec<BindValue> = binds.iter().map(json_to_bind).collect();
    let done = bind_query(sql, &owned)
        .execute(pool)
        .await
        .map_err(PitchdeskError::database)?;
    Ok(done.rows_affected())
}

#[async_trait]
impl Adapter for SqlxAdapter {
    async fn create(
        &self,
        model: &str,
        data: serde_json::Value,
    ) -> AdapterResult<serde_json::Value> {
        let insert = query_builder::build_insert(model, &data);
        execute(&self.pool, &insert.sql, &insert.binds).await?;

        // Select the row back so column defaults are reflected. Without an
        // id there is nothing to select by, so echo the input.
        let Some(id) = data.get("id") else {
            return Ok(data);
        };
        let filter = query_builder::build_where(&[WhereClause::eq("id", id.clone())], 0);
        let sql = format!(
            "SELECT * FROM {}{}",
            query_builder::quote_identifier(model),
            filter.sql
        );
        let row = fetch_optional(&self.pool, &sql, &filter.binds)
            .await?
            .ok_or_else(|| PitchdeskError::database("insert select-back returned no row"))?;
        Ok(row_to_json(&row))
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>> {
        let filter = query_builder::build_where(where_clauses, 0);
        let sql = format!(
            "SELECT * FROM {}{} LIMIT 1",
            query_builder::quote_identifier(model),
            filter.sql
        );
        let row = fetch_optional(&self.pool, &sql, &filter.binds).await?;
        Ok(row.as_ref().map(row_to_json))
    }

    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>> {
        let filter = query_builder::build_where(&query.where_clauses, 0);
        let sql = format!(
            "SELECT * FROM {}{}{}{}",
            query_builder::quote_identifier(model),
            filter.sql,
            query_builder::build_order_by(&query),
            query_builder::build_limit_offset(&query)
        );
        let rows = fetch_all(&self.pool, &sql, &filter.binds).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let filter = query_builder::build_where(where_clauses, 0);
        let sql = format!(
            "SELECT COUNT(*) as count FROM {}{}",
            query_builder::quote_identifier(model),
            filter.sql
        );
        let row = fetch_optional(&self.pool, &sql, &filter.binds)
            .await?
            .ok_or_else(|| PitchdeskError::database("count returned no rows"))?;
        row.try_get("count").map_err(PitchdeskError::database)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        if self.run_update(model, where_clauses, &data).await? == 0 {
            return Ok(None);
        }

        // The Any driver has no RETURNING, so fetch the new state separately.
        let filter = query_builder::build_where(where_clauses, 0);
        let sql = format!(
            "SELECT * FROM {}{}",
            query_builder::quote_identifier(model),
            filter.sql
        );
        let row = fetch_optional(&self.pool, &sql, &filter.binds).await?;
        Ok(row.as_ref().map(row_to_json))
    }

    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<i64> {
        let affected = self.run_update(model, where_clauses, &data).await?;
        Ok(affected as i64)
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        self.run_delete(model, where_clauses).await?;
        Ok(())
    }

    async fn delete_many(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let affected = self.run_delete(model, where_clauses).await?;
        Ok(affected as i64)
    }

    async fn create_schema(
        &self,
        schema: &AppSchema,
        options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        crate::migration::create_schema(&self.pool, schema, options).await
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PitchdeskError::database(format!("transaction begin failed: {e}")))?;
        Ok(Box::new(SqlxTransactionAdapter::new(tx)))
    }
}
