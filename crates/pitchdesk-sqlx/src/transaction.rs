// Transaction adapter — wraps sqlx::Transaction behind the Adapter trait.
//
// The transaction sits in a tokio Mutex so `&self` trait methods can reach
// it across await points; commit and rollback take it out by value.

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;
use tokio::sync::Mutex;

use pitchdesk_core::db::adapter::{
    Adapter, AdapterResult, FindManyQuery, SchemaOptions, SchemaStatus, TransactionAdapter,
    WhereClause,
};
use pitchdesk_core::db::schema::AppSchema;
use pitchdesk_core::error::PitchdeskError;

use crate::adapter::{bind_query, json_to_bind, row_to_json, BindValue};
use crate::query_builder;

/// Adapter whose operations all run inside one open transaction. Commit
/// or rollback consumes it; later calls fail.
pub struct SqlxTransactionAdapter {
    tx: Mutex<Option<sqlx::Transaction<'static, sqlx::Any>>>,
}

impl std::fmt::Debug for SqlxTransactionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SqlxTransactionAdapter")
    }
}

fn consumed() -> PitchdeskError {
    PitchdeskError::database("transaction already consumed")
}

impl SqlxTransactionAdapter {
    pub fn new(tx: sqlx::Transaction<'static, sqlx::Any>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    async fn fetch_all(
        &self,
        sql: &str,
        binds: &[serde_json::Value],
    ) -> Result<Vec<AnyRow>, PitchdeskError> {
        let owned: Vec<BindValue> = binds.iter().map(json_to_bind).collect();
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;
        bind_query(sql, &owned)
            .fetch_all(&mut **tx)
            .await
            .map_err(PitchdeskError::database)
    }

    async fn fetch_optional(
        &self,
        sql: &str,
        binds: &[serde_json::Value],
    ) -> Result<Option<AnyRow>, PitchdeskError> {
        let owned: Vec<BindValue> = binds.iter().map(json_to_bind).collect();
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;
        bind_query(sql, &owned)
            .fetch_optional(&mut **tx)
            .await
            .map_err(PitchdeskError::database)
    }

    async fn execute(&self, sql: &str, binds: &[serde_json::Value]) -> Result<u64, PitchdeskError> {
        let owned: Vec<BindValue> = binds.iter().map(json_to_bind).collect();
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;
        let done = bind_query(sql, &owned)
            .execute(&mut **tx)
            .await
            .map_err(PitchdeskError::database)?;
        Ok(done.rows_affected())
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
        self.execute(&sql, &binds).await
    }

    async fn run_delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<u64> {
        let filter = query_builder::build_where(where_clauses, 0);
        let sql = format!(
            "DELETE FROM {}{}",
            query_builder::quote_identifier(model),
            filter.sql
        );
        self.execute(&sql, &filter.binds).await
    }
}

#[async_trait]
impl Adapter for SqlxTransactionAdapter {
    async fn create(
        &self,
        model: &str,
        data: serde_json::Value,
    ) -> AdapterResult<serde_json::Value> {
        let insert = query_builder::build_insert(model, &data);
        self.execute(&insert.sql, &insert.binds).await?;

        let Some(id) = data.get("id") else {
            return Ok(data);
        };
        let filter = query_builder::build_where(&[WhereClause::eq("id", id.clone())], 0);
        let sql = format!(
            "SELECT * FROM {}{}",
            query_builder::quote_identifier(model),
            filter.sql
        );
        let row = self
            .fetch_optional(&sql, &filter.binds)
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
        let row = self.fetch_optional(&sql, &filter.binds).await?;
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
        let rows = self.fetch_all(&sql, &filter.binds).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let filter = query_builder::build_where(where_clauses, 0);
        let sql = format!(
            "SELECT COUNT(*) as count FROM {}{}",
            query_builder::quote_identifier(model),
            filter.sql
        );
        let row = self
            .fetch_optional(&sql, &filter.binds)
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

        let filter = query_builder::build_where(where_clauses, 0);
        let sql = format!(
            "SELECT * FROM {}{}",
            query_builder::quote_identifier(model),
            filter.sql
        );
        let row = self.fetch_optional(&sql, &filter.binds).await?;
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
        _schema: &AppSchema,
        _options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        Err(PitchdeskError::database(
            "create_schema is not supported inside a transaction",
        ))
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        Err(PitchdeskError::database("nested transactions are not supported"))
    }
}

#[async_trait]
impl TransactionAdapter for SqlxTransactionAdapter {
    async fn commit(self: Box<Self>) -> AdapterResult<()> {
        self.tx
            .into_inner()
            .ok_or_else(consumed)?
            .commit()
            .await
            .map_err(|e| PitchdeskError::database(format!("commit failed: {e}")))
    }

    async fn rollback(self: Box<Self>) -> AdapterResult<()> {
        self.tx
            .into_inner()
            .ok_or_else(consumed)?
            .rollback()
            .await
            .map_err(|e| PitchdeskError::database(format!("rollback failed: {e}")))
    }
}
