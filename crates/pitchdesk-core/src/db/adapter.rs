// Storage adapter trait, the abstraction every backend implements.
//
// The adapter works with `serde_json::Value` rows so backends stay
// schema-agnostic; the service layer converts between typed models and
// `Value` at this seam. Read-check-write sequences that must not
// interleave (the vote ledger, the bookmark toggle) run on a
// `TransactionAdapter` obtained from `begin_transaction`.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::schema::AppSchema;
use crate::error::PitchdeskError;

/// Result type for adapter operations.
pub type AdapterResult<T> = std::result::Result<T, PitchdeskError>;

// ---------------------------------------------------------------------------
// Where clause
// ---------------------------------------------------------------------------

/// Comparison operators usable in a WHERE clause.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Exact equality, the default.
    #[default]
    Eq,
    /// Inequality.
    Ne,
    /// Strictly less than.
    Lt,
    /// At most.
    Lte,
    /// Strictly greater than.
    Gt,
    /// At least.
    Gte,
    /// Membership in a list of candidates.
    In,
    /// Substring match.
    Contains,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
}

/// One filter condition. Chains combine through the connector on the
/// clause before the junction; `None` marks the final clause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    /// Field the condition applies to.
    pub field: String,
    /// Value to compare against.
    pub value: serde_json::Value,
    /// How to compare; equality unless stated.
    #[serde(default)]
    pub operator: Operator,
    /// Junction with the clause that follows, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector: Option<Connector>,
}

/// How two adjacent WHERE clauses combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    And,
    Or,
}

impl WhereClause {
    pub fn new(
        field: impl Into<String>,
        value: impl Into<serde_json::Value>,
        operator: Operator,
    ) -> Self {
        Self {
            operator,
            ..Self::eq(field, value)
        }
    }

    /// Equality filter, the common case.
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            operator: Operator::Eq,
            connector: None,
            field: field.into(),
            value: value.into(),
        }
    }

    /// Join the next clause with AND.
    pub fn and(mut self) -> Self {
        self.connector = Some(Connector::And);
        self
    }

    /// Join the next clause with OR.
    pub fn or(mut self) -> Self {
        self.connector = Some(Connector::Or);
        self
    }
}

// ---------------------------------------------------------------------------
// Sort / pagination
// ---------------------------------------------------------------------------

/// Direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort key: a field and a direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    pub direction: SortDirection,
}

impl SortBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            direction: SortDirection::Desc,
            ..Self::asc(field)
        }
    }
}

/// Query parameters for `find_many`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindManyQuery {
    pub where_clauses: Vec<WhereClause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

impl FindManyQuery {
    pub fn filtered(where_clauses: Vec<WhereClause>) -> Self {
        Self {
            where_clauses,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Schema status
// ---------------------------------------------------------------------------

/// Outcome of a schema comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SchemaStatus {
    /// The live database already matches.
    UpToDate,
    /// Changes pending; carries the CREATE/ALTER statements to run.
    NeedsMigration { statements: Vec<String> },
}

/// Behavior switches for `create_schema`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaOptions {
    /// Apply pending migrations instead of only reporting them.
    #[serde(default)]
    pub auto_migrate: bool,
}

// ---------------------------------------------------------------------------
// Adapter trait
// ---------------------------------------------------------------------------

/// Storage backend abstraction.
///
/// Implemented by the SQL adapter (sqlx) and the in-memory store; services
/// only ever talk to `dyn Adapter`.
#[async_trait]
pub trait Adapter: Send + Sync + fmt::Debug {
    /// Insert a record into the model's table. The returned record has
    /// backend-generated fields (ids, column defaults) filled in.
    async fn create(
        &self,
        model: &str,
        data: serde_json::Value,
    ) -> AdapterResult<serde_json::Value>;

    /// First record matching the clauses, if any.
    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>>;

    /// All records matching the query, honoring sort and pagination.
    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>>;

    /// Number of records matching the clauses.
    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64>;

    /// Update the first matching record; `None` when nothing matched.
    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>>;

    /// Update every matching record, returning how many changed.
    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<i64>;

    /// Remove the first matching record. A missing record is not an error.
    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()>;

    /// Remove every matching record, returning how many were deleted.
    async fn delete_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<i64>;

    /// Diff the live database against the expected schema, applying the
    /// migrations when `options.auto_migrate` is set.
    async fn create_schema(
        &self,
        schema: &AppSchema,
        options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus>;

    /// Open a transaction. The returned adapter runs every operation
    /// inside it until commit or rollback.
    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>>;
}

/// An [`Adapter`] whose operations are scoped to an open transaction.
#[async_trait]
pub trait TransactionAdapter: Adapter {
    /// Make the transaction's writes durable.
    async fn commit(self: Box<Self>) -> AdapterResult<()>;

    /// Discard the transaction's writes.
    async fn rollback(self: Box<Self>) -> AdapterResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_clause_builders() {
        let clause = WhereClause::eq("email", "a@b.com");
        assert_eq!(clause.field, "email");
        assert_eq!(clause.operator, Operator::Eq);
        assert!(clause.connector.is_none());

        let chained = WhereClause::eq("user_id", "u1").and();
        assert_eq!(chained.connector, Some(Connector::And));

        let alt = WhereClause::eq("status", "approved").or();
        assert_eq!(alt.connector, Some(Connector::Or));
    }

    #[test]
    fn test_find_many_query_defaults() {
        let query = FindManyQuery::filtered(vec![WhereClause::eq("id", "x")]);
        assert_eq!(query.where_clauses.len(), 1);
        assert!(query.limit.is_none());
        assert!(query.offset.is_none());
        assert!(query.sort_by.is_none());
    }

    #[test]
    fn test_sort_by_helpers() {
        let sort = SortBy::desc("created_at");
        assert_eq!(sort.field, "created_at");
        assert_eq!(sort.direction, SortDirection::Desc);
        assert_eq!(SortBy::asc("id").direction, SortDirection::Asc);
    }
}
