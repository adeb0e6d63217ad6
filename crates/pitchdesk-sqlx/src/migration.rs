// Differential migrations — introspect the live database to see which
// tables and columns exist, diff against the target AppSchema, and produce
// CREATE TABLE / ALTER TABLE ADD COLUMN statements plus lookup indexes.
//
// Supports SQLite, PostgreSQL, and MySQL introspection.

use std::collections::HashMap;

use sqlx::any::AnyRow;
use sqlx::{AnyPool, Row};

use pitchdesk_core::db::adapter::{SchemaOptions, SchemaStatus};
use pitchdesk_core::db::schema::{AppSchema, AppTable, FieldType, SchemaField};
use pitchdesk_core::error::PitchdeskError;

use crate::ddl::{
    compile_migrations, generate_alter_ddl, generate_index_ddl, generate_table_ddl, match_type,
    DatabaseType,
};

// ---------------------------------------------------------------------------
// Column metadata from introspection
// ---------------------------------------------------------------------------

/// One column of an existing table.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    /// Backend-reported type (e.g. "text", "varchar(255)").
    pub data_type: String,
    pub is_nullable: bool,
}

/// One existing table and its columns.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub name: String,
    /// Owning schema (PostgreSQL; empty on SQLite/MySQL).
    pub schema: String,
    pub columns: Vec<ColumnInfo>,
}

// ---------------------------------------------------------------------------
// Migration diff result
// ---------------------------------------------------------------------------

/// A table absent from the live database.
#[derive(Debug, Clone)]
pub struct PendingTable {
    pub table: String,
    pub fields: HashMap<String, SchemaField>,
    /// Creation order, so foreign keys resolve.
    pub order: i32,
}

/// Columns an existing table is missing.
#[derive(Debug, Clone)]
pub struct PendingColumns {
    pub table: String,
    pub fields: HashMap<String, SchemaField>,
    pub order: i32,
}

/// A live column whose type does not satisfy the expected one. Reported as
/// a warning, never auto-fixed.
#[derive(Debug, Clone)]
pub struct TypeMismatch {
    pub table: String,
    pub field: String,
    pub expected: FieldType,
    pub actual: String,
}

/// Everything a schema diff found, plus the DDL that resolves it.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub missing_tables: Vec<PendingTable>,
    pub missing_columns: Vec<PendingColumns>,
    pub type_mismatches: Vec<TypeMismatch>,
    /// DDL statements, already ordered for execution.
    pub statements: Vec<String>,
}

impl MigrationPlan {
    /// The whole plan as one executable SQL string.
    pub fn compile(&self) -> String {
        if self.statements.is_empty() {
            return ";".to_string();
        }
        compile_migrations(&self.statements)
    }

    /// Whether the live database needs any change at all.
    pub fn has_pending(&self) -> bool {
        !(self.missing_tables.is_empty() && self.missing_columns.is_empty())
    }

    /// Execute every statement in the plan against the pool.
    pub async fn run(&self, pool: &AnyPool) -> Result<(), PitchdeskError> {
        for stmt in &self.statements {
            sqlx::query(stmt).execute(pool).await.map_err(|e| {
                PitchdeskError::database(format!("migration failed: {e}\nSQL: {stmt}"))
            })?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Backend detection
// ---------------------------------------------------------------------------

/// Work out which backend the pool talks to.
pub fn detect_db_type(pool: &AnyPool) -> DatabaseType {
    // sqlx::AnyPool does not expose its backend directly; the debug form of
    // the connect options names the driver.
    let driver = format!("{:?}", pool.connect_options()).to_lowercase();

    if driver.contains("postgres") {
        DatabaseType::Postgres
    } else if driver.contains("mysql") || driver.contains("mariadb") {
        DatabaseType::Mysql
    } else {
        DatabaseType::Sqlite
    }
}

// ---------------------------------------------------------------------------
// Live-schema introspection
// ---------------------------------------------------------------------------

/// List every user table in the live database, with its columns.
pub async fn introspect_tables(
    pool: &AnyPool,
    db_type: DatabaseType,
) -> Result<Vec<TableInfo>, PitchdeskError> {
    match db_type {
        DatabaseType::Sqlite => introspect_sqlite(pool).await,
        DatabaseType::Postgres => introspect_postgres(pool).await,
        DatabaseType::Mysql => introspect_mysql(pool).await,
    }
}

/// SQLite: sqlite_master for tables, PRAGMA table_info for columns.
async fn introspect_sqlite(pool: &AnyPool) -> Result<Vec<TableInfo>, PitchdeskError> {
    let table_rows = sqlx::query(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| PitchdeskError::database(format!("sqlite introspection failed: {e}")))?;

    let mut tables = Vec::new();

    for row in &table_rows {
        let table_name: String = row.try_get("name").map_err(PitchdeskError::database)?;

        let pragma_sql = format!("PRAGMA table_info(\"{}\")", table_name.replace('"', ""));
        let col_rows = sqlx::query(&pragma_sql).fetch_all(pool).await.map_err(|e| {
            PitchdeskError::database(format!("PRAGMA table_info failed for {table_name}: {e}"))
        })?;

        let mut columns = Vec::with_capacity(col_rows.len());
        for col in &col_rows {
            // The Any driver decodes PRAGMA integers as i64 or i32
            // depending on the connection, so probe both.
            let notnull: i64 = col
                .try_get::<i64, _>("notnull")
                .or_else(|_| col.try_get::<i32, _>("notnull").map(i64::from))
                .unwrap_or(0);

            columns.push(ColumnInfo {
                name: col.try_get("name").map_err(PitchdeskError::database)?,
                data_type: col.try_get("type").unwrap_or_default(),
                is_nullable: notnull == 0,
            });
        }

        tables.push(TableInfo {
            name: table_name,
            columns,
            schema: String::new(),
        });
    }

    Ok(tables)
}

const INFORMATION_SCHEMA_TABLES: &str = "SELECT table_name \
     FROM information_schema.tables \
     WHERE table_schema = $1 AND table_type = 'BASE TABLE'";

const INFORMATION_SCHEMA_COLUMNS: &str = "SELECT column_name, data_type, is_nullable \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 \
     ORDER BY ordinal_position";

/// Column extraction shared by the information_schema backends.
fn information_schema_columns(col_rows: &[AnyRow]) -> Vec<ColumnInfo> {
    col_rows
        .iter()
        .map(|row| {
            let nullable: String = row.try_get("is_nullable").unwrap_or_default();
            ColumnInfo {
                name: row.try_get("column_name").unwrap_or_default(),
                data_type: row.try_get("data_type").unwrap_or_default(),
                is_nullable: nullable.eq_ignore_ascii_case("yes"),
            }
        })
        .collect()
}

/// PostgreSQL: information_schema scoped to the search_path schema.
async fn introspect_postgres(pool: &AnyPool) -> Result<Vec<TableInfo>, PitchdeskError> {
    let scope = get_postgres_schema(pool).await;
    introspect_information_schema(pool, scope).await
}

/// MySQL: information_schema scoped to the current database. Outside any
/// database (no `USE`), there is nothing to report.
async fn introspect_mysql(pool: &AnyPool) -> Result<Vec<TableInfo>, PitchdeskError> {
    let db_row = sqlx::query("SELECT DATABASE() as db_name")
        .fetch_optional(pool)
        .await
        .map_err(|e| PitchdeskError::database(format!("mysql database detection failed: {e}")))?;

    let scope: String = db_row
        .as_ref()
        .and_then(|r| r.try_get::<String, _>("db_name").ok())
        .unwrap_or_default();

    if scope.is_empty() {
        return Ok(Vec::new());
    }
    introspect_information_schema(pool, scope).await
}

/// Walk information_schema for one schema/database name. PostgreSQL and
/// MySQL share this path; only how the scope is found differs.
async fn introspect_information_schema(
    pool: &AnyPool,
    scope: String,
) -> Result<Vec<TableInfo>, PitchdeskError> {
    let table_rows = sqlx::query(INFORMATION_SCHEMA_TABLES)
        .bind(&scope)
        .fetch_all(pool)
        .await
        .map_err(|e| PitchdeskError::database(format!("table introspection failed: {e}")))?;

    let mut tables = Vec::with_capacity(table_rows.len());

    for row in &table_rows {
        let table_name: String = row.try_get("table_name").map_err(PitchdeskError::database)?;

        let col_rows = sqlx::query(INFORMATION_SCHEMA_COLUMNS)
            .bind(&scope)
            .bind(&table_name)
            .fetch_all(pool)
            .await
            .map_err(|e| {
                PitchdeskError::database(format!(
                    "column introspection failed for {table_name}: {e}"
                ))
            })?;

        tables.push(TableInfo {
            name: table_name,
            schema: scope.clone(),
            columns: information_schema_columns(&col_rows),
        });
    }

    Ok(tables)
}

/// First concrete schema on the PostgreSQL search_path, defaulting to
/// "public".
async fn get_postgres_schema(pool: &AnyPool) -> String {
    let row = match sqlx::query("SHOW search_path").fetch_optional(pool).await {
        Ok(Some(row)) => row,
        _ => return "public".to_string(),
    };

    let search_path: String = row.try_get("search_path").unwrap_or_default();
    search_path
        .split(',')
        .map(|entry| entry.trim().trim_matches('"').trim_matches('\''))
        .find(|entry| !entry.is_empty() && !entry.starts_with('$'))
        .unwrap_or("public")
        .to_string()
}

// ---------------------------------------------------------------------------
// Migration computation — the diff logic
// ---------------------------------------------------------------------------

/// Diff the target schema against the live database and build the DDL
/// that closes the gap.
pub async fn get_migrations(
    pool: &AnyPool,
    schema: &AppSchema,
    db_type: DatabaseType,
) -> Result<MigrationPlan, PitchdeskError> {
    let live_tables = introspect_tables(pool, db_type).await?;
    let live: HashMap<&str, &TableInfo> =
        live_tables.iter().map(|t| (t.name.as_str(), t)).collect();

    let mut missing_tables: Vec<PendingTable> = Vec::new();
    let mut missing_columns: Vec<PendingColumns> = Vec::new();
    let mut type_mismatches: Vec<TypeMismatch> = Vec::new();

    // Deterministic table order: dependency order first, then name.
    let mut schema_tables: Vec<(&String, &AppTable)> = schema.tables.iter().collect();
    schema_tables.sort_by_key(|(name, t)| (t.order.unwrap_or(i32::MAX), name.as_str()));

    for (table_name, table) in &schema_tables {
        let Some(existing) = live.get(table_name.as_str()) else {
            missing_tables.push(PendingTable {
                table: table_name.to_string(),
                fields: table.fields.clone(),
                order: table.order.unwrap_or(i32::MAX),
            });
            continue;
        };

        let mut absent: HashMap<String, SchemaField> = HashMap::new();

        for (field_name, field) in &table.fields {
            match existing.columns.iter().find(|c| c.name == *field_name) {
                Some(col) if !match_type(&col.data_type, field.field_type, db_type) => {
                    type_mismatches.push(TypeMismatch {
                        table: table_name.to_string(),
                        field: field_name.clone(),
                        expected: field.field_type,
                        actual: col.data_type.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    absent.insert(field_name.clone(), field.clone());
                }
            }
        }

        if !absent.is_empty() {
            missing_columns.push(PendingColumns {
                table: table_name.to_string(),
                fields: absent,
                order: table.order.unwrap_or(i32::MAX),
            });
        }
    }

    // Statement order: ALTERs on existing tables, CREATE TABLE in dependency
    // order, then lookup indexes for the new tables.
    let mut statements: Vec<String> = Vec::new();

    for add in &missing_columns {
        let mut field_names: Vec<&String> = add.fields.keys().collect();
        field_names.sort();
        for name in field_names {
            statements.push(generate_alter_ddl(
                &add.table,
                name,
                &add.fields[name.as_str()],
                db_type,
            ));
        }
    }

    for create in &missing_tables {
        statements.push(generate_table_ddl(&create.table, &create.fields, db_type));
    }
    for create in &missing_tables {
        statements.extend(generate_index_ddl(&create.table, &create.fields));
    }

    Ok(MigrationPlan {
        missing_tables,
        missing_columns,
        type_mismatches,
        statements,
    })
}

/// Compute migrations with auto-detected database type.
pub async fn get_migrations_auto(
    pool: &AnyPool,
    schema: &AppSchema,
) -> Result<MigrationPlan, PitchdeskError> {
    let db_type = detect_db_type(pool);
    get_migrations(pool, schema, db_type).await
}

/// Compare the live database against the schema, applying the migrations
/// when `options.auto_migrate` is set. Backs `Adapter::create_schema`.
pub async fn create_schema(
    pool: &AnyPool,
    schema: &AppSchema,
    options: &SchemaOptions,
) -> Result<SchemaStatus, PitchdeskError> {
    let plan = get_migrations_auto(pool, schema).await?;

    if !plan.has_pending() {
        return Ok(SchemaStatus::UpToDate);
    }

    if options.auto_migrate {
        plan.run(pool).await?;
        Ok(SchemaStatus::UpToDate)
    } else {
        Ok(SchemaStatus::NeedsMigration {
            statements: plan.statements,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
