// DDL generation — turns schema definitions into CREATE/ALTER statements.
//
// Dates are stored as text (RFC 3339), so lexicographic column order equals
// chronological order on every backend. Booleans are integer columns bound
// as 0/1, matching how the adapter encodes them.

use std::collections::HashMap;

use pitchdesk_core::db::schema::{FieldType, SchemaField};

use crate::query_builder::quote_identifier;

/// Database backends understood by the DDL generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Sqlite,
    Postgres,
    Mysql,
}

/// The column type used when creating a field on the given backend.
fn column_type(field_type: FieldType, db: DatabaseType) -> &'static str {
    match (db, field_type) {
        (DatabaseType::Sqlite, FieldType::String | FieldType::Date) => "text",
        (DatabaseType::Sqlite, FieldType::Number | FieldType::Boolean) => "integer",
        (DatabaseType::Postgres, FieldType::String | FieldType::Date) => "text",
        (DatabaseType::Postgres, FieldType::Number) => "bigint",
        (DatabaseType::Postgres, FieldType::Boolean) => "integer",
        (DatabaseType::Mysql, FieldType::String | FieldType::Date) => "varchar(255)",
        (DatabaseType::Mysql, FieldType::Number) => "bigint",
        (DatabaseType::Mysql, FieldType::Boolean) => "tinyint",
    }
}

/// Check whether an introspected column type satisfies the expected field
/// type. Comparison is by type family, so e.g. sqlite INTEGER satisfies
/// both Number and Boolean.
pub fn match_type(actual: &str, expected: FieldType, db: DatabaseType) -> bool {
    let actual = actual.to_lowercase();
    let accepted: &[&str] = match (db, expected) {
        (DatabaseType::Sqlite, FieldType::String | FieldType::Date) => &["text", "varchar", "char"],
        (DatabaseType::Sqlite, FieldType::Number | FieldType::Boolean) => {
            &["integer", "int", "bigint", "numeric"]
        }
        (DatabaseType::Postgres, FieldType::String | FieldType::Date) => {
            &["text", "character varying", "varchar"]
        }
        (DatabaseType::Postgres, FieldType::Number | FieldType::Boolean) => {
            &["bigint", "integer", "smallint"]
        }
        (DatabaseType::Mysql, FieldType::String | FieldType::Date) => &["varchar", "text", "char"],
        (DatabaseType::Mysql, FieldType::Number | FieldType::Boolean) => {
            &["bigint", "int", "tinyint", "smallint"]
        }
    };
    accepted.iter().any(|t| actual.starts_with(t))
}

/// Render a default value as a SQL literal.
fn default_literal(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(format!("'{}'", s.replace('\'', "''"))),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

/// Render one column definition.
fn column_def(name: &str, field: &SchemaField, db: DatabaseType) -> String {
    let mut def = format!(
        "{} {}",
        quote_identifier(name),
        column_type(field.field_type, db)
    );

    if name == "id" {
        def.push_str(" PRIMARY KEY NOT NULL");
        return def;
    }

    if field.required {
        def.push_str(" NOT NULL");
    }
    if field.unique {
        def.push_str(" UNIQUE");
    }
    if let Some(lit) = field.default_value.as_ref().and_then(default_literal) {
        def.push_str(&format!(" DEFAULT {lit}"));
    }
    if let Some(ref r) = field.references {
        def.push_str(&format!(
            " REFERENCES {} ({})",
            quote_identifier(&r.table),
            quote_identifier(&r.field)
        ));
    }

    def
}

/// Generate the CREATE TABLE statement for one table.
///
/// The id column comes first; the rest are sorted by name so the output is
/// deterministic regardless of map iteration order.
pub fn generate_table_ddl(
    table: &str,
    fields: &HashMap<String, SchemaField>,
    db: DatabaseType,
) -> String {
    let mut names: Vec<&String> = fields.keys().collect();
    names.sort();

    let mut defs = Vec::with_capacity(fields.len());
    if let Some(id) = fields.get("id") {
        defs.push(column_def("id", id, db));
    }
    for name in names {
        if name.as_str() != "id" {
            defs.push(column_def(name, &fields[name], db));
        }
    }

    format!(
        "CREATE TABLE {} ({})",
        quote_identifier(table),
        defs.join(", ")
    )
}

/// Generate an ALTER TABLE ADD COLUMN statement.
///
/// SQLite rejects ADD COLUMN with NOT NULL but no default on a non-empty
/// table, and cannot add UNIQUE columns at all, so those constraints are
/// relaxed here.
pub fn generate_alter_ddl(
    table: &str,
    field_name: &str,
    field: &SchemaField,
    db: DatabaseType,
) -> String {
    let mut relaxed = field.clone();
    if relaxed.required && relaxed.default_value.is_none() {
        relaxed.required = false;
    }
    relaxed.unique = false;

    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_identifier(table),
        column_def(field_name, &relaxed, db)
    )
}

/// Generate lookup indexes for a table's reference (foreign key) fields.
pub fn generate_index_ddl(table: &str, fields: &HashMap<String, SchemaField>) -> Vec<String> {
    let mut names: Vec<&String> = fields.keys().collect();
    names.sort();

    names
        .into_iter()
        .filter(|name| fields[name.as_str()].references.is_some())
        .map(|name| {
            format!(
                "CREATE INDEX {} ON {} ({})",
                quote_identifier(&format!("idx_{table}_{name}")),
                quote_identifier(table),
                quote_identifier(name)
            )
        })
        .collect()
}

/// Join migration statements into one executable SQL string.
pub fn compile_migrations(statements: &[String]) -> String {
    let mut out = statements.join(";\n");
    out.push(';');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_types() {
        assert_eq!(column_type(FieldType::String, DatabaseType::Sqlite), "text");
        assert_eq!(
            column_type(FieldType::Boolean, DatabaseType::Sqlite),
            "integer"
        );
        assert_eq!(
            column_type(FieldType::Number, DatabaseType::Postgres),
            "bigint"
        );
        assert_eq!(
            column_type(FieldType::String, DatabaseType::Mysql),
            "varchar(255)"
        );
        // Dates stay textual everywhere.
        assert_eq!(column_type(FieldType::Date, DatabaseType::Postgres), "text");
    }

    #[test]
    fn test_match_type() {
        assert!(match_type("TEXT", FieldType::String, DatabaseType::Sqlite));
        assert!(match_type("INTEGER", FieldType::Boolean, DatabaseType::Sqlite));
        assert!(match_type("INTEGER", FieldType::Number, DatabaseType::Sqlite));
        assert!(!match_type("TEXT", FieldType::Number, DatabaseType::Sqlite));
        assert!(match_type(
            "character varying",
            FieldType::String,
            DatabaseType::Postgres
        ));
        assert!(match_type("tinyint", FieldType::Boolean, DatabaseType::Mysql));
    }

    #[test]
    fn test_generate_table_ddl_sqlite() {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), SchemaField::required_string());
        fields.insert(
            "email".to_string(),
            SchemaField::required_string().with_unique(),
        );
        fields.insert("credits".to_string(), SchemaField::number(100));

        let sql = generate_table_ddl("user", &fields, DatabaseType::Sqlite);
        assert_eq!(
            sql,
            "CREATE TABLE \"user\" (\"id\" text PRIMARY KEY NOT NULL, \
             \"credits\" integer NOT NULL DEFAULT 100, \
             \"email\" text NOT NULL UNIQUE)"
        );
    }

    #[test]
    fn test_generate_table_ddl_references() {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), SchemaField::required_string());
        fields.insert(
            "user_id".to_string(),
            SchemaField::required_string().with_reference("user", "id"),
        );

        let sql = generate_table_ddl("vote", &fields, DatabaseType::Sqlite);
        assert!(sql.contains("\"user_id\" text NOT NULL REFERENCES \"user\" (\"id\")"));
    }

    #[test]
    fn test_generate_alter_ddl_relaxes_constraints() {
        let required = SchemaField::required_string().with_unique();
        let sql = generate_alter_ddl("user", "bio", &required, DatabaseType::Sqlite);
        assert_eq!(sql, "ALTER TABLE \"user\" ADD COLUMN \"bio\" text");

        let with_default = SchemaField::number(0);
        let sql = generate_alter_ddl("idea", "comments_count", &with_default, DatabaseType::Sqlite);
        assert_eq!(
            sql,
            "ALTER TABLE \"idea\" ADD COLUMN \"comments_count\" integer NOT NULL DEFAULT 0"
        );
    }

    #[test]
    fn test_generate_index_ddl() {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), SchemaField::required_string());
        fields.insert(
            "user_id".to_string(),
            SchemaField::required_string().with_reference("user", "id"),
        );
        fields.insert(
            "idea_id".to_string(),
            SchemaField::required_string().with_reference("idea", "id"),
        );

        let stmts = generate_index_ddl("vote", &fields);
        assert_eq!(
            stmts,
            vec![
                "CREATE INDEX \"idx_vote_idea_id\" ON \"vote\" (\"idea_id\")".to_string(),
                "CREATE INDEX \"idx_vote_user_id\" ON \"vote\" (\"user_id\")".to_string(),
            ]
        );
    }

    #[test]
    fn test_compile_migrations() {
        let stmts = vec![
            "CREATE TABLE \"user\" (\"id\" text PRIMARY KEY NOT NULL)".to_string(),
            "CREATE INDEX \"idx_vote_user_id\" ON \"vote\" (\"user_id\")".to_string(),
        ];
        let compiled = compile_migrations(&stmts);
        assert!(compiled.contains(";\n"));
        assert!(compiled.ends_with(';'));
    }
}
