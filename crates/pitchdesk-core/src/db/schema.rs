// Schema description DSL. Backends consume this to create tables and to
// diff a live database against the expected shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Column types a field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
}

/// One field of a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    /// Data type of the column.
    pub field_type: FieldType,
    /// Required fields become NOT NULL columns.
    #[serde(default)]
    pub required: bool,
    /// Unique fields get a UNIQUE constraint.
    #[serde(default)]
    pub unique: bool,
    /// Column default, as JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    /// Foreign key to another table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<FieldReference>,
}

impl SchemaField {
    /// Required string, the base the other constructors build on.
    pub fn required_string() -> Self {
        Self {
            field_type: FieldType::String,
            required: true,
            unique: false,
            references: None,
            default_value: None,
        }
    }

    /// Nullable string.
    pub fn optional_string() -> Self {
        Self {
            required: false,
            ..Self::required_string()
        }
    }

    /// Boolean with a column default.
    pub fn boolean(default: bool) -> Self {
        Self {
            field_type: FieldType::Boolean,
            default_value: Some(serde_json::Value::Bool(default)),
            ..Self::required_string()
        }
    }

    /// Integer with a column default.
    pub fn number(default: i64) -> Self {
        Self {
            field_type: FieldType::Number,
            default_value: Some(serde_json::Value::from(default)),
            ..Self::required_string()
        }
    }

    /// Date, stored as an RFC 3339 string.
    pub fn date() -> Self {
        Self {
            field_type: FieldType::Date,
            ..Self::required_string()
        }
    }

    pub fn with_unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }

    pub fn with_reference(self, table: &str, field: &str) -> Self {
        Self {
            references: Some(FieldReference {
                table: table.to_string(),
                field: field.to_string(),
            }),
            ..self
        }
    }
}

/// Foreign key target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldReference {
    /// Referenced table.
    pub table: String,
    /// Referenced column, "id" in practice.
    pub field: String,
}

/// One table: a name, its fields, and where it sits in creation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppTable {
    pub name: String,
    pub fields: HashMap<String, SchemaField>,
    /// Lower orders are created first so foreign keys resolve.
    #[serde(default)]
    pub order: Option<i32>,
}

impl AppTable {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            order: None,
            fields: HashMap::new(),
        }
    }

    pub fn field(mut self, name: &str, def: SchemaField) -> Self {
        self.fields.insert(name.to_string(), def);
        self
    }

    pub fn with_order(self, order: i32) -> Self {
        Self {
            order: Some(order),
            ..self
        }
    }
}

/// Every table the application expects, keyed by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSchema {
    pub tables: HashMap<String, AppTable>,
}

impl AppSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: AppTable) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// The pitchdesk schema: user, idea, session, vote, bookmark.
    ///
    /// The (user_id, idea_id) pairs on vote and bookmark carry no unique
    /// constraint; pair uniqueness is maintained by the transactional
    /// write paths.
    pub fn core_schema() -> Self {
        let user = AppTable::new("user")
            .with_order(1)
            .field("id", SchemaField::required_string())
            .field("username", SchemaField::required_string().with_unique())
            .field("email", SchemaField::required_string().with_unique())
            .field("password_hash", SchemaField::required_string())
            .field("role", SchemaField::required_string())
            .field("credits", SchemaField::number(100))
            .field("is_verified", SchemaField::boolean(false))
            .field("avatar", SchemaField::required_string())
            .field("bio", SchemaField::optional_string())
            .field("links", SchemaField::optional_string())
            .field("created_at", SchemaField::date());

        let idea = AppTable::new("idea")
            .with_order(2)
            .field("id", SchemaField::required_string())
            .field("title", SchemaField::required_string())
            .field("description", SchemaField::required_string())
            .field("category", SchemaField::required_string())
            .field("media_url", SchemaField::optional_string())
            .field("allow_internships", SchemaField::boolean(false))
            .field("skills_required", SchemaField::optional_string())
            .field("internship_description", SchemaField::optional_string())
            .field("status", SchemaField::required_string())
            .field("upvotes", SchemaField::number(0))
            .field("downvotes", SchemaField::number(0))
            .field("comments_count", SchemaField::number(0))
            .field(
                "author_id",
                SchemaField::required_string().with_reference("user", "id"),
            )
            .field("created_at", SchemaField::date());

        let session = AppTable::new("session")
            .with_order(3)
            .field("id", SchemaField::required_string())
            .field("token", SchemaField::required_string().with_unique())
            .field(
                "user_id",
                SchemaField::required_string().with_reference("user", "id"),
            )
            .field("created_at", SchemaField::date())
            .field("expires_at", SchemaField::date());

        let vote = AppTable::new("vote")
            .with_order(4)
            .field("id", SchemaField::required_string())
            .field("vote_type", SchemaField::required_string())
            .field(
                "user_id",
                SchemaField::required_string().with_reference("user", "id"),
            )
            .field(
                "idea_id",
                SchemaField::required_string().with_reference("idea", "id"),
            )
            .field("created_at", SchemaField::date());

        let bookmark = AppTable::new("bookmark")
            .with_order(5)
            .field("id", SchemaField::required_string())
            .field(
                "user_id",
                SchemaField::required_string().with_reference("user", "id"),
            )
            .field(
                "idea_id",
                SchemaField::required_string().with_reference("idea", "id"),
            )
            .field("created_at", SchemaField::date());

        Self::new()
            .table(user)
            .table(idea)
            .table(session)
            .table(vote)
            .table(bookmark)
    }
}
