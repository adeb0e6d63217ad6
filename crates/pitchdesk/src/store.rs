// Typed access to the backing store.
//
// Translates domain operations into raw adapter CRUD with the correct
// model names, and decodes the JSON rows back into the typed records.
// Transactional flows (vote ledger, bookmark toggle) call the transaction
// adapter directly instead of going through this layer.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use pitchdesk_core::db::adapter::{
    Adapter, FindManyQuery, Operator, SortBy, TransactionAdapter, WhereClause,
};
use pitchdesk_core::error::{PitchdeskError, Result};
use pitchdesk_core::{Bookmark, Idea, Session, User, Vote};

/// Decode an adapter row into a typed record.
pub fn decode_row<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| PitchdeskError::database(format!("row decode failed: {e}")))
}

fn decode_opt<T: DeserializeOwned>(value: Option<Value>) -> Result<Option<T>> {
    value.map(decode_row).transpose()
}

fn decode_rows<T: DeserializeOwned>(values: Vec<Value>) -> Result<Vec<T>> {
    values.into_iter().map(decode_row).collect()
}

/// Encode a typed record into an adapter row.
pub fn encode_record<T: serde::Serialize>(record: &T) -> Result<Value> {
    serde_json::to_value(record)
        .map_err(|e| PitchdeskError::database(format!("record encode failed: {e}")))
}

/// The WHERE clauses for a (user_id, idea_id) pair.
pub fn pair_clauses(user_id: &str, idea_id: &str) -> [WhereClause; 2] {
    [
        WhereClause::eq("user_id", user_id).and(),
        WhereClause::eq("idea_id", idea_id),
    ]
}

/// Typed store over a raw [`Adapter`].
#[derive(Debug, Clone)]
pub struct Store {
    adapter: Arc<dyn Adapter>,
}

impl Store {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self { adapter }
    }

    /// The raw adapter, for schema management and tests.
    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    pub async fn begin_transaction(&self) -> Result<Box<dyn TransactionAdapter>> {
        self.adapter.begin_transaction().await
    }

    // ─── Users ───────────────────────────────────────────────────

    pub async fn create_user(&self, user: &User) -> Result<User> {
        let row = self.adapter.create("user", encode_record(user)?).await?;
        decode_row(row)
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let row = self
            .adapter
            .find_one("user", &[WhereClause::eq("id", id)])
            .await?;
        decode_opt(row)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = self
            .adapter
            .find_one("user", &[WhereClause::eq("username", username)])
            .await?;
        decode_opt(row)
    }

    /// Email lookups are case-insensitive; addresses are stored lowercased.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_lowercase();
        let row = self
            .adapter
            .find_one("user", &[WhereClause::eq("email", email)])
            .await?;
        decode_opt(row)
    }

    pub async fn users_by_ids(&self, ids: &[String]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .adapter
            .find_many(
                "user",
                FindManyQuery::filtered(vec![WhereClause::new(
                    "id",
                    ids.to_vec(),
                    Operator::In,
                )]),
            )
            .await?;
        decode_rows(rows)
    }

    // ─── Sessions ────────────────────────────────────────────────

    pub async fn create_session(&self, session: &Session) -> Result<Session> {
        let row = self.adapter.create("session", encode_record(session)?).await?;
        decode_row(row)
    }

    pub async fn find_session_by_token(&self, token: &str) -> Result<Option<Session>> {
        let row = self
            .adapter
            .find_one("session", &[WhereClause::eq("token", token)])
            .await?;
        decode_opt(row)
    }

    /// Idempotent; deleting an absent session is not an error.
    pub async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        self.adapter
            .delete("session", &[WhereClause::eq("token", token)])
            .await
    }

    // ─── Ideas ───────────────────────────────────────────────────

    pub async fn create_idea(&self, idea: &Idea) -> Result<Idea> {
        let row = self.adapter.create("idea", encode_record(idea)?).await?;
        decode_row(row)
    }

    pub async fn find_idea_by_id(&self, id: &str) -> Result<Option<Idea>> {
        let row = self
            .adapter
            .find_one("idea", &[WhereClause::eq("id", id)])
            .await?;
        decode_opt(row)
    }

    /// Patch an idea row, returning the updated record if it exists.
    pub async fn update_idea(&self, id: &str, data: Value) -> Result<Option<Idea>> {
        let row = self
            .adapter
            .update("idea", &[WhereClause::eq("id", id)], data)
            .await?;
        decode_opt(row)
    }

    /// All approved ideas, unsorted. The feed service filters and orders.
    pub async fn approved_ideas(&self) -> Result<Vec<Idea>> {
        let rows = self
            .adapter
            .find_many(
                "idea",
                FindManyQuery::filtered(vec![WhereClause::eq("status", "approved")]),
            )
            .await?;
        decode_rows(rows)
    }

    // ─── Votes ───────────────────────────────────────────────────

    pub async fn find_vote(&self, user_id: &str, idea_id: &str) -> Result<Option<Vote>> {
        let row = self
            .adapter
            .find_one("vote", &pair_clauses(user_id, idea_id))
            .await?;
        decode_opt(row)
    }

    /// The user's votes restricted to the given ideas.
    pub async fn votes_for_ideas(&self, user_id: &str, idea_ids: &[String]) -> Result<Vec<Vote>> {
        if idea_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .adapter
            .find_many(
                "vote",
                FindManyQuery::filtered(vec![
                    WhereClause::eq("user_id", user_id).and(),
                    WhereClause::new("idea_id", idea_ids.to_vec(), Operator::In),
                ]),
            )
            .await?;
        decode_rows(rows)
    }

    // ─── Bookmarks ───────────────────────────────────────────────

    pub async fn find_bookmark(&self, user_id: &str, idea_id: &str) -> Result<Option<Bookmark>> {
        let row = self
            .adapter
            .find_one("bookmark", &pair_clauses(user_id, idea_id))
            .await?;
        decode_opt(row)
    }

    /// A user's bookmarks, newest first.
    pub async fn bookmarks_for_user(&self, user_id: &str) -> Result<Vec<Bookmark>> {
        let rows = self
            .adapter
            .find_many(
                "bookmark",
                FindManyQuery {
                    where_clauses: vec![WhereClause::eq("user_id", user_id)],
                    sort_by: Some(SortBy::desc("created_at")),
                    ..Default::default()
                },
            )
            .await?;
        decode_rows(rows)
    }
}
