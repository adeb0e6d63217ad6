// Bookmark toggling and listing.
//
// Same transactional read-check-write discipline as the vote ledger, so at
// most one bookmark row exists per (user_id, idea_id) pair. No credits, no
// counters.

use pitchdesk_core::db::adapter::{TransactionAdapter, WhereClause};
use pitchdesk_core::error::{ApiError, Result};
use pitchdesk_core::utils::id::generate_id;
use pitchdesk_core::{Bookmark, User};

use crate::context::AppContext;
use crate::store::{decode_row, encode_record, pair_clauses};

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkAction {
    Added,
    Removed,
}

impl BookmarkAction {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Added => "Bookmark added",
            Self::Removed => "Bookmark removed",
        }
    }
}

/// Toggle a bookmark on an idea. Two successive calls restore the original
/// state.
pub async fn toggle_bookmark(
    ctx: &AppContext,
    user: &User,
    idea_id: &str,
) -> Result<BookmarkAction> {
    if ctx.store.find_idea_by_id(idea_id).await?.is_none() {
        return Err(ApiError::not_found("Idea not found").into());
    }

    let tx = ctx.store.begin_transaction().await?;
    match apply_toggle(&*tx, &user.id, idea_id).await {
        Ok(action) => {
            tx.commit().await?;
            Ok(action)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!("bookmark rollback failed: {rollback_err}");
            }
            Err(err)
        }
    }
}

async fn apply_toggle(
    tx: &dyn TransactionAdapter,
    user_id: &str,
    idea_id: &str,
) -> Result<BookmarkAction> {
    let existing: Option<Bookmark> = tx
        .find_one("bookmark", &pair_clauses(user_id, idea_id))
        .await?
        .map(decode_row)
        .transpose()?;

    match existing {
        Some(bookmark) => {
            tx.delete("bookmark", &[WhereClause::eq("id", bookmark.id.as_str())])
                .await?;
            Ok(BookmarkAction::Removed)
        }
        None => {
            let bookmark = Bookmark::new(generate_id(), user_id.to_string(), idea_id.to_string());
            tx.create("bookmark", encode_record(&bookmark)?).await?;
            Ok(BookmarkAction::Added)
        }
    }
}

/// The ids of a user's bookmarked ideas, newest bookmark first.
pub async fn list_bookmarked_idea_ids(ctx: &AppContext, user: &User) -> Result<Vec<String>> {
    let bookmarks = ctx.store.bookmarks_for_user(&user.id).await?;
    Ok(bookmarks.into_iter().map(|b| b.idea_id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pitchdesk_core::error::ErrorCode;
    use pitchdesk_core::{Idea, IdeaStatus, PitchdeskOptions};
    use pitchdesk_memory::MemoryAdapter;

    use crate::identity::register;

    fn test_ctx() -> Arc<AppContext> {
        AppContext::new(PitchdeskOptions::default(), Arc::new(MemoryAdapter::new()))
    }

    async fn seed_idea(ctx: &AppContext, author_id: &str, title: &str) -> Idea {
        let mut idea = Idea::new(
            generate_id(),
            author_id.to_string(),
            title.to_string(),
            "Description".to_string(),
            "Energy".to_string(),
        );
        idea.status = IdeaStatus::Approved;
        ctx.store.create_idea(&idea).await.unwrap()
    }

    #[tokio::test]
    async fn test_toggle_pair_restores_state() {
        let ctx = test_ctx();
        let user = register(&ctx, "maya", "maya@example.com", "password123")
            .await
            .unwrap();
        let idea = seed_idea(&ctx, &user.id, "Solar kiosks").await;

        let first = toggle_bookmark(&ctx, &user, &idea.id).await.unwrap();
        assert_eq!(first, BookmarkAction::Added);
        assert!(ctx
            .store
            .find_bookmark(&user.id, &idea.id)
            .await
            .unwrap()
            .is_some());

        let second = toggle_bookmark(&ctx, &user, &idea.id).await.unwrap();
        assert_eq!(second, BookmarkAction::Removed);
        assert!(ctx
            .store
            .find_bookmark(&user.id, &idea.id)
            .await
            .unwrap()
            .is_none());

        // Never more than one row along the way.
        toggle_bookmark(&ctx, &user, &idea.id).await.unwrap();
        let rows = ctx
            .store
            .adapter()
            .count("bookmark", &pair_clauses(&user.id, &idea.id))
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_toggle_missing_idea() {
        let ctx = test_ctx();
        let user = register(&ctx, "maya", "maya@example.com", "password123")
            .await
            .unwrap();

        let err = toggle_bookmark(&ctx, &user, "missing").await.unwrap_err();
        assert_eq!(
            err.as_api().map(|api| api.code),
            Some(ErrorCode::NotFound),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_list_newest_first_per_user() {
        let ctx = test_ctx();
        let maya = register(&ctx, "maya", "maya@example.com", "password123")
            .await
            .unwrap();
        let ravi = register(&ctx, "ravi", "ravi@example.com", "password123")
            .await
            .unwrap();

        let first = seed_idea(&ctx, &maya.id, "First").await;
        let second = seed_idea(&ctx, &maya.id, "Second").await;

        // Backdate the first bookmark so ordering is deterministic.
        toggle_bookmark(&ctx, &maya, &first.id).await.unwrap();
        ctx.store
            .adapter()
            .update(
                "bookmark",
                &pair_clauses(&maya.id, &first.id),
                serde_json::json!({ "created_at": "2020-01-01T00:00:00Z" }),
            )
            .await
            .unwrap();
        toggle_bookmark(&ctx, &maya, &second.id).await.unwrap();
        toggle_bookmark(&ctx, &ravi, &first.id).await.unwrap();

        let ids = list_bookmarked_idea_ids(&ctx, &maya).await.unwrap();
        assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

        let ravi_ids = list_bookmarked_idea_ids(&ctx, &ravi).await.unwrap();
        assert_eq!(ravi_ids, vec![first.id.clone()]);
    }
}
