// Idea submission and review.
//
// Review is role-gated with an exhaustive match; only admins change an
// idea's status. There is no HTTP endpoint for review, it is driven from
// the service API.

use pitchdesk_core::error::{ApiError, Result};
use pitchdesk_core::utils::id::generate_id;
use pitchdesk_core::{Idea, IdeaStatus, Role, User};

use crate::context::AppContext;

/// Fields supplied when submitting an idea.
#[derive(Debug, Clone, Default)]
pub struct IdeaDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub allow_internships: bool,
    pub skills_required: Option<String>,
    pub internship_description: Option<String>,
    /// Public path of an uploaded image, set by the HTTP layer.
    pub media_url: Option<String>,
}

/// A review verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    fn status(self) -> IdeaStatus {
        match self {
            Self::Approve => IdeaStatus::Approved,
            Self::Reject => IdeaStatus::Rejected,
        }
    }
}

/// Submit a new idea. It enters the moderation queue as `pending` with
/// zeroed counters.
pub async fn submit_idea(ctx: &AppContext, author: &User, draft: IdeaDraft) -> Result<Idea> {
    let title = draft.title.trim();
    let description = draft.description.trim();
    let category = draft.category.trim();

    if title.is_empty() || description.is_empty() || category.is_empty() {
        return Err(
            ApiError::invalid_input("Title, description and category are required").into(),
        );
    }

    let mut idea = Idea::new(
        generate_id(),
        author.id.clone(),
        title.to_string(),
        description.to_string(),
        category.to_string(),
    );
    idea.allow_internships = draft.allow_internships;
    idea.skills_required = none_if_blank(draft.skills_required);
    idea.internship_description = none_if_blank(draft.internship_description);
    idea.media_url = draft.media_url;

    let idea = ctx.store.create_idea(&idea).await?;
    tracing::info!(idea_id = %idea.id, author = %author.username, "idea submitted");
    Ok(idea)
}

/// Approve or reject a pending idea. Admins only.
pub async fn review_idea(
    ctx: &AppContext,
    reviewer: &User,
    idea_id: &str,
    decision: ReviewDecision,
) -> Result<Idea> {
    match reviewer.role {
        Role::Admin => {}
        Role::Student | Role::Verified => {
            return Err(ApiError::forbidden("Only admins can review ideas").into());
        }
    }

    let status = decision.status();
    let updated = ctx
        .store
        .update_idea(idea_id, serde_json::json!({ "status": status.as_str() }))
        .await?
        .ok_or_else(|| ApiError::not_found("Idea not found"))?;

    tracing::info!(idea_id = %updated.id, status = %status, "idea reviewed");
    Ok(updated)
}

fn none_if_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
