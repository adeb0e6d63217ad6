// The vote ledger.
//
// A cast is a state machine over the voter's existing vote for the idea,
// executed inside one adapter transaction that re-reads the user, idea and
// vote rows. The idea's upvote/downvote counters are denormalized and
// maintained here; they are never recomputed from vote rows on read.
//
// Credit rules: creating a vote costs one credit and requires the balance
// to cover it. Toggling a vote off never refunds the credit.

use serde_json::Value;

use pitchdesk_core::db::adapter::{TransactionAdapter, WhereClause};
use pitchdesk_core::error::{ApiError, Result};
use pitchdesk_core::utils::id::generate_id;
use pitchdesk_core::{Idea, User, Vote, VoteKind};

use crate::context::AppContext;
use crate::store::{decode_row, encode_record, pair_clauses};

/// What a cast did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    /// A new vote was created.
    Recorded,
    /// An identical vote existed and was removed.
    Removed,
    /// An opposite vote existed and was flipped.
    Switched,
}

impl VoteAction {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Recorded => "Vote recorded",
            Self::Removed => "Vote removed",
            Self::Switched => "Vote switched",
        }
    }
}

/// The result of a cast, with the idea's post-commit counters.
#[derive(Debug, Clone, Copy)]
pub struct VoteOutcome {
    pub action: VoteAction,
    pub upvotes: i64,
    pub downvotes: i64,
}

fn counter(idea: &Idea, kind: VoteKind) -> i64 {
    match kind {
        VoteKind::Upvote => idea.upvotes,
        VoteKind::Downvote => idea.downvotes,
    }
}

/// Cast a vote on an idea.
pub async fn cast_vote(
    ctx: &AppContext,
    voter: &User,
    idea_id: &str,
    kind: VoteKind,
) -> Result<VoteOutcome> {
    if ctx.store.find_idea_by_id(idea_id).await?.is_none() {
        return Err(ApiError::not_found("Idea not found").into());
    }

    let tx = ctx.store.begin_transaction().await?;
    match apply_cast(&*tx, ctx.options.credits.vote_cost, &voter.id, idea_id, kind).await {
        Ok(outcome) => {
            tx.commit().await?;
            tracing::debug!(
                idea_id,
                action = ?outcome.action,
                upvotes = outcome.upvotes,
                downvotes = outcome.downvotes,
                "vote applied"
            );
            Ok(outcome)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!("vote rollback failed: {rollback_err}");
            }
            Err(err)
        }
    }
}

/// The transactional body. Everything is re-read inside the transaction so
/// concurrent casts for the same pair serialize and re-decide.
async fn apply_cast(
    tx: &dyn TransactionAdapter,
    vote_cost: i64,
    voter_id: &str,
    idea_id: &str,
    kind: VoteKind,
) -> Result<VoteOutcome> {
    let idea: Idea = tx
        .find_one("idea", &[WhereClause::eq("id", idea_id)])
        .await?
        .map(decode_row)
        .transpose()?
        .ok_or_else(|| ApiError::not_found("Idea not found"))?;

    let voter: User = tx
        .find_one("user", &[WhereClause::eq("id", voter_id)])
        .await?
        .map(decode_row)
        .transpose()?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let existing: Option<Vote> = tx
        .find_one("vote", &pair_clauses(voter_id, idea_id))
        .await?
        .map(decode_row)
        .transpose()?;

    match existing {
        None => {
            if voter.credits < vote_cost {
                return Err(ApiError::forbidden("Not enough credits to vote").into());
            }

            let vote = Vote::new(
                generate_id(),
                voter_id.to_string(),
                idea_id.to_string(),
                kind,
            );
            tx.create("vote", encode_record(&vote)?).await?;

            let new_count = counter(&idea, kind) + 1;
            tx.update(
                "idea",
                &[WhereClause::eq("id", idea_id)],
                counter_patch(kind, new_count),
            )
            .await?;

            tx.update(
                "user",
                &[WhereClause::eq("id", voter_id)],
                serde_json::json!({ "credits": voter.credits - vote_cost }),
            )
            .await?;

            let (upvotes, downvotes) = counters_after(&idea, kind, 1);
            Ok(VoteOutcome {
                action: VoteAction::Recorded,
                upvotes,
                downvotes,
            })
        }

        Some(vote) if vote.vote_type == kind => {
            tx.delete("vote", &[WhereClause::eq("id", vote.id.as_str())])
                .await?;

            let new_count = (counter(&idea, kind) - 1).max(0);
            tx.update(
                "idea",
                &[WhereClause::eq("id", idea_id)],
                counter_patch(kind, new_count),
            )
            .await?;

            let (upvotes, downvotes) = counters_after(&idea, kind, -1);
            Ok(VoteOutcome {
                action: VoteAction::Removed,
                upvotes,
                downvotes,
            })
        }

        Some(vote) => {
            tx.update(
                "vote",
                &[WhereClause::eq("id", vote.id.as_str())],
                serde_json::json!({ "vote_type": kind.as_str() }),
            )
            .await?;

            let gained = counter(&idea, kind) + 1;
            let lost = (counter(&idea, kind.flipped()) - 1).max(0);
            let (upvotes, downvotes) = match kind {
                VoteKind::Upvote => (gained, lost),
                VoteKind::Downvote => (lost, gained),
            };
            tx.update(
                "idea",
                &[WhereClause::eq("id", idea_id)],
                serde_json::json!({ "upvotes": upvotes, "downvotes": downvotes }),
            )
            .await?;

            Ok(VoteOutcome {
                action: VoteAction::Switched,
                upvotes,
                downvotes,
            })
        }
    }
}

fn counter_patch(kind: VoteKind, value: i64) -> Value {
    let mut patch = serde_json::Map::new();
    patch.insert(kind.counter_field().to_string(), Value::from(value));
    Value::Object(patch)
}

/// The idea's counters after changing `kind` by `delta`, clamped at zero.
fn counters_after(idea: &Idea, kind: VoteKind, delta: i64) -> (i64, i64) {
    let mut upvotes = idea.upvotes;
    let mut downvotes = idea.downvotes;
    match kind {
        VoteKind::Upvote => upvotes = (upvotes + delta).max(0),
        VoteKind::Downvote => downvotes = (downvotes + delta).max(0),
    }
    (upvotes, downvotes)
}
