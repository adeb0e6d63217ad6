// Read side of the idea feed.
//
// Only approved ideas are ever listed. Filtering, search and sorting all
// happen here rather than in SQL so every adapter produces identical
// results; all sort orders break ties by id ascending to keep pagination
// stable across requests.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;

use pitchdesk_core::error::{ApiError, PitchdeskError, Result};
use pitchdesk_core::{Idea, User, VoteKind};

use crate::context::AppContext;

/// Author-verification filter. `open-innovation` is the student side of the
/// feed, `verified-startups` the vetted-company side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedFilter {
    #[default]
    All,
    OpenInnovation,
    VerifiedStartups,
}

impl FromStr for FeedFilter {
    type Err = PitchdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "open-innovation" => Ok(Self::OpenInnovation),
            "verified-startups" => Ok(Self::VerifiedStartups),
            other => Err(ApiError::invalid_input(format!("Unknown filter: {other}")).into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedSort {
    #[default]
    Newest,
    Oldest,
    MostVoted,
    Trending,
}

impl FromStr for FeedSort {
    type Err = PitchdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "most-voted" => Ok(Self::MostVoted),
            "trending" => Ok(Self::Trending),
            other => Err(ApiError::invalid_input(format!("Unknown sort: {other}")).into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    pub filter: FeedFilter,
    pub sort: FeedSort,
    pub search: Option<String>,
}

/// Denormalized author block embedded in each feed entry.
#[derive(Debug, Clone, Serialize)]
pub struct IdeaAuthor {
    pub username: String,
    pub avatar: String,
    pub is_verified: bool,
}

impl From<&User> for IdeaAuthor {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            is_verified: user.is_verified,
        }
    }
}

/// One feed entry: the idea, its author block, and the viewer's own vote so
/// the client can render vote-button state without a second request.
#[derive(Debug, Clone, Serialize)]
pub struct IdeaProjection {
    #[serde(flatten)]
    pub idea: Idea,
    pub author: IdeaAuthor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_vote: Option<VoteKind>,
}

/// List approved ideas for `viewer`, filtered, searched and sorted per
/// `query`. Ideas whose author row is missing are skipped.
pub async fn list_ideas(
    ctx: &AppContext,
    viewer: &User,
    query: FeedQuery,
) -> Result<Vec<IdeaProjection>> {
    let ideas = ctx.store.approved_ideas().await?;

    let mut author_ids: Vec<String> = ideas.iter().map(|idea| idea.author_id.clone()).collect();
    author_ids.sort();
    author_ids.dedup();
    let authors: HashMap<String, User> = ctx
        .store
        .users_by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|user| (user.id.clone(), user))
        .collect();

    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut visible: Vec<Idea> = ideas
        .into_iter()
        .filter(|idea| {
            let author = match authors.get(&idea.author_id) {
                Some(author) => author,
                None => {
                    tracing::warn!(idea = %idea.id, "skipping idea with missing author row");
                    return false;
                }
            };
            match query.filter {
                FeedFilter::All => true,
                FeedFilter::OpenInnovation => !author.is_verified,
                FeedFilter::VerifiedStartups => author.is_verified,
            }
        })
        .filter(|idea| match &needle {
            Some(needle) => {
                idea.title.to_lowercase().contains(needle)
                    || idea.description.to_lowercase().contains(needle)
                    || idea.category.to_lowercase().contains(needle)
            }
            None => true,
        })
        .collect();

    visible.sort_by(|a, b| {
        let order = match query.sort {
            FeedSort::Newest => b.created_at.cmp(&a.created_at),
            FeedSort::Oldest => a.created_at.cmp(&b.created_at),
            FeedSort::MostVoted => b.upvotes.cmp(&a.upvotes),
            FeedSort::Trending => {
                (b.upvotes + b.comments_count).cmp(&(a.upvotes + a.comments_count))
            }
        };
        order.then_with(|| a.id.cmp(&b.id))
    });

    let idea_ids: Vec<String> = visible.iter().map(|idea| idea.id.clone()).collect();
    let own_votes: HashMap<String, VoteKind> = ctx
        .store
        .votes_for_ideas(&viewer.id, &idea_ids)
        .await?
        .into_iter()
        .map(|vote| (vote.idea_id, vote.vote_type))
        .collect();

    Ok(visible
        .into_iter()
        .filter_map(|idea| {
            let author = IdeaAuthor::from(authors.get(&idea.author_id)?);
            let user_vote = own_votes.get(&idea.id).copied();
            Some(IdeaProjection {
                idea,
                author,
                user_vote,
            })
        })
        .collect())
}
