// Domain models and their closed enums.
//
// Rows travel through the adapter seam as `serde_json::Value`; these
// structs are the typed view. Field names match column names, so serde
// needs no renaming. Boolean columns come back from SQL backends as 0/1
// integers, which `flag_bool` tolerates on the way in.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ApiError;

// ---------------------------------------------------------------------------
// Closed enums
// ---------------------------------------------------------------------------

/// Account role. Role-gated decisions match on this exhaustively; there is
/// no string comparison anywhere past the parsing boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Verified,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Verified => "verified",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "verified" => Ok(Self::Verified),
            "admin" => Ok(Self::Admin),
            other => Err(ApiError::invalid_input(format!("Unknown role: {other}"))),
        }
    }
}

/// Moderation status of an idea. Only `approved` ideas are publicly
/// visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdeaStatus {
    Pending,
    Approved,
    Rejected,
}

impl IdeaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for IdeaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IdeaStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(ApiError::invalid_input(format!("Unknown status: {other}"))),
        }
    }
}

/// The two recognized vote types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Upvote,
    Downvote,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upvote => "upvote",
            Self::Downvote => "downvote",
        }
    }

    /// The idea counter column this vote kind maintains.
    pub fn counter_field(&self) -> &'static str {
        match self {
            Self::Upvote => "upvotes",
            Self::Downvote => "downvotes",
        }
    }

    /// The other vote kind.
    pub fn flipped(&self) -> Self {
        match self {
            Self::Upvote => Self::Downvote,
            Self::Downvote => Self::Upvote,
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VoteKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upvote" => Ok(Self::Upvote),
            "downvote" => Ok(Self::Downvote),
            _ => Err(ApiError::invalid_input(
                "vote_type must be 'upvote' or 'downvote'",
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// User record, the `user` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// scrypt hash, never the plaintext credential.
    pub password_hash: String,
    pub role: Role,
    pub credits: i64,
    #[serde(deserialize_with = "flag_bool")]
    pub is_verified: bool,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        id: String,
        username: String,
        email: String,
        password_hash: String,
        credits: i64,
    ) -> Self {
        Self {
            id,
            username,
            email: email.to_lowercase(),
            password_hash,
            role: Role::Student,
            credits,
            is_verified: false,
            avatar: "default.png".to_string(),
            bio: None,
            links: None,
            created_at: Utc::now(),
        }
    }
}

/// Idea record, the `idea` table. The three counters are denormalized and
/// maintained only by the vote ledger and (for comments) future writers;
/// they are never derived by counting rows on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(deserialize_with = "flag_bool")]
    pub allow_internships: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills_required: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internship_description: Option<String>,
    pub status: IdeaStatus,
    pub upvotes: i64,
    pub downvotes: i64,
    pub comments_count: i64,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

impl Idea {
    pub fn new(
        id: String,
        author_id: String,
        title: String,
        description: String,
        category: String,
    ) -> Self {
        Self {
            id,
            title,
            description,
            category,
            media_url: None,
            allow_internships: false,
            skills_required: None,
            internship_description: None,
            status: IdeaStatus::Pending,
            upvotes: 0,
            downvotes: 0,
            comments_count: 0,
            author_id,
            created_at: Utc::now(),
        }
    }
}

/// Vote ledger entry, the `vote` table. At most one row exists per
/// (user_id, idea_id) pair; the ledger enforces this inside a transaction
/// rather than with a unique constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub vote_type: VoteKind,
    pub user_id: String,
    pub idea_id: String,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(id: String, user_id: String, idea_id: String, vote_type: VoteKind) -> Self {
        Self {
            id,
            vote_type,
            user_id,
            idea_id,
            created_at: Utc::now(),
        }
    }
}

/// Saved-idea marker, the `bookmark` table. At most one row per
/// (user_id, idea_id) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub idea_id: String,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(id: String, user_id: String, idea_id: String) -> Self {
        Self {
            id,
            user_id,
            idea_id,
            created_at: Utc::now(),
        }
    }
}

/// Session record, the `session` table. Expired rows are treated as
/// absent and deleted on first touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: String, token: String, user_id: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            id,
            token,
            user_id,
            created_at: Utc::now(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Accepts JSON booleans as well as the 0/1 integers SQL backends hand
/// back for boolean columns.
fn flag_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Bool(b) => Ok(b),
        serde_json::Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
        other => Err(serde::de::Error::custom(format!(
            "expected boolean or integer flag, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_round_trips() {
        for role in [Role::Student, Role::Verified, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        for status in [IdeaStatus::Pending, IdeaStatus::Approved, IdeaStatus::Rejected] {
            assert_eq!(status.as_str().parse::<IdeaStatus>().unwrap(), status);
        }
        for kind in [VoteKind::Upvote, VoteKind::Downvote] {
            assert_eq!(kind.as_str().parse::<VoteKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_enum_values_rejected() {
        assert!("superuser".parse::<Role>().is_err());
        assert!("archived".parse::<IdeaStatus>().is_err());
        assert!("sideways".parse::<VoteKind>().is_err());
    }

    #[test]
    fn test_vote_kind_helpers() {
        assert_eq!(VoteKind::Upvote.counter_field(), "upvotes");
        assert_eq!(VoteKind::Downvote.counter_field(), "downvotes");
        assert_eq!(VoteKind::Upvote.flipped(), VoteKind::Downvote);
        assert_eq!(VoteKind::Downvote.flipped(), VoteKind::Upvote);
    }

    #[test]
    fn test_new_user_defaults() {
        let user = User::new(
            "u1".into(),
            "maya".into(),
            "Maya@Example.com".into(),
            "hash".into(),
            100,
        );
        assert_eq!(user.email, "maya@example.com");
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.credits, 100);
        assert!(!user.is_verified);
        assert_eq!(user.avatar, "default.png");
        assert!(user.bio.is_none());
    }

    #[test]
    fn test_new_idea_defaults() {
        let idea = Idea::new(
            "i1".into(),
            "u1".into(),
            "Solar kiosks".into(),
            "Off-grid charging".into(),
            "Energy".into(),
        );
        assert_eq!(idea.status, IdeaStatus::Pending);
        assert_eq!(idea.upvotes, 0);
        assert_eq!(idea.downvotes, 0);
        assert_eq!(idea.comments_count, 0);
    }

    #[test]
    fn test_int_flags_tolerated() {
        let row = serde_json::json!({
            "id": "u1",
            "username": "maya",
            "email": "maya@example.com",
            "password_hash": "hash",
            "role": "verified",
            "credits": 42,
            "is_verified": 1,
            "avatar": "default.png",
            "created_at": "2024-03-01T10:00:00Z",
        });
        let user: User = serde_json::from_value(row).unwrap();
        assert!(user.is_verified);
        assert_eq!(user.role, Role::Verified);
    }

    #[test]
    fn test_user_value_round_trip() {
        let user = User::new("u1".into(), "maya".into(), "m@e.com".into(), "h".into(), 100);
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("bio").is_none());
        let back: User = serde_json::from_value(value).unwrap();
        assert_eq!(back.id, user.id);
        assert_eq!(back.created_at, user.created_at);
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let live = Session::new("s1".into(), "tok".into(), "u1".into(), now + chrono::Duration::hours(1));
        let dead = Session::new("s2".into(), "tok2".into(), "u1".into(), now - chrono::Duration::seconds(1));
        assert!(!live.is_expired(now));
        assert!(dead.is_expired(now));
    }
}
