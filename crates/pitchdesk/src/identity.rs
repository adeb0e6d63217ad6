// Identity operations: registration, authentication, session lifecycle,
// profile projection.
//
// Authentication failures collapse into one "Invalid email or password"
// response; the unknown-email path burns a hash so both failure modes take
// comparable time.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use pitchdesk_core::error::{ApiError, Result};
use pitchdesk_core::utils::id::{generate_id, generate_session_token};
use pitchdesk_core::{Role, Session, User};

use crate::context::AppContext;
use crate::crypto::password::{hash_password, verify_password};

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub credits: i64,
    pub is_verified: bool,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            credits: user.credits,
            is_verified: user.is_verified,
            avatar: user.avatar,
            bio: user.bio,
            links: user.links,
            created_at: user.created_at,
        }
    }
}

/// Minimal email shape check: one '@', non-empty local part, dotted domain.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && !domain.is_empty() && !domain.contains('@') && domain.contains('.')
}

/// Register a new account.
///
/// 1. Validate username length, email shape, password bounds
/// 2. Reject duplicate username or email
/// 3. Hash the password and create the user with starting credits
pub async fn register(
    ctx: &AppContext,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User> {
    let username = username.trim();
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::invalid_input("Username must be between 3 and 32 characters").into());
    }

    let email = email.trim();
    if !is_valid_email(email) {
        return Err(ApiError::invalid_input("Invalid email address").into());
    }

    let bounds = &ctx.options.password;
    if password.len() < bounds.min_length {
        return Err(ApiError::invalid_input(format!(
            "Password must be at least {} characters",
            bounds.min_length
        ))
        .into());
    }
    if password.len() > bounds.max_length {
        return Err(ApiError::invalid_input(format!(
            "Password must be at most {} characters",
            bounds.max_length
        ))
        .into());
    }

    if ctx.store.find_user_by_username(username).await?.is_some() {
        return Err(ApiError::conflict("Username already taken").into());
    }
    if ctx.store.find_user_by_email(email).await?.is_some() {
        return Err(ApiError::conflict("Email already registered").into());
    }

    let password_hash = hash_password(password)?;
    let user = User::new(
        generate_id(),
        username.to_string(),
        email.to_string(),
        password_hash,
        ctx.options.credits.starting_balance,
    );

    let user = ctx.store.create_user(&user).await?;
    tracing::info!(username = %user.username, "user registered");
    Ok(user)
}

/// Authenticate by email and password, creating a session on success.
pub async fn authenticate(ctx: &AppContext, email: &str, password: &str) -> Result<(User, Session)> {
    let user = match ctx.store.find_user_by_email(email).await? {
        Some(user) => user,
        None => {
            // Burn a hash so unknown emails take as long as bad passwords.
            let _ = hash_password(password);
            return Err(ApiError::unauthorized("Invalid email or password").into());
        }
    };

    if !verify_password(&user.password_hash, password)? {
        return Err(ApiError::unauthorized("Invalid email or password").into());
    }

    let session = create_session(ctx, &user).await?;
    tracing::debug!(username = %user.username, "login succeeded");
    Ok((user, session))
}

/// Create a fresh session for the user with the configured TTL.
pub async fn create_session(ctx: &AppContext, user: &User) -> Result<Session> {
    let expires_at = Utc::now() + TimeDelta::seconds(ctx.options.session.expires_in);
    let session = Session::new(
        generate_id(),
        generate_session_token(),
        user.id.clone(),
        expires_at,
    );
    ctx.store.create_session(&session).await
}

/// Resolve a session token to its user.
///
/// Expired sessions are treated as absent and deleted on first touch.
pub async fn resolve_session(ctx: &AppContext, token: &str) -> Result<Option<(User, Session)>> {
    let session = match ctx.store.find_session_by_token(token).await? {
        Some(session) => session,
        None => return Ok(None),
    };

    if session.is_expired(Utc::now()) {
        ctx.store.delete_session_by_token(token).await?;
        return Ok(None);
    }

    let user = match ctx.store.find_user_by_id(&session.user_id).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    Ok(Some((user, session)))
}

/// Revoke a session. Idempotent.
pub async fn revoke_session(ctx: &AppContext, token: &str) -> Result<()> {
    ctx.store.delete_session_by_token(token).await
}

/// Full profile projection for a user id.
pub async fn get_profile(ctx: &AppContext, user_id: &str) -> Result<UserProfile> {
    let user = ctx
        .store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(user.into())
}
