#![doc = include_str!("../README.md")]

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use tower_http::cors::{Any, CorsLayer};

use pitchdesk::context::AppContext;
use pitchdesk::identity::UserProfile;
use pitchdesk::{bookmarks, feed, identity, ideas, votes};
use pitchdesk_core::error::{ApiError, PitchdeskError};
use pitchdesk_core::utils::id::generate_id;
use pitchdesk_core::{Adapter, PitchdeskOptions, Session, User, VoteKind};

// ─── Error Handling ──────────────────────────────────────────────

/// Wrapper that renders workspace errors as the `{success, message}`
/// envelope with the mapped status. Expected failures keep their message;
/// infrastructure faults are logged and surface as a generic 500.
struct HttpError(PitchdeskError);

impl From<PitchdeskError> for HttpError {
    fn from(err: PitchdeskError) -> Self {
        Self(err)
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        Self(err.into())
    }
}

impl From<MultipartError> for HttpError {
    fn from(_: MultipartError) -> Self {
        Self(ApiError::invalid_input("Invalid form data").into())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self.0.as_api() {
            Some(api) => {
                let status = StatusCode::from_u16(api.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(api.to_json())).into_response()
            }
            None => {
                tracing::error!("request failed: {}", self.0);
                let body = serde_json::json!({
                    "success": false,
                    "message": "Internal server error",
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

// ─── Session Token Extraction ────────────────────────────────────

/// Pull the session token from `Authorization: Bearer <token>` or from the
/// named session cookie.
fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|auth| auth.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|raw| raw.to_str().ok())?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .map(|(_, value)| value.to_string())
}

/// Resolve the calling user from the request headers, or fail with 401.
async fn require_user(ctx: &AppContext, headers: &HeaderMap) -> Result<(User, Session), HttpError> {
    let cookie_name = ctx.session_cookie_name();
    let token = extract_session_token(headers, &cookie_name)
        .ok_or_else(|| HttpError::from(ApiError::unauthorized("Authentication required")))?;

    match identity::resolve_session(ctx, &token).await? {
        Some(found) => Ok(found),
        None => Err(ApiError::unauthorized("Invalid or expired session").into()),
    }
}

// ─── Pitchdesk App Builder ───────────────────────────────────────

/// The entry point for serving pitchdesk over Axum.
///
/// # Example
///
/// ```rust,ignore
/// use pitchdesk_axum::PitchdeskApp;
/// use pitchdesk_core::PitchdeskOptions;
///
/// let app = PitchdeskApp::new(PitchdeskOptions::default(), adapter);
/// axum::serve(listener, app.router_with_cors()).await?;
/// ```
pub struct PitchdeskApp {
    ctx: Arc<AppContext>,
}

impl PitchdeskApp {
    /// Create an app from options and a storage adapter.
    pub fn new(options: PitchdeskOptions, adapter: Arc<dyn Adapter>) -> Self {
        let ctx = AppContext::new(options, adapter);
        Self { ctx }
    }

    /// Create from an existing `AppContext`.
    pub fn from_context(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Get a reference to the app context.
    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    /// Build the Axum `Router` with every endpoint registered.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/signup", post(handle_signup))
            .route("/login", post(handle_login))
            .route("/logout", get(handle_logout))
            .route("/api/user", get(handle_get_user))
            .route("/api/user/bookmarks", get(handle_get_bookmarks))
            .route("/api/ideas", get(handle_get_ideas))
            .route("/api/vote", post(handle_vote))
            .route("/api/bookmark", post(handle_bookmark))
            .route("/api/post-idea", post(handle_post_idea))
            .with_state(self.ctx.clone())
    }

    /// Build the router with a permissive CORS layer: any origin,
    /// GET/POST/OPTIONS, content-type and authorization headers.
    pub fn router_with_cors(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

        self.router().layer(cors)
    }
}

// ─── Request Types ──────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct SignupForm {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(serde::Deserialize)]
struct LoginForm {
    email: Option<String>,
    password: Option<String>,
}

#[derive(serde::Deserialize)]
struct VoteRequest {
    idea_id: Option<String>,
    vote_type: Option<String>,
}

#[derive(serde::Deserialize)]
struct BookmarkRequest {
    idea_id: Option<String>,
}

#[derive(serde::Deserialize, Default)]
struct FeedParams {
    filter: Option<String>,
    sort: Option<String>,
    search: Option<String>,
}

// ─── Route Handlers ─────────────────────────────────────────────

/// The `{success: true, message}` body most endpoints return.
fn success_message(message: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": message,
    }))
}

/// Create a 302 Found redirect response.
fn redirect_found(url: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}

async fn handle_signup(
    State(ctx): State<Arc<AppContext>>,
    Form(body): Form<SignupForm>,
) -> Result<impl IntoResponse, HttpError> {
    identity::register(
        &ctx,
        &body.username.unwrap_or_default(),
        &body.email.unwrap_or_default(),
        &body.password.unwrap_or_default(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        success_message("Account created successfully"),
    ))
}

async fn handle_login(
    State(ctx): State<Arc<AppContext>>,
    Form(body): Form<LoginForm>,
) -> Result<impl IntoResponse, HttpError> {
    let (_, session) = identity::authenticate(
        &ctx,
        &body.email.unwrap_or_default(),
        &body.password.unwrap_or_default(),
    )
    .await?;

    let cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        ctx.session_cookie_name(),
        session.token,
        ctx.options.session.expires_in,
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        success_message("Login successful"),
    ))
}

async fn handle_logout(State(ctx): State<Arc<AppContext>>, headers: HeaderMap) -> Response {
    let cookie_name = ctx.session_cookie_name();
    if let Some(token) = extract_session_token(&headers, &cookie_name) {
        if let Err(err) = identity::revoke_session(&ctx, &token).await {
            tracing::warn!("logout could not revoke session: {err}");
        }
    }

    // Expire the cookie regardless of whether a session was found.
    let mut response = redirect_found("/");
    let expired = format!("{cookie_name}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax");
    if let Ok(value) = HeaderValue::from_str(&expired) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

async fn handle_get_user(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let (user, _) = require_user(&ctx, &headers).await?;
    Ok(Json(UserProfile::from(user)))
}

async fn handle_get_bookmarks(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpError> {
    let (user, _) = require_user(&ctx, &headers).await?;
    let ids = bookmarks::list_bookmarked_idea_ids(&ctx, &user).await?;
    Ok(Json(ids))
}

async fn handle_get_ideas(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Query(params): Query<FeedParams>,
) -> Result<impl IntoResponse, HttpError> {
    let (user, _) = require_user(&ctx, &headers).await?;

    let mut query = feed::FeedQuery::default();
    if let Some(filter) = params.filter.as_deref().filter(|s| !s.is_empty()) {
        query.filter = filter.parse()?;
    }
    if let Some(sort) = params.sort.as_deref().filter(|s| !s.is_empty()) {
        query.sort = sort.parse()?;
    }
    query.search = params.search;

    let entries = feed::list_ideas(&ctx, &user, query).await?;
    Ok(Json(entries))
}

async fn handle_vote(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<VoteRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let (user, _) = require_user(&ctx, &headers).await?;

    let kind = match body.vote_type.as_deref() {
        Some("upvote") => VoteKind::Upvote,
        Some("downvote") => VoteKind::Downvote,
        _ => return Err(ApiError::invalid_input("Invalid data").into()),
    };
    let idea_id = match body.idea_id.as_deref().filter(|s| !s.is_empty()) {
        Some(id) => id,
        None => return Err(ApiError::invalid_input("Invalid data").into()),
    };

    let outcome = votes::cast_vote(&ctx, &user, idea_id, kind).await?;
    Ok(success_message(outcome.action.message()))
}

async fn handle_bookmark(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<BookmarkRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let (user, _) = require_user(&ctx, &headers).await?;

    let idea_id = match body.idea_id.as_deref().filter(|s| !s.is_empty()) {
        Some(id) => id,
        None => return Err(ApiError::invalid_input("Invalid data").into()),
    };

    let action = bookmarks::toggle_bookmark(&ctx, &user, idea_id).await?;
    Ok(success_message(action.message()))
}

async fn handle_post_idea(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let (user, _) = require_user(&ctx, &headers).await?;

    let mut draft = ideas::IdeaDraft::default();
    let mut upload: Option<(String, axum::body::Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => draft.title = field.text().await?,
            "description" => draft.description = field.text().await?,
            "category" => draft.category = field.text().await?,
            "allow_internships" => {
                let value = field.text().await?;
                draft.allow_internships = matches!(value.as_str(), "on" | "true" | "1");
            }
            "skills_required" => draft.skills_required = Some(field.text().await?),
            "internship_description" => draft.internship_description = Some(field.text().await?),
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                if !file_name.is_empty() && !data.is_empty() {
                    upload = Some((file_name, data));
                }
            }
            _ => {}
        }
    }

    if let Some((file_name, data)) = upload {
        draft.media_url = Some(store_upload(&ctx, &file_name, &data).await?);
    }

    ideas::submit_idea(&ctx, &user, draft).await?;
    Ok(success_message("Idea submitted successfully"))
}

// ─── Upload Handling ─────────────────────────────────────────────

/// Reduce a client-supplied filename to a safe basename: final path
/// component only, non-portable characters replaced, leading dots stripped.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Write an uploaded file under the configured upload directory and return
/// the public path recorded in `media_url`. Stored names carry a fresh id
/// prefix so equal client filenames never collide.
async fn store_upload(
    ctx: &AppContext,
    file_name: &str,
    data: &[u8],
) -> Result<String, HttpError> {
    let stored_name = format!("{}_{}", generate_id(), sanitize_filename(file_name));

    let dir = std::path::Path::new(&ctx.options.uploads.dir);
    if let Err(err) = tokio::fs::create_dir_all(dir).await {
        tracing::error!("could not create upload dir {}: {err}", dir.display());
        return Err(ApiError::internal("Upload failed").into());
    }

    let path = dir.join(&stored_name);
    if let Err(err) = tokio::fs::write(&path, data).await {
        tracing::error!("could not write upload {}: {err}", path.display());
        return Err(ApiError::internal("Upload failed").into());
    }

    let prefix = ctx.options.uploads.public_prefix.trim_end_matches('/');
    Ok(format!("{prefix}/{stored_name}"))
}

// ─── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use pitchdesk_memory::MemoryAdapter;

    #[test]
    fn test_extract_session_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer my-token-123".parse().unwrap());
        assert_eq!(
            extract_session_token(&headers, "pitchdesk.session_token"),
            Some("my-token-123".to_string())
        );
    }

    #[test]
    fn test_extract_session_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            "other=value; pitchdesk.session_token=abc123; another=xyz"
                .parse()
                .unwrap(),
        );
        assert_eq!(
            extract_session_token(&headers, "pitchdesk.session_token"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_extract_session_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_session_token(&headers, "pitchdesk.session_token"), None);
    }

    #[test]
    fn test_bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer from-header".parse().unwrap());
        headers.insert(
            "cookie",
            "pitchdesk.session_token=from-cookie".parse().unwrap(),
        );
        assert_eq!(
            extract_session_token(&headers, "pitchdesk.session_token"),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("pitch deck v2.png"), "pitch_deck_v2.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("résumé.pdf"), "r_sum_.pdf");
        assert_eq!(sanitize_filename("..."), "upload");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn test_router_creation() {
        let app = PitchdeskApp::new(PitchdeskOptions::default(), Arc::new(MemoryAdapter::new()));
        let _router = app.router_with_cors();
        assert_eq!(app.context().options.cookie_prefix, "pitchdesk");
    }
}
