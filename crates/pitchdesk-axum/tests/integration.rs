// Integration tests for pitchdesk-axum
//
// HTTP-level tests using tower::ServiceExt::oneshot to exercise the full
// Axum router over the in-memory adapter, without starting a TCP server.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use pitchdesk::context::AppContext;
use pitchdesk_axum::PitchdeskApp;
use pitchdesk_core::db::adapter::WhereClause;
use pitchdesk_core::utils::id::generate_id;
use pitchdesk_core::{Idea, IdeaStatus, PitchdeskOptions};
use pitchdesk_memory::MemoryAdapter;

// ─── Helpers ─────────────────────────────────────────────────────

fn build_app() -> (Arc<AppContext>, axum::Router) {
    build_app_with(PitchdeskOptions::default())
}

fn build_app_with(options: PitchdeskOptions) -> (Arc<AppContext>, axum::Router) {
    let app = PitchdeskApp::new(options, Arc::new(MemoryAdapter::new()));
    let ctx = app.context().clone();
    (ctx, app.router())
}

/// Collect the response body and parse it as JSON.
async fn body_json(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn form_request(path: &str, body: &str) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bearer_get(path: &str, token: &str) -> Request<Body> {
    Request::get(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn bearer_post_json(path: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn signup(router: &axum::Router, username: &str, email: &str) {
    let body = format!("username={username}&email={email}&password=password123");
    let response = router
        .clone()
        .oneshot(form_request("/signup", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

/// Log in and return the session token from the Set-Cookie header.
async fn login(router: &axum::Router, email: &str) -> String {
    let body = format!("email={email}&password=password123");
    let response = router
        .clone()
        .oneshot(form_request("/login", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login sets a session cookie")
        .to_str()
        .unwrap();
    let (name_value, _) = cookie.split_once(';').unwrap();
    let (_, token) = name_value.split_once('=').unwrap();
    token.to_string()
}

async fn seed_approved_idea(ctx: &AppContext, author_email: &str, title: &str) -> Idea {
    let author = ctx
        .store
        .find_user_by_email(author_email)
        .await
        .unwrap()
        .unwrap();
    let mut idea = Idea::new(
        generate_id(),
        author.id,
        title.to_string(),
        "Pitch".to_string(),
        "Energy".to_string(),
    );
    idea.status = IdeaStatus::Approved;
    ctx.store.create_idea(&idea).await.unwrap()
}

// ─── Auth Flow ───────────────────────────────────────────────────

#[tokio::test]
async fn signup_then_login_sets_session_cookie() {
    let (_ctx, router) = build_app();
    signup(&router, "maya", "maya@example.com").await;

    let response = router
        .clone()
        .oneshot(form_request(
            "/login",
            "email=maya@example.com&password=password123",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login sets a session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("pitchdesk.session_token="), "{cookie}");
    assert!(cookie.contains("HttpOnly"), "{cookie}");
    assert!(cookie.contains("SameSite=Lax"), "{cookie}");
    assert!(cookie.contains("Max-Age=604800"), "{cookie}");

    let json = body_json(response.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Login successful");
}

#[tokio::test]
async fn duplicate_signup_is_conflict() {
    let (_ctx, router) = build_app();
    signup(&router, "maya", "maya@example.com").await;

    let response = router
        .clone()
        .oneshot(form_request(
            "/signup",
            "username=other&email=maya@example.com&password=password123",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Email already registered");

    let response = router
        .clone()
        .oneshot(form_request(
            "/signup",
            "username=maya&email=new@example.com&password=password123",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["message"], "Username already taken");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let (_ctx, router) = build_app();
    signup(&router, "maya", "maya@example.com").await;

    let response = router
        .clone()
        .oneshot(form_request(
            "/login",
            "email=maya@example.com&password=not-the-password",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Invalid email or password");
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let (_ctx, router) = build_app();

    let response = router
        .clone()
        .oneshot(Request::get("/api/user").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["message"], "Authentication required");

    let response = router
        .clone()
        .oneshot(bearer_get("/api/ideas", "not-a-real-token"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["message"], "Invalid or expired session");
}

#[tokio::test]
async fn profile_endpoint_returns_projection() {
    let (_ctx, router) = build_app();
    signup(&router, "maya", "maya@example.com").await;
    let token = login(&router, "maya@example.com").await;

    let response = router
        .clone()
        .oneshot(bearer_get("/api/user", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["username"], "maya");
    assert_eq!(json["email"], "maya@example.com");
    assert_eq!(json["role"], "student");
    assert_eq!(json["credits"], 100);
    assert_eq!(json["avatar"], "default.png");
    assert!(json.get("password_hash").is_none());
}

#[tokio::test]
async fn logout_redirects_and_revokes_the_session() {
    let (_ctx, router) = build_app();
    signup(&router, "maya", "maya@example.com").await;
    let token = login(&router, "maya@example.com").await;

    let request = Request::get("/logout")
        .header(header::COOKIE, format!("pitchdesk.session_token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("logout expires the cookie")
        .to_str()
        .unwrap();
    assert!(cookie.contains("Max-Age=0"), "{cookie}");

    // The revoked token no longer grants access.
    let response = router
        .clone()
        .oneshot(bearer_get("/api/user", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ─── Votes and Bookmarks ─────────────────────────────────────────

#[tokio::test]
async fn vote_endpoint_round_trip() {
    let (ctx, router) = build_app();
    signup(&router, "maya", "maya@example.com").await;
    signup(&router, "ravi", "ravi@example.com").await;
    let idea = seed_approved_idea(&ctx, "maya@example.com", "Solar kiosks").await;
    let token = login(&router, "ravi@example.com").await;

    let response = router
        .clone()
        .oneshot(bearer_post_json(
            "/api/vote",
            &token,
            serde_json::json!({ "idea_id": idea.id, "vote_type": "upvote" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Vote recorded");

    // One credit spent.
    let response = router
        .clone()
        .oneshot(bearer_get("/api/user", &token))
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["credits"], 99);

    // Same vote again toggles it off, without a refund.
    let response = router
        .clone()
        .oneshot(bearer_post_json(
            "/api/vote",
            &token,
            serde_json::json!({ "idea_id": idea.id, "vote_type": "upvote" }),
        ))
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["message"], "Vote removed");

    let response = router
        .clone()
        .oneshot(bearer_get("/api/user", &token))
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["credits"], 99);
}

#[tokio::test]
async fn vote_endpoint_rejects_bad_payloads() {
    let (ctx, router) = build_app();
    signup(&router, "maya", "maya@example.com").await;
    let idea = seed_approved_idea(&ctx, "maya@example.com", "Solar kiosks").await;
    let token = login(&router, "maya@example.com").await;

    let response = router
        .clone()
        .oneshot(bearer_post_json(
            "/api/vote",
            &token,
            serde_json::json!({ "idea_id": idea.id, "vote_type": "sideways" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["message"], "Invalid data");

    let response = router
        .clone()
        .oneshot(bearer_post_json(
            "/api/vote",
            &token,
            serde_json::json!({ "vote_type": "upvote" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(bearer_post_json(
            "/api/vote",
            &token,
            serde_json::json!({ "idea_id": "missing", "vote_type": "upvote" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["message"], "Idea not found");
}

#[tokio::test]
async fn bookmark_endpoint_toggles_and_lists() {
    let (ctx, router) = build_app();
    signup(&router, "maya", "maya@example.com").await;
    let idea = seed_approved_idea(&ctx, "maya@example.com", "Solar kiosks").await;
    let token = login(&router, "maya@example.com").await;

    let response = router
        .clone()
        .oneshot(bearer_post_json(
            "/api/bookmark",
            &token,
            serde_json::json!({ "idea_id": idea.id }),
        ))
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["message"], "Bookmark added");

    let response = router
        .clone()
        .oneshot(bearer_get("/api/user/bookmarks", &token))
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json, serde_json::json!([idea.id]));

    let response = router
        .clone()
        .oneshot(bearer_post_json(
            "/api/bookmark",
            &token,
            serde_json::json!({ "idea_id": idea.id }),
        ))
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["message"], "Bookmark removed");

    let response = router
        .clone()
        .oneshot(bearer_get("/api/user/bookmarks", &token))
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json, serde_json::json!([]));
}

// ─── Feed ────────────────────────────────────────────────────────

#[tokio::test]
async fn ideas_endpoint_filters_and_annotates() {
    let (ctx, router) = build_app();
    signup(&router, "maya", "maya@example.com").await;
    signup(&router, "acme", "acme@example.com").await;

    // Mark acme as a verified startup.
    let acme = ctx
        .store
        .find_user_by_email("acme@example.com")
        .await
        .unwrap()
        .unwrap();
    ctx.store
        .adapter()
        .update(
            "user",
            &[WhereClause::eq("id", acme.id.as_str())],
            serde_json::json!({ "is_verified": true }),
        )
        .await
        .unwrap();

    let student_idea = seed_approved_idea(&ctx, "maya@example.com", "Campus compost").await;
    seed_approved_idea(&ctx, "acme@example.com", "Solar kiosks").await;

    let token = login(&router, "maya@example.com").await;

    let response = router
        .clone()
        .oneshot(bearer_get("/api/ideas?filter=verified-startups", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["title"], "Solar kiosks");
    assert_eq!(json[0]["author"]["username"], "acme");
    assert_eq!(json[0]["author"]["is_verified"], true);

    // The viewer's own vote is annotated on the entry.
    router
        .clone()
        .oneshot(bearer_post_json(
            "/api/vote",
            &token,
            serde_json::json!({ "idea_id": student_idea.id, "vote_type": "downvote" }),
        ))
        .await
        .unwrap();
    let response = router
        .clone()
        .oneshot(bearer_get("/api/ideas?search=compost", &token))
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["user_vote"], "downvote");
    assert_eq!(json[0]["downvotes"], 1);

    let response = router
        .clone()
        .oneshot(bearer_get("/api/ideas?filter=hot-takes", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["message"], "Unknown filter: hot-takes");
}

// ─── Idea Submission ─────────────────────────────────────────────

fn multipart_body(boundary: &str, with_image: bool) -> String {
    let mut body = String::new();
    let fields = [
        ("title", "Solar kiosks"),
        ("description", "Low-cost panels for campus stalls"),
        ("category", "Energy"),
        ("allow_internships", "on"),
        ("skills_required", "solar, electronics"),
    ];
    for (name, value) in fields {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    if with_image {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; \
             filename=\"pitch deck.png\"\r\nContent-Type: image/png\r\n\r\nfake png bytes\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    body
}

#[tokio::test]
async fn post_idea_multipart_stores_the_upload() {
    let upload_dir = tempfile::tempdir().unwrap();
    let mut options = PitchdeskOptions::default();
    options.uploads.dir = upload_dir.path().to_str().unwrap().to_string();
    let (ctx, router) = build_app_with(options);

    signup(&router, "maya", "maya@example.com").await;
    let token = login(&router, "maya@example.com").await;

    let boundary = "pitchdesk-test-boundary";
    let request = Request::post("/api/post-idea")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(multipart_body(boundary, true)))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Idea submitted successfully");

    // The idea lands as pending with the sanitized public path recorded.
    let row = ctx
        .store
        .adapter()
        .find_one("idea", &[WhereClause::eq("title", "Solar kiosks")])
        .await
        .unwrap()
        .expect("idea row created");
    assert_eq!(row["status"], "pending");
    assert_eq!(row["allow_internships"], true);
    assert_eq!(row["skills_required"], "solar, electronics");
    let media_url = row["media_url"].as_str().unwrap();
    assert!(media_url.starts_with("/static/uploads/"), "{media_url}");
    assert!(media_url.ends_with("pitch_deck.png"), "{media_url}");

    // The bytes are on disk under the id-prefixed name.
    let mut entries = std::fs::read_dir(upload_dir.path()).unwrap();
    let entry = entries.next().unwrap().unwrap();
    assert!(entry
        .file_name()
        .to_string_lossy()
        .ends_with("pitch_deck.png"));
    let contents = std::fs::read_to_string(entry.path()).unwrap();
    assert_eq!(contents, "fake png bytes");

    // Pending ideas do not show in the feed.
    let response = router
        .clone()
        .oneshot(bearer_get("/api/ideas", &token))
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn post_idea_without_image_and_missing_fields() {
    let (_ctx, router) = build_app();
    signup(&router, "maya", "maya@example.com").await;
    let token = login(&router, "maya@example.com").await;

    let boundary = "pitchdesk-test-boundary";

    // No image part at all is fine.
    let request = Request::post("/api/post-idea")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(multipart_body(boundary, false)))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Missing required text fields are rejected.
    let empty = format!("--{boundary}--\r\n");
    let request = Request::post("/api/post-idea")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(empty))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Title, description and category are required");
}
