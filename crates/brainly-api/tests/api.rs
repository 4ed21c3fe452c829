use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request, StatusCode},
};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use brainly_api::auth::create_token;
use brainly_api::{AppStateInner, AuthConfig, router};
use brainly_db::models::{ContentRecord, NewContent, OwnedContent, ShareLinkRecord, UserRecord};
use brainly_db::{
    ContentRepository, LinkRepository, MemoryStore, Store, StoreError, StoreResult,
    UserRepository,
};

const SECRET: &str = "test-secret";

fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: SECRET.into(),
        token_ttl: Some(Duration::days(30)),
    }
}

fn app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppStateInner::new(store.clone(), auth_config());
    (router(state), store)
}

fn app_with_hashes(hash_source: fn(usize) -> String) -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppStateInner::with_hash_source(store.clone(), auth_config(), hash_source);
    (router(state), store)
}

async fn call_with_header(
    app: &Router,
    uri: &str,
    authorization: HeaderValue,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", authorization)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn user_id(store: &MemoryStore, username: &str) -> Uuid {
    store.find_user_by_username(username).unwrap().unwrap().id
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", token);
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn signup(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        "/api/v1/signup",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await
}

async fn signin(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        "/api/v1/signin",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await
}

/// Signs up and signs in, returning the token.
async fn register(app: &Router, username: &str) -> String {
    let (status, _) = signup(app, username, "Abc12345@").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = signin(app, username, "Abc12345@").await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn add(app: &Router, token: &str, title: &str, kind: &str) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        "/api/v1/content",
        Some(token),
        Some(json!({ "title": title, "type": kind, "link": format!("https://example.com/{title}") })),
    )
    .await
}

async fn list(app: &Router, token: &str) -> Vec<Value> {
    let (status, body) = call(app, "GET", "/api/v1/content", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    body["content"].as_array().unwrap().clone()
}

async fn enable_share(app: &Router, token: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/v1/brain/share",
        Some(token),
        Some(json!({ "share": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["hash"].as_str().unwrap().to_string()
}

// -- Auth --

#[tokio::test]
async fn end_to_end_signup_signin_add_list() {
    let (app, _) = app();

    let (status, body) = signup(&app, "alice", "Abc12345@").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "signed up successfully");

    let (status, body) = signin(&app, "alice", "Abc12345@").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "signed in successfully");
    let token = body["token"].as_str().unwrap();

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/content",
        Some(token),
        Some(json!({ "title": "t", "type": "Youtube", "link": "http://youtu.be/x" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Content Added");

    let content = list(&app, token).await;
    assert_eq!(content.len(), 1);
    assert_eq!(content[0]["title"], "t");
    assert_eq!(content[0]["type"], "Youtube");
    assert_eq!(content[0]["link"], "http://youtu.be/x");
    assert_eq!(content[0]["userId"]["username"], "alice");
    assert_eq!(content[0]["tag"], json!([]));
    assert!(content[0]["_id"].is_string());
    assert!(content[0]["createdAt"].is_string());
}

#[tokio::test]
async fn signup_rejects_password_without_uppercase() {
    let (app, _) = app();
    let (status, body) = signup(&app, "alice", "abcdefg1@").await;
    assert_eq!(status.as_u16(), 411);
    assert_eq!(body["message"], "Error in inputs");
}

#[tokio::test]
async fn signup_rejects_short_username() {
    let (app, _) = app();
    let (status, body) = signup(&app, "al", "Abc12345@").await;
    assert_eq!(status.as_u16(), 411);
    assert_eq!(body, json!({ "message": "Error in inputs" }));
}

#[tokio::test]
async fn signup_rejects_missing_fields() {
    let (app, _) = app();
    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/signup",
        None,
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status.as_u16(), 411);
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let (app, _) = app();
    assert_eq!(signup(&app, "alice", "Abc12345@").await.0, StatusCode::OK);

    let (status, body) = signup(&app, "alice", "Xyz98765!").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "User already exists with this username");
}

#[tokio::test]
async fn signin_errors_do_not_reveal_which_field_was_wrong() {
    let (app, _) = app();
    signup(&app, "alice", "Abc12345@").await;

    let (status, wrong_password) = signin(&app, "alice", "Abc12345!").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, unknown_user) = signin(&app, "mallory", "Abc12345@").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password["message"], "Incorrect username or password");
}

// -- Auth middleware --

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let (app, _) = app();
    let (status, body) = call(&app, "GET", "/api/v1/content", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authorization token is missing");
}

#[tokio::test]
async fn invalid_token_is_unauthorized() {
    let (app, _) = app();
    let (status, body) = call(&app, "GET", "/api/v1/content", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "You are not logged in or session expired");
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let (app, _) = app();
    let expired = create_token(
        &AuthConfig {
            jwt_secret: SECRET.into(),
            token_ttl: Some(Duration::hours(-2)),
        },
        Uuid::new_v4(),
    )
    .unwrap();

    let (status, body) = call(&app, "GET", "/api/v1/content", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "You are not logged in or session expired");
}

#[tokio::test]
async fn bearer_prefix_is_accepted() {
    let (app, _) = app();
    let token = register(&app, "alice").await;
    let (status, _) = call(
        &app,
        "GET",
        "/api/v1/content",
        Some(&format!("Bearer {token}")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// -- Content --

#[tokio::test]
async fn content_is_private_to_its_owner() {
    let (app, _) = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    assert_eq!(add(&app, &alice, "mine", "Notion").await.0, StatusCode::OK);

    let alices = list(&app, &alice).await;
    assert_eq!(alices.len(), 1);
    assert_eq!(alices[0]["title"], "mine");
    assert!(list(&app, &bob).await.is_empty());
}

#[tokio::test]
async fn unknown_type_fails_in_the_store() {
    let (app, _) = app();
    let token = register(&app, "alice").await;

    let (status, body) = add(&app, &token, "t", "Myspace").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Server Error");
    assert_eq!(body["error"], "ValidationError");
    assert!(list(&app, &token).await.is_empty());
}

#[tokio::test]
async fn missing_title_fails_in_the_store() {
    let (app, _) = app();
    let token = register(&app, "alice").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/content",
        Some(&token),
        Some(json!({ "type": "Twitter", "link": "https://x.com/p" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "ValidationError");
}

#[tokio::test]
async fn delete_own_content() {
    let (app, _) = app();
    let token = register(&app, "alice").await;
    add(&app, &token, "gone", "Facebook").await;
    let id = list(&app, &token).await[0]["_id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        "DELETE",
        "/api/v1/delete",
        Some(&token),
        Some(json!({ "contentId": id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Content deleted successfully");
    assert!(list(&app, &token).await.is_empty());
}

#[tokio::test]
async fn deleting_another_users_content_is_not_found() {
    let (app, store) = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    add(&app, &bob, "bobs", "Youtube").await;
    let id = list(&app, &bob).await[0]["_id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        "DELETE",
        "/api/v1/delete",
        Some(&alice),
        Some(json!({ "contentId": id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Content not found");

    let id: Uuid = id.parse().unwrap();
    assert!(store.find_content_by_id(id).unwrap().is_some());
    assert_eq!(list(&app, &bob).await.len(), 1);
}

#[tokio::test]
async fn delete_requires_a_content_id() {
    let (app, _) = app();
    let token = register(&app, "alice").await;

    let (status, body) = call(&app, "DELETE", "/api/v1/delete", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Content ID is required");

    let (status, _) = call(&app, "DELETE", "/api/v1/delete", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_with_unparseable_id_is_not_found() {
    let (app, _) = app();
    let token = register(&app, "alice").await;

    let (status, _) = call(
        &app,
        "DELETE",
        "/api/v1/delete",
        Some(&token),
        Some(json!({ "contentId": "64b7f0c2e1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Sharing --

#[tokio::test]
async fn enabling_twice_returns_the_same_hash() {
    let (app, _) = app();
    let token = register(&app, "alice").await;
    add(&app, &token, "one", "Youtube").await;
    add(&app, &token, "two", "Instagram").await;

    let first = enable_share(&app, &token).await;
    let second = enable_share(&app, &token).await;
    assert_eq!(first, second);
    assert_eq!(first.len(), 10);

    let (status, body) = call(&app, "GET", &format!("/api/v1/brain/{first}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    let titles: Vec<&str> = body["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["one", "two"]);
}

#[tokio::test]
async fn shared_view_only_shows_the_link_owner() {
    let (app, _) = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    add(&app, &alice, "alices", "Notion").await;
    add(&app, &bob, "bobs", "Notion").await;

    let hash = enable_share(&app, &bob).await;
    let (_, body) = call(&app, "GET", &format!("/api/v1/brain/{hash}"), None, None).await;
    assert_eq!(body["username"], "bob");
    let content = body["content"].as_array().unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0]["title"], "bobs");
}

#[tokio::test]
async fn disabled_link_becomes_invalid() {
    let (app, _) = app();
    let token = register(&app, "alice").await;
    let hash = enable_share(&app, &token).await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/brain/share",
        Some(&token),
        Some(json!({ "share": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Link Removed");

    let (status, body) = call(&app, "GET", &format!("/api/v1/brain/{hash}"), None, None).await;
    assert_eq!(status.as_u16(), 411);
    assert_eq!(body, json!({ "message": "sorry incorrect input" }));

    // Re-enabling issues a new hash
    let fresh = enable_share(&app, &token).await;
    assert_ne!(fresh, hash);
}

#[tokio::test]
async fn disabling_without_a_link_still_succeeds() {
    let (app, _) = app();
    let token = register(&app, "alice").await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/brain/share",
        Some(&token),
        Some(json!({ "share": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Link Removed");
}

#[tokio::test]
async fn unknown_hash_is_an_invalid_link() {
    let (app, _) = app();
    let token = register(&app, "alice").await;
    add(&app, &token, "secret", "Youtube").await;
    enable_share(&app, &token).await;

    let (status, body) = call(&app, "GET", "/api/v1/brain/Zz9Zz9Zz9Z", None, None).await;
    assert_eq!(status.as_u16(), 411);
    assert!(body.get("content").is_none());
    assert!(body.get("username").is_none());
}

#[tokio::test]
async fn share_requires_authentication() {
    let (app, _) = app();
    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/brain/share",
        None,
        Some(json!({ "share": true })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// -- Request bodies --

#[tokio::test]
async fn share_without_a_body_removes_the_link() {
    let (app, store) = app();
    let token = register(&app, "alice").await;
    let hash = enable_share(&app, &token).await;

    let (status, body) = call(&app, "POST", "/api/v1/brain/share", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Link Removed");
    assert!(store.find_link_by_hash(&hash).unwrap().is_none());
}

#[tokio::test]
async fn content_without_a_body_fails_validation() {
    let (app, _) = app();
    let token = register(&app, "alice").await;

    let (status, body) = call(&app, "POST", "/api/v1/content", Some(&token), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Server Error");
    assert_eq!(body["error"], "ValidationError");
    assert!(list(&app, &token).await.is_empty());
}

// -- Authorization header forms --

#[tokio::test]
async fn blank_authorization_header_is_a_failed_session() {
    let (app, _) = app();
    let (status, body) =
        call_with_header(&app, "/api/v1/content", HeaderValue::from_static("   ")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "You are not logged in or session expired");
}

#[tokio::test]
async fn non_text_authorization_header_is_a_failed_session() {
    let (app, _) = app();
    let value = HeaderValue::from_bytes(&[0xff, 0xfe, 0x41]).unwrap();
    let (status, body) = call_with_header(&app, "/api/v1/content", value).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "You are not logged in or session expired");
}

#[tokio::test]
async fn empty_authorization_header_is_a_missing_token() {
    let (app, _) = app();
    let (status, body) =
        call_with_header(&app, "/api/v1/content", HeaderValue::from_static("")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authorization token is missing");
}

// -- Share hash collisions --

const TAKEN: &str = "Taken00000";

static COLLIDE_ONCE_DRAWS: AtomicUsize = AtomicUsize::new(0);

fn collide_once(len: usize) -> String {
    assert_eq!(len, 10);
    match COLLIDE_ONCE_DRAWS.fetch_add(1, Ordering::SeqCst) {
        0 => TAKEN.to_string(),
        _ => "Fresh00000".to_string(),
    }
}

static ALWAYS_TAKEN_DRAWS: AtomicUsize = AtomicUsize::new(0);

fn always_taken(_len: usize) -> String {
    ALWAYS_TAKEN_DRAWS.fetch_add(1, Ordering::SeqCst);
    TAKEN.to_string()
}

#[tokio::test]
async fn colliding_hash_is_drawn_again() {
    let (app, store) = app_with_hashes(collide_once);
    register(&app, "bob").await;
    store.insert_link_if_absent(user_id(&store, "bob"), TAKEN).unwrap();
    let alice = register(&app, "alice").await;

    let hash = enable_share(&app, &alice).await;
    assert_eq!(hash, "Fresh00000");
    assert_eq!(COLLIDE_ONCE_DRAWS.load(Ordering::SeqCst), 2);

    // Bob keeps his link
    let bobs = store.find_link_by_hash(TAKEN).unwrap().unwrap();
    assert_eq!(bobs.owner_id, user_id(&store, "bob"));
}

#[tokio::test]
async fn share_gives_up_after_three_collisions() {
    let (app, store) = app_with_hashes(always_taken);
    register(&app, "bob").await;
    store.insert_link_if_absent(user_id(&store, "bob"), TAKEN).unwrap();
    let alice = register(&app, "alice").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/brain/share",
        Some(&alice),
        Some(json!({ "share": true })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Server Error");
    assert_eq!(body["error"], "ConflictError");
    assert_eq!(ALWAYS_TAKEN_DRAWS.load(Ordering::SeqCst), 3);
    assert!(store.find_link_by_owner(user_id(&store, "alice")).unwrap().is_none());
}

// -- Store failures --

/// Delegates to a `MemoryStore` but fails every content delete.
struct FailingDeletes(MemoryStore);

impl UserRepository for FailingDeletes {
    fn insert_user(&self, username: &str, password_hash: &str) -> StoreResult<UserRecord> {
        self.0.insert_user(username, password_hash)
    }

    fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        self.0.find_user_by_id(id)
    }

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        self.0.find_user_by_username(username)
    }
}

impl ContentRepository for FailingDeletes {
    fn insert_content(&self, content: NewContent) -> StoreResult<ContentRecord> {
        self.0.insert_content(content)
    }

    fn find_content_by_id(&self, id: Uuid) -> StoreResult<Option<ContentRecord>> {
        self.0.find_content_by_id(id)
    }

    fn find_contents_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<OwnedContent>> {
        self.0.find_contents_by_owner(owner_id)
    }

    fn delete_content(&self, _id: Uuid, _owner_id: Uuid) -> StoreResult<bool> {
        Err(StoreError::Poisoned)
    }
}

impl LinkRepository for FailingDeletes {
    fn insert_link_if_absent(&self, owner_id: Uuid, hash: &str) -> StoreResult<ShareLinkRecord> {
        self.0.insert_link_if_absent(owner_id, hash)
    }

    fn find_link_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<ShareLinkRecord>> {
        self.0.find_link_by_owner(owner_id)
    }

    fn find_link_by_hash(&self, hash: &str) -> StoreResult<Option<ShareLinkRecord>> {
        self.0.find_link_by_hash(hash)
    }

    fn delete_link_by_owner(&self, owner_id: Uuid) -> StoreResult<bool> {
        self.0.delete_link_by_owner(owner_id)
    }
}

#[tokio::test]
async fn store_failure_on_delete_is_forbidden() {
    let store: Arc<dyn Store> = Arc::new(FailingDeletes(MemoryStore::new()));
    let app = router(AppStateInner::new(store, auth_config()));
    let token = register(&app, "alice").await;
    add(&app, &token, "talk", "Youtube").await;
    let id = list(&app, &token).await[0]["_id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        "DELETE",
        "/api/v1/delete",
        Some(&token),
        Some(json!({ "contentId": id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "message": "Server Error", "error": "StoreError" }));
    assert_eq!(list(&app, &token).await.len(), 1);
}
