use agora::config::Config;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn spawn_app_with(config: Config) -> Router {
    let state = agora::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    agora::api::router(state).await
}

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.generation.api_key = None;
    spawn_app_with(config).await
}

struct Reply {
    status: StatusCode,
    body: Value,
    cookie: Option<String>,
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    Reply {
        status,
        body,
        cookie,
    }
}

async fn signup(app: &Router, email: &str) -> String {
    let reply = send(
        app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({"email": email, "password": "correct-horse", "display_name": "Tester"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    reply.cookie.expect("signup should start a session")
}

async fn create_thread(app: &Router, cookie: &str) -> i64 {
    let reply = send(
        app,
        "POST",
        "/api/threads",
        Some(cookie),
        Some(json!({"title": "Rates", "body": "Central bank raised rates by 0.5%."})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    reply.body["data"]["thread_id"].as_i64().unwrap()
}

#[tokio::test]
async fn signup_login_and_me() {
    let app = spawn_app().await;
    let cookie = signup(&app, "Reader@Example.com").await;

    let me = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["success"], true);
    assert_eq!(me.body["data"]["email"], "reader@example.com");

    let duplicate = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({"email": "reader@example.com", "password": "another-pass"})),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["success"], false);

    let wrong = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "reader@example.com", "password": "nope-nope"})),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let login = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "reader@example.com", "password": "correct-horse"})),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
    assert!(login.cookie.is_some());

    let anonymous = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = spawn_app().await;
    let cookie = signup(&app, "leaver@example.com").await;

    let logout = send(&app, "POST", "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(logout.status, StatusCode::OK);

    let me = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_login() {
    let app = spawn_app().await;

    let cases = [
        ("POST", "/api/threads"),
        ("POST", "/api/threads/1/posts"),
        ("POST", "/api/threads/1/respond"),
        ("POST", "/api/threads/1/publish"),
        ("PUT", "/api/threads/1/status"),
        ("POST", "/api/posts/1/report"),
        ("POST", "/api/analyze"),
    ];

    for (method, uri) in cases {
        let reply = send(&app, method, uri, None, Some(json!({}))).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(reply.body["success"], false);
    }

    let list = send(&app, "GET", "/api/threads", None, None).await;
    assert_eq!(list.status, StatusCode::OK);
}

#[tokio::test]
async fn thread_post_report_flow() {
    let app = spawn_app().await;
    let cookie = signup(&app, "author@example.com").await;
    let thread_id = create_thread(&app, &cookie).await;

    let post = send(
        &app,
        "POST",
        &format!("/api/threads/{thread_id}/posts"),
        Some(&cookie),
        Some(json!({"content": "Mortgages will follow."})),
    )
    .await;
    assert_eq!(post.status, StatusCode::OK);
    let post_id = post.body["data"]["post_id"].as_i64().unwrap();

    let blank = send(
        &app,
        "POST",
        &format!("/api/threads/{thread_id}/posts"),
        Some(&cookie),
        Some(json!({"content": "   "})),
    )
    .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let detail = send(&app, "GET", &format!("/api/threads/{thread_id}"), None, None).await;
    assert_eq!(detail.status, StatusCode::OK);
    let posts = detail.body["data"]["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(detail.body["data"]["thread"]["title"], "Rates");

    let report = send(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/report"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(report.status, StatusCode::OK, "{}", report.body);
    assert!(report.body["data"]["report_id"].as_i64().is_some());

    let missing = send(&app, "GET", "/api/threads/9999", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let invalid = send(&app, "GET", "/api/threads/0", None, None).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn locked_thread_rejects_posts_and_only_author_moderates() {
    let app = spawn_app().await;
    let author = signup(&app, "owner@example.com").await;
    let other = signup(&app, "visitor@example.com").await;
    let thread_id = create_thread(&app, &author).await;
    let status_uri = format!("/api/threads/{thread_id}/status");

    let forbidden = send(&app, "PUT", &status_uri, Some(&other), Some(json!({"status": "locked"}))).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let bogus = send(&app, "PUT", &status_uri, Some(&author), Some(json!({"status": "archived"}))).await;
    assert_eq!(bogus.status, StatusCode::BAD_REQUEST);

    let locked = send(&app, "PUT", &status_uri, Some(&author), Some(json!({"status": "locked"}))).await;
    assert_eq!(locked.status, StatusCode::OK);
    assert_eq!(locked.body["data"]["status"], "locked");

    let rejected = send(
        &app,
        "POST",
        &format!("/api/threads/{thread_id}/posts"),
        Some(&other),
        Some(json!({"content": "late reply"})),
    )
    .await;
    assert_eq!(rejected.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn publish_and_public_view() {
    let app = spawn_app().await;
    let cookie = signup(&app, "sharer@example.com").await;

    let analyzed = send(
        &app,
        "POST",
        "/api/analyze",
        Some(&cookie),
        Some(json!({"thread_title": "Shared", "article": "Contact me at a@b.co", "comment": "ok?"})),
    )
    .await;
    assert_eq!(analyzed.status, StatusCode::OK, "{}", analyzed.body);
    assert_eq!(analyzed.body["data"]["role"], "system");
    let thread_id = analyzed.body["data"]["thread_id"].as_i64().unwrap();

    let published = send(
        &app,
        "POST",
        &format!("/api/threads/{thread_id}/publish"),
        Some(&cookie),
        Some(json!({"make_public": true})),
    )
    .await;
    assert_eq!(published.status, StatusCode::OK, "{}", published.body);
    assert_eq!(published.body["data"]["is_public"], true);
    let share_url = published.body["data"]["share_url"].as_str().unwrap().to_string();
    let path = &share_url[share_url.find("/p/").unwrap()..];

    let view = send(&app, "GET", path, None, None).await;
    assert_eq!(view.status, StatusCode::OK, "{}", view.body);
    assert_eq!(view.body["data"]["title"], "Shared");
    let history = view.body["data"]["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    let first = history[0]["content"].as_str().unwrap();
    assert!(first.contains("[email masked]"));
    assert!(!first.contains("a@b.co"));

    let unpublished = send(
        &app,
        "POST",
        &format!("/api/threads/{thread_id}/publish"),
        Some(&cookie),
        Some(json!({"make_public": false})),
    )
    .await;
    assert_eq!(unpublished.status, StatusCode::OK);

    let gone = send(&app, "GET", path, None, None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn respond_without_api_key_is_unavailable() {
    let app = spawn_app().await;
    let cookie = signup(&app, "asker@example.com").await;
    let thread_id = create_thread(&app, &cookie).await;

    let reply = send(
        &app,
        "POST",
        &format!("/api/threads/{thread_id}/respond"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(reply.body["error"].as_str().unwrap().contains("OPENAI_API_KEY"));

    let detail = send(&app, "GET", &format!("/api/threads/{thread_id}"), None, None).await;
    assert_eq!(detail.body["data"]["posts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn respond_appends_generated_post() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Rates affect loans."}}]}"#)
        .expect(1)
        .create_async()
        .await;

    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.generation.api_url = format!("{}/v1/chat/completions", server.url());
    config.generation.api_key = Some("sk-test".to_string());
    let app = spawn_app_with(config).await;

    let cookie = signup(&app, "curious@example.com").await;
    let thread_id = create_thread(&app, &cookie).await;

    let reply = send(
        &app,
        "POST",
        &format!("/api/threads/{thread_id}/respond"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["data"]["content"], "Rates affect loans.");
    assert_eq!(reply.body["data"]["from_cache"], false);

    let detail = send(&app, "GET", &format!("/api/threads/{thread_id}"), None, None).await;
    let posts = detail.body["data"]["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert!(posts[1]["content"].as_str().unwrap().ends_with("Rates affect loans."));
    assert_eq!(
        detail.body["data"]["latest_summary"]["content"],
        "Rates affect loans."
    );

    mock.assert_async().await;
}

#[tokio::test]
async fn upstream_rejection_maps_to_bad_gateway() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
        .expect(1)
        .create_async()
        .await;

    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.generation.api_url = format!("{}/v1/chat/completions", server.url());
    config.generation.api_key = Some("sk-wrong".to_string());
    let app = spawn_app_with(config).await;

    let cookie = signup(&app, "rejected@example.com").await;
    let thread_id = create_thread(&app, &cookie).await;

    let reply = send(
        &app,
        "POST",
        &format!("/api/threads/{thread_id}/respond"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
    let error = reply.body["error"].as_str().unwrap();
    assert!(error.contains("401"), "{error}");
    assert!(error.contains("Incorrect API key"), "{error}");

    mock.assert_async().await;
}

#[tokio::test]
async fn health_endpoints() {
    let app = spawn_app().await;

    let live = send(&app, "GET", "/api/health/live", None, None).await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body["data"]["status"], "ok");

    let ready = send(&app, "GET", "/api/health/ready", None, None).await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.body["data"]["status"], "ready");
}
