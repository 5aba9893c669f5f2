/// Error handling at the HTTP boundary
///
/// Covers the status code and error body for each failure class, and checks
/// that rejected requests leave the stored session untouched.
use draftwatch_web::fixtures::sample_catalog;
use draftwatch_web::{
    AppContext, AssetUrls, EventBus, MemorySessionStore, ServerConfig, SessionError,
    SessionManager, WebServer,
};
use serde_json::{json, Value};
use std::sync::Arc;
use warp::http::StatusCode;

async fn call(
    context: &AppContext,
    method: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = warp::test::request().method(method).path(path);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.reply(&WebServer::filter(context)).await;
    let json = serde_json::from_slice(response.body()).unwrap_or(Value::Null);
    (response.status(), json)
}

fn context_with_fixed_ids() -> AppContext {
    let bus = Arc::new(EventBus::new());
    let sessions = SessionManager::new(
        Arc::new(MemorySessionStore::new()),
        Arc::new(sample_catalog()),
        bus.clone(),
        AssetUrls::default(),
    )
    .with_id_generator(|| "always-the-same".to_string());
    AppContext::new_with_dependencies(ServerConfig::for_tests(), bus, Arc::new(sessions))
}

#[tokio::test]
async fn two_cards_is_a_validation_error_without_mutation() {
    let context = AppContext::new_for_tests();
    let creds = context.sessions().create_session().expect("create");

    let (status, body) = call(
        &context,
        "POST",
        &format!("/session/update/cards/{}", creds.session_id),
        Some(json!({"auth_token": creds.auth_token, "cards": ["CS2_029", "CS2_024"]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"]["field"], "cards");

    let snapshot = context
        .sessions()
        .snapshot(&creds.session_id)
        .expect("snapshot");
    assert_eq!(snapshot.current_cards, [None, None, None]);
}

#[tokio::test]
async fn thirty_one_picks_are_rejected() {
    let context = AppContext::new_for_tests();
    let creds = context.sessions().create_session().expect("create");

    let (status, body) = call(
        &context,
        "POST",
        &format!("/session/update/drafted/{}", creds.session_id),
        Some(json!({"auth_token": creds.auth_token, "drafted": vec!["CS2_029"; 31]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "drafted");
    assert_eq!(
        context
            .sessions()
            .snapshot(&creds.session_id)
            .expect("snapshot")
            .num_drafted,
        0
    );
}

#[tokio::test]
async fn unknown_hero_is_rejected() {
    let context = AppContext::new_for_tests();
    let creds = context.sessions().create_session().expect("create");

    let (status, body) = call(
        &context,
        "POST",
        &format!("/session/update/hero/{}", creds.session_id),
        Some(json!({"auth_token": creds.auth_token, "hero": "necromancer"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"]["field"], "hero");
}

#[tokio::test]
async fn unknown_card_is_rejected_before_storing() {
    let context = AppContext::new_for_tests();
    let creds = context.sessions().create_session().expect("create");

    let (status, body) = call(
        &context,
        "POST",
        &format!("/session/update/drafted/{}", creds.session_id),
        Some(json!({"auth_token": creds.auth_token, "drafted": ["CS2_029", "NOPE_001"]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown_card");
    assert_eq!(body["details"]["card"], "NOPE_001");
    assert!(context
        .sessions()
        .snapshot(&creds.session_id)
        .expect("snapshot")
        .drafted
        .is_empty());
}

#[tokio::test]
async fn reads_of_unknown_sessions_are_404() {
    let context = AppContext::new_for_tests();

    for path in ["/json/missing", "/viewer/missing"] {
        let (status, body) = call(&context, "GET", path, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
        assert_eq!(body["error"], "session_not_found");
        assert_eq!(body["details"]["session_id"], "missing");
    }
}

#[tokio::test]
async fn updates_to_unknown_sessions_are_404() {
    let context = AppContext::new_for_tests();

    let (status, body) = call(
        &context,
        "POST",
        "/session/update/hero/missing",
        Some(json!({"auth_token": "whatever", "hero": "mage"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "session_not_found");
}

#[tokio::test]
async fn drafted_update_to_unknown_session_is_404_even_with_unknown_cards() {
    let context = AppContext::new_for_tests();

    let (status, body) = call(
        &context,
        "POST",
        "/session/update/drafted/does_not_exist",
        Some(json!({"auth_token": "x", "drafted": ["NOPE"]})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "session_not_found");
    assert_eq!(body["details"]["session_id"], "does_not_exist");
}

#[tokio::test]
async fn id_exhaustion_is_a_server_error() {
    let context = context_with_fixed_ids();

    let (status, _) = call(&context, "GET", "/session/new", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&context, "GET", "/session/new", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "session_id_exhausted");

    assert!(matches!(
        context.sessions().create_session(),
        Err(SessionError::Exhausted { attempts: 10 })
    ));
}

#[tokio::test]
async fn token_is_never_exposed() {
    let context = AppContext::new_for_tests();
    let creds = context.sessions().create_session().expect("create");

    for path in [
        format!("/json/{}", creds.session_id),
        format!("/viewer/{}", creds.session_id),
    ] {
        let response = warp::test::request()
            .path(&path)
            .reply(&WebServer::filter(&context))
            .await;
        let raw = String::from_utf8_lossy(response.body()).to_string();
        assert!(!raw.contains(&creds.auth_token), "{path} leaked the token");
    }
}
