use draftwatch_web::server::{AppContext, ServerHandle, WebServer};
use draftwatch_web::settings::AppSettings;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use warp::hyper::body::HttpBody;
use warp::hyper::{self, Body, Client as HyperClient, Request};

async fn start() -> ServerHandle {
    WebServer::from_context(AppContext::new_for_tests())
        .start()
        .await
        .expect("start server")
}

async fn send(
    method: hyper::Method,
    address: SocketAddr,
    path: &str,
    body: Option<Value>,
) -> (u16, Value) {
    let client = HyperClient::new();
    let mut builder = Request::builder()
        .method(method)
        .uri(format!("http://{address}{path}"));
    let body = match body {
        Some(body) => {
            builder = builder.header(hyper::header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let response = client
        .request(builder.body(body).expect("build request"))
        .await
        .expect("issue request");
    let status = response.status().as_u16();
    let bytes = hyper::body::to_bytes(response.into_body())
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get(address: SocketAddr, path: &str) -> (u16, Value) {
    send(hyper::Method::GET, address, path, None).await
}

async fn post(address: SocketAddr, path: &str, body: Value) -> (u16, Value) {
    send(hyper::Method::POST, address, path, Some(body)).await
}

#[tokio::test]
async fn draft_lifecycle_over_http() {
    let handle = start().await;
    let address = handle.address();

    let (status, created) = post(address, "/session/new", json!({})).await;
    assert_eq!(status, 200);
    let session_id = created["session_id"].as_str().expect("session id").to_string();
    let token = created["auth_token"].as_str().expect("token").to_string();
    assert!(!session_id.is_empty());
    assert!(!token.is_empty());

    let (status, body) = post(
        address,
        &format!("/session/update/cards/{session_id}"),
        json!({"auth_token": token, "cards": ["cs2_029", "", "EX1_277"]}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"success": true, "error": false}));

    post(
        address,
        &format!("/session/update/hero/{session_id}"),
        json!({"auth_token": token, "hero": "MAGE"}),
    )
    .await;
    post(
        address,
        &format!("/session/update/drafted/{session_id}"),
        json!({"auth_token": token, "drafted": ["CS2_029", "cs2_231"]}),
    )
    .await;

    let (status, snapshot) = get(address, &format!("/json/{session_id}")).await;
    assert_eq!(status, 200);
    assert_eq!(snapshot["session_id"], session_id);
    assert_eq!(snapshot["current_cards"], json!(["CS2_029", null, "EX1_277"]));
    assert_eq!(snapshot["hero"], "mage");
    assert_eq!(snapshot["drafted"], json!(["CS2_029", "CS2_231"]));
    assert_eq!(snapshot["num_drafted"], 2);
    assert!(snapshot.get("auth_token").is_none());

    let (status, viewer) = get(address, &format!("/viewer/{session_id}")).await;
    assert_eq!(status, 200);
    assert_eq!(viewer["manas"], json!([4, 0]));
    assert_eq!(viewer["finished"], false);
    assert_eq!(viewer["message"], "");
    assert!(viewer["hero"]
        .as_str()
        .expect("hero url")
        .ends_with("/heroes/mage.png"));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn session_new_accepts_get() {
    let handle = start().await;

    let (status, created) = get(handle.address(), "/session/new").await;
    assert_eq!(status, 200);
    assert!(created["session_id"].is_string());
}

#[tokio::test]
async fn sessions_get_distinct_credentials() {
    let handle = start().await;

    let (_, first) = get(handle.address(), "/session/new").await;
    let (_, second) = get(handle.address(), "/session/new").await;

    assert_ne!(first["session_id"], second["session_id"]);
    assert_ne!(first["auth_token"], second["auth_token"]);
}

#[tokio::test]
async fn health_reports_ok() {
    let handle = start().await;
    let (status, body) = get(handle.address(), "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn sse_viewer_receives_named_events() {
    let handle = start().await;
    let address = handle.address();
    let credentials = handle
        .context()
        .sessions()
        .create_session()
        .expect("create");

    let client = HyperClient::new();
    let uri: hyper::Uri = format!("http://{address}/events/{}", credentials.session_id)
        .parse()
        .expect("parse uri");
    let response = client.get(uri).await.expect("open stream");
    assert_eq!(response.status(), hyper::StatusCode::OK);
    let mut stream = response.into_body();

    // The route subscribes before the response head is sent.
    post(
        address,
        &format!("/session/update/hero/{}", credentials.session_id),
        json!({"auth_token": credentials.auth_token, "hero": "shaman"}),
    )
    .await;

    let mut frame = String::new();
    while !frame.contains("\n\n") {
        let chunk = tokio::time::timeout(Duration::from_secs(2), stream.data())
            .await
            .expect("frame before timeout")
            .expect("stream open")
            .expect("chunk");
        frame.push_str(&String::from_utf8_lossy(&chunk));
    }

    assert!(frame.contains("event:hero_updated"));
    assert!(frame.contains("/heroes/shaman.png"));
}

#[tokio::test]
async fn sqlite_backed_server_keeps_sessions_across_restarts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = AppSettings {
        port: 0,
        database_path: Some(dir.path().join("sessions.db")),
        ..AppSettings::default()
    };

    let handle = WebServer::from_settings(&settings)
        .expect("server")
        .start()
        .await
        .expect("start");
    let (_, created) = get(handle.address(), "/session/new").await;
    let session_id = created["session_id"].as_str().expect("id").to_string();
    post(
        handle.address(),
        &format!("/session/update/hero/{session_id}"),
        json!({"auth_token": created["auth_token"], "hero": "paladin"}),
    )
    .await;
    handle.shutdown().await.expect("shutdown");

    let handle = WebServer::from_settings(&settings)
        .expect("server")
        .start()
        .await
        .expect("restart");
    let (status, snapshot) = get(handle.address(), &format!("/json/{session_id}")).await;
    assert_eq!(status, 200);
    assert_eq!(snapshot["hero"], "paladin");
}
