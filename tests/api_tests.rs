//! HTTP surface tests.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

mod common;
use common::{test_app, test_hub};

fn login_request(nickname: &str, password: &str) -> Request<Body> {
    Request::builder()
        .uri("/login")
        .method(Method::POST)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("nickname={nickname}&password={password}")))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, cookie, json)
}

#[tokio::test]
async fn test_login_registers_then_authenticates() {
    let app = test_app(test_hub().await);

    let (status, cookie, json) = send(&app, login_request("alice", "pw1")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cookie.unwrap_or_default().contains("id="));
    assert_eq!(json["nickname"], "alice");
    assert_eq!(json["created"], true);
    let color = json["color"].as_str().unwrap().to_owned();
    assert!(color.starts_with('#') && color.len() == 7);

    let (status, _, json) = send(&app, login_request("alice", "pw1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["created"], false);
    assert_eq!(json["color"], color.as_str());
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = test_app(test_hub().await);
    send(&app, login_request("alice", "pw1")).await;

    let (status, cookie, json) = send(&app, login_request("alice", "wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cookie.is_none());
    assert_eq!(json["error"], "Mot de passe incorrect.");
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let app = test_app(test_hub().await);

    let (status, _, json) = send(&app, login_request("alice", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, _, _) = send(&app, login_request("", "pw")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn history_request(cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/history");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie.split(';').next().unwrap());
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_history_endpoint() {
    let hub = test_hub().await;
    let conn = hub.connect().await;
    hub.join(conn, Some("bob")).await.unwrap();
    hub.message(conn, None, "<b>hi</b>").await.unwrap();
    let app = test_app(hub);

    let (_, cookie, _) = send(&app, login_request("alice", "pw1")).await;
    let (status, _, json) = send(&app, history_request(cookie.as_deref())).await;
    assert_eq!(status, StatusCode::OK);

    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["nickname"], "");
    assert_eq!(messages[1]["nickname"], "bob");
    let text = messages[1]["message"].as_str().unwrap();
    assert!(text.starts_with("&lt;b&gt;hi"));
    assert!(!text.contains('<'));
    assert!(messages[1].get("kind").is_none());
}

#[tokio::test]
async fn test_history_requires_login() {
    let hub = test_hub().await;
    let conn = hub.connect().await;
    hub.message(conn, Some("bob"), "private").await.unwrap();
    let app = test_app(hub);

    let (status, _, json) = send(&app, history_request(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json.get("messages").is_none());

    let (_, cookie, _) = send(&app, login_request("alice", "pw1")).await;
    let cookie = cookie.unwrap();
    let cookie = cookie.split(';').next().unwrap();
    let logout = Request::builder()
        .uri("/logout")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    send(&app, logout).await;
    let (status, _, _) = send(&app, history_request(Some(cookie))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_only_redirects_locally() {
    let app = test_app(test_hub().await);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/logout?return_url=//evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/logout?return_url=/chat")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()[header::LOCATION], "/chat");
}
