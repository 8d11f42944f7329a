//! Chat socket tests against a live listener.

use std::{net::SocketAddr, time::Duration};

use axum::{
    body::Body,
    http::{Method, Request, header},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, client::IntoClientRequest},
};
use tower::ServiceExt;

mod common;
use common::{test_app, test_hub};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> (SocketAddr, Router) {
    let app = test_app(test_hub().await);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let served = app.clone();
    tokio::spawn(async move {
        axum::serve(listener, served).await.unwrap();
    });
    (addr, app)
}

/// Logs in over HTTP and returns the `name=value` part of the session cookie.
async fn login_cookie(app: &Router, nickname: &str) -> String {
    let request = Request::builder()
        .uri("/login")
        .method(Method::POST)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("nickname={nickname}&password=pw")))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    cookie.split(';').next().unwrap().to_owned()
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

async fn connect_with_cookie(addr: SocketAddr, cookie: &str) -> Client {
    let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
    request.headers_mut().insert(header::COOKIE, cookie.parse().unwrap());
    let (client, _) = connect_async(request).await.unwrap();
    client
}

fn count_text(frame: &Value, text: &str) -> usize {
    let messages = match frame["event"].as_str() {
        Some("history") => frame["data"]["messages"].as_array().unwrap().clone(),
        _ => vec![frame["data"].clone()],
    };
    messages.iter().filter(|m| m["message"] == text).count()
}

async fn emit(client: &mut Client, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    client.send(Message::text(frame)).await.unwrap();
}

async fn next_frame(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a frame")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_join_message_leave() {
    let (addr, _app) = spawn_server().await;

    let mut alice = connect(addr).await;
    emit(&mut alice, "join", json!({ "nickname": "alice" })).await;

    let history = next_frame(&mut alice).await;
    assert_eq!(history["event"], "history");
    assert_eq!(history["data"]["messages"], json!([]));
    let joined = next_frame(&mut alice).await;
    assert_eq!(joined["data"]["message"], "alice a rejoint le chat.");

    let mut bob = connect(addr).await;
    emit(&mut bob, "join", json!({ "nickname": "bob" })).await;
    let history = next_frame(&mut bob).await;
    assert_eq!(history["data"]["messages"].as_array().unwrap().len(), 1);
    assert_eq!(
        next_frame(&mut alice).await["data"]["message"],
        "bob a rejoint le chat."
    );
    next_frame(&mut bob).await;

    emit(&mut bob, "message", json!({ "text": "<script>alert(1)</script>" })).await;
    let seen_by_alice = next_frame(&mut alice).await;
    assert_eq!(seen_by_alice["data"]["nickname"], "bob");
    assert!(!seen_by_alice["data"]["message"].as_str().unwrap().contains('<'));
    assert_eq!(next_frame(&mut bob).await, seen_by_alice);

    bob.close(None).await.unwrap();
    let left = next_frame(&mut alice).await;
    assert_eq!(left["data"]["nickname"], "");
    assert_eq!(left["data"]["message"], "bob a quitté le chat.");
    assert_eq!(left["data"]["color"], "#aaaaaa");
}

#[tokio::test]
async fn test_raw_frame_before_join() {
    let (addr, _app) = spawn_server().await;
    let mut client = connect(addr).await;

    client.send(Message::text("just text".to_owned())).await.unwrap();
    emit(&mut client, "join", json!({ "nickname": "late" })).await;

    let history = next_frame(&mut client).await;
    assert_eq!(history["event"], "history");
    let messages = history["data"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["nickname"], "Anonyme");
    assert_eq!(messages[0]["message"], "just text");

    let joined = next_frame(&mut client).await;
    assert_eq!(joined["event"], "message");
    assert_eq!(joined["data"]["message"], "late a rejoint le chat.");
}

#[tokio::test]
async fn test_event_before_join_arrives_once() {
    let (addr, _app) = spawn_server().await;

    let mut alice = connect(addr).await;
    emit(&mut alice, "join", json!({ "nickname": "alice" })).await;
    next_frame(&mut alice).await;
    next_frame(&mut alice).await;

    let mut watcher = connect(addr).await;
    emit(&mut alice, "message", json!({ "text": "hello" })).await;
    assert_eq!(next_frame(&mut alice).await["data"]["message"], "hello");

    emit(&mut watcher, "join", json!({ "nickname": "watcher" })).await;
    let history = next_frame(&mut watcher).await;
    assert_eq!(history["event"], "history");
    assert_eq!(count_text(&history, "hello"), 1);
    let joined = next_frame(&mut watcher).await;
    assert_eq!(joined["data"]["message"], "watcher a rejoint le chat.");

    emit(&mut alice, "message", json!({ "text": "bye" })).await;
    let next = next_frame(&mut watcher).await;
    assert_eq!(count_text(&next, "hello"), 0);
    assert_eq!(next["data"]["message"], "bye");
}

#[tokio::test]
async fn test_second_join_sends_no_second_history() {
    let (addr, _app) = spawn_server().await;
    let mut client = connect(addr).await;

    emit(&mut client, "join", json!({ "nickname": "alice" })).await;
    assert_eq!(next_frame(&mut client).await["event"], "history");
    next_frame(&mut client).await;

    emit(&mut client, "join", json!({ "nickname": "alicia" })).await;
    let frame = next_frame(&mut client).await;
    assert_eq!(frame["event"], "message");
    assert_eq!(frame["data"]["message"], "alicia a rejoint le chat.");
}

#[tokio::test]
async fn test_logged_in_socket_leaving_without_join_is_announced() {
    let (addr, app) = spawn_server().await;

    let mut alice = connect(addr).await;
    emit(&mut alice, "join", json!({ "nickname": "alice" })).await;
    next_frame(&mut alice).await;
    next_frame(&mut alice).await;

    let cookie = login_cookie(&app, "carol").await;
    let mut carol = connect_with_cookie(addr, &cookie).await;
    carol.close(None).await.unwrap();

    let left = next_frame(&mut alice).await;
    assert_eq!(left["data"]["nickname"], "");
    assert_eq!(left["data"]["message"], "carol a quitté le chat.");
}

#[tokio::test]
async fn test_anonymous_socket_leaving_without_join_is_silent() {
    let (addr, _app) = spawn_server().await;

    let mut alice = connect(addr).await;
    emit(&mut alice, "join", json!({ "nickname": "alice" })).await;
    next_frame(&mut alice).await;
    next_frame(&mut alice).await;

    let mut stranger = connect(addr).await;
    stranger.close(None).await.unwrap();
    emit(&mut alice, "message", json!({ "text": "anyone?" })).await;

    let next = next_frame(&mut alice).await;
    assert_eq!(next["data"]["message"], "anyone?");
}
