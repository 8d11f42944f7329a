use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::{
    chat::ChatEvent,
    hub::{
        protocol::{history_frame, message_frame},
        ClientEvent, Hub, Joined,
    },
    session::NICKNAME,
    AppResult,
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    State(hub): State<Arc<Hub>>,
    session: Session,

    ws: WebSocketUpgrade,
) -> AppResult<impl IntoResponse> {
    let cookie_nickname = session.get::<String>(NICKNAME).await?;

    Ok(ws.on_upgrade(async move |socket| serve_socket(hub, socket, cookie_nickname).await))
}

/// Pumps client frames into the hub and hub events out to the client until
/// either side goes away. However it ends, the hub sees a disconnect.
///
/// Hub events are only forwarded once the client has joined; the `history`
/// frame sent on join covers everything before that.
async fn serve_socket(hub: Arc<Hub>, socket: WebSocket, cookie_nickname: Option<String>) {
    let id = hub.connect().await;
    let mut events: Option<broadcast::Receiver<Arc<ChatEvent>>> = None;
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let frame = match incoming {
                    Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(Message::Binary(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!(connection = %id, error = %e, "socket error");
                        break;
                    }
                };

                match hub.dispatch(id, ClientEvent::parse(&frame), cookie_nickname.as_deref()).await {
                    // joining again keeps the stream already being forwarded
                    Ok(Some(_)) if events.is_some() => {}
                    Ok(Some(Joined { history, events: joined })) => {
                        events = Some(joined);
                        if sender.send(Message::Text(history_frame(&history).into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(connection = %id, error = %e, "dropping event");
                        break;
                    }
                }
            }
            event = next_event(&mut events) => match event {
                Ok(event) => {
                    if sender.send(Message::Text(message_frame(&event).into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(connection = %id, skipped, "client fell behind, events skipped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    hub.disconnect(id, cookie_nickname.as_deref()).await;
}

async fn next_event(
    events: &mut Option<broadcast::Receiver<Arc<ChatEvent>>>,
) -> Result<Arc<ChatEvent>, RecvError> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}
