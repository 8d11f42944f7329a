use std::sync::Arc;

use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower_sessions::Session;

use crate::{
    hub::{protocol::wire_messages, Hub},
    session::NICKNAME,
    AppResult,
};

/// The last few events, for rendering a page before the socket is up. Only
/// served to a session that has logged in.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn history(State(hub): State<Arc<Hub>>, session: Session) -> AppResult<Response> {
    if session.get::<String>(NICKNAME).await?.is_none() {
        return Ok((StatusCode::UNAUTHORIZED, Json(json!({ "error": "login required" }))).into_response());
    }

    let events = hub.recent(hub.window()).await;
    Ok(Json(json!({ "messages": wire_messages(&events) })).into_response())
}
