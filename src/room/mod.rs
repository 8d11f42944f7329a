mod history;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/history", get(history::history))
        .route("/ws", get(ws::chat_ws))
}
