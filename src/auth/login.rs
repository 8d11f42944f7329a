use std::sync::Arc;

use axum::{debug_handler, extract::State, Form, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::info;

use crate::{
    chat::{Color, Nickname},
    hub::Hub,
    session::NICKNAME,
    AppResult,
};

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    pub(crate) nickname: String,
    #[serde(default)]
    pub(crate) password: String,
}

#[derive(Serialize)]
pub(crate) struct LoginReply {
    pub(crate) nickname: Nickname,
    pub(crate) color: Color,
    pub(crate) created: bool,
}

/// Logs into an existing identity or registers a new one, then remembers the
/// nickname in the cookie session for the chat socket.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(hub): State<Arc<Hub>>,
    session: Session,
    Form(LoginForm { nickname, password }): Form<LoginForm>,
) -> AppResult<Json<LoginReply>> {
    let (identity, created) = hub.identities().login(&nickname, &password).await?;

    session.cycle_id().await?;
    session.insert(NICKNAME, nickname.trim()).await?;
    info!(nickname = %identity.nickname, created, "logged in");

    Ok(Json(LoginReply {
        nickname: identity.nickname,
        color: identity.color,
        created,
    }))
}
