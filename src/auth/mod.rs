use axum::{routing::{get, post}, Router};

use crate::AppState;

mod login;
mod logout;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login::login))
        .route("/logout", get(logout::logout))
}
