pub mod auth;
pub mod chat;
pub mod color;
pub mod config;
pub mod history;
pub mod hub;
pub mod identity;
pub mod room;
pub mod session;
pub mod store;

use std::sync::Arc;

use axum::{extract::FromRef, http::StatusCode, response::{IntoResponse, Response}, Json, Router};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer};
use tracing::error;

use crate::{
    config::Config,
    history::HistoryLog,
    hub::Hub,
    identity::{AuthError, Credentials, IdentityStore},
    store::{DocumentStore, FileStore, SqliteStore},
};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub hub: Arc<Hub>,
}

pub fn router(app_state: AppState, session_hours: i64) -> Router {
    let session_layer = SessionManagerLayer::new(tower_sessions::MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(session_hours)));

    Router::new()
        .merge(auth::router())
        .merge(room::router())
        .with_state(app_state)
        .layer(session_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Opens the configured document store and loads everything the hub needs.
pub async fn open_hub(config: &Config) -> anyhow::Result<Arc<Hub>> {
    use anyhow::Context;

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => Arc::new(
            SqliteStore::connect(url)
                .await
                .with_context(|| format!("opening {url}"))?,
        ),
        None => Arc::new(FileStore::new(config.data_dir.clone())),
    };
    let credentials = config.bcrypt_cost.map(Credentials::new).unwrap_or_default();

    let identities = IdentityStore::load(store.clone(), credentials)
        .await
        .context("loading identities")?;
    let history = HistoryLog::load(store, config.history_limit)
        .await
        .context("loading history")?;

    Ok(Arc::new(Hub::new(
        Arc::new(identities),
        history,
        config.history_window,
        config.broadcast_capacity,
    )))
}

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<AuthError>() {
            Some(AuthError::Validation) => StatusCode::BAD_REQUEST,
            Some(AuthError::AlreadyRegistered) => StatusCode::CONFLICT,
            Some(AuthError::NotFound | AuthError::BadCredential) => StatusCode::UNAUTHORIZED,
            Some(AuthError::Hashing(_)) | None => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = ?self.0, "request failed");
            "internal error".to_owned()
        } else {
            self.0.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(tower_sessions::session::Error);
apperr_impl!(AuthError);
