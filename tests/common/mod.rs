use std::sync::Arc;

use axum::Router;
use salon::{
    history::HistoryLog,
    hub::Hub,
    identity::{Credentials, IdentityStore},
    router,
    store::MemoryStore,
    AppState,
};

pub async fn test_hub() -> Arc<Hub> {
    let store = Arc::new(MemoryStore::new());
    let identities = IdentityStore::load(store.clone(), Credentials::for_tests())
        .await
        .unwrap();
    let history = HistoryLog::load(store, 50).await.unwrap();
    Arc::new(Hub::new(Arc::new(identities), history, 20, 64))
}

pub fn test_app(hub: Arc<Hub>) -> Router {
    router(AppState { hub }, 1)
}
