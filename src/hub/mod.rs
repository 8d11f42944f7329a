//! Connection lifecycle and the single ordered stream of chat events.
//!
//! Every event is appended to the history and sent on the broadcast channel
//! while the state lock is held for writing, so the history order, the
//! persisted order and the order every receiver observes are the same.

pub mod protocol;
mod registry;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, error, info};

use crate::{
    chat::{ChatEvent, Nickname, SafeText},
    color::ColorAssigner,
    history::HistoryLog,
    identity::IdentityStore,
};

pub use protocol::ClientEvent;
pub use registry::{ConnectionId, SessionRegistry};

pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("connection {0} is not open")]
    UnknownConnection(ConnectionId),
}

/// `history` is the log right before the join was announced and `events`
/// starts with that announcement, so together they miss and repeat nothing.
/// A connection receives no events before it joins.
pub struct Joined {
    pub history: Vec<ChatEvent>,
    pub events: broadcast::Receiver<Arc<ChatEvent>>,
}

struct HubState {
    sessions: SessionRegistry,
    history: HistoryLog,
}

impl HubState {
    async fn publish(&mut self, tx: &broadcast::Sender<Arc<ChatEvent>>, event: ChatEvent) {
        if let Err(e) = self.history.append(event.clone()).await {
            error!(error = %e, "failed to persist history, keeping it in memory");
        }
        // no receivers is not an error
        let _ = tx.send(Arc::new(event));
    }
}

pub struct Hub {
    state: RwLock<HubState>,
    identities: Arc<IdentityStore>,
    colors: ColorAssigner,
    tx: broadcast::Sender<Arc<ChatEvent>>,
    window: usize,
}

impl Hub {
    /// `window` is how many past events a joining client receives; it never
    /// exceeds the history limit.
    pub fn new(identities: Arc<IdentityStore>, history: HistoryLog, window: usize, capacity: usize) -> Self {
        let window = window.min(history.limit());
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            state: RwLock::new(HubState {
                sessions: SessionRegistry::default(),
                history,
            }),
            colors: ColorAssigner::new(identities.clone()),
            identities,
            tx,
            window,
        }
    }

    pub fn identities(&self) -> &Arc<IdentityStore> {
        &self.identities
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub async fn connect(&self) -> ConnectionId {
        let id = ConnectionId::new();
        let mut state = self.state.write().await;
        state.sessions.open(id);
        info!(connection = %id, live = state.sessions.len(), "connected");

        id
    }

    /// Binds the connection to a nickname and announces it.
    pub async fn join(&self, id: ConnectionId, nickname: Option<&str>) -> Result<Joined, HubError> {
        let nickname = Nickname::sanitize_or_anonymous(nickname);
        self.colors.assign_or_get(&nickname).await;

        let mut state = self.state.write().await;
        if !state.sessions.bind(id, nickname.clone()) {
            return Err(HubError::UnknownConnection(id));
        }
        let history = state.history.recent(self.window);
        let events = self.tx.subscribe();
        state.publish(&self.tx, ChatEvent::joined(&nickname)).await;
        info!(connection = %id, %nickname, "joined");

        Ok(Joined { history, events })
    }

    /// Publishes a chat message. The nickname falls back to the one the
    /// connection joined with, then to the anonymous one.
    pub async fn message(&self, id: ConnectionId, nickname: Option<&str>, text: &str) -> Result<ChatEvent, HubError> {
        let nickname = match nickname.and_then(Nickname::sanitize) {
            Some(nickname) => nickname,
            None => {
                let state = self.state.read().await;
                if !state.sessions.is_open(id) {
                    return Err(HubError::UnknownConnection(id));
                }
                state.sessions.lookup(id).cloned().unwrap_or_else(Nickname::anonymous)
            }
        };
        let text = SafeText::sanitize(text);
        let color = self.colors.assign_or_get(&nickname).await;
        let event = ChatEvent::message(&nickname, &text, color);

        let mut state = self.state.write().await;
        if !state.sessions.is_open(id) {
            return Err(HubError::UnknownConnection(id));
        }
        state.publish(&self.tx, event.clone()).await;
        debug!(connection = %id, %nickname, "message");

        Ok(event)
    }

    /// Closes the connection and announces who left; the announcement is
    /// returned. A connection that never joined is announced under
    /// `fallback` (e.g. the cookie nickname), or not at all without one.
    pub async fn disconnect(&self, id: ConnectionId, fallback: Option<&str>) -> Option<ChatEvent> {
        let mut state = self.state.write().await;
        if !state.sessions.is_open(id) {
            return None;
        }
        let nickname = state.sessions.unbind(id);
        info!(connection = %id, live = state.sessions.len(), "disconnected");

        let nickname = nickname.or_else(|| fallback.and_then(Nickname::sanitize))?;
        let event = ChatEvent::left(&nickname);
        state.publish(&self.tx, event.clone()).await;

        Some(event)
    }

    /// Applies one normalized client event. `fallback` is the nickname the
    /// surrounding request handling already knows (e.g. from a cookie).
    pub async fn dispatch(
        &self,
        id: ConnectionId,
        event: ClientEvent,
        fallback: Option<&str>,
    ) -> Result<Option<Joined>, HubError> {
        match event {
            ClientEvent::Join { nickname } => {
                self.join(id, nickname.as_deref().or(fallback)).await.map(Some)
            }
            ClientEvent::Message { nickname, text } => {
                self.message(id, nickname.as_deref(), &text).await.map(|_| None)
            }
            ClientEvent::Unknown(name) => {
                debug!(connection = %id, event = %name, "ignoring unknown event");
                Ok(None)
            }
        }
    }

    pub async fn recent(&self, k: usize) -> Vec<ChatEvent> {
        self.state.read().await.history.recent(k)
    }

}
