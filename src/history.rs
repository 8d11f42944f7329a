//! Bounded, ordered, durable log of chat events.

use std::{collections::VecDeque, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    chat::ChatEvent,
    store::{DocumentStore, StoreResult, HISTORY_KEY},
};

#[derive(Deserialize)]
struct HistoryDocument {
    #[serde(default)]
    messages: VecDeque<ChatEvent>,
}

/// Oldest events are evicted first once `limit` is exceeded. Every append
/// rewrites the whole document.
pub struct HistoryLog {
    store: Arc<dyn DocumentStore>,
    limit: usize,
    events: VecDeque<ChatEvent>,
}

impl HistoryLog {
    pub async fn load(store: Arc<dyn DocumentStore>, limit: usize) -> StoreResult<Self> {
        let limit = limit.max(1);
        let mut events = match store.load(HISTORY_KEY).await? {
            Some(doc) => serde_json::from_value::<HistoryDocument>(doc)
                .map(|doc| doc.messages)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "history document has an unexpected shape, starting empty");
                    VecDeque::new()
                }),
            None => VecDeque::new(),
        };
        while events.len() > limit {
            events.pop_front();
        }
        info!(events = events.len(), limit, "history loaded");

        Ok(Self { store, limit, events })
    }

    /// The event is in memory even when the write-back fails; the error is
    /// returned for the caller to report.
    pub async fn append(&mut self, event: ChatEvent) -> StoreResult<()> {
        self.events.push_back(event);
        while self.events.len() > self.limit {
            self.events.pop_front();
        }
        self.persist().await
    }

    /// The last `k` events, oldest first.
    pub fn recent(&self, k: usize) -> Vec<ChatEvent> {
        let skip = self.events.len().saturating_sub(k);
        self.events.iter().skip(skip).cloned().collect()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    async fn persist(&self) -> StoreResult<()> {
        #[derive(Serialize)]
        struct Borrowed<'a> {
            messages: &'a VecDeque<ChatEvent>,
        }

        let doc = serde_json::to_value(Borrowed { messages: &self.events })?;
        self.store.save(HISTORY_KEY, &doc).await
    }
}
