use std::{collections::HashMap, fmt};

use uuid::Uuid;

use crate::chat::Nickname;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Live connections and the nickname each one joined with. A connection
/// that is open but has not joined maps to `None`.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Option<Nickname>>,
}

impl SessionRegistry {
    pub fn open(&mut self, id: ConnectionId) {
        self.sessions.insert(id, None);
    }

    pub fn is_open(&self, id: ConnectionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Only open connections can be bound. Returns `false` otherwise.
    pub fn bind(&mut self, id: ConnectionId, nickname: Nickname) -> bool {
        match self.sessions.get_mut(&id) {
            Some(slot) => {
                *slot = Some(nickname);
                true
            }
            None => false,
        }
    }

    /// Removes the connection; the nickname it had joined with, if any.
    pub fn unbind(&mut self, id: ConnectionId) -> Option<Nickname> {
        self.sessions.remove(&id).flatten()
    }

    pub fn lookup(&self, id: ConnectionId) -> Option<&Nickname> {
        self.sessions.get(&id).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
