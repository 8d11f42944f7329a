use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::{
    chat::{Color, Nickname},
    identity::IdentityStore,
};

/// First three bytes of the SHA-256 of the sanitized nickname. Stable across
/// builds and restarts, unlike `std::hash`.
pub fn derive_color(nickname: &Nickname) -> Color {
    let digest = Sha256::digest(nickname.as_str().as_bytes());
    Color::from_rgb(digest[0], digest[1], digest[2])
}

/// Hands out an identity's color, deriving and persisting it the first time
/// the nickname is seen. A stored color is never recomputed.
#[derive(Clone)]
pub struct ColorAssigner {
    identities: Arc<IdentityStore>,
}

impl ColorAssigner {
    pub fn new(identities: Arc<IdentityStore>) -> Self {
        Self { identities }
    }

    pub async fn assign_or_get(&self, nickname: &Nickname) -> Color {
        self.identities.ensure_color(nickname, derive_color).await
    }
}
