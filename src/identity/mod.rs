//! Registered nicknames, their credential hash and their permanent color.

mod credential;

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::{
    chat::{Color, Nickname},
    color::derive_color,
    store::{DocumentStore, StoreResult, USERS_KEY},
};

pub use credential::Credentials;

/// Display strings are shown to the user as is.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Veuillez fournir un pseudo et un mot de passe.")]
    Validation,

    #[error("Ce pseudo est déjà enregistré.")]
    AlreadyRegistered,

    #[error("Pseudo inconnu.")]
    NotFound,

    #[error("Mot de passe incorrect.")]
    BadCredential,

    #[error("credential hashing failed: {0}")]
    Hashing(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IdentityRecord {
    #[serde(rename = "credentialHash", alias = "pwd", default, skip_serializing_if = "Option::is_none")]
    credential_hash: Option<String>,
    #[serde(default)]
    color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub nickname: Nickname,
    pub color: Color,
}

type Records = BTreeMap<Nickname, IdentityRecord>;

pub struct IdentityStore {
    store: Arc<dyn DocumentStore>,
    credentials: Credentials,
    records: RwLock<Records>,
}

impl IdentityStore {
    /// Reads the whole identity document. A document of the wrong shape is
    /// treated as empty rather than refusing to start.
    pub async fn load(store: Arc<dyn DocumentStore>, credentials: Credentials) -> StoreResult<Self> {
        let records = match store.load(USERS_KEY).await? {
            Some(doc) => serde_json::from_value(doc).unwrap_or_else(|e| {
                warn!(error = %e, "identity document has an unexpected shape, starting empty");
                Records::new()
            }),
            None => Records::new(),
        };
        info!(identities = records.len(), "identity store loaded");

        Ok(Self {
            store,
            credentials,
            records: RwLock::new(records),
        })
    }

    pub async fn register(&self, nickname: &str, password: &str) -> Result<Identity, AuthError> {
        let (nickname, password) = validate(nickname, password)?;

        if self.records.read().await.contains_key(&nickname) {
            return Err(AuthError::AlreadyRegistered);
        }
        let credential_hash = self.credentials.hash(password).await?;

        // check and insert under the same lock as the write-back
        let mut records = self.records.write().await;
        if records.contains_key(&nickname) {
            return Err(AuthError::AlreadyRegistered);
        }
        let color = derive_color(&nickname);
        records.insert(
            nickname.clone(),
            IdentityRecord {
                credential_hash: Some(credential_hash),
                color: Some(color.clone()),
            },
        );
        self.persist(&records).await;
        info!(%nickname, "registered");

        Ok(Identity { nickname, color })
    }

    pub async fn authenticate(&self, nickname: &str, password: &str) -> Result<Identity, AuthError> {
        let (nickname, password) = validate(nickname, password)?;

        let record = self
            .records
            .read()
            .await
            .get(&nickname)
            .cloned()
            .ok_or(AuthError::NotFound)?;

        let Some(hash) = record.credential_hash.as_deref() else {
            return Err(AuthError::BadCredential);
        };
        if !self.credentials.verify(password, hash).await {
            return Err(AuthError::BadCredential);
        }

        let color = match record.color {
            Some(color) => color,
            None => self.ensure_color(&nickname, derive_color).await,
        };
        Ok(Identity { nickname, color })
    }

    /// Authenticates a known nickname, registers an unknown one. The flag is
    /// `true` when the identity was just created.
    pub async fn login(&self, nickname: &str, password: &str) -> Result<(Identity, bool), AuthError> {
        match self.authenticate(nickname, password).await {
            Err(AuthError::NotFound) => match self.register(nickname, password).await {
                Ok(identity) => Ok((identity, true)),
                // lost a registration race, the other side won
                Err(AuthError::AlreadyRegistered) => {
                    self.authenticate(nickname, password).await.map(|i| (i, false))
                }
                Err(e) => Err(e),
            },
            other => other.map(|i| (i, false)),
        }
    }

    pub async fn get_color(&self, nickname: &Nickname) -> Option<Color> {
        self.records.read().await.get(nickname).and_then(|r| r.color.clone())
    }

    /// Returns the stored color, otherwise derives one, stores it and
    /// returns it. Unknown nicknames get a credential-less identity.
    pub async fn ensure_color(&self, nickname: &Nickname, derive: impl FnOnce(&Nickname) -> Color) -> Color {
        if let Some(color) = self.get_color(nickname).await {
            return color;
        }

        let mut records = self.records.write().await;
        let record = records.entry(nickname.clone()).or_default();
        if let Some(color) = &record.color {
            return color.clone();
        }
        let color = derive(nickname);
        record.color = Some(color.clone());
        self.persist(&records).await;

        color
    }

    async fn persist(&self, records: &Records) {
        let result = match serde_json::to_value(records) {
            Ok(doc) => self.store.save(USERS_KEY, &doc).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            error!(error = %e, "failed to persist identities, keeping them in memory");
        }
    }
}

fn validate<'a>(nickname: &str, password: &'a str) -> Result<(Nickname, &'a str), AuthError> {
    if password.is_empty() {
        return Err(AuthError::Validation);
    }
    let nickname = Nickname::sanitize(nickname).ok_or(AuthError::Validation)?;
    Ok((nickname, password))
}
