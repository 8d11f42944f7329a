use tracing::warn;

use super::AuthError;

/// bcrypt hashing at a fixed cost.
#[derive(Debug, Clone, Copy)]
pub struct Credentials {
    cost: u32,
}

impl Credentials {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn for_tests() -> Self {
        Self { cost: 4 }
    }

    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    pub async fn verify(&self, password: &str, hash: &str) -> bool {
        let password = password.to_owned();
        let hash = hash.to_owned();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await;
        match verified {
            Ok(Ok(ok)) => ok,
            Ok(Err(e)) => {
                warn!(error = %e, "stored credential is not a usable bcrypt hash");
                false
            }
            Err(e) => {
                warn!(error = %e, "credential check did not complete");
                false
            }
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(if cfg!(debug_assertions) { 4 } else { bcrypt::DEFAULT_COST })
    }
}
