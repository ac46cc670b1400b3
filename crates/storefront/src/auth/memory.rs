//! In-process auth provider.

use std::collections::HashMap;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use marketstall_core::{AccountId, Email};

use super::{Account, AuthError, AuthGateway, SessionHub};

struct StoredAccount {
    id: AccountId,
    password_hash: String,
}

/// Accounts kept in memory, passwords stored as Argon2id hashes.
///
/// Used by tests and the `memory` backend. The hashing cost is kept low
/// since nothing here outlives the process.
#[derive(Default)]
pub struct MemoryAuth {
    accounts: RwLock<HashMap<Email, StoredAccount>>,
    sessions: SessionHub,
}

impl MemoryAuth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered accounts.
    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }
}

fn hasher() -> Result<Argon2<'static>, AuthError> {
    let params = Params::new(8 * 1024, 1, 1, None).map_err(|_| AuthError::PasswordHash)?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    hasher()?
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[async_trait]
impl AuthGateway for MemoryAuth {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(&self, email: &Email, password: &str) -> Result<Account, AuthError> {
        let account = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(email) {
                return Err(AuthError::EmailInUse);
            }
            let id = AccountId::new(uuid::Uuid::new_v4().simple().to_string());
            accounts.insert(
                email.clone(),
                StoredAccount {
                    id: id.clone(),
                    password_hash: hash_password(password)?,
                },
            );
            Account {
                id,
                email: email.clone(),
            }
        };
        info!(account_id = %account.id, "account created");
        self.sessions.publish(Some(account.clone()));
        Ok(account)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<Account, AuthError> {
        let account = {
            let accounts = self.accounts.read().await;
            let stored = accounts.get(email).ok_or(AuthError::InvalidCredentials)?;
            verify_password(password, &stored.password_hash)?;
            Account {
                id: stored.id.clone(),
                email: email.clone(),
            }
        };
        self.sessions.publish(Some(account.clone()));
        Ok(account)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.sessions.current().is_some() {
            self.sessions.publish(None);
        }
        Ok(())
    }

    fn sessions(&self) -> &SessionHub {
        &self.sessions
    }
}
