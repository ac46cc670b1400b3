//! User profile repository.
//!
//! Profiles are keyed by auth account id. An account without a profile is
//! normal; callers substitute the guest shopper where a name is needed.

use tracing::instrument;

use marketstall_core::{AccountId, UserProfile};

use super::{RepositoryError, collections::USERS, decode, encode};
use crate::gateway::{Document, DocumentStore};

/// Repository for user profiles.
pub struct UserRepository<'a> {
    store: &'a dyn DocumentStore,
}

fn to_profile(doc: &Document) -> Result<UserProfile, RepositoryError> {
    let mut profile: UserProfile = decode(USERS, doc)?;
    profile.id = AccountId::new(&doc.id);
    Ok(profile)
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Every stored profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a document is malformed.
    pub async fn list(&self) -> Result<Vec<UserProfile>, RepositoryError> {
        self.store
            .query(USERS, None)
            .await?
            .iter()
            .map(to_profile)
            .collect()
    }

    /// Get the profile for an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the document is malformed.
    pub async fn get(&self, id: &AccountId) -> Result<Option<UserProfile>, RepositoryError> {
        self.store
            .get(USERS, id.as_str())
            .await?
            .as_ref()
            .map(to_profile)
            .transpose()
    }

    /// Write a whole profile under its account id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    #[instrument(skip(self, profile), fields(account_id = %profile.id))]
    pub async fn save(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        self.store
            .set(USERS, profile.id.as_str(), encode(profile)?)
            .await?;
        Ok(())
    }

    /// Merge edited fields into an existing profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` with `StoreError::NotFound` if the
    /// account has no profile.
    #[instrument(skip(self, profile), fields(account_id = %profile.id))]
    pub async fn update(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        self.store
            .update(USERS, profile.id.as_str(), encode(profile)?)
            .await?;
        Ok(())
    }

    /// Delete a profile. The auth account itself is untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &AccountId) -> Result<(), RepositoryError> {
        Ok(self.store.delete(USERS, id.as_str()).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketstall_core::Email;

    use super::*;
    use crate::gateway::MemoryStore;

    #[tokio::test]
    async fn test_profile_lifecycle() {
        let store = MemoryStore::new();
        let repo = UserRepository::new(&store);
        let id = AccountId::new("uid-1");
        let email = Email::parse("ada@example.com").unwrap();

        repo.save(&UserProfile::for_new_account(id.clone(), &email))
            .await
            .unwrap();
        let mut profile = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(profile.email, "ada@example.com");
        assert!(!profile.is_complete());

        profile.name = "Ada".to_owned();
        profile.phone = "555-0100".to_owned();
        repo.update(&profile).await.unwrap();
        assert_eq!(repo.list().await.unwrap(), vec![profile]);

        repo.delete(&id).await.unwrap();
        assert!(repo.get(&id).await.unwrap().is_none());
    }
}
