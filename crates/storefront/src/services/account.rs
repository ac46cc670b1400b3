//! Account registration, sign-in and profile upkeep.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use marketstall_core::{AccountId, Email, UserProfile};

use crate::auth::{Account, AuthError, AuthGateway, validate_password};
use crate::db::users::UserRepository;
use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::gateway::DocumentStore;

/// Account flows on top of the auth gateway and the users collection.
#[derive(Clone)]
pub struct AccountService {
    auth: Arc<dyn AuthGateway>,
    store: Arc<dyn DocumentStore>,
}

impl AccountService {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthGateway>, store: Arc<dyn DocumentStore>) -> Self {
        Self { auth, store }
    }

    fn users(&self) -> UserRepository<'_> {
        UserRepository::new(self.store.as_ref())
    }

    /// Create an account, sign it in and write its initial profile.
    ///
    /// If the profile write fails the account still exists and stays signed
    /// in; the error is returned so the caller can retry the profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::WeakPassword` before
    /// contacting the auth service, then any auth or store failure.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<Account> {
        let email = Email::parse(email).map_err(AuthError::from)?;
        validate_password(password)?;

        let account = self.auth.sign_up(&email, password).await?;
        set_sentry_user(&account.id, Some(account.email.as_str()));
        info!(account_id = %account.id, "account registered");

        self.users()
            .save(&UserProfile::for_new_account(account.id.clone(), &email))
            .await?;
        Ok(account)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for a wrong password or unknown
    /// email, or a transport failure.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Account> {
        let email = Email::parse(email).map_err(AuthError::from)?;
        let account = self.auth.sign_in(&email, password).await?;
        set_sentry_user(&account.id, Some(account.email.as_str()));
        add_breadcrumb("auth", "Signed in", None);
        Ok(account)
    }

    /// Sign out. Harmless when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns an error if a persisted session cannot be removed.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        self.auth.sign_out().await?;
        clear_sentry_user();
        add_breadcrumb("auth", "Signed out", None);
        Ok(())
    }

    /// The signed-in account, if any.
    #[must_use]
    pub fn current(&self) -> Option<Account> {
        self.auth.current()
    }

    /// Profile for an account; `None` when it never wrote one.
    ///
    /// # Errors
    ///
    /// Returns the store error if the read fails.
    pub async fn profile(&self, id: &AccountId) -> Result<Option<UserProfile>> {
        Ok(self.users().get(id).await?)
    }

    /// Every profile.
    ///
    /// # Errors
    ///
    /// Returns the store error if the query fails.
    pub async fn profiles(&self) -> Result<Vec<UserProfile>> {
        Ok(self.users().list().await?)
    }

    /// Save edited profile fields. Creates the profile if it is missing.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write fails.
    #[instrument(skip(self, profile), fields(account_id = %profile.id))]
    pub async fn update_profile(&self, profile: &UserProfile) -> Result<()> {
        let users = self.users();
        if users.get(&profile.id).await?.is_some() {
            users.update(profile).await?;
        } else {
            warn!("profile missing, writing a new one");
            users.save(profile).await?;
        }
        Ok(())
    }

    /// Delete a profile document. The auth account is not touched.
    ///
    /// # Errors
    ///
    /// Returns the store error if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete_profile(&self, id: &AccountId) -> Result<()> {
        self.users().delete(id).await?;
        info!(account_id = %id, "profile deleted");
        Ok(())
    }
}
