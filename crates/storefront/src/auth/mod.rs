//! Authentication gateway.
//!
//! Sign-up, sign-in and sign-out are delegated to a hosted auth service.
//! The storefront only needs to know who is signed in right now and to be
//! told when that changes.
//!
//! # Adapters
//!
//! - [`MemoryAuth`] - in-process accounts with argon2 password hashes
//! - [`HttpAuth`] - identity-toolkit style REST service
//!
//! # Session changes
//!
//! Every gateway owns a [`SessionHub`]. Subscribing registers a handler that
//! is called once immediately with the current account (or `None`) and again
//! after every sign-in or sign-out, until the returned [`Subscription`] is
//! unsubscribed or dropped.

mod error;
mod http;
mod memory;
mod password;
mod session;

pub use error::AuthError;
pub use http::HttpAuth;
pub use memory::MemoryAuth;
pub use password::validate_password;
pub use session::{SessionHandler, SessionHub, Subscription};

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use marketstall_core::{AccountId, Email};

/// A signed-in auth account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: Email,
}

/// Port to the hosted authentication service.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Create an account and sign it in.
    async fn sign_up(&self, email: &Email, password: &str) -> Result<Account, AuthError>;

    /// Sign in to an existing account.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<Account, AuthError>;

    /// End the current session. Signing out while signed out is a no-op.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Session change fan-out for this gateway.
    fn sessions(&self) -> &SessionHub;

    /// Bearer token for backend calls made on behalf of the current session.
    fn id_token(&self) -> Option<SecretString> {
        None
    }

    /// The signed-in account, if any.
    fn current(&self) -> Option<Account> {
        self.sessions().current()
    }

    /// Register a session handler. See [`SessionHub::subscribe`].
    fn subscribe(&self, handler: SessionHandler) -> Subscription {
        self.sessions().subscribe(handler)
    }
}
