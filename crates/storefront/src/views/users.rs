//! User profile listing.

use tokio::sync::watch;

use marketstall_core::UserProfile;

use super::{Loader, Resource};
use crate::state::AppState;

/// Every stored user profile.
pub struct UsersView {
    app: AppState,
    loader: Loader<(), Vec<UserProfile>>,
}

impl UsersView {
    #[must_use]
    pub fn new(app: AppState) -> Self {
        Self {
            app,
            loader: Loader::new(),
        }
    }

    pub async fn refresh(&self) -> Resource<Vec<UserProfile>> {
        let accounts = self.app.accounts().clone();
        self.loader
            .load((), |()| async move { accounts.profiles().await })
            .await
    }

    #[must_use]
    pub fn state(&self) -> Resource<Vec<UserProfile>> {
        self.loader.get()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Resource<Vec<UserProfile>>> {
        self.loader.subscribe()
    }
}
