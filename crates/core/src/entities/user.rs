//! User profiles.

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Email};

/// Display name used when an order's buyer has no profile.
pub const GUEST_SHOPPER_NAME: &str = "Guest Shopper";

/// Profile document for an auth account, stored under the account id.
///
/// An account may exist without a profile; a freshly registered account
/// gets one with only the email filled in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    #[serde(skip)]
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl UserProfile {
    /// Initial profile written at registration.
    #[must_use]
    pub fn for_new_account(id: AccountId, email: &Email) -> Self {
        Self {
            id,
            email: email.to_string(),
            ..Self::default()
        }
    }

    /// Stand-in buyer for guest orders and missing profiles.
    #[must_use]
    pub fn guest_shopper() -> Self {
        Self {
            name: GUEST_SHOPPER_NAME.to_owned(),
            ..Self::default()
        }
    }

    /// Whether the account owner has filled in a name yet.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
    }
}
