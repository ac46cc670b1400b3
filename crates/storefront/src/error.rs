//! Storefront errors and the Sentry plumbing around them.
//!
//! [`AppError`] is what every storefront operation hands back to a caller. Transport and internal failures are captured to Sentry by
//! [`AppError::report`]; [`AppError::user_message`] gives text that is safe
//! to show a shopper.

use thiserror::Error;

use marketstall_core::DraftError;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::db::RepositoryError;
use crate::gateway::StoreError;
use crate::storage::StorageError;

/// Any failure a storefront operation can surface.
#[derive(Debug, Error)]
pub enum AppError {
    /// Document store operation failed.
    #[error("store: {0}")]
    Repository(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    /// Device storage operation failed.
    #[error("device storage: {0}")]
    Storage(#[from] StorageError),

    /// Product fields failed validation.
    #[error("invalid product: {0}")]
    Draft(#[from] DraftError),

    /// Configuration could not be loaded.
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request cannot be carried out in the current state.
    #[error("rejected: {0}")]
    Validation(String),

    /// Internal error.
    #[error("internal: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Repository(RepositoryError::Store(err))
    }
}

impl AppError {
    /// Whether this error points at a backend or local fault worth reporting,
    /// as opposed to something the shopper did.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        match self {
            Self::Repository(_) | Self::Storage(_) | Self::Config(_) | Self::Internal(_) => true,
            Self::Auth(err) => matches!(
                err,
                AuthError::Transport(_) | AuthError::Storage(_) | AuthError::PasswordHash
            ),
            Self::Draft(_) | Self::NotFound(_) | Self::Validation(_) => false,
        }
    }

    /// Capture to Sentry and log if reportable; log at debug otherwise.
    pub fn report(&self) {
        if self.is_reportable() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "storefront error"
            );
        } else {
            tracing::debug!(error = %self, "rejected request");
        }
    }

    /// Message safe to show a shopper. Never includes transport details.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Repository(RepositoryError::Store(err)) => match err {
                StoreError::Permission(_) => "You don't have permission to do that.".to_string(),
                StoreError::NotFound { .. } => "That item no longer exists.".to_string(),
                StoreError::Transport(_) | StoreError::Malformed(_) => {
                    "Could not reach the store. Please try again.".to_string()
                }
            },
            Self::Repository(RepositoryError::DataCorruption(_)) | Self::Internal(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password.".to_string(),
                AuthError::EmailInUse => "An account with this email already exists.".to_string(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address.".to_string(),
                _ => "Authentication failed. Please try again.".to_string(),
            },
            Self::Storage(_) => "Could not save to this device.".to_string(),
            Self::Config(_) => "The storefront is not configured correctly.".to_string(),
            Self::Draft(err) => err.to_string(),
            Self::NotFound(msg) | Self::Validation(msg) => msg.clone(),
        }
    }
}

/// Shorthand for results carrying an [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;

/// Tag subsequent Sentry events with the signed-in account.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Drop the account tag once the session ends.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Record a shopper action as a Sentry breadcrumb.
///
/// The trail is attached to whatever event is captured next.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes_the_layer() {
        let err = AppError::NotFound("Order not found.".to_string());
        assert_eq!(err.to_string(), "not found: Order not found.");

        let err = AppError::Validation("cart is empty".to_string());
        assert_eq!(err.to_string(), "rejected: cart is empty");
    }

    #[test]
    fn test_user_message_hides_transport_details() {
        let err = AppError::from(StoreError::Transport("tcp reset by 10.0.0.7".to_string()));
        let message = err.user_message();
        assert!(!message.contains("10.0.0.7"));
        assert_eq!(message, "Could not reach the store. Please try again.");

        let err = AppError::from(StoreError::Permission("rules denied".to_string()));
        assert_eq!(err.user_message(), "You don't have permission to do that.");
    }

    #[test]
    fn test_user_message_for_auth() {
        assert_eq!(
            AppError::Auth(AuthError::InvalidCredentials).user_message(),
            "Invalid email or password."
        );
        assert_eq!(
            AppError::Auth(AuthError::WeakPassword("too weak".to_string())).user_message(),
            "too weak"
        );
        assert_eq!(
            AppError::Auth(AuthError::Transport("dns".to_string())).user_message(),
            "Authentication failed. Please try again."
        );
    }

    #[test]
    fn test_reportable_classification() {
        assert!(AppError::from(StoreError::Transport("x".to_string())).is_reportable());
        assert!(AppError::Auth(AuthError::Transport("x".to_string())).is_reportable());
        assert!(!AppError::Auth(AuthError::InvalidCredentials).is_reportable());
        assert!(!AppError::Validation("x".to_string()).is_reportable());
        assert!(!AppError::NotFound("x".to_string()).is_reportable());
    }
}
