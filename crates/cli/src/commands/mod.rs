//! Command implementations.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod seed;

use std::path::PathBuf;

use marketstall_storefront::AppError;
use marketstall_storefront::views::Resource;

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    App(#[from] AppError),

    /// A view finished in the failed state; the message is already
    /// user-facing and the cause already reported.
    #[error("{0}")]
    View(String),

    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid catalog file {path}: {source}")]
    CatalogFile {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Seed file entries rejected before anything was written.
    #[error("{0} invalid products")]
    InvalidProducts(usize),
}

impl CliError {
    /// Send to Sentry when the underlying error deserves it.
    pub fn report(&self) {
        if let Self::App(e) = self {
            e.report();
        }
    }

    /// Message printed to the terminal on failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::App(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Unwrap a settled view resource.
pub fn settle<T>(resource: Resource<T>) -> Result<T, CliError> {
    match resource {
        Resource::Succeeded(data) => Ok(data),
        Resource::Failed(message) => Err(CliError::View(message)),
        Resource::Idle | Resource::Loading => Err(CliError::View("Nothing loaded.".to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_failed_keeps_message() {
        let err = settle::<u32>(Resource::Failed("Order not found.".to_string())).unwrap_err();
        assert_eq!(err.user_message(), "Order not found.");
    }

    #[test]
    fn test_settle_succeeded() {
        assert_eq!(settle(Resource::Succeeded(3)).unwrap(), 3);
    }

    #[test]
    fn test_app_error_uses_user_message() {
        let err = CliError::from(AppError::Validation("Your cart is empty.".to_string()));
        assert_eq!(err.user_message(), "Your cart is empty.");
    }
}
