//! Identity-toolkit style REST auth client.
//!
//! ```text
//! POST {base}/accounts:signUp?key=<api key>
//! POST {base}/accounts:signInWithPassword?key=<api key>
//!      {"email", "password", "returnSecureToken": true}
//!   -> {"localId", "email", "idToken"}
//!   -> {"error": {"message": "EMAIL_EXISTS"}}
//! ```
//!
//! Sign-out is local: the token is dropped and the persisted session, if
//! any, is removed.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use url::Url;

use marketstall_core::{AccountId, Email};

use super::{Account, AuthError, AuthGateway, SessionHub};
use crate::storage::DeviceStorage;

/// Device storage key for the persisted session.
pub const AUTH_SESSION_KEY: &str = "auth_session";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    email: String,
    id_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSession {
    account: Account,
    id_token: String,
}

/// Client for a hosted email/password auth service.
pub struct HttpAuth {
    client: reqwest::Client,
    base: Url,
    api_key: SecretString,
    token: Mutex<Option<SecretString>>,
    storage: Option<Arc<dyn DeviceStorage>>,
    sessions: SessionHub,
}

impl std::fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAuth")
            .field("base", &self.base.as_str())
            .field("api_key", &"[REDACTED]")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl HttpAuth {
    /// Create a client for the auth API rooted at `base`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Transport` if the HTTP client cannot be built.
    pub fn new(
        base: Url,
        api_key: SecretString,
        timeout: Option<Duration>,
    ) -> Result<Self, AuthError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base,
            api_key,
            token: Mutex::new(None),
            storage: None,
            sessions: SessionHub::new(),
        })
    }

    /// Persist sessions in `storage` and restore one saved by an earlier run.
    ///
    /// A saved session that cannot be parsed is discarded.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn DeviceStorage>) -> Self {
        match storage.get_item(AUTH_SESSION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<PersistedSession>(&raw) {
                Ok(saved) => {
                    self.set_token(Some(SecretString::from(saved.id_token)));
                    self.sessions.publish(Some(saved.account));
                }
                Err(e) => {
                    warn!(error = %e, "discarding unreadable saved session");
                    if let Err(e) = storage.remove_item(AUTH_SESSION_KEY) {
                        warn!(error = %e, "failed to remove saved session");
                    }
                }
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to read saved session"),
        }
        self.storage = Some(storage);
        self
    }

    fn set_token(&self, token: Option<SecretString>) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn endpoint(&self, action: &str) -> Result<Url, AuthError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| AuthError::Transport("auth url cannot carry a path".to_owned()))?
            .pop_if_empty()
            .push(action);
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());
        Ok(url)
    }

    async fn exchange(
        &self,
        action: &str,
        email: &Email,
        password: &str,
    ) -> Result<Account, AuthError> {
        let response = self
            .client
            .post(self.endpoint(action)?)
            .json(&CredentialsRequest {
                email: email.as_str(),
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let code = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(map_error_code(&code));
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::Transport(e.to_string()))?;
        let account = Account {
            id: AccountId::new(token.local_id),
            email: Email::parse(&token.email)?,
        };
        self.begin_session(account.clone(), token.id_token)?;
        Ok(account)
    }

    fn begin_session(&self, account: Account, id_token: String) -> Result<(), AuthError> {
        if let Some(storage) = &self.storage {
            let saved = PersistedSession {
                account: account.clone(),
                id_token: id_token.clone(),
            };
            let raw =
                serde_json::to_string(&saved).map_err(|e| AuthError::Transport(e.to_string()))?;
            storage.set_item(AUTH_SESSION_KEY, &raw)?;
        }
        self.set_token(Some(SecretString::from(id_token)));
        info!(account_id = %account.id, "signed in");
        self.sessions.publish(Some(account));
        Ok(())
    }
}

/// Map a service error code to an auth error.
///
/// Codes may carry a detail suffix (`WEAK_PASSWORD : Password should be ...`).
fn map_error_code(code: &str) -> AuthError {
    let head = code.split(':').next().unwrap_or(code).trim();
    match head {
        "EMAIL_EXISTS" => AuthError::EmailInUse,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AuthError::InvalidCredentials
        }
        "INVALID_EMAIL" => AuthError::Rejected("invalid email".to_owned()),
        "WEAK_PASSWORD" => AuthError::WeakPassword(code.to_owned()),
        other => AuthError::Rejected(other.to_owned()),
    }
}

#[async_trait]
impl AuthGateway for HttpAuth {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(&self, email: &Email, password: &str) -> Result<Account, AuthError> {
        self.exchange("accounts:signUp", email, password).await
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<Account, AuthError> {
        self.exchange("accounts:signInWithPassword", email, password)
            .await
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.sessions.current().is_none() {
            return Ok(());
        }
        self.set_token(None);
        if let Some(storage) = &self.storage {
            storage.remove_item(AUTH_SESSION_KEY)?;
        }
        self.sessions.publish(None);
        Ok(())
    }

    fn sessions(&self) -> &SessionHub {
        &self.sessions
    }

    fn id_token(&self) -> Option<SecretString> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
