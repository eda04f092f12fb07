use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::credentials;
use super::refresh::RefreshTransport;
use super::types::{token_prefix, Credential};
use crate::error::AuthError;

/// Credentials older than this are refreshed before use
pub const FRESHNESS_WINDOW_SECS: i64 = 20 * 60;

/// Upper bound on a single refresh exchange
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Refresh token the upstream already refused, with the reason
struct RejectedRefresh {
    refresh_token: String,
    reason: String,
}

struct TokenState {
    credential: Credential,

    /// Last failed exchange; a token listed here is never sent again implicitly
    rejected: Option<RejectedRefresh>,
}

impl TokenState {
    fn with(credential: Credential) -> Self {
        Self {
            credential,
            rejected: None,
        }
    }

    fn rejection_reason(&self) -> Option<&str> {
        self.rejected
            .as_ref()
            .filter(|r| r.refresh_token == self.credential.refresh_token)
            .map(|r| r.reason.as_str())
    }
}

/// Token lifecycle manager
///
/// Owns the single credential of the process. Created once by the entry
/// point and shared by reference (`Arc`) with everything that issues
/// authenticated requests.
pub struct TokenManager {
    /// Current credential; the write lock doubles as the refresh critical section
    state: RwLock<TokenState>,

    /// Refresh exchange
    transport: Arc<dyn RefreshTransport>,

    /// Maximum credential age in seconds
    freshness_window: i64,

    /// Timeout around the refresh exchange
    refresh_timeout: Duration,
}

impl TokenManager {
    /// Create a manager holding an empty credential
    pub fn new(transport: Arc<dyn RefreshTransport>) -> Self {
        Self {
            state: RwLock::new(TokenState::with(Credential::default())),
            transport,
            freshness_window: FRESHNESS_WINDOW_SECS,
            refresh_timeout: REFRESH_TIMEOUT,
        }
    }

    /// Create a manager with an in-memory credential (never persisted)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(transport: Arc<dyn RefreshTransport>, credential: Credential) -> Self {
        let manager = Self::new(transport);
        Self {
            state: RwLock::new(TokenState::with(credential)),
            ..manager
        }
    }

    /// Override the refresh timeout
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Snapshot of the current credential
    pub async fn current(&self) -> Credential {
        self.state.read().await.credential.clone()
    }

    /// Replace the current credential with the one stored at `path`
    pub async fn load_from(&self, path: &Path) -> Result<(), AuthError> {
        let loaded = credentials::load_from_file(path)?;
        tracing::info!(
            uid = %loaded.uid,
            "Credential loaded from {}",
            path.display()
        );
        *self.state.write().await = TokenState::with(loaded);
        Ok(())
    }

    /// Persist a freshly minted credential to `path` and make it current
    pub async fn install(&self, mut credential: Credential, path: &Path) -> Result<(), AuthError> {
        if !credential.is_complete() {
            return Err(AuthError::Corrupt {
                path: path.to_path_buf(),
                reason: "login produced an incomplete credential".to_string(),
            });
        }

        let mut state = self.state.write().await;
        credentials::save_to_file(&mut credential, path)?;
        *state = TokenState::with(credential);
        Ok(())
    }

    fn is_stale(&self, credential: &Credential, now: i64) -> bool {
        // A credential without a timestamp is trusted as-is
        credential.last_refreshed_at > 0
            && now - credential.last_refreshed_at > self.freshness_window
    }

    /// Get an access token believed valid, refreshing it first when stale
    ///
    /// Concurrent callers that find the credential stale queue on the write
    /// lock; the first one refreshes, the rest re-check and reuse its result.
    /// Once the upstream refuses a refresh token, later callers get
    /// `RefreshFailed` without another exchange until a new credential is
    /// loaded or a forced refresh succeeds.
    pub async fn get_valid_access_token(&self) -> Result<String, AuthError> {
        {
            let state = self.state.read().await;
            let credential = &state.credential;
            if credential.is_empty() {
                tracing::warn!("Access token requested but no credential is loaded");
                return Err(AuthError::Unauthenticated);
            }
            if !self.is_stale(&credential, Utc::now().timestamp()) {
                return Ok(credential.access_token.clone());
            }
        }

        let mut state = self.state.write().await;
        if state.credential.is_empty() {
            return Err(AuthError::Unauthenticated);
        }

        if self.is_stale(&state.credential, Utc::now().timestamp()) {
            if let Some(reason) = state.rejection_reason() {
                tracing::debug!("Refresh token was already rejected, not retrying");
                return Err(AuthError::RefreshFailed(anyhow::anyhow!("{}", reason)));
            }

            tracing::debug!(
                last_refreshed_at = state.credential.last_refreshed_at,
                "Access token is stale, refreshing"
            );
            match self.refresh_locked(&mut state).await {
                Ok(()) => {}
                Err(AuthError::PersistFailed { path, source }) => {
                    tracing::warn!(
                        "Refreshed token kept in memory only, failed to save to {}: {}",
                        path.display(),
                        source
                    );
                }
                Err(e @ AuthError::RefreshFailed(_)) => return Err(e),
                Err(other) => return Err(AuthError::RefreshFailed(anyhow::Error::new(other))),
            }
        }

        if state.credential.access_token.is_empty() {
            return Err(AuthError::RefreshFailed(anyhow::anyhow!(
                "access token is empty after refresh"
            )));
        }

        Ok(state.credential.access_token.clone())
    }

    /// Refresh now regardless of age
    ///
    /// Unlike `get_valid_access_token`, a failure to persist the refreshed
    /// credential is returned to the caller; the in-memory credential is
    /// updated either way. A previously rejected refresh token is tried again.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let mut state = self.state.write().await;
        if state.credential.is_empty() {
            return Err(AuthError::Unauthenticated);
        }
        self.refresh_locked(&mut state).await?;
        Ok(state.credential.access_token.clone())
    }

    /// Run one exchange and record its outcome; caller holds the write lock
    async fn refresh_locked(&self, state: &mut TokenState) -> Result<(), AuthError> {
        let result = self.exchange(&mut state.credential).await;
        match &result {
            Ok(()) | Err(AuthError::PersistFailed { .. }) => state.rejected = None,
            Err(AuthError::RefreshFailed(e)) => {
                state.rejected = Some(RejectedRefresh {
                    refresh_token: state.credential.refresh_token.clone(),
                    reason: format!("{:#}", e),
                });
            }
            Err(_) => {}
        }
        result
    }

    /// Exchange the refresh token and write back the new pair
    async fn exchange(&self, credential: &mut Credential) -> Result<(), AuthError> {
        if credential.refresh_token.is_empty() {
            return Err(AuthError::InvalidState);
        }

        let exchange = self.transport.refresh(&credential.refresh_token);
        let pair = match tokio::time::timeout(self.refresh_timeout, exchange).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                tracing::error!("Token refresh failed: {:#}", e);
                return Err(AuthError::RefreshFailed(e));
            }
            Err(_) => {
                tracing::error!("Token refresh timed out after {:?}", self.refresh_timeout);
                return Err(AuthError::RefreshFailed(anyhow::anyhow!(
                    "token refresh timed out after {:?}",
                    self.refresh_timeout
                )));
            }
        };

        if pair.access_token.is_empty() || pair.refresh_token.is_empty() {
            return Err(AuthError::RefreshFailed(anyhow::anyhow!(
                "refresh returned an empty token"
            )));
        }

        credential.access_token = pair.access_token;
        credential.refresh_token = pair.refresh_token;
        credential.last_refreshed_at = credential.last_refreshed_at.max(Utc::now().timestamp());
        tracing::info!(
            "Access token refreshed (token: {}...)",
            token_prefix(&credential.access_token)
        );

        let Some(path) = credential.source_path.clone() else {
            tracing::warn!("Credential has no source path, refreshed token kept in memory only");
            return Ok(());
        };

        credentials::save_to_file(credential, &path).map_err(|e| match e {
            AuthError::Io { path, source } => AuthError::PersistFailed { path, source },
            other => other,
        })
    }
}
