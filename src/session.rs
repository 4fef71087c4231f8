//! Coordination for callers that share one tenant's token set.
//!
//! At most one refresh or bootstrap per tenant runs at a time. Callers that
//! queued behind it while holding the token set it replaced receive the new
//! set instead of renewing again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::Credentials;
use crate::error::BilinkError;
use crate::oauth::{OAuthClient, TokenSet};

/// Renew when the id token expires within this many seconds.
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 3600;

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Full credential login.
    async fn bootstrap(&self, credentials: &Credentials) -> Result<TokenSet, BilinkError>;

    /// Refresh-token renewal.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, BilinkError>;
}

#[async_trait]
impl Authenticator for OAuthClient {
    async fn bootstrap(&self, credentials: &Credentials) -> Result<TokenSet, BilinkError> {
        OAuthClient::bootstrap(self, credentials).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, BilinkError> {
        OAuthClient::refresh(self, refresh_token).await
    }
}

struct Rotation {
    replaced: Option<String>,
    issued: TokenSet,
}

#[derive(Default)]
struct GuardState {
    last: Option<Rotation>,
    /// id token a caller reported as rejected by the data service.
    revoked: Option<String>,
}

impl GuardState {
    fn is_revoked(&self, tokens: &TokenSet) -> bool {
        self.revoked.as_deref() == Some(tokens.id_token.as_str())
    }

    /// The last issued set, if `current` is what it replaced (or the caller
    /// has nothing) and it is still usable.
    fn reusable(&self, current: Option<&TokenSet>, margin: chrono::Duration) -> Option<TokenSet> {
        let rotation = self.last.as_ref()?;
        let superseded = match current {
            None => true,
            Some(tokens) => rotation.replaced.as_deref() == Some(tokens.id_token.as_str()),
        };
        let usable = !rotation.issued.needs_refresh(margin) && !self.is_revoked(&rotation.issued);
        (superseded && usable).then(|| rotation.issued.clone())
    }
}

/// Single-flight refresh/bootstrap guard for one tenant.
pub struct SessionGuard {
    authenticator: Arc<dyn Authenticator>,
    margin: chrono::Duration,
    state: tokio::sync::Mutex<GuardState>,
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("margin", &self.margin)
            .finish_non_exhaustive()
    }
}

impl SessionGuard {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self::with_margin(authenticator, chrono::Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS))
    }

    pub fn with_margin(authenticator: Arc<dyn Authenticator>, margin: chrono::Duration) -> Self {
        Self {
            authenticator,
            margin,
            state: tokio::sync::Mutex::new(GuardState::default()),
        }
    }

    /// Return a token set that is safe to use for the next poll.
    ///
    /// `current` is returned unchanged while it is outside the refresh
    /// margin. Otherwise it is refreshed; a [`BilinkError::SessionExpired`]
    /// falls back to a full bootstrap with `credentials`. With no `current`
    /// set the guard bootstraps directly. Transient errors are returned as-is.
    pub async fn ensure_fresh(
        &self,
        current: Option<TokenSet>,
        credentials: &Credentials,
    ) -> Result<TokenSet, BilinkError> {
        let mut state = self.state.lock().await;

        if let Some(tokens) = state.reusable(current.as_ref(), self.margin) {
            tracing::debug!("reusing token set issued by a concurrent renewal");
            return Ok(tokens);
        }

        let replaced = current.as_ref().map(|t| t.id_token.clone());
        let renewed = match current {
            Some(tokens) if !tokens.needs_refresh(self.margin) && !state.is_revoked(&tokens) => {
                return Ok(tokens);
            }
            Some(tokens) => match self.authenticator.refresh(&tokens.refresh_token).await {
                Ok(renewed) => renewed,
                Err(e) if e.requires_bootstrap() => {
                    tracing::warn!("refresh token no longer accepted, signing in again: {e}");
                    self.authenticator.bootstrap(credentials).await?
                }
                Err(e) => return Err(e),
            },
            None => self.authenticator.bootstrap(credentials).await?,
        };

        state.last = Some(Rotation {
            replaced,
            issued: renewed.clone(),
        });
        Ok(renewed)
    }

    /// Mark `tokens` as rejected so the next [`ensure_fresh`](Self::ensure_fresh)
    /// renews even if they look unexpired.
    pub async fn invalidate(&self, tokens: &TokenSet) {
        let mut state = self.state.lock().await;
        state.revoked = Some(tokens.id_token.clone());
    }
}

/// One [`SessionGuard`] per tenant key.
#[derive(Default)]
pub struct SessionRegistry {
    guards: Mutex<HashMap<String, Arc<SessionGuard>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the guard for `tenant`, creating it with `make` on first use.
    pub fn guard(
        &self,
        tenant: &str,
        make: impl FnOnce() -> Arc<dyn Authenticator>,
    ) -> Arc<SessionGuard> {
        let mut guards = self.guards.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guards
            .entry(tenant.to_string())
            .or_insert_with(|| Arc::new(SessionGuard::new(make())))
            .clone()
    }
}
