//! Bearer token pair and its refresh state machine.
//!
//! [`TokenManager`] owns the current [`Credentials`] behind a lock and hands
//! out whole snapshots, so a reader never sees the access token of one pair
//! next to the refresh token of another. Every successful refresh bumps a
//! generation counter; callers that saw a stale generation trigger at most
//! one provider call between them.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::error::AuthError;

/// Access token + refresh token pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_token: String,
    refresh_token: String,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

// Tokens stay out of logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Identity provider able to exchange a refresh token for a new pair.
pub trait AuthProvider: Send + Sync {
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<Credentials, AuthError>> + Send;
}

/// Consistent view of the credentials at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub credentials: Arc<Credentials>,
    /// Number of successful refreshes before this snapshot was taken
    pub generation: u64,
}

impl Snapshot {
    pub fn access_token(&self) -> &str {
        self.credentials.access_token()
    }
}

/// Holds the current credentials and refreshes them on demand.
///
/// Never retries on its own: retry policy belongs to the request executor.
pub struct TokenManager<A> {
    provider: A,
    current: RwLock<Snapshot>,
    /// Held while refreshing; remembers the last failed refresh
    refreshing: Mutex<Option<FailedRefresh>>,
}

/// A refresh of `generation` the provider rejected.
#[derive(Debug, Clone)]
struct FailedRefresh {
    generation: u64,
    error: AuthError,
}

impl<A: AuthProvider> TokenManager<A> {
    pub fn new(provider: A, credentials: Credentials) -> Self {
        Self {
            provider,
            current: RwLock::new(Snapshot {
                credentials: Arc::new(credentials),
                generation: 0,
            }),
            refreshing: Mutex::new(None),
        }
    }

    /// Current credentials as one consistent snapshot.
    pub async fn snapshot(&self) -> Snapshot {
        self.current.read().await.clone()
    }

    pub fn provider(&self) -> &A {
        &self.provider
    }

    /// Unconditionally exchange the refresh token for a new pair.
    pub async fn refresh(&self) -> Result<Snapshot, AuthError> {
        let mut failed = self.refreshing.lock().await;
        let current = self.snapshot().await;
        self.refresh_locked(&mut failed, current).await
    }

    /// Refresh only if nobody has refreshed since `seen_generation`.
    ///
    /// Many requests failing with the same expired token collapse into one
    /// provider call; the rest pick up the pair it produced, or the error it
    /// failed with.
    pub async fn refresh_if_stale(&self, seen_generation: u64) -> Result<Snapshot, AuthError> {
        let mut failed = self.refreshing.lock().await;
        let current = self.snapshot().await;
        if current.generation != seen_generation {
            log::debug!(
                "credentials already refreshed (generation {} -> {})",
                seen_generation,
                current.generation
            );
            return Ok(current);
        }
        if let Some(prev) = failed.as_ref().filter(|f| f.generation == seen_generation) {
            return Err(prev.error.clone());
        }
        self.refresh_locked(&mut failed, current).await
    }

    async fn refresh_locked(
        &self,
        failed: &mut Option<FailedRefresh>,
        current: Snapshot,
    ) -> Result<Snapshot, AuthError> {
        let fresh = match self
            .provider
            .refresh(current.credentials.refresh_token())
            .await
        {
            Ok(c) => c,
            Err(e) => {
                log::error!("token refresh failed: {e}");
                *failed = Some(FailedRefresh {
                    generation: current.generation,
                    error: e.clone(),
                });
                return Err(e);
            }
        };
        *failed = None;
        let mut slot = self.current.write().await;
        *slot = Snapshot {
            credentials: Arc::new(fresh),
            generation: current.generation + 1,
        };
        log::debug!("credentials refreshed (generation {})", slot.generation);
        Ok(slot.clone())
    }
}
