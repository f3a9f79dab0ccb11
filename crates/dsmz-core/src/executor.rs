//! Request executor: one authenticated GET, classified, retried with backoff.

use crate::auth::{AuthProvider, TokenManager};
use crate::config::HttpConfig;
use crate::error::RetrieveError;
use crate::gate::{Connector, Gate};
use crate::retry::RetryState;
use crate::transport::{RawResponse, Transport, TransportError};

/// Statuses worth another attempt (rate limit and gateway/server trouble).
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Classified result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Any status not listed below; the body may still carry an API error payload
    Success { status: u16, body: String },
    /// One of [`RETRYABLE_STATUSES`]
    RetryableFailure { status: u16 },
    /// HTTP 401
    AuthExpired,
    TransportError(TransportError),
}

impl Outcome {
    pub fn classify(resp: RawResponse) -> Self {
        match resp.status {
            401 => Self::AuthExpired,
            s if RETRYABLE_STATUSES.contains(&s) => Self::RetryableFailure { status: s },
            status => Self::Success {
                status,
                body: resp.body,
            },
        }
    }
}

/// Body of a request that ended in [`Outcome::Success`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

/// Borrowed view over a client context's gate, tokens and config.
pub struct Executor<'a, C: Connector, A> {
    pub(crate) config: &'a HttpConfig,
    pub(crate) gate: &'a Gate<C>,
    pub(crate) tokens: &'a TokenManager<A>,
}

impl<C: Connector, A: AuthProvider> Executor<'_, C, A> {
    /// One attempt under an admission permit.
    ///
    /// Returns the outcome together with the credential generation it used,
    /// so a follow-up refresh can tell whether someone else already refreshed.
    pub async fn execute_once(&self, url: &str) -> Result<(Outcome, u64), RetrieveError> {
        let session = self.gate.acquire_session().await?;
        let _permit = self.gate.admit().await?;
        let snapshot = self.tokens.snapshot().await;
        let outcome = match session.transport().get(url, snapshot.access_token()).await {
            Ok(resp) => Outcome::classify(resp),
            Err(e) => Outcome::TransportError(e),
        };
        Ok((outcome, snapshot.generation))
    }

    /// GET `url` until it succeeds or `max_retries` attempts are spent.
    ///
    /// Expired tokens, retryable statuses and transport errors all refresh
    /// the credentials before backing off: upstream sometimes reports an
    /// expired token as a dropped connection. A failed refresh is fatal.
    pub async fn execute(&self, url: &str) -> Result<Response, RetrieveError> {
        let mut retry = RetryState::new(self.config.max_retries);
        while let Some(attempt) = retry.next_attempt() {
            let (outcome, generation) = self.execute_once(url).await?;
            let reason = match outcome {
                Outcome::Success { status, body } => return Ok(Response { status, body }),
                Outcome::AuthExpired => "token expired".to_string(),
                Outcome::RetryableFailure { status } => format!("HTTP {status}"),
                Outcome::TransportError(e) => e.to_string(),
            };
            if retry.exhausted() {
                log::debug!("{url}: attempt {attempt} failed ({reason}), giving up");
                break;
            }
            self.tokens.refresh_if_stale(generation).await?;
            let delay = retry.backoff(self.config.backoff_unit);
            log::debug!(
                "{url}: attempt {attempt}/{} failed ({reason}), retrying in {delay:?}",
                retry.max_attempts()
            );
            tokio::time::sleep(delay).await;
        }
        Err(RetrieveError::RetryExhausted {
            url: url.to_string(),
            attempts: retry.attempts(),
        })
    }
}
