//! Non-concurrent search path and the search handle fed to the orchestrator.

use serde_json::Value;

use crate::auth::AuthProvider;
use crate::context::ClientContext;
use crate::error::RetrieveError;
use crate::executor::RETRYABLE_STATUSES;
use crate::gate::Connector;
use crate::pagination::ApiQuery;
use crate::retry::RetryState;
use crate::transport::Transport;

/// Message upstream puts in a 401 body when the access token timed out.
pub const EXPIRED_TOKEN_MESSAGE: &str = "Expired token";

/// A search ready to be retrieved.
#[derive(Debug, Clone, PartialEq)]
pub enum Search {
    /// Server-side search: the query to page through and its first response
    Query { query: ApiQuery, result: Value },
    /// Identifiers known up front; resolved straight through `fetch/`
    Ids(Vec<String>),
}

impl Search {
    /// Parse identifiers; each item may itself be a `;`-separated list.
    pub fn ids<I, S>(items: I) -> Result<Self, RetrieveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = items
            .into_iter()
            .flat_map(|s| {
                s.as_ref()
                    .split(';')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .collect();
        if ids.is_empty() {
            return Err(RetrieveError::Query("no identifiers given".to_string()));
        }
        Ok(Self::Ids(ids))
    }

    /// Total number of results, or `None` when the search response has no usable count.
    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Query { result, .. } => result.get("count").and_then(Value::as_u64),
            Self::Ids(ids) => Some(ids.len() as u64),
        }
    }

    /// Upstream `title: message` when the search came back as an error payload.
    pub fn error_message(&self) -> Option<String> {
        let Self::Query { result, .. } = self else {
            return None;
        };
        if result.get("count").is_some() {
            return None;
        }
        let title = result.get("title").and_then(Value::as_str).unwrap_or("error");
        let message = result.get("message").and_then(Value::as_str).unwrap_or("");
        Some(format!("{title}: {message}"))
    }
}

impl<C: Connector, A: AuthProvider> ClientContext<C, A> {
    /// Run a search query and keep its first response for planning.
    pub async fn search(&self, query: ApiQuery) -> Result<Search, RetrieveError> {
        if query.path().trim_matches('/').is_empty() {
            return Err(RetrieveError::Query("empty search path".to_string()));
        }
        let result = self.api_call(&query).await?;
        let search = Search::Query { query, result };
        match (search.count(), search.error_message()) {
            (_, Some(msg)) => log::error!("search failed: {msg}"),
            (Some(0), _) => log::info!("search returned no results"),
            (Some(n), _) => log::info!("search matched {n} entries"),
            (None, None) => log::warn!("search response has no usable count"),
        }
        Ok(search)
    }

    /// Single API call returning the JSON body, for non-concurrent use.
    ///
    /// Compatibility behavior kept from the upstream clients: 400/500/503
    /// bodies are returned as data (they carry `title`/`message`), and a 401
    /// only triggers a refresh when its message says the token expired.
    /// Transport errors and the other retryable statuses (429/502/504) are
    /// retried with backoff.
    pub async fn api_call(&self, query: &ApiQuery) -> Result<Value, RetrieveError> {
        let url = self.url_for(query)?;
        let url = url.as_str();
        let mut retry = RetryState::new(self.config().max_retries);
        let mut refreshed = false;

        while let Some(attempt) = retry.next_attempt() {
            let session = self.gate().acquire_session().await?;
            let snapshot = self.tokens().snapshot().await;
            let sent = {
                let _permit = self.gate().admit().await?;
                session.transport().get(url, snapshot.access_token()).await
            };
            let reason = match sent {
                Err(e) => e.to_string(),
                Ok(resp) if retried_on_search_path(resp.status) => format!("HTTP {}", resp.status),
                Ok(resp) => {
                    let body = parse_body(url, resp.status, &resp.body)?;
                    match resp.status {
                        400 | 500 | 503 => {
                            log::warn!("HTTP {} from {url}: {}", resp.status, resp.body);
                            return Ok(body);
                        }
                        401 if !refreshed && !retry.exhausted() && is_expired_token(&body) => {
                            refreshed = true;
                            self.tokens().refresh_if_stale(snapshot.generation).await?;
                            continue;
                        }
                        _ => return Ok(body),
                    }
                }
            };
            if retry.exhausted() {
                log::debug!("{url}: attempt {attempt} failed ({reason}), giving up");
                break;
            }
            let delay = retry.backoff(self.config().backoff_unit);
            log::debug!("{url}: attempt {attempt} failed ({reason}), retrying in {delay:?}");
            tokio::time::sleep(delay).await;
        }
        Err(RetrieveError::RetryExhausted {
            url: url.to_string(),
            attempts: retry.attempts(),
        })
    }
}

/// Retryable statuses, minus the 500/503 bodies this path hands back as data.
fn retried_on_search_path(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status) && !matches!(status, 500 | 503)
}

fn parse_body(url: &str, status: u16, body: &str) -> Result<Value, RetrieveError> {
    serde_json::from_str(body)
        .map_err(|e| RetrieveError::malformed(url, format!("HTTP {status}: {e}")))
}

fn is_expired_token(body: &Value) -> bool {
    body.get("message").and_then(Value::as_str) == Some(EXPIRED_TOKEN_MESSAGE)
}
