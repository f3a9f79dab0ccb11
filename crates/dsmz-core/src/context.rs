//! Client context: everything one API client shares across its requests.
//!
//! Session and credentials are separate, separately locked fields; every
//! operation borrows the context instead of touching ambient client state.

use url::Url;

use crate::auth::{AuthProvider, Credentials, TokenManager};
use crate::config::HttpConfig;
use crate::error::RetrieveError;
use crate::executor::Executor;
use crate::gate::{Connector, Gate, HttpConnector};
use crate::keycloak::KeycloakProvider;
use crate::pagination::ApiQuery;
use crate::resolver::BatchResolver;

/// Production context: reqwest sessions, Keycloak tokens.
pub type HttpContext = ClientContext<HttpConnector, KeycloakProvider>;

pub struct ClientContext<C: Connector, A> {
    config: HttpConfig,
    base_url: Url,
    predictions: bool,
    gate: Gate<C>,
    tokens: TokenManager<A>,
}

impl<C: Connector, A: AuthProvider> ClientContext<C, A> {
    /// `base_url` is the API root; a missing trailing `/` is added.
    pub fn new(
        config: HttpConfig,
        base_url: &str,
        connector: C,
        provider: A,
        credentials: Credentials,
    ) -> Result<Self, RetrieveError> {
        let base_url = parse_base_url(base_url)?;
        Ok(Self {
            gate: Gate::new(connector, &config),
            tokens: TokenManager::new(provider, credentials),
            config,
            base_url,
            predictions: false,
        })
    }

    /// Ask for predicted traits on every request (BacDive only).
    pub fn with_predictions(mut self, on: bool) -> Self {
        self.predictions = on;
        self
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn predictions(&self) -> bool {
        self.predictions
    }

    pub fn gate(&self) -> &Gate<C> {
        &self.gate
    }

    pub fn tokens(&self) -> &TokenManager<A> {
        &self.tokens
    }

    pub fn executor(&self) -> Executor<'_, C, A> {
        Executor {
            config: &self.config,
            gate: &self.gate,
            tokens: &self.tokens,
        }
    }

    pub fn resolver(&self) -> BatchResolver<'_, C, A> {
        BatchResolver::new(self)
    }

    /// Absolute URL for a query, with the context's feature flags applied.
    pub fn url_for(&self, query: &ApiQuery) -> Result<Url, RetrieveError> {
        query
            .clone()
            .with_predictions(self.predictions)
            .resolve(&self.base_url)
    }

    /// Close the shared session. Safe to call any number of times.
    pub async fn close(&self) {
        self.gate.close().await;
    }
}

fn parse_base_url(raw: &str) -> Result<Url, RetrieveError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| RetrieveError::Query(format!("invalid base URL {raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(RetrieveError::Query(format!("invalid base URL {raw}")));
    }
    Ok(url)
}
