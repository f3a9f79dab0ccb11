//! LPSN client

use dsmz_core::{
    AuthProvider, ClientContext, Connector, Credentials, HttpConnector, KeycloakProvider,
    ProgressBar, Record, RetrieveError, Retrieval, Search,
};
use serde_json::Value;

use crate::config::Config;
use crate::query::{advanced_query, flexible_query};

pub struct LpsnClient<C: Connector = HttpConnector, A = KeycloakProvider> {
    ctx: ClientContext<C, A>,
}

impl LpsnClient {
    /// Log in against the deployment's Keycloak realm.
    pub async fn login(config: &Config, user: &str, password: &str) -> Result<Self, RetrieveError> {
        let provider = KeycloakProvider::new(config.keycloak())?;
        let credentials = provider.login(user, password).await?;
        log::info!("logged in to LPSN ({})", config.deployment);
        Self::with_credentials(config, HttpConnector, provider, credentials)
    }
}

impl<C: Connector, A: AuthProvider> LpsnClient<C, A> {
    pub fn with_credentials(
        config: &Config,
        connector: C,
        provider: A,
        credentials: Credentials,
    ) -> Result<Self, RetrieveError> {
        let ctx = ClientContext::new(
            config.http.clone(),
            config.api_url(),
            connector,
            provider,
            credentials,
        )?;
        Ok(Self { ctx })
    }

    pub fn context(&self) -> &ClientContext<C, A> {
        &self.ctx
    }

    /// Field search, e.g. `[("taxon_name", "Escherichia"), ("valid", "true")]`.
    pub async fn advanced_search<I, K, V>(&self, params: I) -> Result<Search, RetrieveError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.ctx.search(advanced_query(params)?).await
    }

    /// JSON expression search; `negate` inverts the match.
    pub async fn flexible_search(
        &self,
        search: &Value,
        negate: bool,
    ) -> Result<Search, RetrieveError> {
        self.ctx.search(flexible_query(search, negate)?).await
    }

    /// LPSN record ids known up front; no search request is made.
    pub fn by_ids<I, S>(&self, ids: I) -> Result<Search, RetrieveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Search::ids(ids)
    }

    pub async fn retrieve(&self, search: &Search) -> Result<Vec<Record>, RetrieveError> {
        self.ctx.retrieve(search).await
    }

    pub async fn retrieve_with_summary(
        &self,
        search: &Search,
        pb: &ProgressBar,
    ) -> Result<Retrieval, RetrieveError> {
        self.ctx.retrieve_with_summary(search, pb).await
    }

    pub async fn close(&self) {
        self.ctx.close().await;
    }
}
