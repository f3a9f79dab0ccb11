//! BacDive client: login, searches, retrieval

use dsmz_core::{
    AuthProvider, ClientContext, Connector, Credentials, HttpConnector, KeycloakProvider,
    ProgressBar, Record, RetrieveError, Retrieval, Search,
};

use crate::config::Config;
use crate::query::{culture_collection_query, genome_query, sequence_16s_query, taxonomy_query};

/// BacDive API client.
///
/// Searches return a [`Search`] handle; [`retrieve`](Self::retrieve) then
/// fetches every matching strain concurrently.
pub struct BacdiveClient<C: Connector = HttpConnector, A = KeycloakProvider> {
    ctx: ClientContext<C, A>,
}

impl BacdiveClient {
    /// Log in against the deployment's Keycloak realm.
    pub async fn login(config: &Config, user: &str, password: &str) -> Result<Self, RetrieveError> {
        let provider = KeycloakProvider::new(config.keycloak())?;
        let credentials = provider.login(user, password).await?;
        log::info!("logged in to BacDive ({})", config.deployment);
        Self::with_credentials(config, HttpConnector, provider, credentials)
    }
}

impl<C: Connector, A: AuthProvider> BacdiveClient<C, A> {
    /// Client over an already authenticated provider.
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
        )?
        .with_predictions(config.predictions);
        Ok(Self { ctx })
    }

    pub fn context(&self) -> &ClientContext<C, A> {
        &self.ctx
    }

    pub async fn by_culture_collection_no(&self, number: &str) -> Result<Search, RetrieveError> {
        self.ctx.search(culture_collection_query(number)?).await
    }

    pub async fn by_taxonomy(
        &self,
        genus: &str,
        species: Option<&str>,
        subspecies: Option<&str>,
    ) -> Result<Search, RetrieveError> {
        self.ctx.search(taxonomy_query(genus, species, subspecies)?).await
    }

    pub async fn by_16s(&self, accession: &str) -> Result<Search, RetrieveError> {
        self.ctx.search(sequence_16s_query(accession)?).await
    }

    pub async fn by_genome(&self, accession: &str) -> Result<Search, RetrieveError> {
        self.ctx.search(genome_query(accession)?).await
    }

    /// BacDive ids known up front; no search request is made.
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
