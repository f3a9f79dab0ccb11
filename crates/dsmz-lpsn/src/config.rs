//! LPSN endpoints and client settings

use dsmz_core::{Deployment, HttpConfig, KeycloakConfig};

pub const PUBLIC_API_URL: &str = "https://api.lpsn.dsmz.de/";
pub const INTERNAL_API_URL: &str = "http://api.pnu-dev.dsmz.local/";
pub const SSO_URL: &str = "https://sso.dsmz.de/auth/";
pub const REALM: &str = "dsmz";
pub const PUBLIC_CLIENT_ID: &str = "api.lpsn.public";
pub const INTERNAL_CLIENT_ID: &str = "api.pnu-dev.private";

/// Runtime configuration for an LPSN client
#[derive(Debug, Clone)]
pub struct Config {
    pub deployment: Deployment,
    pub public_url: String,
    pub internal_url: String,
    pub sso_url: String,
    pub realm: String,
    pub public_client_id: String,
    pub internal_client_id: String,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deployment: Deployment::Public,
            public_url: PUBLIC_API_URL.to_string(),
            internal_url: INTERNAL_API_URL.to_string(),
            sso_url: SSO_URL.to_string(),
            realm: REALM.to_string(),
            public_client_id: PUBLIC_CLIENT_ID.to_string(),
            internal_client_id: INTERNAL_CLIENT_ID.to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// API root for the selected deployment.
    pub fn api_url(&self) -> &str {
        match self.deployment {
            Deployment::Public => &self.public_url,
            Deployment::Internal => &self.internal_url,
        }
    }

    /// Keycloak client for the selected deployment.
    pub fn keycloak(&self) -> KeycloakConfig {
        let client_id = match self.deployment {
            Deployment::Public => &self.public_client_id,
            Deployment::Internal => &self.internal_client_id,
        };
        KeycloakConfig {
            server_url: self.sso_url.clone(),
            realm: self.realm.clone(),
            client_id: client_id.clone(),
        }
    }
}
