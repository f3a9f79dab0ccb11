//! Keycloak (OpenID Connect) identity provider

use std::time::Duration;

use serde::Deserialize;

use crate::auth::{AuthProvider, Credentials};
use crate::error::AuthError;

const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and as whom to request tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeycloakConfig {
    /// Server root, e.g. `https://sso.dsmz.de/auth/`
    pub server_url: String,
    pub realm: String,
    pub client_id: String,
}

impl KeycloakConfig {
    /// OpenID Connect token endpoint for the realm
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.server_url.trim_end_matches('/'),
            self.realm
        )
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Password and refresh-token grants against a Keycloak realm.
#[derive(Debug, Clone)]
pub struct KeycloakProvider {
    config: KeycloakConfig,
    client: reqwest::Client,
}

impl KeycloakProvider {
    pub fn new(config: KeycloakConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(TOKEN_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &KeycloakConfig {
        &self.config
    }

    /// Initial login with username and password.
    pub async fn login(&self, user: &str, password: &str) -> Result<Credentials, AuthError> {
        log::debug!("requesting tokens for {user} from {}", self.config.server_url);
        self.token_request(&[
            ("grant_type", "password"),
            ("client_id", &self.config.client_id),
            ("username", user),
            ("password", password),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<Credentials, AuthError> {
        let resp = self
            .client
            .post(self.config.token_endpoint())
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.without_url().to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.without_url().to_string()))?;

        if !(200..300).contains(&status) {
            return Err(AuthError::Rejected {
                status,
                message: error_message(&body),
            });
        }
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::Malformed(e.to_string()))?;
        Ok(Credentials::new(token.access_token, token.refresh_token))
    }
}

impl AuthProvider for KeycloakProvider {
    async fn refresh(&self, refresh_token: &str) -> Result<Credentials, AuthError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("client_id", &self.config.client_id),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}

/// Best-effort human message from a Keycloak error body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error_description: Some(desc),
            ..
        }) => desc,
        Ok(ErrorResponse {
            error: Some(err), ..
        }) => err,
        _ => body.chars().take(200).collect(),
    }
}
