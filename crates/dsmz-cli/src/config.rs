//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use dsmz_core::{Deployment, HttpConfig};
use serde::Deserialize;

/// Global configuration for dsmz
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub http: HttpSection,
    pub bacdive: BacdiveSection,
    pub lpsn: LpsnSection,
}

/// Keycloak login shared by both APIs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub user: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub password: Option<String>,
    pub sso_url: String,
    pub realm: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user: std::env::var("DSMZ_USER").ok(),
            password: std::env::var("DSMZ_PASSWORD").ok(),
            sso_url: dsmz_bacdive::config::SSO_URL.to_string(),
            realm: dsmz_bacdive::config::REALM.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub max_retries: u32,
    /// Backoff base in milliseconds
    pub backoff_ms: u64,
    /// Per-request timeout in seconds
    pub request_timeout: u64,
    /// Connect timeout in seconds
    pub connect_timeout: u64,
    pub max_in_flight: usize,
    pub pool_size: usize,
}

impl Default for HttpSection {
    fn default() -> Self {
        let http = HttpConfig::default();
        Self {
            max_retries: http.max_retries,
            backoff_ms: http.backoff_unit.as_millis() as u64,
            request_timeout: http.request_timeout.as_secs(),
            connect_timeout: http.connect_timeout.as_secs(),
            max_in_flight: http.max_in_flight,
            pool_size: http.pool_size,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BacdiveSection {
    pub public_url: String,
    pub dev_url: String,
    pub client_id: String,
    pub dev_client_id: String,
    /// Ask for predicted traits by default
    pub predictions: bool,
}

impl Default for BacdiveSection {
    fn default() -> Self {
        use dsmz_bacdive::config::{
            INTERNAL_API_URL, INTERNAL_CLIENT_ID, PUBLIC_API_URL, PUBLIC_CLIENT_ID,
        };
        Self {
            public_url: PUBLIC_API_URL.to_string(),
            dev_url: INTERNAL_API_URL.to_string(),
            client_id: PUBLIC_CLIENT_ID.to_string(),
            dev_client_id: INTERNAL_CLIENT_ID.to_string(),
            predictions: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LpsnSection {
    pub public_url: String,
    pub dev_url: String,
    pub client_id: String,
    pub dev_client_id: String,
}

impl Default for LpsnSection {
    fn default() -> Self {
        use dsmz_lpsn::config::{
            INTERNAL_API_URL, INTERNAL_CLIENT_ID, PUBLIC_API_URL, PUBLIC_CLIENT_ID,
        };
        Self {
            public_url: PUBLIC_API_URL.to_string(),
            dev_url: INTERNAL_API_URL.to_string(),
            client_id: PUBLIC_CLIENT_ID.to_string(),
            dev_client_id: INTERNAL_CLIENT_ID.to_string(),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./dsmz.toml (current directory)
    /// 2. ~/.config/dsmz/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("dsmz.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "dsmz") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Username and password, or an error naming what is missing.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let user = self
            .auth
            .user
            .as_deref()
            .context("No username: set auth.user in the config file or DSMZ_USER")?;
        let password = self
            .auth
            .password
            .as_deref()
            .context("No password: set auth.password in the config file or DSMZ_PASSWORD")?;
        Ok((user, password))
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            max_retries: self.http.max_retries,
            backoff_unit: Duration::from_millis(self.http.backoff_ms),
            request_timeout: Duration::from_secs(self.http.request_timeout),
            connect_timeout: Duration::from_secs(self.http.connect_timeout),
            max_in_flight: self.http.max_in_flight,
            pool_size: self.http.pool_size,
            ..HttpConfig::default()
        }
    }

    pub fn bacdive_config(
        &self,
        deployment: Deployment,
        predictions: bool,
    ) -> dsmz_bacdive::Config {
        dsmz_bacdive::Config {
            deployment,
            public_url: self.bacdive.public_url.clone(),
            internal_url: self.bacdive.dev_url.clone(),
            sso_url: self.auth.sso_url.clone(),
            realm: self.auth.realm.clone(),
            public_client_id: self.bacdive.client_id.clone(),
            internal_client_id: self.bacdive.dev_client_id.clone(),
            predictions: predictions || self.bacdive.predictions,
            http: self.http_config(),
        }
    }

    pub fn lpsn_config(&self, deployment: Deployment) -> dsmz_lpsn::Config {
        dsmz_lpsn::Config {
            deployment,
            public_url: self.lpsn.public_url.clone(),
            internal_url: self.lpsn.dev_url.clone(),
            sso_url: self.auth.sso_url.clone(),
            realm: self.auth.realm.clone(),
            public_client_id: self.lpsn.client_id.clone(),
            internal_client_id: self.lpsn.dev_client_id.clone(),
            http: self.http_config(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.http.max_retries, 10);
        assert_eq!(config.http.max_in_flight, 50);
        assert_eq!(config.bacdive.public_url, "https://api.bacdive.dsmz.de/");
        assert_eq!(config.lpsn.dev_url, "http://api.pnu-dev.dsmz.local/");
        assert!(!config.bacdive.predictions);
    }

    #[test]
    fn expand_env_var_simple() {
        std::env::set_var("DSMZ_TEST_VAR", "test_value");
        assert_eq!(
            expand_env_var("${DSMZ_TEST_VAR}"),
            Some("test_value".to_string())
        );
        std::env::remove_var("DSMZ_TEST_VAR");
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[auth]
user = "curator@example.org"
password = "secret"
realm = "test"

[http]
max_retries = 4
backoff_ms = 250
max_in_flight = 8

[bacdive]
predictions = true
public_url = "https://bacdive.example/"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.credentials().unwrap(), ("curator@example.org", "secret"));

        let http = config.http_config();
        assert_eq!(http.max_retries, 4);
        assert_eq!(http.backoff_unit, Duration::from_millis(250));
        assert_eq!(http.max_in_flight, 8);
        assert_eq!(http.request_timeout, Duration::from_secs(300));

        let bacdive = config.bacdive_config(Deployment::Public, false);
        assert!(bacdive.predictions);
        assert_eq!(bacdive.api_url(), "https://bacdive.example/");
        assert_eq!(bacdive.keycloak().realm, "test");

        let lpsn = config.lpsn_config(Deployment::Internal);
        assert_eq!(lpsn.api_url(), "http://api.pnu-dev.dsmz.local/");
        assert_eq!(lpsn.keycloak().client_id, "api.pnu-dev.private");
    }

    #[test]
    fn missing_password_is_reported() {
        let config = Config {
            auth: AuthConfig {
                user: Some("someone".into()),
                password: None,
                ..AuthConfig::default()
            },
            ..Config::default()
        };
        let err = config.credentials().unwrap_err();
        assert!(err.to_string().contains("DSMZ_PASSWORD"));
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dsmz.toml");
        std::fs::write(&path, "[lpsn]\nclient_id = \"custom\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.lpsn.client_id, "custom");
        assert_eq!(config.lpsn.public_url, "https://api.lpsn.dsmz.de/");
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[http\nmax_retries = ").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
