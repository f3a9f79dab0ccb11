//! Low-level request primitive.
//!
//! Everything above this module talks to the network through [`Transport`],
//! a single authenticated GET. The reqwest-backed [`HttpTransport`] is the
//! production implementation; tests plug in in-process fakes.

use std::future::Future;

use crate::config::HttpConfig;

/// Status and body of one HTTP exchange, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Network-level failure: no HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    message: String,
    timeout: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: false,
        }
    }

    /// Build from a reqwest error, dropping the URL so query strings don't leak into logs.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        let timeout = e.is_timeout();
        Self {
            message: e.without_url().to_string(),
            timeout,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.timeout
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.timeout {
            write!(f, "transport timeout: {}", self.message)
        } else {
            write!(f, "transport error: {}", self.message)
        }
    }
}

impl std::error::Error for TransportError {}

/// One authenticated GET returning the raw status and body.
///
/// Implementations must send `Accept: application/json` and
/// `Authorization: Bearer <access_token>`.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        url: &str,
        access_token: &str,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// reqwest-backed transport owning one connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.pool_size)
            .build()
            .map_err(TransportError::from_reqwest)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str, access_token: &str) -> Result<RawResponse, TransportError> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(TransportError::from_reqwest)?;
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn sends_accept_and_bearer_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fetch/1"))
            .and(header("accept", "application/json"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&HttpConfig::default()).unwrap();
        let resp = transport
            .get(&format!("{}/fetch/1", server.uri()), "access-1")
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, r#"{"results":[]}"#);
    }

    #[tokio::test]
    async fn error_status_is_not_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&HttpConfig::default()).unwrap();
        let resp = transport.get(&server.uri(), "t").await.unwrap();
        assert_eq!(resp, RawResponse::new(503, "busy"));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let config = HttpConfig {
            connect_timeout: std::time::Duration::from_millis(200),
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        // Port 9 (discard) on localhost is not listening in test environments
        let err = transport.get("http://127.0.0.1:9/", "t").await.unwrap_err();
        assert!(format!("{err}").starts_with("transport"));
    }

    #[test]
    fn display_variants() {
        assert_eq!(
            format!("{}", TransportError::new("reset")),
            "transport error: reset"
        );
    }
}
