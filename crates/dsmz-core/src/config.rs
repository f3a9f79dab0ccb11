//! HTTP and retrieval settings for one client context

use std::time::Duration;

/// Which deployment of an API a client talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Deployment {
    /// Public internet API
    #[default]
    Public,
    /// Internal / development API (DSMZ network only)
    Internal,
}

impl Deployment {
    pub fn from_dev_flag(dev: bool) -> Self {
        if dev {
            Self::Internal
        } else {
            Self::Public
        }
    }

    pub fn is_public(self) -> bool {
        self == Self::Public
    }
}

impl std::fmt::Display for Deployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::Internal => f.write_str("internal"),
        }
    }
}

/// Tunables shared by every request issued through a client context.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Attempts per request before giving up (bounded, never infinite)
    pub max_retries: u32,
    /// Backoff base: after attempt `n` fails, sleep `backoff_unit * 2^n`
    pub backoff_unit: Duration,
    /// Total timeout for a single request
    pub request_timeout: Duration,
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
    /// Admission gate ceiling (simultaneous in-flight requests)
    pub max_in_flight: usize,
    /// Connection pool ceiling per host
    pub pool_size: usize,
    /// Identifiers per search page (fixed by upstream)
    pub page_size: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            backoff_unit: Duration::from_secs(1),
            request_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(60),
            max_in_flight: 50,
            pool_size: 200,
            page_size: 100,
        }
    }
}
