//! In-process fakes for the transport and identity provider.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::auth::{AuthProvider, Credentials};
use crate::config::HttpConfig;
use crate::context::ClientContext;
use crate::error::AuthError;
use crate::gate::Connector;
use crate::transport::{RawResponse, Transport, TransportError};

pub(crate) enum Reply {
    Status(u16, String),
    Disconnect,
}

type Handler = Box<dyn Fn(&str, &str, usize) -> Reply + Send + Sync>;

/// Scripted upstream. The handler sees `(url, access_token, call_number)`.
pub(crate) struct MockUpstream {
    handler: Handler,
    latency: Duration,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockUpstream {
    pub(crate) fn new(
        handler: impl Fn(&str, &str, usize) -> Reply + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::with_latency(Duration::ZERO, handler)
    }

    pub(crate) fn with_latency(
        latency: Duration,
        handler: impl Fn(&str, &str, usize) -> Reply + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            latency,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running requests observed
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
    }

    pub(crate) fn tokens_seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

pub(crate) struct MockTransport(Arc<MockUpstream>);

impl Transport for MockTransport {
    async fn get(&self, url: &str, access_token: &str) -> Result<RawResponse, TransportError> {
        let up = &self.0;
        let n = up.calls.fetch_add(1, Ordering::SeqCst) + 1;
        up.seen
            .lock()
            .unwrap()
            .push((url.to_string(), access_token.to_string()));

        let now = up.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        up.peak.fetch_max(now, Ordering::SeqCst);
        if up.latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(up.latency).await;
        }
        up.in_flight.fetch_sub(1, Ordering::SeqCst);

        match (up.handler)(url, access_token, n) {
            Reply::Status(status, body) => Ok(RawResponse::new(status, body)),
            Reply::Disconnect => Err(TransportError::new("connection reset by peer")),
        }
    }
}

pub(crate) struct MockConnector {
    upstream: Arc<MockUpstream>,
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn connect(&self, _config: &HttpConfig) -> Result<MockTransport, TransportError> {
        Ok(MockTransport(Arc::clone(&self.upstream)))
    }
}

/// Issues `access-N` / `refresh-N` on the N-th refresh.
#[derive(Default)]
pub(crate) struct MockAuth {
    refreshes: AtomicUsize,
    failing: AtomicBool,
}

impl MockAuth {
    pub(crate) fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl AuthProvider for MockAuth {
    async fn refresh(&self, _refresh_token: &str) -> Result<Credentials, AuthError> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::Rejected {
                status: 400,
                message: "Token is not active".to_string(),
            });
        }
        Ok(Credentials::new(format!("access-{n}"), format!("refresh-{n}")))
    }
}

pub(crate) type MockContext = ClientContext<MockConnector, MockAuth>;

pub(crate) fn config(max_retries: u32) -> HttpConfig {
    HttpConfig {
        max_retries,
        backoff_unit: Duration::from_secs(1),
        ..Default::default()
    }
}

/// Context against `https://api.test/` starting with tokens `access-0` / `refresh-0`.
pub(crate) fn context(upstream: Arc<MockUpstream>, max_retries: u32) -> MockContext {
    context_with(upstream, config(max_retries))
}

pub(crate) fn context_with(upstream: Arc<MockUpstream>, config: HttpConfig) -> MockContext {
    ClientContext::new(
        config,
        "https://api.test/",
        MockConnector { upstream },
        MockAuth::default(),
        Credentials::new("access-0", "refresh-0"),
    )
    .unwrap()
}
