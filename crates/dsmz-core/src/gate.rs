//! Concurrency gate: admission semaphore plus the shared, lazily-opened session.
//!
//! The session (one connection pool) is created on first use by whichever
//! request gets there first; racing callers wait on the same mutex and reuse
//! it. Closing drops the gate's handle exactly once; a second close is a no-op.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

use crate::config::HttpConfig;
use crate::error::RetrieveError;
use crate::transport::{HttpTransport, Transport, TransportError};

/// Factory for the transport backing a session.
pub trait Connector: Send + Sync {
    type Transport: Transport;

    fn connect(&self, config: &HttpConfig) -> Result<Self::Transport, TransportError>;
}

/// Opens reqwest connection pools.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    type Transport = HttpTransport;

    fn connect(&self, config: &HttpConfig) -> Result<HttpTransport, TransportError> {
        HttpTransport::new(config)
    }
}

/// Shared network context. Cloned handles keep the pool alive for in-flight requests.
#[derive(Debug)]
pub struct Session<T> {
    id: u64,
    transport: T,
}

impl<T> Session<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

pub struct Gate<C: Connector> {
    connector: C,
    config: HttpConfig,
    admission: Semaphore,
    session: Mutex<Option<Arc<Session<C::Transport>>>>,
    opened: AtomicU64,
}

impl<C: Connector> Gate<C> {
    pub fn new(connector: C, config: &HttpConfig) -> Self {
        let permits = config.max_in_flight.max(1);
        Self {
            connector,
            config: config.clone(),
            admission: Semaphore::new(permits),
            session: Mutex::new(None),
            opened: AtomicU64::new(0),
        }
    }

    /// Return the live session, opening one if none exists.
    pub async fn acquire_session(&self) -> Result<Arc<Session<C::Transport>>, RetrieveError> {
        let mut slot = self.session.lock().await;
        if let Some(session) = slot.as_ref() {
            return Ok(Arc::clone(session));
        }
        let transport = self
            .connector
            .connect(&self.config)
            .map_err(|e| RetrieveError::Session(e.to_string()))?;
        let id = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!(
            "session {id}: opened (pool {}, timeout {:?})",
            self.config.pool_size,
            self.config.request_timeout
        );
        let session = Arc::new(Session { id, transport });
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Wait for an admission permit. Dropping the permit frees the slot.
    pub async fn admit(&self) -> Result<SemaphorePermit<'_>, RetrieveError> {
        self.admission
            .acquire()
            .await
            .map_err(|_| RetrieveError::Session("admission gate closed".to_string()))
    }

    /// Tear down the current session. Returns `false` if there was none.
    pub async fn close(&self) -> bool {
        match self.session.lock().await.take() {
            Some(session) => {
                log::debug!("session {}: closed", session.id);
                true
            }
            None => false,
        }
    }

    pub async fn is_open(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Sessions opened over the gate's lifetime
    pub fn sessions_opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    pub fn available_permits(&self) -> usize {
        self.admission.available_permits()
    }
}
