//! dsmz-core - Concurrent retrieval engine for DSMZ REST APIs
//!
//! Pages through a search result, resolves each page's identifiers with one
//! batch `fetch/` call, and flattens the records, handling bearer-token
//! expiry, rate limiting and transient network failures along the way.

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod gate;
pub mod keycloak;
pub mod logging;
pub mod pagination;
pub mod progress;
pub mod resolver;
pub mod retriever;
pub mod retry;
pub mod runtime;
pub mod search;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use auth::{AuthProvider, Credentials, TokenManager};
pub use config::{Deployment, HttpConfig};
pub use context::{ClientContext, HttpContext};
pub use error::{AuthError, RetrieveError};
pub use executor::{Outcome, Response};
pub use gate::{Connector, Gate, HttpConnector, Session};
pub use indicatif::ProgressBar;
pub use keycloak::{KeycloakConfig, KeycloakProvider};
pub use logging::{init_logging, IndicatifLogger};
pub use pagination::{plan, ApiQuery, PageTask};
pub use progress::{fmt_num, ProgressContext};
pub use resolver::Record;
pub use retriever::{Phase, Retrieval};
pub use runtime::{block_on, SHARED_RUNTIME};
pub use search::Search;
pub use transport::{HttpTransport, RawResponse, Transport, TransportError};
