//! Error types for the retrieval pipeline

/// Failure to obtain or refresh bearer tokens from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Provider answered with a non-success status (revoked / invalid token, bad login)
    Rejected { status: u16, message: String },
    /// Provider could not be reached
    Transport(String),
    /// Provider answered with an unexpected body
    Malformed(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected { status, message } => {
                write!(f, "identity provider rejected request (HTTP {status}): {message}")
            }
            Self::Transport(msg) => write!(f, "identity provider unreachable: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed token response: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Error from a retrieval run or one of its pages.
///
/// Only [`Auth`](Self::Auth) and [`Session`](Self::Session) abort a run;
/// every other variant is contained at page granularity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrieveError {
    /// Token refresh (or login) failed
    Auth(AuthError),
    /// A request failed on every allowed attempt
    RetryExhausted { url: String, attempts: u32 },
    /// Response body had an unexpected shape or was not JSON
    MalformedResponse { url: String, message: String },
    /// Invalid search specification, raised before any network activity
    Query(String),
    /// Session / connection pool could not be created
    Session(String),
}

impl std::fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth(e) => write!(f, "authentication failed: {e}"),
            Self::RetryExhausted { url, attempts } => {
                write!(f, "failed to GET {url} after {attempts} attempts")
            }
            Self::MalformedResponse { url, message } => {
                write!(f, "malformed response from {url}: {message}")
            }
            Self::Query(msg) => write!(f, "invalid query: {msg}"),
            Self::Session(msg) => write!(f, "cannot open session: {msg}"),
        }
    }
}

impl std::error::Error for RetrieveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Auth(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AuthError> for RetrieveError {
    fn from(e: AuthError) -> Self {
        Self::Auth(e)
    }
}

impl RetrieveError {
    /// Whether this error must abort the whole retrieval instead of one page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Session(_))
    }

    /// The failing URL, when the error is tied to one request.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::RetryExhausted { url, .. } | Self::MalformedResponse { url, .. } => Some(url),
            _ => None,
        }
    }

    pub(crate) fn malformed(url: &str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            url: url.to_string(),
            message: message.into(),
        }
    }
}
