//! Error types for the collection pipeline.
//!
//! Two layers:
//! - `FetchError`: outcomes of a single HTTP fetch, surfaced by the Fetcher
//!   after its internal retries are exhausted
//! - `CoreError`: pipeline-level errors (probe, collect, reconcile, store)

use thiserror::Error;

// ============================================================================
// FETCH ERRORS
// ============================================================================

/// Terminal outcome of an HTTP fetch. Transient classes (network, timeout,
/// 5xx, 429) are retried inside the Fetcher before one of these surfaces.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Attempt exceeded its time budget
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure (DNS, TLS, reset)
    #[error("network error: {0}")]
    Network(String),

    /// Terminal client error (404 and friends; 429 is retried, not surfaced)
    #[error("HTTP {0}")]
    Http4xx(u16),

    /// Server error that survived all retries
    #[error("HTTP {0}")]
    Http5xx(u16),

    /// Body could not be decoded into the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// robots.txt disallows this path for our user agent
    #[error("blocked by robots policy")]
    PolicyBlocked,

    /// Page needs a JS renderer and none is available
    #[error("page requires JavaScript rendering")]
    RequiresJs,

    /// The owning pass was cancelled mid-flight
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Whether the Fetcher should retry this class internally.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network(_) | Self::Http5xx(_))
    }
}

// ============================================================================
// CORE ERRORS
// ============================================================================

/// Pipeline-level errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Token generation produced nothing usable for this company name
    #[error("no candidate tokens for '{0}'")]
    NoCandidateTokens(String),

    /// Write lost a race or hit a busy database; retried once by the caller
    #[error("store conflict: {0}")]
    StoreConflict(String),

    #[error("database error: {0}")]
    Database(String),

    /// Pass was cancelled (budget exceeded or external signal)
    #[error("pass cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Fetch(FetchError::Cancelled))
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.message().contains("locked") || db.message().contains("busy") => {
                Self::StoreConflict(db.message().to_string())
            }
            _ => Self::Database(e.to_string()),
        }
    }
}

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
