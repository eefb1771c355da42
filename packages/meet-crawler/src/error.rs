//! Typed errors for the meet crawler.
//!
//! A 404 is never an error here: it is [`ProbeOutcome::Absent`](crate::probe::ProbeOutcome).
//! Everything in this module is meet-scoped; nothing aborts a whole pass
//! except failing to select meets in the first place.

use thiserror::Error;

/// Anomalies raised while talking to the results host.
///
/// Only 200 and 404 carry meaning upstream. Anything else lands here and
/// leaves the affected meet unresolved until the next pass.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Connection, TLS, timeout or redirect failure
    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Any status other than 200 or 404
    #[error("unexpected HTTP status {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },

    /// The response arrived but its body could not be read
    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ProbeError {
    /// URL the anomaly was observed on.
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. } | Self::UnexpectedStatus { url, .. } | Self::Body { url, .. } => url,
        }
    }
}

/// Structural mismatches in fetched markup.
///
/// These drop a single page's contribution; sibling pages of the same meet
/// still proceed.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The element the generation's layout promises is not on the page
    #[error("no {element} found on {url}")]
    MissingElement { url: String, element: &'static str },
}

/// Persistence failures. Each one aborts the unit of work for its meet.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("meet not found: {code}")]
    MeetNotFound { code: String },

    /// A stored column holds a value this crate cannot interpret
    #[error("invalid value {value:?} in column {column}")]
    InvalidValue { column: &'static str, value: String },
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("invalid staleness policy {0:?} (expected all, date_N, scrape_M, codes:A,B, null or around_N)")]
    InvalidPolicy(String),

    #[error("invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Everything that can stop a single meet from being crawled this pass.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

/// A stored or configured string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised {kind}: {value:?}")]
pub struct ParseValueError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseValueError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Result type alias for probe operations.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Result type alias for markup extraction.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
