//! Fetch error types.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for metric fetches.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while fetching the block height.
///
/// None of these are fatal to the supervisor; they feed the stall clock.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid indexer URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme {0:?}, only http is supported")]
    UnsupportedScheme(String),

    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),

    #[error("http error from {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: hyper::Error,
    },

    #[error("request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode query response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("query status was {status:?}: {detail}")]
    QueryStatus { status: String, detail: String },

    #[error("query returned no results")]
    EmptyResult,

    #[error("query result carries no sample value")]
    MissingValue,

    #[error("invalid metric value {0:?}")]
    InvalidValue(String),

    #[error("metric {0} not found in response")]
    MetricNotFound(String),
}
