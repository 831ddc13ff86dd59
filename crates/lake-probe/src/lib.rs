//! lake-probe — reads the indexer's block height from its metrics server.
//!
//! # Fetch order
//!
//! ```text
//! MetricFetcher::fetch()
//!   ├── GET {base}/api/v1/query?query={metric}   (Prometheus query API)
//!   │     any failure → fall through
//!   └── GET {base}/metrics                        (text exposition)
//!         failure → FetchError
//! ```
//!
//! Every failure in the structured path is non-fatal; only the text path's
//! error is reported to the caller. Values are floats on the wire and are
//! truncated to an integer height.

mod client;
pub mod error;
pub mod exposition;
pub mod fetcher;
pub mod query;

pub use error::{FetchError, FetchResult};
pub use fetcher::{MetricFetcher, MetricSource};
