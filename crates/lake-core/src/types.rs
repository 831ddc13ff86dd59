use std::fmt;

use tokio::time::Instant;

/// Which endpoint produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSource {
    /// `/api/v1/query` structured response.
    Query,
    /// `/metrics` text exposition.
    Exposition,
}

impl fmt::Display for SampleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleSource::Query => f.write_str("query"),
            SampleSource::Exposition => f.write_str("exposition"),
        }
    }
}

/// A single block-height reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSample {
    pub height: u64,
    pub fetched_at: Instant,
    pub source: SampleSource,
}

impl MetricSample {
    pub fn new(height: u64, source: SampleSource) -> Self {
        Self {
            height,
            fetched_at: Instant::now(),
            source,
        }
    }

    /// Build a sample from a raw metric value.
    ///
    /// Metric values travel as floats; the fractional part is truncated.
    /// Negative and non-finite values are rejected.
    pub fn from_value(value: f64, source: SampleSource) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some(Self::new(value.trunc() as u64, source))
    }
}
