//! Prometheus query API response (`/api/v1/query`).
//!
//! Only `data.result[0].value[1]` is consumed. Every field is optional on
//! decode so that a partially-shaped response produces a precise error
//! instead of a generic decode failure.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{FetchError, FetchResult};

/// Top-level query response.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<QueryData>,
    /// Present when `status` is `"error"`.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryData {
    #[serde(rename = "resultType", default)]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<VectorSample>,
}

/// One series of an instant vector.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorSample {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    #[serde(default)]
    pub value: Option<SampleValue>,
}

/// `[unix_timestamp, "value"]`.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleValue(pub f64, pub String);

impl QueryResponse {
    pub fn from_slice(body: &[u8]) -> FetchResult<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// The first series' value, parsed as a float.
    pub fn first_value(&self) -> FetchResult<f64> {
        if self.status != "success" {
            return Err(FetchError::QueryStatus {
                status: self.status.clone(),
                detail: self.error.clone().unwrap_or_default(),
            });
        }

        let first = self
            .data
            .as_ref()
            .and_then(|d| d.result.first())
            .ok_or(FetchError::EmptyResult)?;
        let SampleValue(_, raw) = first.value.as_ref().ok_or(FetchError::MissingValue)?;

        raw.trim()
            .parse::<f64>()
            .map_err(|_| FetchError::InvalidValue(raw.clone()))
    }
}
