//! Block-height fetcher.

use std::future::Future;
use std::time::Duration;

use http::Uri;
use tracing::debug;

use lake_core::{MetricSample, SampleSource, SupervisorConfig};

use crate::client;
use crate::error::{FetchError, FetchResult};
use crate::exposition;
use crate::query::QueryResponse;

/// Anything that can produce a block-height sample.
///
/// The stall monitor is generic over this so tests can script heights.
pub trait MetricSource {
    fn fetch(&self) -> impl Future<Output = FetchResult<MetricSample>> + Send;
}

/// Fetches the height from an indexer's metrics server.
#[derive(Debug, Clone)]
pub struct MetricFetcher {
    metric_name: String,
    query_uri: Uri,
    metrics_uri: Uri,
    timeout: Duration,
}

impl MetricFetcher {
    /// Create a fetcher for `base_url` (e.g. `http://indexer:3030`).
    ///
    /// A path on the base URL is kept as a prefix for both endpoints.
    pub fn new(base_url: &str, metric_name: &str, timeout: Duration) -> FetchResult<Self> {
        let invalid = |reason: String| FetchError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };

        let base: Uri = base_url
            .trim()
            .parse()
            .map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))?;
        match base.scheme_str() {
            Some("http") => {}
            Some(other) => return Err(FetchError::UnsupportedScheme(other.to_string())),
            None => return Err(invalid("missing scheme".to_string())),
        }
        let authority = base
            .authority()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let prefix = base.path().trim_end_matches('/');

        let build = |path_and_query: String| -> FetchResult<Uri> {
            format!("http://{authority}{prefix}{path_and_query}")
                .parse()
                .map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))
        };

        Ok(Self {
            metric_name: metric_name.to_string(),
            query_uri: build(format!(
                "/api/v1/query?query={}",
                encode_query_value(metric_name)
            ))?,
            metrics_uri: build("/metrics".to_string())?,
            timeout,
        })
    }

    pub fn from_config(config: &SupervisorConfig) -> FetchResult<Self> {
        Self::new(&config.indexer_url, &config.metric_name, config.fetch_timeout)
    }

    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    pub fn query_uri(&self) -> &Uri {
        &self.query_uri
    }

    pub fn metrics_uri(&self) -> &Uri {
        &self.metrics_uri
    }

    /// Structured path: Prometheus query API.
    pub async fn fetch_query(&self) -> FetchResult<MetricSample> {
        let resp = client::get(&self.query_uri, self.timeout).await?;
        if !resp.status.is_success() {
            return Err(FetchError::Status {
                url: self.query_uri.to_string(),
                status: resp.status.as_u16(),
            });
        }

        let value = QueryResponse::from_slice(&resp.body)?.first_value()?;
        MetricSample::from_value(value, SampleSource::Query)
            .ok_or_else(|| FetchError::InvalidValue(value.to_string()))
    }

    /// Text path: `/metrics` exposition.
    pub async fn fetch_exposition(&self) -> FetchResult<MetricSample> {
        let resp = client::get(&self.metrics_uri, self.timeout).await?;
        if !resp.status.is_success() {
            return Err(FetchError::Status {
                url: self.metrics_uri.to_string(),
                status: resp.status.as_u16(),
            });
        }

        let body = String::from_utf8_lossy(&resp.body);
        let value = exposition::find_value(&body, &self.metric_name)?;
        MetricSample::from_value(value, SampleSource::Exposition)
            .ok_or_else(|| FetchError::InvalidValue(value.to_string()))
    }
}

impl MetricSource for MetricFetcher {
    async fn fetch(&self) -> FetchResult<MetricSample> {
        match self.fetch_query().await {
            Ok(sample) => return Ok(sample),
            Err(e) => {
                debug!(error = %e, "structured query failed, falling back to text exposition");
            }
        }
        self.fetch_exposition().await
    }
}

/// Percent-encode a query-string value (RFC 3986 unreserved set kept).
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;

    use super::*;

    const METRIC: &str = "near_indexer_streaming_current_block_height";

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fetcher(base: &str) -> MetricFetcher {
        MetricFetcher::new(base, METRIC, Duration::from_secs(2)).unwrap()
    }

    fn query_body(value: &str) -> serde_json::Value {
        serde_json::json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [{"metric": {"__name__": METRIC}, "value": [1718000000.0, value]}]
            }
        })
    }

    #[test]
    fn builds_endpoint_uris() {
        let f = fetcher("http://indexer:3030");
        assert_eq!(
            f.query_uri().to_string(),
            "http://indexer:3030/api/v1/query?query=near_indexer_streaming_current_block_height"
        );
        assert_eq!(f.metrics_uri().to_string(), "http://indexer:3030/metrics");
    }

    #[test]
    fn keeps_base_path_prefix() {
        let f = fetcher("http://indexer:3030/prom/");
        assert_eq!(f.metrics_uri().to_string(), "http://indexer:3030/prom/metrics");
        assert!(f.query_uri().path().starts_with("/prom/api/v1/query"));
    }

    #[test]
    fn encodes_selector_in_query() {
        let f = MetricFetcher::new(
            "http://indexer:3030",
            "height{job=\"lake\"}",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            f.query_uri().query(),
            Some("query=height%7Bjob%3D%22lake%22%7D")
        );
    }

    #[test]
    fn rejects_https_and_missing_scheme() {
        assert!(matches!(
            MetricFetcher::new("https://indexer:3030", METRIC, Duration::from_secs(1)),
            Err(FetchError::UnsupportedScheme(s)) if s == "https"
        ));
        assert!(matches!(
            MetricFetcher::new("indexer:3030", METRIC, Duration::from_secs(1)),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn structured_query_is_preferred() {
        let router = Router::new()
            .route(
                "/api/v1/query",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    assert_eq!(params.get("query").map(String::as_str), Some(METRIC));
                    axum::Json(query_body("1234.9"))
                }),
            )
            .route("/metrics", get(|| async { format!("{METRIC} 1\n") }));
        let base = serve(router).await;

        let sample = fetcher(&base).fetch().await.unwrap();
        assert_eq!(sample.height, 1234);
        assert_eq!(sample.source, SampleSource::Query);
    }

    #[tokio::test]
    async fn falls_back_to_text_on_server_error() {
        let router = Router::new()
            .route(
                "/api/v1/query",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route(
                "/metrics",
                get(|| async { format!("# TYPE {METRIC} gauge\n{METRIC} 42.0\n") }),
            );
        let base = serve(router).await;

        let sample = fetcher(&base).fetch().await.unwrap();
        assert_eq!(sample.height, 42);
        assert_eq!(sample.source, SampleSource::Exposition);
    }

    #[tokio::test]
    async fn falls_back_when_query_route_is_missing() {
        let router = Router::new().route("/metrics", get(|| async { format!("{METRIC} 7\n") }));
        let base = serve(router).await;

        assert_eq!(fetcher(&base).fetch().await.unwrap().height, 7);
    }

    #[tokio::test]
    async fn falls_back_on_empty_result_and_bad_status() {
        let router = Router::new()
            .route(
                "/api/v1/query",
                get(|| async {
                    axum::Json(serde_json::json!({
                        "status": "success",
                        "data": {"resultType": "vector", "result": []}
                    }))
                }),
            )
            .route("/metrics", get(|| async { format!("{METRIC} 99\n") }));
        let base = serve(router).await;
        assert_eq!(fetcher(&base).fetch().await.unwrap().height, 99);

        let router = Router::new()
            .route(
                "/api/v1/query",
                get(|| async { axum::Json(serde_json::json!({"status": "error"})) }),
            )
            .route("/metrics", get(|| async { format!("{METRIC} 100\n") }));
        let base = serve(router).await;
        assert_eq!(fetcher(&base).fetch().await.unwrap().height, 100);
    }

    #[tokio::test]
    async fn falls_back_on_unparsable_query_value() {
        let router = Router::new()
            .route(
                "/api/v1/query",
                get(|| async { axum::Json(query_body("NaN-ish")) }),
            )
            .route("/metrics", get(|| async { format!("{METRIC} 5\n") }));
        let base = serve(router).await;

        assert_eq!(fetcher(&base).fetch().await.unwrap().height, 5);
    }

    #[tokio::test]
    async fn reports_text_error_when_both_fail() {
        let router = Router::new()
            .route(
                "/api/v1/query",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route("/metrics", get(|| async { "process_cpu_seconds_total 1\n" }));
        let base = serve(router).await;

        let err = fetcher(&base).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::MetricNotFound(_)));
    }

    #[tokio::test]
    async fn text_endpoint_status_is_an_error() {
        let router = Router::new().route(
            "/metrics",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "starting") }),
        );
        let base = serve(router).await;

        let err = fetcher(&base).fetch_exposition().await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn connection_refused_is_connect_error() {
        // Nothing listens on port 1.
        let err = fetcher("http://127.0.0.1:1").fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Connect { .. }));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let router = Router::new().route(
            "/metrics",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let base = serve(router).await;

        let f = MetricFetcher::new(&base, METRIC, Duration::from_millis(100)).unwrap();
        let err = f.fetch_exposition().await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
    }
}
