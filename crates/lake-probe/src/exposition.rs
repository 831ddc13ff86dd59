//! Prometheus text exposition format.
//!
//! Scans a `/metrics` body for a single sample line of the form
//! `metric_name[{labels}] value [timestamp]`.

use crate::error::{FetchError, FetchResult};

/// Find the value of the first sample line for `metric`.
///
/// Comment lines (`# HELP`, `# TYPE`) are skipped. A line matches when it
/// starts with `metric`, so `foo` also matches `foo_total`. A matching line
/// whose value does not parse, or is negative or non-finite, is skipped and
/// the scan continues.
pub fn find_value(body: &str, metric: &str) -> FetchResult<f64> {
    for line in body.lines() {
        let line = line.trim_start();
        if line.starts_with('#') {
            continue;
        }
        if !line.starts_with(metric) {
            continue;
        }

        let Some(raw) = line.split_whitespace().nth(1) else {
            continue;
        };
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => return Ok(value),
            _ => {}
        }
    }

    Err(FetchError::MetricNotFound(metric.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const METRIC: &str = "near_indexer_streaming_current_block_height";

    #[test]
    fn finds_plain_sample() {
        let body = "near_indexer_streaming_current_block_height 42.0\n";
        assert_eq!(find_value(body, METRIC).unwrap(), 42.0);
    }

    #[test]
    fn skips_comments_and_unrelated_lines() {
        let body = "\
# HELP near_indexer_streaming_current_block_height Current streamed block.
# TYPE near_indexer_streaming_current_block_height gauge
process_cpu_seconds_total 12.5
near_indexer_streaming_current_block_height 137590421
near_indexer_streaming_current_block_height 1
";
        assert_eq!(find_value(body, METRIC).unwrap(), 137_590_421.0);
    }

    #[test]
    fn accepts_labels_and_timestamp() {
        let body = "near_indexer_streaming_current_block_height{shard=\"0\"} 9.5e3 1718000000000\n";
        assert_eq!(find_value(body, METRIC).unwrap(), 9_500.0);
    }

    #[test]
    fn longer_metric_name_matches_by_prefix() {
        let body = "near_indexer_streaming_current_block_height_seconds 7\n";
        assert_eq!(find_value(body, METRIC).unwrap(), 7.0);
    }

    #[test]
    fn non_finite_and_negative_values_move_on() {
        let body = "\
near_indexer_streaming_current_block_height NaN
near_indexer_streaming_current_block_height -3
near_indexer_streaming_current_block_height +Inf
near_indexer_streaming_current_block_height 5
";
        assert_eq!(find_value(body, METRIC).unwrap(), 5.0);
    }

    #[test]
    fn only_invalid_values_is_not_found() {
        let body = "near_indexer_streaming_current_block_height NaN\n";
        assert!(matches!(
            find_value(body, METRIC),
            Err(FetchError::MetricNotFound(_))
        ));
    }

    #[test]
    fn unparsable_value_moves_on() {
        let body = "\
near_indexer_streaming_current_block_height garbage
near_indexer_streaming_current_block_height 55
";
        assert_eq!(find_value(body, METRIC).unwrap(), 55.0);
    }

    #[test]
    fn name_without_value_is_skipped() {
        let body = "near_indexer_streaming_current_block_height \n";
        assert!(find_value(body, METRIC).is_err());
    }

    #[test]
    fn handles_crlf_line_endings() {
        let body = "other 1\r\nnear_indexer_streaming_current_block_height 77\r\n";
        assert_eq!(find_value(body, METRIC).unwrap(), 77.0);
    }

    #[test]
    fn missing_metric_names_it() {
        let err = find_value("", METRIC).unwrap_err();
        assert_eq!(
            err.to_string(),
            "metric near_indexer_streaming_current_block_height not found in response"
        );
    }
}
