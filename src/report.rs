use serde::Serialize;

use crate::metrics::RequestMetrics;

/// One failed request in the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub id: u64,
    pub error: String,
}

/// Mean/percentile/min/max breakdown for one metric family. All fields stay
/// at zero when the family collected no values, which is how "no successful
/// samples" is kept distinct from "all samples were fast": `count` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricSummary {
    pub count: usize,
    pub mean: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricSummary {
    fn from_values(mut values: Vec<f64>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        values.sort_by(|a, b| a.total_cmp(b));
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        Self {
            count,
            mean,
            p50: percentile(&values, 50.0),
            p90: percentile(&values, 90.0),
            p95: percentile(&values, 95.0),
            p99: percentile(&values, 99.0),
            min: values[0],
            max: values[count - 1],
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

/// Aggregated results over one run. TTFA and latency summaries are in
/// seconds; RTF is dimensionless.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BenchmarkResults {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub ttfa: MetricSummary,
    pub rtf: MetricSummary,
    pub latency: MetricSummary,
    pub failures: Vec<FailureRecord>,
}

impl BenchmarkResults {
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful_requests as f64 / self.total_requests as f64 * 100.0
    }
}

/// Compute summary statistics over a run's record set.
///
/// Pure over its input: the record set is an unordered multiset and calling
/// this twice on the same slice yields identical results. Tolerates a record
/// set smaller than the number of dispatched requests (interrupted runs).
pub fn aggregate(records: &[RequestMetrics]) -> BenchmarkResults {
    let total_requests = records.len();
    let successful: Vec<&RequestMetrics> = records.iter().filter(|r| r.success).collect();
    let failures = records
        .iter()
        .filter_map(|record| {
            record.error.as_ref().map(|error| FailureRecord {
                id: record.id,
                error: error.to_string(),
            })
        })
        .collect();

    let mut results = BenchmarkResults {
        total_requests,
        successful_requests: successful.len(),
        failed_requests: total_requests - successful.len(),
        failures,
        ..Default::default()
    };

    if successful.is_empty() {
        return results;
    }

    let ttfa: Vec<f64> = successful
        .iter()
        .filter_map(|r| r.ttfa())
        .map(|d| d.as_secs_f64())
        .collect();
    let rtf: Vec<f64> = successful.iter().filter_map(|r| r.rtf()).collect();
    let latency: Vec<f64> = successful
        .iter()
        .map(|r| r.total_latency().as_secs_f64())
        .collect();

    results.ttfa = MetricSummary::from_values(ttfa);
    results.rtf = MetricSummary::from_values(rtf);
    results.latency = MetricSummary::from_values(latency);
    results
}

/// Percentile by linear interpolation between closest ranks.
///
/// `sorted` must be ascending. For length `n` the rank is
/// `r = (p/100) * (n-1)`; the result interpolates between `sorted[floor(r)]`
/// and `sorted[ceil(r)]` with the upper index clamped to `n-1`.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::metrics::{RequestFailure, RequestMetrics};

    #[test]
    fn percentile_interpolates_between_closest_ranks() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 50.0), 3.0);
        // rank = 0.9 * 4 = 3.6, interpolated between 4 and 5.
        assert!((percentile(&sorted, 90.0) - 4.6).abs() < 1e-12);
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 100.0), 5.0);
    }

    #[test]
    fn percentile_of_single_value_is_that_value() {
        assert_eq!(percentile(&[7.5], 99.0), 7.5);
    }

    #[test]
    fn percentile_of_empty_slice_is_zero() {
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    fn record(id: u64, latency_ms: u64, ttfa_ms: Option<u64>, audio: Option<f64>) -> RequestMetrics {
        let start = Instant::now();
        RequestMetrics {
            id,
            start_time: start,
            first_byte_time: ttfa_ms.map(|ms| start + Duration::from_millis(ms)),
            end_time: start + Duration::from_millis(latency_ms),
            audio_duration: audio,
            success: audio.is_some(),
            error: if audio.is_some() {
                None
            } else {
                Some(RequestFailure::Timeout)
            },
        }
    }

    #[test]
    fn empty_record_set_aggregates_to_zeroes() {
        let results = aggregate(&[]);
        assert_eq!(results.total_requests, 0);
        assert_eq!(results.successful_requests, 0);
        assert_eq!(results, BenchmarkResults::default());
    }

    #[test]
    fn failures_count_toward_totals_but_not_statistics() {
        let records = vec![
            record(1, 100, Some(20), Some(1.0)),
            record(2, 100, None, None),
            record(3, 100, None, None),
        ];
        let results = aggregate(&records);
        assert_eq!(results.total_requests, 3);
        assert_eq!(results.successful_requests, 1);
        assert_eq!(results.failed_requests, 2);
        assert_eq!(results.latency.count, 1);
        assert_eq!(results.failures.len(), 2);
        assert_eq!(results.failures[0].error, "request timeout");
    }

    #[test]
    fn all_failed_yields_zero_metric_families() {
        let records = vec![record(1, 100, None, None), record(2, 200, None, None)];
        let results = aggregate(&records);
        assert_eq!(results.successful_requests, 0);
        assert!(!results.ttfa.has_data());
        assert!(!results.rtf.has_data());
        assert!(!results.latency.has_data());
    }

    #[test]
    fn summaries_cover_only_defined_values() {
        // Second record succeeded but never saw a first byte, so it is in
        // the latency family and absent from the TTFA family.
        let records = vec![
            record(1, 100, Some(40), Some(1.0)),
            record(2, 300, None, Some(3.0)),
        ];
        let results = aggregate(&records);
        assert_eq!(results.ttfa.count, 1);
        assert_eq!(results.latency.count, 2);
        assert!((results.latency.mean - 0.2).abs() < 1e-9);
        assert!((results.latency.min - 0.1).abs() < 1e-9);
        assert!((results.latency.max - 0.3).abs() < 1e-9);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let records = vec![
            record(1, 120, Some(15), Some(2.0)),
            record(2, 340, Some(80), Some(1.5)),
            record(3, 90, None, None),
        ];
        assert_eq!(aggregate(&records), aggregate(&records));
    }
}
