mod audio;
mod config;
mod metrics;
mod report;
mod runner;

pub use config::BenchmarkConfig;
pub use metrics::{RequestFailure, RequestMetrics};
pub use report::{aggregate, percentile, BenchmarkResults, FailureRecord, MetricSummary};
pub use runner::{run_benchmark, ArrivalProcess};
