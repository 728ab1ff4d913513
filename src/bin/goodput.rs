use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use goodput_bench::{aggregate, run_benchmark, BenchmarkConfig, BenchmarkResults, MetricSummary};

#[derive(Parser, Debug)]
#[command(
    name = "goodput",
    about = "Open-loop goodput benchmark for a streaming TTS server"
)]
struct Args {
    /// Server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Request rate (req/s)
    #[arg(long, default_value_t = 1.0)]
    rate: f64,

    /// Test duration in seconds
    #[arg(long, default_value_t = 10.0)]
    duration: f64,

    /// Text payload to synthesize on every request
    #[arg(long)]
    text: Option<String>,

    /// Total per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,

    /// Seed for the arrival process, for reproducible schedules
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Emit the results as JSON instead of the human-readable report
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = BenchmarkConfig::try_new(&args.host, args.port, args.rate, args.duration)?
        .with_request_timeout(Duration::from_secs(args.request_timeout_secs))
        .with_seed(args.seed);
    if let Some(text) = args.text {
        config = config.with_text(text);
    }

    println!("Starting benchmark: {} req/s for {}s", args.rate, args.duration);
    println!("Target server: {}", config.endpoint);
    println!("{}", "=".repeat(60));

    // Ctrl-c stops dispatching; in-flight requests still finish (bounded by
    // the request timeout) and are reported.
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nInterrupted; reporting over completed requests...");
            flag.store(false, Ordering::SeqCst);
        }
    });

    let records = run_benchmark(config, running).await?;
    let results = aggregate(&records);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results);
    }

    Ok(())
}

fn print_results(results: &BenchmarkResults) {
    println!();
    println!("{}", "=".repeat(60));
    println!("BENCHMARK RESULTS");
    println!("{}", "=".repeat(60));

    println!("Total Requests:      {}", results.total_requests);
    println!("Successful:          {}", results.successful_requests);
    println!("Failed:              {}", results.failed_requests);
    println!("Success Rate:        {:.1}%", results.success_rate());
    println!();

    if !results.failures.is_empty() {
        println!("FAILURES");
        println!("{}", "-".repeat(30));
        for failure in &results.failures {
            println!("  req_{:06}: {}", failure.id, failure.error);
        }
        println!();
    }

    if results.successful_requests == 0 {
        println!("No successful requests to analyze.");
        return;
    }

    print_summary("TIME TO FIRST AUDIO (TTFA)", &results.ttfa, "s");
    print_summary("REAL-TIME FACTOR (RTF)", &results.rtf, "");
    print_summary("TOTAL LATENCY", &results.latency, "s");

    println!("PERFORMANCE INSIGHTS");
    println!("{}", "-".repeat(30));
    let mean_rtf = results.rtf.mean;
    if mean_rtf > 1.0 {
        println!("System is {:.1}x FASTER than real-time", mean_rtf);
    } else if mean_rtf > 0.0 {
        println!("System is {:.1}x SLOWER than real-time", 1.0 / mean_rtf);
    } else {
        println!("No real-time factor samples collected");
    }

    if results.ttfa.p95 < 0.5 {
        println!("Excellent TTFA latency (P95 < 0.5s)");
    } else if results.ttfa.p95 < 1.0 {
        println!("Good TTFA latency (P95 < 1.0s)");
    } else {
        println!("High TTFA latency (P95 > 1.0s)");
    }
}

fn print_summary(title: &str, summary: &MetricSummary, unit: &str) {
    println!("{}", title);
    println!("{}", "-".repeat(30));
    println!("Mean:     {:.3}{}", summary.mean, unit);
    println!("P50:      {:.3}{}", summary.p50, unit);
    println!("P90:      {:.3}{}", summary.p90, unit);
    println!("P95:      {:.3}{}", summary.p95, unit);
    println!("P99:      {:.3}{}", summary.p99, unit);
    println!("Min:      {:.3}{}", summary.min, unit);
    println!("Max:      {:.3}{}", summary.max, unit);
    println!();
}
