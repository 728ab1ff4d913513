use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};
use reqwest::Client;
use tokio::time::{sleep_until, Instant as TokioInstant};

use crate::audio;
use crate::config::BenchmarkConfig;
use crate::metrics::{RequestFailure, RequestMetrics};

const BODY_SNIPPET_CHARS: usize = 200;

/// Seeded source of Poisson inter-arrival gaps.
///
/// Gaps are drawn from an exponential distribution with mean `1/rate`, so
/// the dispatch timestamps they generate form a Poisson process. The RNG is
/// owned here rather than being process-global; two processes built with the
/// same rate and seed produce the same schedule.
pub struct ArrivalProcess {
    rng: StdRng,
    gaps: Exp<f64>,
}

impl ArrivalProcess {
    pub fn new(rate: f64, seed: u64) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(anyhow!(
                "arrival rate must be a positive number of requests per second"
            ));
        }
        let gaps = Exp::new(rate)
            .map_err(|err| anyhow!("invalid arrival rate {}: {:?}", rate, err))?;
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            gaps,
        })
    }

    pub fn next_gap(&mut self) -> Duration {
        Duration::from_secs_f64(self.gaps.sample(&mut self.rng))
    }
}

/// Run an open-loop benchmark: dispatch requests on the arrival process
/// schedule for the configured duration, then join everything in flight and
/// return the finalized record set (insertion order = join order).
///
/// Pacing is driven only by the schedule, never by completions; a slow
/// server accumulates in-flight requests instead of slowing dispatch. When
/// `running` is flipped to false the scheduler stops dispatching but still
/// joins the requests already in flight, so an interrupted run reports over
/// whatever finished.
pub async fn run_benchmark(
    config: BenchmarkConfig,
    running: Arc<AtomicBool>,
) -> Result<Vec<RequestMetrics>> {
    let client = Client::builder()
        .timeout(config.request_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .build()
        .context("failed to construct HTTP client")?;

    let mut arrivals = ArrivalProcess::new(config.rate, config.seed)?;
    let config = Arc::new(config);

    let run_start = TokioInstant::now();
    let deadline = run_start + config.duration;
    let mut next_dispatch = run_start;
    let mut handles = Vec::new();

    while next_dispatch < deadline {
        // Never dispatch early; when already past due this returns at once,
        // with no extra catch-up beyond the lag itself.
        sleep_until(next_dispatch).await;
        if !running.load(Ordering::Relaxed) {
            break;
        }

        let id = handles.len() as u64 + 1;
        let client = client.clone();
        let config = Arc::clone(&config);
        handles.push(tokio::spawn(execute_request(id, client, config)));

        next_dispatch += arrivals.next_gap();
    }

    println!("Scheduled {} requests. Waiting for completion...", handles.len());

    let mut records = Vec::with_capacity(handles.len());
    for handle in handles {
        // A panicked executor loses its record; aggregation tolerates a
        // result set smaller than the dispatch count.
        if let Ok(record) = handle.await {
            print_progress(&record);
            records.push(record);
        }
    }

    Ok(records)
}

/// Issue one request and capture its milestones. Never returns an error:
/// every outcome, including timeout and transport failure, finalizes into a
/// well-formed record with `end_time` stamped.
async fn execute_request(
    id: u64,
    client: Client,
    config: Arc<BenchmarkConfig>,
) -> RequestMetrics {
    let start_time = Instant::now();
    match stream_audio(&client, &config).await {
        Ok(stream) => {
            let end_time = Instant::now();
            let audio_duration = audio::duration_seconds(&stream.payload);
            RequestMetrics {
                id,
                start_time,
                first_byte_time: stream.first_byte_time,
                end_time,
                audio_duration: Some(audio_duration),
                success: true,
                error: None,
            }
        }
        Err(failure) => RequestMetrics {
            id,
            start_time,
            first_byte_time: None,
            end_time: Instant::now(),
            audio_duration: None,
            success: false,
            error: Some(failure),
        },
    }
}

struct StreamedResponse {
    first_byte_time: Option<Instant>,
    payload: Vec<u8>,
}

async fn stream_audio(
    client: &Client,
    config: &BenchmarkConfig,
) -> std::result::Result<StreamedResponse, RequestFailure> {
    let mut response = client
        .post(config.endpoint.clone())
        .form(&[("text", config.text.as_str()), ("streaming", "true")])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RequestFailure::Upstream {
            status: status.as_u16(),
            body: snippet(&body),
        });
    }

    let mut payload = Vec::new();
    let mut first_byte_time = None;
    loop {
        match response.chunk().await? {
            Some(chunk) => {
                // An empty chunk is an explicit end-of-stream signal.
                if chunk.is_empty() {
                    break;
                }
                if first_byte_time.is_none() {
                    first_byte_time = Some(Instant::now());
                }
                payload.extend_from_slice(&chunk);
            }
            None => break,
        }
    }

    Ok(StreamedResponse {
        first_byte_time,
        payload,
    })
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}

fn print_progress(record: &RequestMetrics) {
    let status = if record.success { "ok " } else { "ERR" };
    let ttfa = record
        .ttfa()
        .map(|d| format!("{:.3}s", d.as_secs_f64()))
        .unwrap_or_else(|| "n/a".to_string());
    let rtf = record
        .rtf()
        .map(|v| format!("{:.3}", v))
        .unwrap_or_else(|| "n/a".to_string());
    println!("{} {}: ttfa={} rtf={}", status, record.label(), ttfa, rtf);
}
