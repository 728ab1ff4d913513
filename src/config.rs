use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Url;

/// Run configuration for one benchmark invocation.
///
/// Validation happens in [`BenchmarkConfig::try_new`]; a config that exists
/// is a config the scheduler can run.
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    /// Full URL of the generation endpoint, e.g. `http://localhost:8000/generate`.
    pub endpoint: Url,
    /// Target arrival rate in requests per second. Strictly positive.
    pub rate: f64,
    /// Wall-clock window during which new requests are dispatched.
    pub duration: Duration,
    /// Text payload sent with every request.
    pub text: String,
    /// Total per-request timeout, connection through last chunk.
    pub request_timeout: Duration,
    /// Seed for the arrival process RNG; fixed default for reproducible runs.
    pub seed: u64,
    /// Cap on idle pooled connections per target host.
    pub pool_max_idle_per_host: usize,
}

const DEFAULT_TEXT: &str = "Hello world, this is a test message for benchmarking.";

impl BenchmarkConfig {
    pub fn try_new(host: impl AsRef<str>, port: u16, rate: f64, duration_secs: f64) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(anyhow!("rate must be a positive number of requests per second"));
        }
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(anyhow!("duration must be a positive number of seconds"));
        }

        let raw = format!("http://{}:{}/generate", host.as_ref(), port);
        let endpoint =
            Url::parse(&raw).with_context(|| format!("invalid endpoint URL: {}", raw))?;

        Ok(Self {
            endpoint,
            rate,
            duration: Duration::from_secs_f64(duration_secs),
            text: DEFAULT_TEXT.to_string(),
            request_timeout: Duration::from_secs(30),
            seed: 42,
            pool_max_idle_per_host: 50,
        })
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.text = text;
        }
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        if !request_timeout.is_zero() {
            self.request_timeout = request_timeout;
        }
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
