use std::fmt;
use std::time::{Duration, Instant};

/// Why a single request failed. Captured into that request's record; never
/// propagated to sibling requests or the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    /// The bounded total-request timeout elapsed.
    Timeout,
    /// Connection or protocol failure below the HTTP layer.
    Transport(String),
    /// The server answered with a non-success status.
    Upstream { status: u16, body: String },
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestFailure::Timeout => write!(f, "request timeout"),
            RequestFailure::Transport(message) => write!(f, "transport error: {}", message),
            RequestFailure::Upstream { status, body } => write!(f, "HTTP {}: {}", status, body),
        }
    }
}

impl From<reqwest::Error> for RequestFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestFailure::Timeout
        } else {
            RequestFailure::Transport(err.to_string())
        }
    }
}

/// Latency milestones for one request.
///
/// Built fully finalized by the executor task that owned the request; the
/// aggregator only ever sees it by shared reference. Timestamps come from
/// `Instant`, which is monotonic, so the derived intervals cannot go
/// negative.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    /// Unique within a run, assigned in dispatch order.
    pub id: u64,
    /// Stamped at dispatch.
    pub start_time: Instant,
    /// First non-empty chunk of the response stream; `None` when the stream
    /// closed before delivering any audio.
    pub first_byte_time: Option<Instant>,
    /// Stamped when the stream closes or the request fails.
    pub end_time: Instant,
    /// Playback duration of the concatenated payload, seconds. Present
    /// exactly when `success` is true.
    pub audio_duration: Option<f64>,
    /// True only if the status was success and the stream drained cleanly.
    pub success: bool,
    /// Present exactly when `success` is false.
    pub error: Option<RequestFailure>,
}

impl RequestMetrics {
    /// Display name in the `req_000001` style.
    pub fn label(&self) -> String {
        format!("req_{:06}", self.id)
    }

    /// Time to first audio: dispatch to first non-empty chunk.
    pub fn ttfa(&self) -> Option<Duration> {
        self.first_byte_time
            .map(|first| first.duration_since(self.start_time))
    }

    pub fn total_latency(&self) -> Duration {
        self.end_time.duration_since(self.start_time)
    }

    /// Real-time factor: seconds of audio produced per second of wall-clock
    /// latency. Absent on failure or when elapsed time rounds to zero.
    pub fn rtf(&self) -> Option<f64> {
        let elapsed = self.total_latency().as_secs_f64();
        match self.audio_duration {
            Some(duration) if elapsed > 0.0 => Some(duration / elapsed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished_record(latency: Duration, audio_duration: Option<f64>) -> RequestMetrics {
        let start = Instant::now();
        RequestMetrics {
            id: 1,
            start_time: start,
            first_byte_time: Some(start + latency / 2),
            end_time: start + latency,
            audio_duration,
            success: audio_duration.is_some(),
            error: None,
        }
    }

    #[test]
    fn rtf_is_audio_seconds_over_elapsed_seconds() {
        let record = finished_record(Duration::from_secs(2), Some(4.0));
        assert_eq!(record.rtf(), Some(2.0));
    }

    #[test]
    fn rtf_absent_without_audio_duration() {
        let record = finished_record(Duration::from_secs(2), None);
        assert_eq!(record.rtf(), None);
    }

    #[test]
    fn rtf_absent_for_zero_elapsed_time() {
        let start = Instant::now();
        let record = RequestMetrics {
            id: 1,
            start_time: start,
            first_byte_time: None,
            end_time: start,
            audio_duration: Some(1.0),
            success: true,
            error: None,
        };
        assert_eq!(record.rtf(), None);
    }

    #[test]
    fn ttfa_measured_from_dispatch() {
        let record = finished_record(Duration::from_secs(2), Some(1.0));
        assert_eq!(record.ttfa(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn failure_display_includes_cause() {
        let failure = RequestFailure::Upstream {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(failure.to_string(), "HTTP 503: overloaded");
        assert_eq!(RequestFailure::Timeout.to_string(), "request timeout");
    }
}
