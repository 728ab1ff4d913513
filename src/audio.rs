use std::io::Cursor;

// Fallback constants when the payload is not a parseable WAV container:
// a canonical 44-byte header followed by 16 kHz 16-bit mono samples.
const FALLBACK_HEADER_BYTES: usize = 44;
const FALLBACK_SAMPLE_RATE: u64 = 16_000;
const FALLBACK_BYTES_PER_SAMPLE: u64 = 2;

/// Playback duration in seconds of a complete audio payload.
///
/// Parses the payload as RIFF/WAV and returns `frames / sample_rate`. When
/// parsing fails the duration is estimated from the byte length instead, so
/// this always produces a value.
pub fn duration_seconds(payload: &[u8]) -> f64 {
    wav_duration(payload).unwrap_or_else(|| estimated_duration(payload))
}

fn wav_duration(payload: &[u8]) -> Option<f64> {
    let reader = hound::WavReader::new(Cursor::new(payload)).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    // `duration()` is the frame count: samples divided by channel count.
    Some(f64::from(reader.duration()) / f64::from(spec.sample_rate))
}

fn estimated_duration(payload: &[u8]) -> f64 {
    let sample_bytes = payload.len().saturating_sub(FALLBACK_HEADER_BYTES);
    sample_bytes as f64 / (FALLBACK_SAMPLE_RATE * FALLBACK_BYTES_PER_SAMPLE) as f64
}
