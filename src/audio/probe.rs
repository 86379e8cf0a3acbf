//! Format probing via the media tool's structured JSON output

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use super::ffmpeg::run_ffprobe;
use crate::error::MediaError;

/// Measured properties of a candidate audio file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFileInfo {
    pub size_mb: f64,
    pub duration_min: f64,
    pub estimated_segments: usize,
}

impl AudioFileInfo {
    pub fn duration_sec(&self) -> f64 {
        self.duration_min * 60.0
    }
}

/// Audio stream properties from the probe, for logging
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u32,
    pub duration_sec: f64,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

fn probe(path: &Path) -> Result<ProbeOutput, MediaError> {
    let output = run_ffprobe([
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
        path.to_string_lossy().as_ref(),
    ])?;

    if !output.status.success() {
        return Err(MediaError::Probe(format!(
            "ffprobe exited with {}",
            output.status
        )));
    }

    serde_json::from_slice(&output.stdout).map_err(|e| MediaError::Probe(e.to_string()))
}

/// Probe the duration of an audio file in seconds.
pub fn probe_duration_sec(path: &Path) -> Result<f64, MediaError> {
    let parsed = probe(path)?;
    parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| MediaError::Probe("no duration in probe output".to_string()))
}

/// Probe the first audio stream of a file.
pub fn probe_stream(path: &Path) -> Result<StreamInfo, MediaError> {
    let parsed = probe(path)?;

    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .ok_or_else(|| MediaError::Probe("no audio stream found".to_string()))?;

    Ok(StreamInfo {
        codec: stream.codec_name.clone().unwrap_or_default(),
        sample_rate: stream
            .sample_rate
            .as_ref()
            .and_then(|r| r.parse().ok())
            .unwrap_or(0),
        channels: stream.channels.unwrap_or(0),
        duration_sec,
    })
}

/// Measure size, duration, and the resulting segment estimate for a file.
///
/// Duration comes from the probe; when probing fails the file size in MB
/// stands in as a rough minutes estimate so the pipeline can continue.
pub fn inspect(path: &Path, segment_duration_sec: u32) -> Result<AudioFileInfo, MediaError> {
    let metadata = std::fs::metadata(path).map_err(|e| MediaError::Probe(e.to_string()))?;
    let size_mb = metadata.len() as f64 / 1024.0 / 1024.0;

    let duration_min = match probe_duration_sec(path) {
        Ok(secs) => secs / 60.0,
        Err(e) => {
            warn!(
                "Duration probe failed for {} ({}), estimating from file size",
                path.display(),
                e
            );
            size_mb
        }
    };

    let estimated_segments = estimate_segments(duration_min * 60.0, segment_duration_sec);

    debug!(
        "Inspected {}: {:.1} MB, {:.1} min, ~{} segments",
        path.display(),
        size_mb,
        duration_min,
        estimated_segments
    );

    Ok(AudioFileInfo {
        size_mb,
        duration_min,
        estimated_segments,
    })
}

fn estimate_segments(duration_sec: f64, segment_duration_sec: u32) -> usize {
    ((duration_sec / segment_duration_sec as f64).ceil() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_segments() {
        assert_eq!(estimate_segments(130.0, 60), 3);
        assert_eq!(estimate_segments(120.0, 60), 2);
        assert_eq!(estimate_segments(0.0, 60), 1);
        assert_eq!(estimate_segments(59.0, 60), 1);
    }

    #[test]
    fn test_probe_output_parsing() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "codec_name": "mjpeg"},
                {"codec_type": "audio", "codec_name": "aac",
                 "sample_rate": "44100", "channels": 2}
            ],
            "format": {"duration": "130.500000", "bit_rate": "128000"}
        }"#;

        let parsed: ProbeOutput = serde_json::from_str(json).unwrap();
        let duration: f64 = parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_ref())
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(duration, 130.5);

        let audio = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"))
            .unwrap();
        assert_eq!(audio.codec_name.as_deref(), Some("aac"));
        assert_eq!(audio.channels, Some(2));
    }

    #[test]
    fn test_probe_output_tolerates_missing_fields() {
        let parsed: ProbeOutput = serde_json::from_str("{}").unwrap();
        assert!(parsed.format.is_none());
        assert!(parsed.streams.is_empty());
    }
}
