//! Bounded-range segment extraction

use std::path::Path;

use tracing::debug;

use super::ffmpeg::run_ffmpeg;
use crate::error::MediaError;

/// Cuts a bounded slice of audio to a file the speech model can consume.
///
/// The trait seam exists so the segmentation loop can be exercised
/// without the external tool.
pub trait SegmentExtractor {
    fn extract(
        &self,
        source: &Path,
        start_sec: f64,
        duration_sec: f64,
        dest: &Path,
    ) -> Result<(), MediaError>;
}

/// Extraction via the external media tool, emitting canonical
/// 16 kHz mono 16-bit PCM.
pub struct FfmpegExtractor;

impl SegmentExtractor for FfmpegExtractor {
    fn extract(
        &self,
        source: &Path,
        start_sec: f64,
        duration_sec: f64,
        dest: &Path,
    ) -> Result<(), MediaError> {
        debug!(
            "Extracting [{:.1}s +{:.1}s] from {} to {}",
            start_sec,
            duration_sec,
            source.display(),
            dest.display()
        );

        let output = run_ffmpeg([
            "-i",
            source.to_string_lossy().as_ref(),
            "-ss",
            &format!("{start_sec}"),
            "-t",
            &format!("{duration_sec}"),
            "-ar",
            "16000",
            "-ac",
            "1",
            "-acodec",
            "pcm_s16le",
            "-y",
            dest.to_string_lossy().as_ref(),
        ])?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(MediaError::Extraction(
                stderr.lines().last().unwrap_or("unknown failure").to_string(),
            ))
        }
    }
}
