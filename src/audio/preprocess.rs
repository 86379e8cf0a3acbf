//! Audio preprocessing through the external media tool
//!
//! Every stage degrades gracefully: a failed enhancement keeps the
//! previous stage's file, and only the initial filesystem access can
//! fail the whole step. Intermediate files live in the caller's
//! workspace directory and are removed as soon as they are superseded.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::diagnostics::{parse_silence_spans, parse_volume_detect};
use super::ffmpeg::run_ffmpeg;
use super::probe::{inspect, probe_stream, AudioFileInfo};
use crate::config::PreprocessConfig;
use crate::error::{MediaError, Result};
use crate::hardware::RunParameters;

/// Result of preprocessing one source file
#[derive(Debug)]
pub struct PreprocessOutcome {
    /// The file the segment loop should cut from. May be the unmodified
    /// source when every enhancement stage failed.
    pub working_path: PathBuf,
    /// Properties of the working file, measured after preprocessing
    pub info: AudioFileInfo,
    /// Mean volume measured on the source (or the configured default)
    pub measured_volume_db: f64,
}

pub struct Preprocessor<'a> {
    config: &'a PreprocessConfig,
    params: &'a RunParameters,
}

impl<'a> Preprocessor<'a> {
    pub fn new(config: &'a PreprocessConfig, params: &'a RunParameters) -> Self {
        Self { config, params }
    }

    /// Convert, de-silence, and enhance `source`, writing intermediates
    /// under `workspace`.
    pub fn preprocess(&self, source: &Path, workspace: &Path) -> Result<PreprocessOutcome> {
        let measured_volume_db = self.measure_volume(source);
        let boost_db = (self.config.target_volume_db - measured_volume_db)
            .clamp(0.0, self.params.volume_boost_db);

        match probe_stream(source) {
            Ok(stream) => info!(
                "Source audio: {} {} Hz {} ch, {:.1}s, mean volume {:.1} dB (boost {:.1} dB)",
                stream.codec,
                stream.sample_rate,
                stream.channels,
                stream.duration_sec,
                measured_volume_db,
                boost_db
            ),
            Err(e) => warn!("Stream probe failed: {}", e),
        }

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        // Stage: canonical WAV conversion
        let mut working = match self.convert(source, &workspace.join(format!("{stem}_tmp.wav"))) {
            Ok(path) => path,
            Err(e) => {
                warn!("WAV conversion failed ({}), using the source as-is", e);
                source.to_path_buf()
            }
        };

        // Stage: silence excision
        if self.config.enable_silence_removal {
            let no_silence = workspace.join(format!("{stem}_no_silence.wav"));
            if let Some(path) = self.remove_silence(&working, &no_silence) {
                remove_superseded(&working, source);
                working = path;
            }
        }

        // Stage: gain and band filtering
        let optimized = workspace.join(format!("{stem}_optimized.wav"));
        match self.enhance(&working, &optimized, boost_db) {
            Ok(path) => {
                remove_superseded(&working, source);
                working = path;
            }
            Err(e) => warn!("Audio enhancement failed ({}), keeping previous stage", e),
        }

        let info = inspect(&working, self.params.segment_duration_sec)?;
        info!(
            "Preprocessed audio: {:.1} MB, {:.1} min, ~{} segments",
            info.size_mb, info.duration_min, info.estimated_segments
        );

        Ok(PreprocessOutcome {
            working_path: working,
            info,
            measured_volume_db,
        })
    }

    /// Mean volume of the file, or the configured default when the
    /// analysis pass fails in any way.
    fn measure_volume(&self, source: &Path) -> f64 {
        let output = run_ffmpeg([
            "-i",
            source.to_string_lossy().as_ref(),
            "-af",
            "volumedetect",
            "-f",
            "null",
            "-",
        ]);

        match output {
            Ok(out) => {
                let stats = parse_volume_detect(&String::from_utf8_lossy(&out.stderr));
                match stats.mean_db {
                    Some(mean) => mean,
                    None => {
                        warn!("No volume statistics in analysis output, assuming default");
                        self.config.default_volume_db
                    }
                }
            }
            Err(e) => {
                warn!("Volume analysis failed ({}), assuming default", e);
                self.config.default_volume_db
            }
        }
    }

    fn convert(&self, source: &Path, dest: &Path) -> std::result::Result<PathBuf, MediaError> {
        let output = run_ffmpeg([
            "-i",
            source.to_string_lossy().as_ref(),
            "-y",
            dest.to_string_lossy().as_ref(),
        ])?;

        if output.status.success() {
            Ok(dest.to_path_buf())
        } else {
            Err(MediaError::Conversion(trim_stderr(&output.stderr)))
        }
    }

    /// Detect and excise silence spans. Returns the de-silenced file, or
    /// `None` when nothing was detected or any step failed.
    fn remove_silence(&self, source: &Path, dest: &Path) -> Option<PathBuf> {
        let detect_filter = format!(
            "silencedetect=noise={}dB:duration={}",
            self.config.silence_threshold_db, self.config.min_silence_duration
        );

        let spans = match run_ffmpeg([
            "-i",
            source.to_string_lossy().as_ref(),
            "-af",
            &detect_filter,
            "-f",
            "null",
            "-",
        ]) {
            Ok(out) => parse_silence_spans(&String::from_utf8_lossy(&out.stderr)),
            Err(e) => {
                warn!("Silence detection failed: {}", e);
                return None;
            }
        };

        if spans.is_empty() {
            info!("No silence spans detected");
            return None;
        }
        info!("Detected {} silence spans", spans.len());

        // Trim leading and trailing silence in one pass by removing from
        // the front, reversing, removing from the front again, and
        // reversing back.
        let remove_filter = format!(
            "silenceremove=start_periods=1:start_duration=1:start_threshold={th}dB:detection=peak,\
             aformat=dblp,areverse,\
             silenceremove=start_periods=1:start_duration=1:start_threshold={th}dB:detection=peak,\
             aformat=dblp,areverse",
            th = self.config.silence_threshold_db
        );

        match run_ffmpeg([
            "-i",
            source.to_string_lossy().as_ref(),
            "-af",
            &remove_filter,
            "-y",
            dest.to_string_lossy().as_ref(),
        ]) {
            Ok(out) if out.status.success() => Some(dest.to_path_buf()),
            Ok(out) => {
                warn!("Silence removal failed: {}", trim_stderr(&out.stderr));
                None
            }
            Err(e) => {
                warn!("Silence removal failed: {}", e);
                None
            }
        }
    }

    fn enhance(
        &self,
        source: &Path,
        dest: &Path,
        boost_db: f64,
    ) -> std::result::Result<PathBuf, MediaError> {
        let filter_chain = format!(
            "volume={:.1}dB,highpass=f={},lowpass=f={},afftdn=nf={}",
            boost_db, self.config.high_pass_hz, self.config.low_pass_hz, self.config.noise_floor_db
        );

        let output = run_ffmpeg([
            "-i",
            source.to_string_lossy().as_ref(),
            "-af",
            &filter_chain,
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
            Ok(dest.to_path_buf())
        } else {
            Err(MediaError::Conversion(trim_stderr(&output.stderr)))
        }
    }
}

/// Delete an intermediate once a later stage replaced it. The original
/// source file is never touched.
fn remove_superseded(path: &Path, source: &Path) {
    if path != source {
        let _ = std::fs::remove_file(path);
    }
}

fn trim_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    text.lines().last().unwrap_or("").to_string()
}
