//! Whisper-based transcription backend

use std::path::Path;
use std::sync::Arc;

use hound::SampleFormat;
use tracing::{debug, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{TranscriptResult, TranscriptSegment};
use crate::config::SttConfig;
use crate::error::SttError;

/// Sample rate the model expects; extracted segments are produced at
/// this rate by the media tool.
const MODEL_SAMPLE_RATE: u32 = 16_000;

/// File-based Whisper engine
pub struct WhisperEngine {
    ctx: Arc<WhisperContext>,
    name: String,
    language: String,
    threads: u32,
    translate: bool,
}

impl WhisperEngine {
    /// Load a ggml model file.
    pub fn load(model_path: &Path, config: &SttConfig) -> Result<Self, SttError> {
        if !model_path.exists() {
            return Err(SttError::ModelNotFound(model_path.display().to_string()));
        }

        info!("Loading model from: {}", model_path.display());

        let ctx_params = WhisperContextParameters::default();
        let ctx =
            WhisperContext::new_with_params(&model_path.to_string_lossy(), ctx_params)
                .map_err(|e| SttError::ModelLoad(e.to_string()))?;

        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "whisper".to_string());

        info!("Model {} loaded", name);

        Ok(Self {
            ctx: Arc::new(ctx),
            name,
            language: config.language.clone(),
            threads: config.threads,
            translate: config.translate,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transcribe a WAV file into text plus timed spans.
    pub fn transcribe_file(&self, path: &Path) -> Result<TranscriptResult, SttError> {
        let samples = read_wav_mono(path)?;
        if samples.is_empty() {
            return Err(SttError::InvalidAudioData);
        }

        debug!(
            "Transcribing {} samples ({:.2}s) with {}",
            samples.len(),
            samples.len() as f64 / MODEL_SAMPLE_RATE as f64,
            self.name
        );

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(self.threads as i32);
        params.set_language(Some(&self.language));
        params.set_translate(self.translate);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_single_segment(false);
        params.set_no_context(true);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::Whisper(e.to_string()))?;

        state
            .full(params, &samples)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut segments = Vec::with_capacity(num_segments as usize);
        let mut full_text = String::new();

        for i in 0..num_segments {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(e.to_string()))?;

            // Model ticks are 10 ms units
            let start = state
                .full_get_segment_t0(i)
                .map_err(|e| SttError::Transcription(e.to_string()))? as f64
                * 0.01;
            let end = state
                .full_get_segment_t1(i)
                .map_err(|e| SttError::Transcription(e.to_string()))? as f64
                * 0.01;

            let text = text.trim();
            if !full_text.is_empty() && !text.is_empty() {
                full_text.push(' ');
            }
            full_text.push_str(text);

            segments.push(TranscriptSegment {
                text: text.to_string(),
                start_sec: Some(start),
                end_sec: Some(end),
            });
        }

        debug!(
            "Transcription complete: {} spans, {} chars",
            segments.len(),
            full_text.len()
        );

        Ok(TranscriptResult {
            text: full_text.trim().to_string(),
            segments,
        })
    }
}

/// Read a WAV file as mono f32 samples, averaging channels if needed.
fn read_wav_mono(path: &Path) -> Result<Vec<f32>, SttError> {
    let mut reader = hound::WavReader::open(path).map_err(|e| SttError::AudioRead {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;

    let spec = reader.spec();
    if spec.sample_rate != MODEL_SAMPLE_RATE {
        warn!(
            "Expected {} Hz input, got {} Hz in {}",
            MODEL_SAMPLE_RATE,
            spec.sample_rate,
            path.display()
        );
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().filter_map(|s| s.ok()).collect(),
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .filter_map(|s| s.ok())
                .map(|s| s as f32 / max_val)
                .collect()
        }
    };

    if spec.channels > 1 {
        Ok(samples
            .chunks(spec.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / spec.channels as f32)
            .collect())
    } else {
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SttConfig;

    #[test]
    fn test_missing_model_is_an_error() {
        let config = SttConfig::default();
        let result = WhisperEngine::load(Path::new("/nonexistent/model.bin"), &config);
        assert!(matches!(result, Err(SttError::ModelNotFound(_))));
    }

    #[test]
    fn test_read_wav_mono_downmixes_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: MODEL_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(8192i16).unwrap();
            writer.write_sample(-8192i16).unwrap();
        }
        writer.finalize().unwrap();

        let samples = read_wav_mono(&path).unwrap();
        assert_eq!(samples.len(), 100);
        // Opposite-phase channels cancel to silence
        assert!(samples.iter().all(|s| s.abs() < 1e-6));
    }
}
