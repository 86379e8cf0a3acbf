//! Configuration structures for the batch transcription pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub preprocess: PreprocessConfig,
    pub stt: SttConfig,
    pub checkpoint: CheckpointConfig,
    pub progress: ProgressConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self, crate::error::ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| crate::error::ConfigError::FileNotFound(path.display().to_string()))?;

        toml::from_str(&content).map_err(|e| crate::error::ConfigError::Parse(e.to_string()))
    }
}

/// Input discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Fixed base filename to look for (without extension)
    pub base_name: String,
    /// Recognized container/codec extensions
    pub extensions: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            base_name: "source".to_string(),
            extensions: vec![
                "aac".to_string(),
                "mp3".to_string(),
                "wav".to_string(),
                "m4a".to_string(),
                "flac".to_string(),
            ],
        }
    }
}

/// Audio preprocessing configuration (external media tool parameters)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Target mean volume after gain adjustment (dB)
    pub target_volume_db: f64,
    /// Assumed mean volume when probing fails (dB)
    pub default_volume_db: f64,
    /// Enable silence-span detection and excision
    pub enable_silence_removal: bool,
    /// Noise threshold for silence detection (dB)
    pub silence_threshold_db: f64,
    /// Minimum silence span duration (seconds)
    pub min_silence_duration: f64,
    /// High-pass cutoff in the enhancement chain (Hz)
    pub high_pass_hz: u32,
    /// Low-pass cutoff in the enhancement chain (Hz)
    pub low_pass_hz: u32,
    /// Noise floor for the denoise filter (dB)
    pub noise_floor_db: i32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_volume_db: -12.0,
            default_volume_db: -20.0,
            enable_silence_removal: true,
            silence_threshold_db: -30.0,
            min_silence_duration: 1.0,
            high_pass_hz: 100,
            low_pass_hz: 7000,
            noise_floor_db: -20,
        }
    }
}

/// STT backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Path to the primary model file
    pub primary_model: PathBuf,
    /// Ordered fallback model files, tried when the primary
    /// returns degenerate output
    pub fallback_models: Vec<PathBuf>,
    /// Language for transcription
    pub language: String,
    /// Number of threads for inference
    pub threads: u32,
    /// Enable translation to English
    pub translate: bool,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            primary_model: PathBuf::from("./models/ggml-medium.bin"),
            fallback_models: vec![PathBuf::from("./models/ggml-base.bin")],
            language: "zh".to_string(),
            threads: 4,
            translate: false,
        }
    }
}

/// Checkpoint store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Directory holding result files and sidecars
    pub output_dir: PathBuf,
    /// Tolerance when deciding a transcript covers the whole file (seconds)
    pub completeness_tolerance_sec: f64,
    /// Minimum length for a body line to count as transcript content
    pub min_content_line_chars: usize,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("transcripts"),
            completeness_tolerance_sec: 30.0,
            min_content_line_chars: 20,
        }
    }
}

/// Progress reporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Status line interval (seconds)
    pub report_interval_sec: u64,
    /// Disable the background reporter entirely
    pub disabled: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            report_interval_sec: 30,
            disabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.discovery.base_name, "source");
        assert_eq!(config.discovery.extensions.len(), 5);
        assert_eq!(config.preprocess.target_volume_db, -12.0);
        assert_eq!(config.checkpoint.completeness_tolerance_sec, 30.0);
        assert_eq!(config.progress.report_interval_sec, 30);
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
            [discovery]
            base_name = "meeting"

            [preprocess]
            enable_silence_removal = false
            silence_threshold_db = -40.0

            [stt]
            language = "en"
            threads = 8

            [checkpoint]
            output_dir = "results"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.discovery.base_name, "meeting");
        assert!(!config.preprocess.enable_silence_removal);
        assert_eq!(config.preprocess.silence_threshold_db, -40.0);
        assert_eq!(config.stt.language, "en");
        assert_eq!(config.stt.threads, 8);
        assert_eq!(config.checkpoint.output_dir, PathBuf::from("results"));
        // Untouched sections keep their defaults
        assert_eq!(config.preprocess.high_pass_hz, 100);
    }
}
