//! Custom error types for the transcription pipeline

use thiserror::Error;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Media tool error: {0}")]
    Media(#[from] MediaError),

    #[error("STT engine error: {0}")]
    Stt(#[from] SttError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors at the external media tool boundary
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("External tool not found: {0}")]
    ToolMissing(&'static str),

    #[error("Failed to spawn {tool}: {detail}")]
    Spawn { tool: &'static str, detail: String },

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Segment extraction failed: {0}")]
    Extraction(String),
}

/// STT engine errors
#[derive(Error, Debug)]
pub enum SttError {
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("No usable transcription backend (all model paths failed to load)")]
    NoBackend,

    #[error("Failed to read audio file {path}: {detail}")]
    AudioRead { path: String, detail: String },

    #[error("Invalid audio data for transcription")]
    InvalidAudioData,

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Whisper error: {0}")]
    Whisper(String),
}

/// Checkpoint store errors
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Failed to create result file {path}: {detail}")]
    Create { path: String, detail: String },

    #[error("Failed to append to result file: {0}")]
    Append(String),

    #[error("Failed to write sidecar {path}: {detail}")]
    Sidecar { path: String, detail: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
