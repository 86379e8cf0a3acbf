//! Batch Audio Transcription Pipeline
//!
//! Segments long audio files, transcribes each slice through a
//! speech-recognition backend with fallback, filters degenerate output,
//! and persists results incrementally so an interrupted job can resume.
//!
//! # Architecture
//!
//! - `hardware`: memory/accelerator probing and derived run parameters
//! - `audio`: the external media tool boundary (probing, preprocessing,
//!   segment extraction, diagnostic-stream parsing)
//! - `stt`: speech-to-text backends behind one contract, with a
//!   degenerate-output fallback policy
//! - `filter`: heuristic rejection of filler/stutter transcriptions
//! - `checkpoint`: append-only result files plus structured resume
//!   sidecars
//! - `controller`: the per-segment orchestration loop
//! - `progress`: advisory background status reporting
//! - `config`: configuration structures
//! - `error`: error types

pub mod audio;
pub mod checkpoint;
pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod hardware;
pub mod progress;
pub mod stt;

// Re-exports for convenience
pub use audio::{AudioFileInfo, FfmpegExtractor, PreprocessOutcome, Preprocessor, SegmentExtractor};
pub use checkpoint::{CheckpointHeader, CheckpointStore, ResumeState};
pub use config::Config;
pub use controller::{plan_segments, Controller, FileOutcome, SegmentSpan};
pub use error::{CheckpointError, ConfigError, MediaError, PipelineError, Result, SttError};
pub use filter::ContentFilter;
pub use hardware::{Accelerator, HardwareProfile, Precision, RunParameters};
pub use progress::{ProgressCounters, ProgressReporter};
pub use stt::{FallbackTranscriber, Transcriber, TranscriptResult, TranscriptSegment, WhisperEngine};
