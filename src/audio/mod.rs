//! Audio handling at the external media tool boundary

pub mod diagnostics;
pub mod extract;
pub mod ffmpeg;
pub mod preprocess;
pub mod probe;

pub use extract::{FfmpegExtractor, SegmentExtractor};
pub use preprocess::{PreprocessOutcome, Preprocessor};
pub use probe::AudioFileInfo;
