//! Backend contract and the degenerate-output fallback policy

use std::path::Path;

use tracing::{info, warn};

use super::engine::WhisperEngine;
use super::TranscriptResult;
use crate::config::SttConfig;
use crate::error::SttError;

/// The single contract every speech backend satisfies: audio file in,
/// text plus timed spans out.
pub trait Transcriber {
    fn name(&self) -> &str;
    fn transcribe(&self, audio: &Path) -> Result<TranscriptResult, SttError>;
}

impl Transcriber for WhisperEngine {
    fn name(&self) -> &str {
        self.name()
    }

    fn transcribe(&self, audio: &Path) -> Result<TranscriptResult, SttError> {
        self.transcribe_file(audio)
    }
}

/// Known degenerate signatures: near-empty text or a bare run of
/// exclamation marks. A quality signal, never an error.
pub fn is_degenerate(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.chars().count() <= 2 || trimmed.chars().all(|c| c == '!')
}

/// Primary backend plus an ordered list of fallbacks. The first backend
/// producing non-degenerate output wins; when all of them produce
/// degenerate output the last result is kept and the pipeline proceeds.
pub struct FallbackTranscriber<T: Transcriber = WhisperEngine> {
    backends: Vec<T>,
}

impl FallbackTranscriber<WhisperEngine> {
    /// Load the configured primary and fallback models. Paths that fail
    /// to load are logged and skipped; zero loadable backends is fatal.
    pub fn from_config(config: &SttConfig) -> Result<Self, SttError> {
        let mut backends = Vec::new();

        for path in std::iter::once(&config.primary_model).chain(config.fallback_models.iter()) {
            match WhisperEngine::load(path, config) {
                Ok(engine) => backends.push(engine),
                Err(e) => warn!("Skipping backend {}: {}", path.display(), e),
            }
        }

        if backends.is_empty() {
            return Err(SttError::NoBackend);
        }

        info!(
            "Transcription backends: {}",
            backends
                .iter()
                .map(|b| b.name())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(Self { backends })
    }
}

impl<T: Transcriber> FallbackTranscriber<T> {
    /// Assemble from ready backends; the first entry is the primary.
    pub fn new(backends: Vec<T>) -> Result<Self, SttError> {
        if backends.is_empty() {
            return Err(SttError::NoBackend);
        }
        Ok(Self { backends })
    }
}

impl<T: Transcriber> Transcriber for FallbackTranscriber<T> {
    fn name(&self) -> &str {
        self.backends[0].name()
    }

    fn transcribe(&self, audio: &Path) -> Result<TranscriptResult, SttError> {
        let mut last_result: Option<TranscriptResult> = None;
        let mut last_error: Option<SttError> = None;

        for (i, backend) in self.backends.iter().enumerate() {
            match backend.transcribe(audio) {
                Ok(result) => {
                    if !is_degenerate(&result.text) {
                        if i > 0 {
                            info!("Fallback backend {} recovered the segment", backend.name());
                        }
                        return Ok(result);
                    }
                    warn!(
                        "Backend {} returned degenerate output ({:?})",
                        backend.name(),
                        result.text
                    );
                    last_result = Some(result);
                }
                Err(e) => {
                    warn!("Backend {} failed: {}", backend.name(), e);
                    last_error = Some(e);
                }
            }
        }

        // Degenerate output beats a hard error: it still carries the
        // quality signal downstream.
        match (last_result, last_error) {
            (Some(result), _) => Ok(result),
            (None, Some(e)) => Err(e),
            (None, None) => Err(SttError::NoBackend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_degenerate_signatures() {
        assert!(is_degenerate(""));
        assert!(is_degenerate("  "));
        assert!(is_degenerate("!"));
        assert!(is_degenerate("ab"));
        assert!(is_degenerate("!!!!!!!!!"));
        assert!(!is_degenerate("abc"));
        assert!(!is_degenerate("今天天氣很好"));
    }

    struct FakeBackend {
        name: &'static str,
        text: &'static str,
        fail: bool,
        calls: Cell<u32>,
    }

    impl FakeBackend {
        fn ok(name: &'static str, text: &'static str) -> Self {
            Self {
                name,
                text,
                fail: false,
                calls: Cell::new(0),
            }
        }

        fn failing(name: &'static str) -> Self {
            Self {
                name,
                text: "",
                fail: true,
                calls: Cell::new(0),
            }
        }
    }

    impl Transcriber for FakeBackend {
        fn name(&self) -> &str {
            self.name
        }

        fn transcribe(&self, _audio: &Path) -> Result<TranscriptResult, SttError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(SttError::Transcription("boom".to_string()));
            }
            Ok(TranscriptResult {
                text: self.text.to_string(),
                segments: Vec::new(),
            })
        }
    }

    #[test]
    fn test_primary_wins_when_healthy() {
        let chain = FallbackTranscriber::new(vec![
            FakeBackend::ok("primary", "real transcription text"),
            FakeBackend::ok("backup", "should not run"),
        ])
        .unwrap();

        let result = chain.transcribe(Path::new("x.wav")).unwrap();
        assert_eq!(result.text, "real transcription text");
        assert_eq!(chain.backends[1].calls.get(), 0);
    }

    #[test]
    fn test_fallback_replaces_degenerate_output() {
        let chain = FallbackTranscriber::new(vec![
            FakeBackend::ok("primary", "!"),
            FakeBackend::ok("backup", "recovered content"),
        ])
        .unwrap();

        let result = chain.transcribe(Path::new("x.wav")).unwrap();
        assert_eq!(result.text, "recovered content");
    }

    #[test]
    fn test_all_degenerate_keeps_last_result() {
        let chain = FallbackTranscriber::new(vec![
            FakeBackend::ok("primary", "!"),
            FakeBackend::ok("backup", "!!"),
        ])
        .unwrap();

        let result = chain.transcribe(Path::new("x.wav")).unwrap();
        assert_eq!(result.text, "!!");
    }

    #[test]
    fn test_backend_error_skipped_in_favor_of_degenerate() {
        let chain = FallbackTranscriber::new(vec![
            FakeBackend::ok("primary", "!"),
            FakeBackend::failing("backup"),
        ])
        .unwrap();

        // The degenerate primary result survives the failing fallback
        let result = chain.transcribe(Path::new("x.wav")).unwrap();
        assert_eq!(result.text, "!");
    }

    #[test]
    fn test_all_errors_propagate() {
        let chain = FallbackTranscriber::new(vec![
            FakeBackend::failing("primary"),
            FakeBackend::failing("backup"),
        ])
        .unwrap();

        assert!(chain.transcribe(Path::new("x.wav")).is_err());
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert!(FallbackTranscriber::<FakeBackend>::new(Vec::new()).is_err());
    }
}
