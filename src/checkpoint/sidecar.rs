//! Structured resume record stored beside each transcript
//!
//! The transcript itself stays human-readable and append-only; resume
//! decisions read this record instead of re-parsing prose. Transcripts
//! from older runs may not have one, in which case the store falls back
//! to header matching.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CheckpointError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarRecord {
    /// Fingerprint of the processed audio this transcript belongs to
    pub size_mb: f64,
    pub duration_min: f64,
    /// Segment attempts the loop has advanced past. Failed segments
    /// count too: they are skipped, never retried.
    pub segments_completed: usize,
    pub total_segments: usize,
    /// Global end timestamp of the last appended span
    pub last_end_sec: Option<f64>,
    /// Backend that produced the transcript
    pub model: String,
    pub updated_at: String,
}

impl SidecarRecord {
    /// Fingerprints match at one-decimal precision, same as the header
    /// lines in the transcript.
    pub fn matches_fingerprint(&self, size_mb: f64, duration_min: f64) -> bool {
        one_decimal(self.size_mb) == one_decimal(size_mb)
            && one_decimal(self.duration_min) == one_decimal(duration_min)
    }
}

fn one_decimal(value: f64) -> i64 {
    (value * 10.0).round() as i64
}

/// Sidecar path for a transcript: same name, `.json` extension.
pub fn sidecar_path(transcript: &Path) -> PathBuf {
    transcript.with_extension("json")
}

/// Read a sidecar record; any failure (missing file, bad JSON) is `None`.
pub fn load(path: &Path) -> Option<SidecarRecord> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(record) => Some(record),
        Err(e) => {
            debug!("Ignoring unreadable sidecar {}: {}", path.display(), e);
            None
        }
    }
}

/// Write a sidecar record, replacing the previous one.
pub fn store(path: &Path, record: &SidecarRecord) -> Result<(), CheckpointError> {
    let json = serde_json::to_string_pretty(record).map_err(|e| CheckpointError::Sidecar {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;

    std::fs::write(path, json).map_err(|e| CheckpointError::Sidecar {
        path: path.display().to_string(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SidecarRecord {
        SidecarRecord {
            size_mb: 12.34,
            duration_min: 5.67,
            segments_completed: 3,
            total_segments: 10,
            last_end_sec: Some(270.0),
            model: "ggml-medium".to_string(),
            updated_at: "2025-09-03 22:03:56".to_string(),
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = sidecar_path(&dir.path().join("result-source-20250903_220356.txt"));

        store(&path, &record()).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.segments_completed, 3);
        assert_eq!(loaded.last_end_sec, Some(270.0));
        assert!(loaded.matches_fingerprint(12.34, 5.67));
    }

    #[test]
    fn test_fingerprint_one_decimal_precision() {
        let rec = record();
        // 12.34 and 12.30 both round to 12.3
        assert!(rec.matches_fingerprint(12.30, 5.71));
        assert!(!rec.matches_fingerprint(12.44, 5.67));
        assert!(!rec.matches_fingerprint(12.34, 5.80));
    }

    #[test]
    fn test_load_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(load(&path).is_none());
        assert!(load(&dir.path().join("missing.json")).is_none());
    }
}
