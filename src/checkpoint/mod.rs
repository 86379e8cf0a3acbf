//! Append-only checkpoint files: the durable result and resume source
//!
//! A checkpoint is a flat UTF-8 text file with a fixed-format metadata
//! header followed by one timestamped line per retained span. The header
//! carries a size/duration fingerprint of the *processed* audio; resume
//! matching compares those two lines verbatim at one-decimal precision,
//! so the key strings below are part of the external format and must not
//! drift.

pub mod sidecar;

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::config::CheckpointConfig;
use crate::error::CheckpointError;
use crate::stt::TranscriptSegment;
use sidecar::SidecarRecord;

const TITLE: &str = "智能語音轉錄結果";
const SECTION: &str = "分段轉錄結果:";
const RULE: &str = "============================================================";

/// Fingerprint keys, matched as substrings during resume
const FILE_SIZE_KEY: &str = "檔案大小: ";
const DURATION_KEY: &str = "音訊長度: ";

/// Marker for spans whose timestamps the backend did not supply
const UNKNOWN_TIMESTAMP: &str = "[時間戳未知]";

/// Header lines are never transcript content
const HEADER_KEYS: &[&str] = &[
    "檔案: ",
    "模型: ",
    "處理方法: ",
    "硬體配置: ",
    "記憶體: ",
    FILE_SIZE_KEY,
    DURATION_KEY,
    "分段大小: ",
    "批次大小: ",
    "精度: ",
    "轉錄時間: ",
    TITLE,
    SECTION,
];

/// Metadata written once when a checkpoint file is created
#[derive(Debug, Clone)]
pub struct CheckpointHeader {
    pub source: PathBuf,
    pub model: String,
    pub hardware: String,
    pub total_memory_gb: f64,
    /// Fingerprint: size of the processed audio
    pub size_mb: f64,
    /// Fingerprint: duration of the processed audio
    pub duration_min: f64,
    pub segment_duration_sec: u32,
    pub batch_size: u32,
    pub precision: String,
}

/// A located checkpoint eligible for resuming
#[derive(Debug, Clone)]
pub struct ResumeState {
    pub path: PathBuf,
    /// Global end of the last well-formed span line
    pub last_end_sec: Option<f64>,
    /// First line that looks like actual transcript content
    pub first_content_line: Option<String>,
    /// Present only when a sidecar record was found
    pub segments_completed: Option<usize>,
}

/// Open handle for appending spans to one checkpoint file
pub struct CheckpointHandle {
    pub path: PathBuf,
    file: File,
    sidecar: SidecarRecord,
}

impl CheckpointHandle {
    /// Append one line per span, flushing each so a crash loses at most
    /// the in-flight segment.
    pub fn append(&mut self, spans: &[TranscriptSegment]) -> Result<(), CheckpointError> {
        for span in spans {
            match (span.start_sec, span.end_sec) {
                (Some(start), Some(end)) => {
                    writeln!(self.file, "[{:.1}s - {:.1}s] {}", start, end, span.text)
                }
                _ => writeln!(self.file, "{} {}", UNKNOWN_TIMESTAMP, span.text),
            }
            .map_err(|e| CheckpointError::Append(e.to_string()))?;

            self.file
                .flush()
                .map_err(|e| CheckpointError::Append(e.to_string()))?;
        }
        Ok(())
    }

    /// Record that a segment finished, updating the resume sidecar.
    /// Sidecar trouble is logged, not fatal: the transcript itself is
    /// already safely on disk.
    pub fn segment_done(&mut self, completed: usize, total: usize, last_end_sec: Option<f64>) {
        self.sidecar.segments_completed = completed;
        self.sidecar.total_segments = total;
        if last_end_sec.is_some() {
            self.sidecar.last_end_sec = last_end_sec;
        }
        self.sidecar.updated_at = now_stamp();

        let path = sidecar::sidecar_path(&self.path);
        if let Err(e) = sidecar::store(&path, &self.sidecar) {
            warn!("{}", e);
        }
    }
}

/// Locates, creates, and appends to checkpoint files in one directory
pub struct CheckpointStore {
    output_dir: PathBuf,
    completeness_tolerance_sec: f64,
    min_content_line_chars: usize,
}

impl CheckpointStore {
    pub fn new(config: &CheckpointConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            completeness_tolerance_sec: config.completeness_tolerance_sec,
            min_content_line_chars: config.min_content_line_chars,
        }
    }

    /// Create a fresh checkpoint file, writing the header block once.
    pub fn create_new(&self, header: &CheckpointHeader) -> Result<CheckpointHandle, CheckpointError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| CheckpointError::Create {
            path: self.output_dir.display().to_string(),
            detail: e.to_string(),
        })?;

        let stem = header
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = self.output_dir.join(format!("result-{stem}-{timestamp}.txt"));

        let mut file = File::create(&path).map_err(|e| CheckpointError::Create {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

        write_header(&mut file, header).map_err(|e| CheckpointError::Create {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

        let record = SidecarRecord {
            size_mb: header.size_mb,
            duration_min: header.duration_min,
            segments_completed: 0,
            total_segments: 0,
            last_end_sec: None,
            model: header.model.clone(),
            updated_at: now_stamp(),
        };
        sidecar::store(&sidecar::sidecar_path(&path), &record)?;

        info!("Created checkpoint file: {}", path.display());
        Ok(CheckpointHandle {
            path,
            file,
            sidecar: record,
        })
    }

    /// Reopen an existing checkpoint for appending.
    pub fn reopen(
        &self,
        state: &ResumeState,
        header: &CheckpointHeader,
    ) -> Result<CheckpointHandle, CheckpointError> {
        let file = OpenOptions::new()
            .append(true)
            .open(&state.path)
            .map_err(|e| CheckpointError::Create {
                path: state.path.display().to_string(),
                detail: e.to_string(),
            })?;

        let sidecar = sidecar::load(&sidecar::sidecar_path(&state.path)).unwrap_or(SidecarRecord {
            size_mb: header.size_mb,
            duration_min: header.duration_min,
            segments_completed: state.segments_completed.unwrap_or(0),
            total_segments: 0,
            last_end_sec: state.last_end_sec,
            model: header.model.clone(),
            updated_at: now_stamp(),
        });

        info!("Resuming checkpoint file: {}", state.path.display());
        Ok(CheckpointHandle {
            path: state.path.clone(),
            file,
            sidecar,
        })
    }

    /// Find the newest checkpoint whose fingerprint matches the processed
    /// audio. Candidates are ordered by the timestamp embedded in their
    /// filename, newest first; names that fail to parse sort last.
    pub fn find_resumable(&self, size_mb: f64, duration_min: f64) -> Option<ResumeState> {
        let entries = std::fs::read_dir(&self.output_dir).ok()?;

        let mut candidates: Vec<(Option<NaiveDateTime>, PathBuf)> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_result_file(p))
            .map(|p| (filename_timestamp(&p), p))
            .collect();

        // Descending by timestamp; None compares below every Some and
        // therefore lands at the end.
        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        for (_, path) in candidates {
            if let Some(record) = sidecar::load(&sidecar::sidecar_path(&path)) {
                if !record.matches_fingerprint(size_mb, duration_min) {
                    debug!("Fingerprint mismatch (sidecar): {}", path.display());
                    continue;
                }

                let content = std::fs::read_to_string(&path).unwrap_or_default();
                info!("Found matching checkpoint (sidecar): {}", path.display());
                return Some(ResumeState {
                    path,
                    last_end_sec: record.last_end_sec,
                    first_content_line: self.first_content_line(&content),
                    segments_completed: Some(record.segments_completed),
                });
            }

            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping unreadable checkpoint {}: {}", path.display(), e);
                    continue;
                }
            };

            let size_line = format!("{}{:.1} MB", FILE_SIZE_KEY, size_mb);
            let duration_line = format!("{}{:.1} 分鐘", DURATION_KEY, duration_min);
            if !content.contains(&size_line) || !content.contains(&duration_line) {
                debug!("Fingerprint mismatch: {}", path.display());
                continue;
            }

            info!("Found matching checkpoint: {}", path.display());
            return Some(ResumeState {
                path,
                last_end_sec: last_span_end(&content),
                first_content_line: self.first_content_line(&content),
                segments_completed: None,
            });
        }

        None
    }

    /// Whether a transcript reaching `last_end_sec` covers the whole
    /// audio, within the trailing-segment tolerance.
    pub fn is_complete(&self, last_end_sec: f64, total_duration_sec: f64) -> bool {
        last_end_sec >= total_duration_sec - self.completeness_tolerance_sec
    }

    /// First body line that looks like genuine transcript content:
    /// not a header or decoration line, not a timestamped span, and
    /// longer than the configured minimum.
    fn first_content_line(&self, content: &str) -> Option<String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| !line.starts_with('=') && !line.starts_with('['))
            .filter(|line| !HEADER_KEYS.iter().any(|key| line.starts_with(key)))
            .find(|line| line.chars().count() > self.min_content_line_chars)
            .map(str::to_string)
    }
}

fn write_header(file: &mut File, header: &CheckpointHeader) -> std::io::Result<()> {
    writeln!(file, "{TITLE}")?;
    writeln!(file, "{RULE}")?;
    writeln!(file, "檔案: {}", header.source.display())?;
    writeln!(file, "模型: {}", header.model)?;
    writeln!(file, "處理方法: 智能分段轉錄")?;
    writeln!(file, "硬體配置: {}", header.hardware)?;
    writeln!(file, "記憶體: {:.1} GB", header.total_memory_gb)?;
    writeln!(file, "{}{:.1} MB", FILE_SIZE_KEY, header.size_mb)?;
    writeln!(file, "{}{:.1} 分鐘", DURATION_KEY, header.duration_min)?;
    writeln!(file, "分段大小: {} 秒", header.segment_duration_sec)?;
    writeln!(file, "批次大小: {}", header.batch_size)?;
    writeln!(file, "精度: {}", header.precision)?;
    writeln!(
        file,
        "轉錄時間: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(file, "{RULE}")?;
    writeln!(file)?;
    writeln!(file, "{SECTION}")?;
    writeln!(file, "{RULE}")?;
    file.flush()
}

fn is_result_file(path: &Path) -> bool {
    path.extension().map_or(false, |e| e == "txt")
        && path
            .file_name()
            .map_or(false, |n| n.to_string_lossy().starts_with("result-"))
}

/// Timestamp embedded in `result-<stem>-YYYYmmdd_HHMMSS.txt`, if the
/// name parses.
fn filename_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let stem = path.file_stem()?.to_string_lossy();
    let (_, timestamp) = stem.rsplit_once('-')?;
    NaiveDateTime::parse_from_str(timestamp, "%Y%m%d_%H%M%S").ok()
}

/// End value of the last well-formed `[<start>s - <end>s]` line.
fn last_span_end(content: &str) -> Option<f64> {
    content
        .lines()
        .rev()
        .find_map(|line| parse_span_line(line.trim()).map(|(_, end)| end))
}

/// Parse `[<start>s - <end>s] text` into its timestamps. Marker lines
/// (`[時間戳未知] ...`) deliberately do not match.
fn parse_span_line(line: &str) -> Option<(f64, f64)> {
    let rest = line.strip_prefix('[')?;
    let (stamp, _) = rest.split_once(']')?;
    let (start, end) = stamp.split_once(" - ")?;
    let start: f64 = start.trim().strip_suffix('s')?.parse().ok()?;
    let end: f64 = end.trim().strip_suffix('s')?.parse().ok()?;
    Some((start, end))
}

fn now_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
