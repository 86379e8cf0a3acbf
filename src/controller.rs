//! Segmentation controller: the orchestration loop
//!
//! Drives extract → transcribe → filter → append per segment, strictly
//! sequentially. One bad segment never aborts the run; its coverage is
//! simply missing from the checkpoint.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::audio::probe::AudioFileInfo;
use crate::audio::SegmentExtractor;
use crate::checkpoint::{CheckpointHandle, CheckpointHeader, CheckpointStore};
use crate::error::Result;
use crate::filter::ContentFilter;
use crate::progress::ProgressCounters;
use crate::stt::{TranscriptResult, TranscriptSegment, Transcriber};

/// One planned slice of the source audio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSpan {
    pub index: usize,
    pub start_sec: f64,
    pub end_sec: f64,
}

impl SegmentSpan {
    pub fn duration_sec(&self) -> f64 {
        self.end_sec - self.start_sec
    }
}

/// Partition `[0, total)` into `ceil(total / segment)` half-open spans
/// with no gap or overlap; the final span absorbs the remainder.
pub fn plan_segments(total_duration_sec: f64, segment_duration_sec: u32) -> Vec<SegmentSpan> {
    let segment = segment_duration_sec as f64;
    if total_duration_sec <= 0.0 {
        return Vec::new();
    }

    let count = (total_duration_sec / segment).ceil() as usize;
    (0..count)
        .map(|index| {
            let start_sec = index as f64 * segment;
            let end_sec = (start_sec + segment).min(total_duration_sec);
            SegmentSpan {
                index,
                start_sec,
                end_sec,
            }
        })
        .collect()
}

/// Shift slice-local span timestamps into global time. Spans the backend
/// returned without timestamps get the bounds of the slice itself.
pub fn globalize(result: &mut TranscriptResult, span: &SegmentSpan) {
    for segment in &mut result.segments {
        match (segment.start_sec, segment.end_sec) {
            (Some(start), Some(end)) => {
                segment.start_sec = Some(start + span.start_sec);
                segment.end_sec = Some(end + span.start_sec);
            }
            _ => {
                segment.start_sec = Some(span.start_sec);
                segment.end_sec = Some(span.end_sec);
            }
        }
    }
}

/// Outcome of processing one source file
#[derive(Debug)]
pub struct FileOutcome {
    pub checkpoint_path: PathBuf,
    pub combined: TranscriptResult,
    /// True when a complete transcript already existed and nothing ran
    pub resumed_complete: bool,
}

pub struct Controller<'a, X: SegmentExtractor, T: Transcriber> {
    extractor: &'a X,
    transcriber: &'a T,
    filter: &'a ContentFilter,
    store: &'a CheckpointStore,
    counters: Arc<ProgressCounters>,
    stop: Arc<AtomicBool>,
}

impl<'a, X: SegmentExtractor, T: Transcriber> Controller<'a, X, T> {
    pub fn new(
        extractor: &'a X,
        transcriber: &'a T,
        filter: &'a ContentFilter,
        store: &'a CheckpointStore,
        counters: Arc<ProgressCounters>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            extractor,
            transcriber,
            filter,
            store,
            counters,
            stop,
        }
    }

    /// Process one preprocessed audio file end to end: decide between a
    /// fresh transcript and a resume, then run the segment loop.
    pub fn run(
        &self,
        working_audio: &Path,
        info: &AudioFileInfo,
        header: &CheckpointHeader,
        workspace: &Path,
    ) -> Result<FileOutcome> {
        let total_sec = info.duration_sec();
        let plan = plan_segments(total_sec, header.segment_duration_sec);
        info!(
            "Planned {} segments of {} s over {:.1} s of audio",
            plan.len(),
            header.segment_duration_sec,
            total_sec
        );

        self.counters.set_total(plan.len());
        self.counters.set_current(0);

        let (mut handle, start_index) = match self.store.find_resumable(info.size_mb, info.duration_min)
        {
            Some(state) => {
                if let Some(first) = &state.first_content_line {
                    info!("Existing transcript begins: {}", truncate(first, 50));
                }

                if state
                    .last_end_sec
                    .is_some_and(|end| self.store.is_complete(end, total_sec))
                {
                    info!("Transcript already complete, skipping reprocessing");
                    return Ok(FileOutcome {
                        checkpoint_path: state.path,
                        combined: TranscriptResult::default(),
                        resumed_complete: true,
                    });
                }

                // A sidecar gives a trustworthy segment index; a prose-only
                // match restarts from the beginning.
                let start = state
                    .segments_completed
                    .map(|done| done.min(plan.len()))
                    .unwrap_or(0);
                if start > 0 {
                    info!("Resuming at segment {}/{}", start + 1, plan.len());
                }
                self.counters.set_current(start);

                (self.store.reopen(&state, header)?, start)
            }
            None => (self.store.create_new(header)?, 0),
        };

        let combined = self.segment_loop(&plan, start_index, working_audio, &mut handle, workspace)?;

        Ok(FileOutcome {
            checkpoint_path: handle.path.clone(),
            combined,
            resumed_complete: false,
        })
    }

    fn segment_loop(
        &self,
        plan: &[SegmentSpan],
        start_index: usize,
        working_audio: &Path,
        handle: &mut CheckpointHandle,
        workspace: &Path,
    ) -> Result<TranscriptResult> {
        let mut combined = TranscriptResult::default();

        for span in &plan[start_index..] {
            if self.stop.load(Ordering::SeqCst) {
                warn!("Stop requested, leaving segment loop");
                break;
            }

            info!(
                "Segment {}/{}: {:.1}s - {:.1}s",
                span.index + 1,
                plan.len(),
                span.start_sec,
                span.end_sec
            );

            match self.process_segment(span, working_audio, handle, workspace) {
                Ok(result) => combined.append(result),
                Err(e) => {
                    warn!("Segment {} failed, skipping: {}", span.index + 1, e);
                }
            }

            self.counters.set_current(span.index + 1);
            handle.segment_done(span.index + 1, plan.len(), Some(span.end_sec));
        }

        Ok(combined)
    }

    /// Extract, transcribe, filter, and persist one segment.
    fn process_segment(
        &self,
        span: &SegmentSpan,
        working_audio: &Path,
        handle: &mut CheckpointHandle,
        workspace: &Path,
    ) -> Result<TranscriptResult> {
        let segment_path = workspace.join(format!("segment_{}.wav", span.index));
        // Sole writer: the previous occupant of this path must be gone
        // before the tool writes a new one.
        let _ = std::fs::remove_file(&segment_path);

        self.extractor.extract(
            working_audio,
            span.start_sec,
            span.duration_sec(),
            &segment_path,
        )?;

        let transcription = self.transcriber.transcribe(&segment_path);
        let _ = std::fs::remove_file(&segment_path);
        let mut result = transcription?;

        globalize(&mut result, span);

        let retained: Vec<TranscriptSegment> = result
            .segments
            .into_iter()
            .filter(|segment| match self.filter.filter(&segment.text) {
                Some(_) => true,
                None => {
                    info!("Filtered degenerate span: {:?}", segment.text);
                    false
                }
            })
            .collect();

        handle.append(&retained)?;

        let text = retained
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(TranscriptResult {
            text,
            segments: retained,
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect::<String>() + "..."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_partitions_without_gap_or_overlap() {
        let plan = plan_segments(130.0, 60);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].start_sec, 0.0);
        assert_eq!(plan[0].end_sec, 60.0);
        assert_eq!(plan[1].start_sec, 60.0);
        assert_eq!(plan[1].end_sec, 120.0);
        assert_eq!(plan[2].start_sec, 120.0);
        assert_eq!(plan[2].end_sec, 130.0);

        for pair in plan.windows(2) {
            assert_eq!(pair[0].end_sec, pair[1].start_sec);
        }
    }

    #[test]
    fn test_plan_exact_multiple() {
        let plan = plan_segments(120.0, 60);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].end_sec, 120.0);
    }

    #[test]
    fn test_plan_empty_and_short_inputs() {
        assert!(plan_segments(0.0, 60).is_empty());

        let plan = plan_segments(10.0, 60);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].end_sec, 10.0);
    }

    #[test]
    fn test_globalize_shifts_local_spans() {
        let span = SegmentSpan {
            index: 2,
            start_sec: 120.0,
            end_sec: 180.0,
        };
        let mut result = TranscriptResult {
            text: "a b".to_string(),
            segments: vec![
                TranscriptSegment {
                    text: "a".to_string(),
                    start_sec: Some(1.5),
                    end_sec: Some(4.0),
                },
                TranscriptSegment {
                    text: "b".to_string(),
                    start_sec: None,
                    end_sec: None,
                },
            ],
        };

        globalize(&mut result, &span);

        assert_eq!(result.segments[0].start_sec, Some(121.5));
        assert_eq!(result.segments[0].end_sec, Some(124.0));
        // Missing timestamps become the slice bounds
        assert_eq!(result.segments[1].start_sec, Some(120.0));
        assert_eq!(result.segments[1].end_sec, Some(180.0));
    }
}
