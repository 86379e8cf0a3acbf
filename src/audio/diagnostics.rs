//! Parsers for the media tool's diagnostic text stream
//!
//! Volume and silence measurements only exist as free text on stderr.
//! The grammar is one metric per line: `<key>: <float>` with an optional
//! unit suffix and optional `| <more metrics>` tail. Everything brittle
//! about that format lives here.

/// Volume statistics reported by the `volumedetect` filter
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VolumeStats {
    pub mean_db: Option<f64>,
    pub max_db: Option<f64>,
}

/// Extract mean/max volume from a `volumedetect` stderr dump.
pub fn parse_volume_detect(stderr: &str) -> VolumeStats {
    let mut stats = VolumeStats::default();
    for line in stderr.lines() {
        if let Some(v) = metric_value(line, "mean_volume:") {
            stats.mean_db = Some(v);
        } else if let Some(v) = metric_value(line, "max_volume:") {
            stats.max_db = Some(v);
        }
    }
    stats
}

/// Extract `(start, end)` silence spans from a `silencedetect` stderr dump.
///
/// Unpaired or unparseable markers are dropped; a `silence_start` with no
/// matching `silence_end` never produces a span.
pub fn parse_silence_spans(stderr: &str) -> Vec<(f64, f64)> {
    let mut spans = Vec::new();
    let mut current_start: Option<f64> = None;

    for line in stderr.lines() {
        if let Some(start) = metric_value(line, "silence_start:") {
            current_start = Some(start);
        } else if let Some(end) = metric_value(line, "silence_end:") {
            if let Some(start) = current_start.take() {
                spans.push((start, end));
            }
        }
    }

    spans
}

/// `<anything> <key> <float>[ <unit>][ | <tail>]` → the float, if the key
/// is present and the token after it parses.
fn metric_value(line: &str, key: &str) -> Option<f64> {
    let rest = line.split(key).nth(1)?;
    let token = rest.trim().split([' ', '|']).next()?;
    token.trim_end_matches("dB").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOLUME_STDERR: &str = "\
[Parsed_volumedetect_0 @ 0x7f8] n_samples: 4915200
[Parsed_volumedetect_0 @ 0x7f8] mean_volume: -23.5 dB
[Parsed_volumedetect_0 @ 0x7f8] max_volume: -4.1 dB
[Parsed_volumedetect_0 @ 0x7f8] histogram_4db: 12";

    #[test]
    fn test_parse_volume_detect() {
        let stats = parse_volume_detect(VOLUME_STDERR);
        assert_eq!(stats.mean_db, Some(-23.5));
        assert_eq!(stats.max_db, Some(-4.1));
    }

    #[test]
    fn test_parse_volume_detect_missing_metrics() {
        let stats = parse_volume_detect("frame=  100 fps=0.0 q=-0.0 size=N/A");
        assert_eq!(stats, VolumeStats::default());
    }

    const SILENCE_STDERR: &str = "\
[silencedetect @ 0x55d] silence_start: 3.240021
[silencedetect @ 0x55d] silence_end: 3.957792 | silence_duration: 0.717771
[silencedetect @ 0x55d] silence_start: 10.5
[silencedetect @ 0x55d] silence_end: 12.25 | silence_duration: 1.75";

    #[test]
    fn test_parse_silence_spans() {
        let spans = parse_silence_spans(SILENCE_STDERR);
        assert_eq!(spans, vec![(3.240021, 3.957792), (10.5, 12.25)]);
    }

    #[test]
    fn test_unpaired_silence_start_dropped() {
        let spans = parse_silence_spans("[silencedetect @ 0x1] silence_start: 5.0");
        assert!(spans.is_empty());

        // An end with no preceding start is ignored too
        let spans = parse_silence_spans("[silencedetect @ 0x1] silence_end: 7.0");
        assert!(spans.is_empty());
    }

    #[test]
    fn test_metric_value_garbage() {
        assert_eq!(metric_value("mean_volume: n/a dB", "mean_volume:"), None);
        assert_eq!(metric_value("no key here", "mean_volume:"), None);
    }
}
