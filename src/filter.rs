//! Heuristic filter for degenerate transcription output
//!
//! A swappable denylist policy, tuned against one observed failure mode
//! (repeated fillers and stutter). False positives and negatives are
//! accepted.

/// Stock filler tokens rejected when they make up the entire input
const FILLER_TOKENS: &[&str] = &["好", "A", "啊", "嗯", "哦", "呃", "嗯嗯", "哈哈", "呵"];

/// Length of an identical-character run that marks the text as stutter
const REPEAT_RUN: usize = 4;

/// Runs of identical characters are only checked past this length
const REPEAT_MIN_LEN: usize = 5;

/// Content filter over transcribed text
#[derive(Debug, Clone)]
pub struct ContentFilter {
    filler_tokens: Vec<String>,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self {
            filler_tokens: FILLER_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ContentFilter {
    /// Build a filter with a custom denylist.
    pub fn with_fillers<I, S>(fillers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filler_tokens: fillers.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the input unchanged when it looks like genuine content,
    /// `None` when it matches a known degenerate pattern.
    pub fn filter<'a>(&self, text: &'a str) -> Option<&'a str> {
        let trimmed = text.trim();
        let words: Vec<&str> = trimmed.split_whitespace().collect();

        // Lone filler token
        if words.len() == 1 && self.filler_tokens.iter().any(|f| f == words[0]) {
            return None;
        }

        // Stutter: the first two words are identical
        if words.len() >= 2 && words[0] == words[1] {
            return None;
        }

        // A run of identical characters anywhere in longer text
        if trimmed.chars().count() > REPEAT_MIN_LEN && has_repeat_run(trimmed, REPEAT_RUN) {
            return None;
        }

        Some(text)
    }
}

fn has_repeat_run(text: &str, run: usize) -> bool {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(run).any(|w| w.iter().all(|&c| c == w[0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filler_tokens_rejected() {
        let filter = ContentFilter::default();
        for token in ["好", "A", "啊", "嗯", "哦", "呃"] {
            assert_eq!(filter.filter(token), None, "should reject {}", token);
        }
        assert_eq!(filter.filter("  嗯  "), None);
    }

    #[test]
    fn test_repeated_leading_pair_rejected() {
        let filter = ContentFilter::default();
        assert_eq!(filter.filter("好 好"), None);
        assert_eq!(filter.filter("the the quick brown fox"), None);
    }

    #[test]
    fn test_identical_run_rejected() {
        let filter = ContentFilter::default();
        assert_eq!(filter.filter("well aaaa then"), None);
        assert_eq!(filter.filter("!!!!!!!!!"), None);
    }

    #[test]
    fn test_short_text_skips_run_check() {
        let filter = ContentFilter::default();
        // Five chars or fewer: the run rule does not apply
        assert_eq!(filter.filter("aaaa"), Some("aaaa"));
    }

    #[test]
    fn test_genuine_content_passes_unchanged() {
        let filter = ContentFilter::default();
        let text = "今天的會議從三點開始";
        assert_eq!(filter.filter(text), Some(text));

        let text = " leading whitespace preserved ";
        assert_eq!(filter.filter(text), Some(text));
    }

    #[test]
    fn test_custom_denylist() {
        let filter = ContentFilter::with_fillers(["um"]);
        assert_eq!(filter.filter("um"), None);
        // Stock tokens are gone on a custom list
        assert_eq!(filter.filter("嗯"), Some("嗯"));
    }
}
