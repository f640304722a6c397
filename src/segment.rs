//! Sentence segmentation.
//!
//! The pipeline only depends on the [`Segmenter`] contract: deterministic,
//! side-effect free, ordered output. [`UnicodeSegmenter`] is the default and
//! follows the UAX #29 sentence boundary rules.

use unicode_segmentation::UnicodeSegmentation;

pub trait Segmenter: Send + Sync {
    /// Split one response into ordered sentences.
    fn segment(&self, text: &str) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSegmenter;

impl Segmenter for UnicodeSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        text.unicode_sentences()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_sentence_boundaries() {
        let s = UnicodeSegmenter.segment("I love the school. It is great.");
        assert_eq!(s, vec!["I love the school.", "It is great."]);
    }

    #[test]
    fn test_single_sentence_without_terminator() {
        let s = UnicodeSegmenter.segment("More sports please");
        assert_eq!(s, vec!["More sports please"]);
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        assert!(UnicodeSegmenter.segment("   ").is_empty());
    }

    #[test]
    fn test_question_and_exclamation() {
        let s = UnicodeSegmenter.segment("Why so late? Fix it! Thanks.");
        assert_eq!(s.len(), 3);
    }
}
