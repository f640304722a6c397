//! Sentiment classification.
//!
//! The pipeline talks to a [`SentimentClassifier`]; [`LexiconSentiment`] is
//! the offline default, a phrase-lexicon scorer with simple negation.

use aho_corasick::{AhoCorasick, MatchKind};
use async_trait::async_trait;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{AnalysisError, Result};
use crate::model::Sentiment;

pub const POSITIVE: &str = "POSITIVE";
pub const NEGATIVE: &str = "NEGATIVE";

/// Words inspected before a lexicon hit when looking for a negator
const NEGATION_WINDOW: usize = 3;

const POSITIVE_TERMS: &[&str] = &[
    "good", "great", "excellent", "love", "loved", "loves", "amazing", "wonderful", "happy",
    "fantastic", "awesome", "best", "better", "helpful", "friendly", "appreciate",
    "appreciated", "thank", "thanks", "thankful", "supported", "supportive", "safe", "enjoy",
    "enjoyed", "enjoys", "value", "valued", "improved", "clear", "easy", "constructive",
    "highlight", "nice", "kind", "kindness", "encouraged", "responsive", "approachable",
    "confident", "confidence", "educational", "hit",
];

const NEGATIVE_TERMS: &[&str] = &[
    "bad", "terrible", "awful", "hate", "hated", "horrible", "worst", "worse", "sad", "angry",
    "disappointed", "disappointing", "poor", "chaotic", "stressful", "late", "heavy",
    "uncomfortable", "unhealthy", "difficult", "confusing", "unsafe", "frustrated",
    "frustrating", "problem", "problems", "lacking", "unclear", "boring", "rude",
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "hardly", "don't", "doesn't", "didn't", "isn't", "aren't", "wasn't",
    "weren't", "can't", "cannot", "won't", "shouldn't", "couldn't", "wouldn't",
];

/// Classifies texts into a (label, confidence) pair, one per input, in order.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Sentiment>>;

    fn name(&self) -> &str;
}

pub struct LexiconSentiment {
    positive: AhoCorasick,
    negative: AhoCorasick,
}

impl LexiconSentiment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            positive: build_matcher(POSITIVE_TERMS)?,
            negative: build_matcher(NEGATIVE_TERMS)?,
        })
    }

    pub fn classify_text(&self, text: &str) -> Sentiment {
        let text = text.replace('\u{2019}', "'");
        let mut positive = 0.0f32;
        let mut negative = 0.0f32;

        for (matcher, polarity) in [(&self.positive, true), (&self.negative, false)] {
            for m in matcher.find_iter(&text) {
                if !is_whole_word(&text, m.start(), m.end()) {
                    continue;
                }
                let flipped = is_negated(&text[..m.start()]);
                if polarity != flipped {
                    positive += 1.0;
                } else {
                    negative += 1.0;
                }
            }
        }

        let total = positive + negative;
        let p = if total == 0.0 { 0.5 } else { positive / total };
        if p >= 0.5 {
            Sentiment {
                label: POSITIVE.to_string(),
                score: p,
            }
        } else {
            Sentiment {
                label: NEGATIVE.to_string(),
                score: 1.0 - p,
            }
        }
    }
}

fn build_matcher(terms: &[&str]) -> Result<AhoCorasick> {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(terms)
        .map_err(|e| {
            AnalysisError::service("sentiment", format!("failed to build sentiment matcher: {e}"))
        })
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let boundary = |c: Option<char>| c.map_or(true, |c| !c.is_alphanumeric() && c != '\'');
    boundary(before) && boundary(after)
}

fn is_negated(prefix: &str) -> bool {
    let words: Vec<&str> = prefix.unicode_words().collect();
    words
        .iter()
        .rev()
        .take(NEGATION_WINDOW)
        .any(|w| NEGATORS.iter().any(|n| n.eq_ignore_ascii_case(w)))
}

#[async_trait]
impl SentimentClassifier for LexiconSentiment {
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Sentiment>> {
        Ok(texts.iter().map(|t| self.classify_text(t)).collect())
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

/// Reject a malformed classifier response.
pub fn validate_sentiments(expected: usize, results: Vec<Sentiment>) -> Result<Vec<Sentiment>> {
    if results.len() != expected {
        return Err(AnalysisError::service(
            "sentiment",
            format!("expected {} results, got {}", expected, results.len()),
        ));
    }
    for (i, s) in results.iter().enumerate() {
        if s.label.trim().is_empty() {
            return Err(AnalysisError::service("sentiment", format!("result {} has no label", i)));
        }
        if !s.score.is_finite() || !(0.0..=1.0).contains(&s.score) {
            return Err(AnalysisError::service(
                "sentiment",
                format!("result {} has score {} outside [0, 1]", i, s.score),
            ));
        }
    }
    Ok(results)
}

/// Classify `texts` in fixed-size batches, keeping input order.
pub async fn classify_in_batches(
    classifier: &dyn SentimentClassifier,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Sentiment>> {
    let mut out = Vec::with_capacity(texts.len());
    for (n, chunk) in texts.chunks(batch_size.max(1)).enumerate() {
        debug!("Sentiment batch {} - size={}", n + 1, chunk.len());
        let results = classifier.classify_batch(chunk).await?;
        out.extend(validate_sentiments(chunk.len(), results)?);
    }
    Ok(out)
}
