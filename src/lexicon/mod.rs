//! Lexical roots: content words of a sentence, reduced to a lemma-like form.

pub mod frequency;

use std::fmt;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{AnalysisError, Result};
use crate::model::Row;

pub use frequency::{FrequencyTable, SortOrder};

/// Extracts ordered root strings from a text, function words already removed.
pub trait RootExtractor: Send + Sync {
    fn roots(&self, text: &str) -> Result<Vec<String>>;

    fn name(&self) -> &str;
}

/// Word classes that never count as content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionWordCategory {
    Determiner,
    Auxiliary,
    Conjunction,
    Preposition,
    Pronoun,
    Modal,
    Particle,
    InfinitiveMarker,
    Interjection,
    Copula,
    Possessive,
}

impl fmt::Display for FunctionWordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Determiner => "determiner",
            Self::Auxiliary => "auxiliary",
            Self::Conjunction => "conjunction",
            Self::Preposition => "preposition",
            Self::Pronoun => "pronoun",
            Self::Modal => "modal",
            Self::Particle => "particle",
            Self::InfinitiveMarker => "infinitive marker",
            Self::Interjection => "interjection",
            Self::Copula => "copula",
            Self::Possessive => "possessive",
        };
        write!(f, "{}", name)
    }
}

const DETERMINERS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "each", "every", "some", "any", "all",
    "both", "either", "neither", "another", "such", "no", "several", "what", "which",
    "whatever", "whichever",
];
const AUXILIARIES: &[&str] = &[
    "do", "does", "did", "doing", "has", "have", "had", "having", "been", "being", "don't",
    "doesn't", "didn't", "hasn't", "haven't", "hadn't",
];
const CONJUNCTIONS: &[&str] = &[
    "and", "or", "but", "nor", "so", "yet", "because", "although", "though", "while", "if",
    "unless", "whereas", "whether", "since", "than",
];
const PREPOSITIONS: &[&str] = &[
    "about", "above", "across", "after", "against", "along", "among", "around", "as", "at",
    "before", "behind", "below", "beneath", "beside", "between", "beyond", "by", "despite",
    "down", "during", "except", "for", "from", "in", "inside", "into", "near", "of", "off",
    "on", "onto", "out", "outside", "over", "past", "per", "through", "throughout", "toward",
    "towards", "under", "until", "up", "upon", "via", "with", "within", "without",
];
const PRONOUNS: &[&str] = &[
    "i", "me", "myself", "you", "yourself", "yourselves", "he", "him", "himself", "she",
    "herself", "it", "itself", "we", "us", "ourselves", "they", "them", "themselves", "who",
    "whom", "someone", "anyone", "everyone", "something", "anything", "everything", "nothing",
    "nobody", "everybody", "somebody",
];
const MODALS: &[&str] = &[
    "can", "could", "may", "might", "must", "shall", "should", "will", "would", "cannot",
    "can't", "couldn't", "mustn't", "shouldn't", "won't", "wouldn't", "ought",
];
const PARTICLES: &[&str] = &["not", "n't"];
const INFINITIVE_MARKERS: &[&str] = &["to"];
const INTERJECTIONS: &[&str] = &[
    "oh", "ah", "wow", "hey", "yes", "yeah", "ok", "okay", "um", "uh", "hmm",
];
const COPULAS: &[&str] = &[
    "is", "am", "are", "was", "were", "be", "isn't", "aren't", "wasn't", "weren't",
];
const POSSESSIVES: &[&str] = &[
    "my", "your", "his", "her", "its", "our", "their", "mine", "yours", "hers", "ours",
    "theirs", "whose",
];

/// Words ending in `s` that are not plurals
const NOT_PLURAL: &[&str] = &[
    "always", "news", "series", "species", "perhaps", "sometimes", "towards", "afterwards",
    "lots", "thanks", "gas", "bus", "yes", "physics", "mathematics", "maths",
];

/// Category of `word` (lower-case) if it is a function word.
pub fn function_word_category(word: &str) -> Option<FunctionWordCategory> {
    use FunctionWordCategory::*;
    let tables: [(&[&str], FunctionWordCategory); 11] = [
        (INFINITIVE_MARKERS, InfinitiveMarker),
        (COPULAS, Copula),
        (AUXILIARIES, Auxiliary),
        (MODALS, Modal),
        (POSSESSIVES, Possessive),
        (PRONOUNS, Pronoun),
        (DETERMINERS, Determiner),
        (CONJUNCTIONS, Conjunction),
        (PREPOSITIONS, Preposition),
        (PARTICLES, Particle),
        (INTERJECTIONS, Interjection),
    ];
    tables
        .iter()
        .find(|(words, _)| words.contains(&word))
        .map(|(_, category)| *category)
}

/// Rule-based root extractor for English.
pub struct LexiconRootExtractor {
    clitic: Regex,
}

impl LexiconRootExtractor {
    pub fn new() -> Result<Self> {
        let clitic = Regex::new(r"'(?:s|re|ve|ll|d|m)?$")
            .map_err(|e| AnalysisError::service("roots", format!("invalid clitic pattern: {e}")))?;
        Ok(Self { clitic })
    }

    fn root_of(&self, token: &str) -> Option<String> {
        let word = token.to_lowercase().replace('\u{2019}', "'");
        if !word.chars().any(char::is_alphabetic) || function_word_category(&word).is_some() {
            return None;
        }

        let base = self.clitic.replace(&word, "");
        if base.is_empty() || function_word_category(&base).is_some() {
            return None;
        }
        Some(fold_suffix(&base))
    }
}

fn ends_with_double_consonant(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 2
        && b[b.len() - 1] == b[b.len() - 2]
        && !matches!(b[b.len() - 1], b'a' | b'e' | b'i' | b'o' | b'u' | b'l' | b's' | b'z')
}

/// Restore the silent `e` dropped before -ing / -ed where English spelling needs it.
fn restore_e(stem: &str) -> String {
    if ends_with_double_consonant(stem) {
        return stem[..stem.len() - 1].to_string();
    }
    let needs_e = ["v", "c", "u", "at", "iz", "ag", "ur"]
        .iter()
        .any(|end| stem.ends_with(end));
    if needs_e {
        format!("{}e", stem)
    } else {
        stem.to_string()
    }
}

/// Light inflection folding: plurals, -ies, -ing, -ed.
pub fn fold_suffix(word: &str) -> String {
    if !word.is_ascii() || word.len() <= 3 || NOT_PLURAL.contains(&word) {
        return word.to_string();
    }

    if let Some(stem) = word.strip_suffix("ies") {
        if stem.len() >= 2 {
            return format!("{}y", stem);
        }
    }
    if let Some(stem) = word.strip_suffix("ied") {
        if stem.len() >= 2 {
            return format!("{}y", stem);
        }
    }
    if let Some(stem) = word.strip_suffix("ing") {
        if stem.len() >= 3 && stem.chars().any(|c| "aeiouy".contains(c)) {
            return restore_e(stem);
        }
    }
    if let Some(stem) = word.strip_suffix("ed") {
        if !word.ends_with("eed") && stem.len() >= 3 && stem.chars().any(|c| "aeiouy".contains(c)) {
            return restore_e(stem);
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("es") {
        if ["s", "x", "z", "ch", "sh"].iter().any(|end| stem.ends_with(end)) {
            return stem.to_string();
        }
    }
    if let Some(stem) = word.strip_suffix('s') {
        return stem.to_string();
    }
    word.to_string()
}

impl RootExtractor for LexiconRootExtractor {
    fn roots(&self, text: &str) -> Result<Vec<String>> {
        Ok(text.unicode_words().filter_map(|w| self.root_of(w)).collect())
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

/// Roots for every row, in row order. Empty root strings are a service failure.
pub fn extract_roots(extractor: &dyn RootExtractor, rows: &[Row]) -> Result<Vec<Vec<String>>> {
    rows.iter()
        .map(|row| {
            let roots = extractor.roots(&row.text)?;
            if let Some(pos) = roots.iter().position(|r| r.trim().is_empty()) {
                return Err(AnalysisError::service(
                    "roots",
                    format!("row {} produced an empty root at position {}", row.key(), pos),
                ));
            }
            Ok(roots)
        })
        .collect()
}
