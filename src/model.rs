use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a row as assigned at segmentation time.
///
/// Merging retires the key of the absorbed row; keys are never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey {
    pub id: i64,
    pub sentence_index: usize,
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.id, self.sentence_index)
    }
}

impl FromStr for RowKey {
    type Err = String;

    /// Parses the `id-sentence_index` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid row key '{}' (expected <id>-<sentence>)", s);
        let (id, index) = s.trim().rsplit_once('-').ok_or_else(invalid)?;
        Ok(RowKey {
            id: id.parse().map_err(|_| invalid())?,
            sentence_index: index.parse().map_err(|_| invalid())?,
        })
    }
}

/// A point in the 2-D projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub x: f32,
    pub y: f32,
}

/// Sentiment classification as returned by the sentiment service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// Model label, e.g. "POSITIVE". Compared case-insensitively.
    pub label: String,
    /// Confidence in [0, 1].
    pub score: f32,
}

impl Sentiment {
    pub fn normalized_label(&self) -> String {
        self.label.to_lowercase()
    }
}

/// One segmented, progressively enriched unit of response text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: i64,
    pub sentence_index: usize,
    pub text: String,
    pub stakeholder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<Coords>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots: Option<Vec<String>>,
}

impl Row {
    pub fn new(id: i64, sentence_index: usize, text: impl Into<String>, stakeholder: impl Into<String>) -> Self {
        Self {
            id,
            sentence_index,
            text: text.into(),
            stakeholder: stakeholder.into(),
            embedding: None,
            coords: None,
            sentiment: None,
            roots: None,
        }
    }

    pub fn key(&self) -> RowKey {
        RowKey {
            id: self.id,
            sentence_index: self.sentence_index,
        }
    }
}

/// Sorted, de-duplicated stakeholder tags present in `rows`.
pub fn stakeholders(rows: &[Row]) -> Vec<String> {
    let set: std::collections::BTreeSet<&str> = rows.iter().map(|r| r.stakeholder.as_str()).collect();
    set.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_key_display() {
        let row = Row::new(42, 3, "text", "parents");
        assert_eq!(row.key().to_string(), "42-3");
    }

    #[test]
    fn test_row_key_parses_display_form() {
        let key: RowKey = "42-3".parse().unwrap();
        assert_eq!(key, Row::new(42, 3, "t", "s").key());
        let negative: RowKey = "-7-0".parse().unwrap();
        assert_eq!(negative.id, -7);
        assert!("42".parse::<RowKey>().is_err());
        assert!("a-1".parse::<RowKey>().is_err());
    }

    #[test]
    fn test_stakeholders_sorted_unique() {
        let rows = vec![
            Row::new(1, 0, "a", "staff"),
            Row::new(2, 0, "b", "parents"),
            Row::new(3, 0, "c", "staff"),
        ];
        assert_eq!(stakeholders(&rows), vec!["parents", "staff"]);
    }

    #[test]
    fn test_unset_fields_not_serialized() {
        let json = serde_json::to_value(Row::new(1, 0, "hi", "students")).unwrap();
        assert!(json.get("embedding").is_none());
        assert!(json.get("coords").is_none());
        assert_eq!(json["sentence_index"], 0);
    }
}
