//! Derived views over the row collection: filtering, selection, plot bounds.
//!
//! Nothing here mutates rows.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Coords, Row, RowKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentFilter {
    #[default]
    All,
    Positive,
    Negative,
}

impl SentimentFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentFilter::All => "all",
            SentimentFilter::Positive => "positive",
            SentimentFilter::Negative => "negative",
        }
    }
}

impl FromStr for SentimentFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(SentimentFilter::All),
            "positive" => Ok(SentimentFilter::Positive),
            "negative" => Ok(SentimentFilter::Negative),
            other => Err(format!(
                "unknown sentiment filter '{}' (expected all, positive or negative)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Allowed stakeholders; empty allows all
    #[serde(default)]
    pub stakeholders: Vec<String>,
    #[serde(default)]
    pub sentiment: SentimentFilter,
    /// Case-insensitive substring of the row text
    #[serde(default)]
    pub search: String,
}

impl FilterSpec {
    pub fn matches(&self, row: &Row) -> bool {
        let stakeholder_ok =
            self.stakeholders.is_empty() || self.stakeholders.iter().any(|s| *s == row.stakeholder);

        let sentiment_ok = match self.sentiment {
            SentimentFilter::All => true,
            wanted => row
                .sentiment
                .as_ref()
                .is_some_and(|s| s.normalized_label() == wanted.as_str()),
        };

        let search_ok = self.search.is_empty()
            || row.text.to_lowercase().contains(&self.search.to_lowercase());

        stakeholder_ok && sentiment_ok && search_ok
    }
}

/// Rows satisfying `spec`, in collection order.
pub fn filtered_rows<'a>(rows: &'a [Row], spec: &FilterSpec) -> Vec<&'a Row> {
    rows.iter().filter(|r| spec.matches(r)).collect()
}

/// Rows picked for the detail table, by segmentation-time identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    keys: BTreeSet<RowKey>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.keys.contains(key)
    }

    /// Add `key` if absent, remove it if present.
    pub fn toggle(&mut self, key: RowKey) {
        if !self.keys.remove(&key) {
            self.keys.insert(key);
        }
    }

    pub fn extend(&mut self, keys: impl IntoIterator<Item = RowKey>) {
        self.keys.extend(keys);
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Replace the selection with rows whose coordinates fall inside the
    /// rectangle spanned by two corners (any order, edges inclusive).
    pub fn select_in_rect(&mut self, rows: &[Row], a: (f32, f32), b: (f32, f32)) {
        let (x0, x1) = (a.0.min(b.0), a.0.max(b.0));
        let (y0, y1) = (a.1.min(b.1), a.1.max(b.1));
        self.keys = rows
            .iter()
            .filter(|r| {
                r.coords
                    .is_some_and(|c| c.x >= x0 && c.x <= x1 && c.y >= y0 && c.y <= y1)
            })
            .map(Row::key)
            .collect();
    }

    /// Selected rows in collection order; an empty selection selects everything.
    pub fn selected_rows<'a>(&self, rows: &'a [Row]) -> Vec<&'a Row> {
        if self.keys.is_empty() {
            return rows.iter().collect();
        }
        rows.iter().filter(|r| self.keys.contains(&r.key())).collect()
    }
}

/// Rows passing `spec` and, when anything is selected, in `selection`.
pub fn visible_rows<'a>(rows: &'a [Row], spec: &FilterSpec, selection: &Selection) -> Vec<&'a Row> {
    selection
        .selected_rows(rows)
        .into_iter()
        .filter(|r| spec.matches(r))
        .collect()
}

/// Parse `x0,y0,x1,y1` into two rectangle corners.
pub fn parse_rect(s: &str) -> Result<((f32, f32), (f32, f32)), String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid rectangle '{}': {}", s, e))?;
    match values[..] {
        [x0, y0, x1, y1] if values.iter().all(|v| v.is_finite()) => Ok(((x0, y0), (x1, y1))),
        _ => Err(format!("invalid rectangle '{}' (expected x0,y0,x1,y1)", s)),
    }
}

/// Axis ranges for plotting, always covering the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl PlotBounds {
    pub const BUFFER: f32 = 0.05;

    pub fn from_rows(rows: &[Row]) -> Self {
        Self::from_points(rows.iter().filter_map(|r| r.coords))
    }

    pub fn from_points(points: impl IntoIterator<Item = Coords>) -> Self {
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (0.0f32, 1.0f32, 0.0f32, 1.0f32);
        for c in points {
            min_x = min_x.min(c.x);
            max_x = max_x.max(c.x);
            min_y = min_y.min(c.y);
            max_y = max_y.max(c.y);
        }
        let x_pad = (max_x - min_x) * Self::BUFFER;
        let y_pad = (max_y - min_y) * Self::BUFFER;
        Self {
            min_x: min_x - x_pad,
            max_x: max_x + x_pad,
            min_y: min_y - y_pad,
            max_y: max_y + y_pad,
        }
    }
}

/// Two-digit upper-case hex byte for a score in [0, 1] (clamped).
pub fn score_to_hex(score: f32) -> String {
    let clamped = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
    format!("{:02X}", (clamped * 255.0).round() as u8)
}
