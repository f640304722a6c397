use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;

use crate::model::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Descending count, ties in first-seen order
    #[default]
    Count,
    /// Alphabetical by root
    Alpha,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "count" => Ok(SortOrder::Count),
            "alpha" | "alphabetical" => Ok(SortOrder::Alpha),
            other => Err(format!("unknown sort order '{}' (expected count or alpha)", other)),
        }
    }
}

/// Corpus-wide root counts, remembering the order in which roots first appeared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrequencyTable {
    entries: Vec<(String, usize)>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from per-row root lists, visited in order.
    pub fn build<'a, I>(roots: I) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let mut table = Self::new();
        for list in roots {
            for root in list {
                table.add(root);
            }
        }
        table
    }

    pub fn from_rows(rows: &[Row]) -> Self {
        Self::build(rows.iter().filter_map(|r| r.roots.as_deref()))
    }

    pub fn add(&mut self, root: &str) {
        match self.index.get(root) {
            Some(&pos) => self.entries[pos].1 += 1,
            None => {
                self.index.insert(root.to_string(), self.entries.len());
                self.entries.push((root.to_string(), 1));
            }
        }
    }

    pub fn count(&self, root: &str) -> usize {
        self.index.get(root).map_or(0, |&pos| self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total root occurrences
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    /// Entries in first-seen order.
    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    pub fn sorted(&self, order: SortOrder) -> Vec<(String, usize)> {
        let mut out = self.entries.clone();
        match order {
            // sort_by is stable, so equal counts keep first-seen order
            SortOrder::Count => out.sort_by(|a, b| b.1.cmp(&a.1)),
            SortOrder::Alpha => out.sort_by(|a, b| a.0.cmp(&b.0)),
        }
        out
    }

    /// Displayed list: entries with `count >= min_count`, in `order`.
    ///
    /// Only the presentation is filtered; the table keeps every root.
    pub fn display(&self, min_count: usize, order: SortOrder) -> Vec<(String, usize)> {
        self.sorted(order)
            .into_iter()
            .filter(|(_, c)| *c >= min_count)
            .collect()
    }
}
