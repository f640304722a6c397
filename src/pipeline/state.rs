//! The single mutable pipeline state owned by the orchestrator.
//!
//! Every stage result carries the generation it was started for; results for
//! any other generation are dropped. Sentiment jobs carry an extra ticket so a
//! newer request supersedes an older one within the same generation.

use tracing::debug;

use super::{PipelineStatus, Snapshot};
use crate::error::{AnalysisError, Result};
use crate::input::ParseReport;
use crate::lexicon::FrequencyTable;
use crate::merge::MergeOutcome;
use crate::model::{stakeholders, Coords, Row, Sentiment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    Stale,
}

/// Work order for one sentiment pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentJob {
    pub generation: u64,
    pub ticket: u64,
    pub texts: Vec<String>,
}

#[derive(Debug, Default)]
pub struct PipelineState {
    current: Snapshot,
    sentiment_ticket: u64,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.current
    }

    pub fn generation(&self) -> u64 {
        self.current.generation
    }

    pub fn status(&self) -> PipelineStatus {
        self.current.status
    }

    pub fn rows(&self) -> &[Row] {
        &self.current.rows
    }

    fn is_current(&mut self, generation: u64, what: &str) -> bool {
        if generation == self.current.generation {
            return true;
        }
        debug!(
            "Dropping stale {} result - generation={}, current={}",
            what, generation, self.current.generation
        );
        self.current.dropped_results += 1;
        false
    }

    /// Discard all results and start a new generation in `Parsing`.
    pub fn begin_run(&mut self) -> u64 {
        let generation = self.current.generation + 1;
        self.current = Snapshot {
            generation,
            status: PipelineStatus::Parsing,
            ..Default::default()
        };
        generation
    }

    pub fn apply_parsed(&mut self, generation: u64, rows: Vec<Row>, report: ParseReport) -> Applied {
        if !self.is_current(generation, "parse") {
            return Applied::Stale;
        }
        self.current.stakeholders = stakeholders(&rows);
        self.current.rows = rows;
        self.current.parse_report = report;
        self.current.status = PipelineStatus::Embedding;
        Applied::Applied
    }

    pub fn apply_embedded(&mut self, generation: u64, outcome: MergeOutcome) -> Applied {
        if !self.is_current(generation, "embedding") {
            return Applied::Stale;
        }
        self.current.merges = outcome.merges();
        self.current.rows = outcome.rows;
        self.current.status = PipelineStatus::Mapping;
        Applied::Applied
    }

    pub fn apply_coords(&mut self, generation: u64, coords: Vec<Coords>) -> Result<Applied> {
        if !self.is_current(generation, "mapping") {
            return Ok(Applied::Stale);
        }
        if coords.len() != self.current.rows.len() {
            return Err(AnalysisError::service(
                "mapping",
                format!("expected {} points, got {}", self.current.rows.len(), coords.len()),
            ));
        }
        for (row, c) in self.current.rows.iter_mut().zip(coords) {
            row.coords = Some(c);
        }
        self.current.status = PipelineStatus::Stemming;
        Ok(Applied::Applied)
    }

    pub fn apply_roots(&mut self, generation: u64, roots: Vec<Vec<String>>) -> Result<Applied> {
        if !self.is_current(generation, "stemming") {
            return Ok(Applied::Stale);
        }
        if roots.len() != self.current.rows.len() {
            return Err(AnalysisError::service(
                "stemming",
                format!("expected {} root lists, got {}", self.current.rows.len(), roots.len()),
            ));
        }
        for (row, r) in self.current.rows.iter_mut().zip(roots) {
            row.roots = Some(r);
        }
        self.current.frequency = FrequencyTable::from_rows(&self.current.rows);
        self.current.status = if self.current.sentiment_running {
            PipelineStatus::Sentiment
        } else {
            PipelineStatus::Complete
        };
        Ok(Applied::Applied)
    }

    /// Move to `Error`, keeping the rows as they were before the failed stage.
    pub fn fail(&mut self, generation: u64, stage: &str, err: &AnalysisError) -> Applied {
        if !self.is_current(generation, stage) {
            return Applied::Stale;
        }
        self.current.status = PipelineStatus::Error;
        self.current.error = Some(AnalysisError::stage_failure(stage, err));
        Applied::Applied
    }

    /// Start a sentiment pass over the current rows.
    pub fn begin_sentiment(&mut self) -> Result<SentimentJob> {
        let status = self.current.status;
        if !status.accepts_sentiment() || self.current.rows.is_empty() {
            return Err(AnalysisError::NotReady(format!(
                "sentiment needs analysed rows, pipeline is {}",
                status
            )));
        }

        self.sentiment_ticket += 1;
        self.current.sentiment_running = true;
        self.current.sentiment_error = None;
        if status == PipelineStatus::Complete {
            self.current.status = PipelineStatus::Sentiment;
        }

        Ok(SentimentJob {
            generation: self.current.generation,
            ticket: self.sentiment_ticket,
            texts: self.current.rows.iter().map(|r| r.text.clone()).collect(),
        })
    }

    fn is_current_sentiment(&mut self, generation: u64, ticket: u64) -> bool {
        if !self.is_current(generation, "sentiment") {
            return false;
        }
        if ticket != self.sentiment_ticket {
            debug!(
                "Dropping superseded sentiment result - ticket={}, current={}",
                ticket, self.sentiment_ticket
            );
            self.current.dropped_results += 1;
            return false;
        }
        true
    }

    fn finish_sentiment(&mut self) {
        self.current.sentiment_running = false;
        if self.current.status == PipelineStatus::Sentiment {
            self.current.status = PipelineStatus::Complete;
        }
    }

    pub fn apply_sentiment(&mut self, generation: u64, ticket: u64, results: Vec<Sentiment>) -> Result<Applied> {
        if !self.is_current_sentiment(generation, ticket) {
            return Ok(Applied::Stale);
        }
        if results.len() != self.current.rows.len() {
            return Err(AnalysisError::service(
                "sentiment",
                format!("expected {} results, got {}", self.current.rows.len(), results.len()),
            ));
        }
        for (row, s) in self.current.rows.iter_mut().zip(results) {
            row.sentiment = Some(s);
        }
        self.finish_sentiment();
        Ok(Applied::Applied)
    }

    /// Record a sentiment failure; the main status is left alone.
    pub fn fail_sentiment(&mut self, generation: u64, ticket: u64, err: &AnalysisError) -> Applied {
        if !self.is_current_sentiment(generation, ticket) {
            return Applied::Stale;
        }
        self.current.sentiment_error = Some(AnalysisError::stage_failure("Sentiment", err));
        self.finish_sentiment();
        Applied::Applied
    }
}
