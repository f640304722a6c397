//! Analysis pipeline: status, published snapshots and the orchestrator that
//! drives Parsing -> Embedding -> Mapping -> Stemming -> Complete.

pub mod orchestrator;
pub mod stages;
pub mod state;

use std::fmt;

use serde::Serialize;

use crate::input::ParseReport;
use crate::lexicon::FrequencyTable;
use crate::model::Row;

pub use orchestrator::{Orchestrator, OrchestratorHandle, Services};
pub use state::{Applied, PipelineState, SentimentJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    #[default]
    Pending,
    Parsing,
    Embedding,
    Mapping,
    Stemming,
    Complete,
    /// Sentiment side-state entered from `Complete`
    Sentiment,
    Error,
}

impl PipelineStatus {
    /// No further stage will run for the current generation.
    pub fn is_settled(&self) -> bool {
        matches!(self, PipelineStatus::Complete | PipelineStatus::Error)
    }

    /// Row structure is final, so per-row sentiment can be attached.
    pub fn accepts_sentiment(&self) -> bool {
        matches!(
            self,
            PipelineStatus::Mapping
                | PipelineStatus::Stemming
                | PipelineStatus::Complete
                | PipelineStatus::Sentiment
                | PipelineStatus::Error
        )
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Pending => "pending",
            PipelineStatus::Parsing => "parsing",
            PipelineStatus::Embedding => "embedding",
            PipelineStatus::Mapping => "mapping",
            PipelineStatus::Stemming => "stemming",
            PipelineStatus::Complete => "complete",
            PipelineStatus::Sentiment => "sentiment",
            PipelineStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Read-only view of the pipeline handed to consumers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub generation: u64,
    pub status: PipelineStatus,
    pub rows: Vec<Row>,
    pub stakeholders: Vec<String>,
    pub frequency: FrequencyTable,
    pub parse_report: ParseReport,
    pub merges: usize,
    pub error: Option<String>,
    pub sentiment_running: bool,
    pub sentiment_error: Option<String>,
    /// Results from superseded runs discarded during this generation
    pub dropped_results: u64,
}

impl Snapshot {
    pub fn has_sentiment(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| r.sentiment.is_some())
    }
}
