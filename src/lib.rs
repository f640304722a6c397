// Library interface for scatterlens

pub mod cli;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod export;
pub mod filter;
pub mod input;
pub mod lexicon;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod reduction;
pub mod sample;
pub mod segment;
pub mod sentiment;
pub mod testing;

// Re-export commonly used types
pub use config::Config;
pub use error::{AnalysisError, Result};
pub use model::{Coords, Row, RowKey, Sentiment};
pub use pipeline::{Orchestrator, OrchestratorHandle, PipelineStatus, Services, Snapshot};
