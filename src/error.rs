use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Malformed input on line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("Input contains no usable responses")]
    EmptyInput,

    #[error("{stage} service failed: {message}")]
    Service { stage: &'static str, message: String },

    #[error("Reduction failed: {0}")]
    Reduction(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Pipeline channel closed")]
    ChannelClosed,
}

impl AnalysisError {
    pub fn service(stage: &'static str, message: impl Into<String>) -> Self {
        AnalysisError::Service {
            stage,
            message: message.into(),
        }
    }

    /// Human-readable message shown in the pipeline status when `stage` fails.
    pub fn stage_failure(stage: &str, err: &AnalysisError) -> String {
        format!("{} failed: {}", stage, err)
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
