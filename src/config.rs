use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};

/// Number of texts sent to a model service per request
pub const DEFAULT_BATCH_SIZE: usize = 50;
/// Cosine similarity above which adjacent sentences of one response merge
pub const DEFAULT_MERGE_THRESHOLD: f32 = 0.4;
/// Embedding dimensionality above which PCA runs before the layout step
pub const DEFAULT_PCA_CUTOFF: usize = 120;
/// Frequency entries below this count are hidden from displayed lists
pub const DEFAULT_MIN_DISPLAY_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedProviderKind {
    OpenAI,
    Gemini,
    Ollama,
    Hashing,
}

impl EmbedProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            EmbedProviderKind::OpenAI => "text-embedding-3-small",
            EmbedProviderKind::Gemini => "text-embedding-004",
            EmbedProviderKind::Ollama => "nomic-embed-text",
            EmbedProviderKind::Hashing => "hashing-v1",
        }
    }

    pub fn env_var_name(&self) -> Option<&'static str> {
        match self {
            EmbedProviderKind::OpenAI => Some("OPENAI_API_KEY"),
            EmbedProviderKind::Gemini => Some("GEMINI_API_KEY"),
            EmbedProviderKind::Ollama | EmbedProviderKind::Hashing => None,
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "gpt" => Some(EmbedProviderKind::OpenAI),
            "gemini" | "google" => Some(EmbedProviderKind::Gemini),
            "ollama" | "local" => Some(EmbedProviderKind::Ollama),
            "hashing" | "hash" | "offline" => Some(EmbedProviderKind::Hashing),
            _ => None,
        }
    }
}

impl fmt::Display for EmbedProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedProviderKind::OpenAI => write!(f, "openai"),
            EmbedProviderKind::Gemini => write!(f, "gemini"),
            EmbedProviderKind::Ollama => write!(f, "ollama"),
            EmbedProviderKind::Hashing => write!(f, "hashing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbedProviderKind,
    /// Model name; `None` uses the provider default
    pub model: Option<String>,
    pub batch_size: usize,
    /// Output dimensionality of the offline hashing embedder
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbedProviderKind::Hashing,
            model: None,
            batch_size: DEFAULT_BATCH_SIZE,
            dimensions: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub threshold: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MERGE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    pub pca_cutoff: usize,
    pub max_neighbors: usize,
    pub spread: f32,
    pub min_dist: f32,
    pub epochs: usize,
    pub seed: u64,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            pca_cutoff: DEFAULT_PCA_CUTOFF,
            max_neighbors: 15,
            spread: 2.0,
            min_dist: 0.1,
            epochs: 200,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub batch_size: usize,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyConfig {
    pub min_display_count: usize,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            min_display_count: DEFAULT_MIN_DISPLAY_COUNT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub merge: MergeConfig,
    pub reduction: ReductionConfig,
    pub sentiment: SentimentConfig,
    pub frequency: FrequencyConfig,
}

impl Config {
    /// Load configuration.
    ///
    /// Lookup order: `path`, then `$SCATTERLENS_CONFIG`, then
    /// `<config_dir>/scatterlens/config.json`, then built-in defaults.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("SCATTERLENS_CONFIG").ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(p) => {
                if !p.exists() {
                    return Err(AnalysisError::Config(format!(
                        "config file not found: {}",
                        p.display()
                    )));
                }
                Self::from_file(&p)?
            }
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("scatterlens").join("config.json"))
    }

    fn apply_env(&mut self) {
        if let Ok(p) = std::env::var("SCATTERLENS_EMBED_PROVIDER") {
            if let Some(kind) = EmbedProviderKind::from_str_loose(&p) {
                self.embedding.provider = kind;
            }
        }
        if let Ok(m) = std::env::var("SCATTERLENS_EMBED_MODEL") {
            if !m.trim().is_empty() {
                self.embedding.model = Some(m);
            }
        }
        if let Ok(t) = std::env::var("SCATTERLENS_MERGE_THRESHOLD") {
            if let Ok(v) = t.parse::<f32>() {
                self.merge.threshold = v;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding.batch_size == 0 || self.sentiment.batch_size == 0 {
            return Err(AnalysisError::Config("batch_size must be at least 1".into()));
        }
        if self.embedding.dimensions == 0 {
            return Err(AnalysisError::Config("embedding.dimensions must be at least 1".into()));
        }
        if !(-1.0..=1.0).contains(&self.merge.threshold) {
            return Err(AnalysisError::Config(format!(
                "merge.threshold must be within [-1, 1], got {}",
                self.merge.threshold
            )));
        }
        if self.reduction.max_neighbors < 2 {
            return Err(AnalysisError::Config("reduction.max_neighbors must be at least 2".into()));
        }
        if self.reduction.spread <= 0.0 || self.reduction.min_dist < 0.0 {
            return Err(AnalysisError::Config(
                "reduction.spread must be positive and min_dist non-negative".into(),
            ));
        }
        Ok(())
    }

    pub fn embedding_model(&self) -> String {
        self.embedding
            .model
            .clone()
            .unwrap_or_else(|| self.embedding.provider.default_model().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let c = Config::default();
        assert_eq!(c.embedding.batch_size, 50);
        assert!((c.merge.threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(c.reduction.pca_cutoff, 120);
        assert_eq!(c.reduction.max_neighbors, 15);
        assert_eq!(c.frequency.min_display_count, 5);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "merge": { "threshold": 0.8 } }"#).unwrap();
        let c = Config::from_file(&path).unwrap();
        assert!((c.merge.threshold - 0.8).abs() < f32::EPSILON);
        assert_eq!(c.embedding.batch_size, 50);
        assert_eq!(c.embedding.provider, EmbedProviderKind::Hashing);
    }

    #[test]
    fn test_missing_explicit_path_errors() {
        let err = Config::load(Some(Path::new("/nonexistent/scatterlens.json"))).unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut c = Config::default();
        c.embedding.batch_size = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_threshold_out_of_range() {
        let mut c = Config::default();
        c.merge.threshold = 1.5;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_provider_loose_parsing() {
        assert_eq!(EmbedProviderKind::from_str_loose("OpenAI"), Some(EmbedProviderKind::OpenAI));
        assert_eq!(EmbedProviderKind::from_str_loose("offline"), Some(EmbedProviderKind::Hashing));
        assert_eq!(EmbedProviderKind::from_str_loose("nope"), None);
    }
}
