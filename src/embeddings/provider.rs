use async_trait::async_trait;
use serde::Deserialize;

use super::{Embedder, HashingEmbedder};
use crate::config::{EmbedProviderKind, EmbeddingConfig};
use crate::error::{AnalysisError, Result};

pub enum EmbeddingProvider {
    OpenAI { api_key: String, model: String },
    Gemini { api_key: String, model: String },
    Ollama { endpoint: String, model: String },
    Hashing(HashingEmbedder),
}

impl EmbeddingProvider {
    /// Build the provider named in the embedding config.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| config.provider.default_model().to_string());

        match config.provider {
            EmbedProviderKind::OpenAI => {
                let api_key = std::env::var("OPENAI_API_KEY")
                    .map_err(|_| AnalysisError::Config("OPENAI_API_KEY not set".into()))?;
                Ok(Self::OpenAI { api_key, model })
            }
            EmbedProviderKind::Gemini => {
                let api_key = std::env::var("GEMINI_API_KEY")
                    .map_err(|_| AnalysisError::Config("GEMINI_API_KEY not set".into()))?;
                Ok(Self::Gemini { api_key, model })
            }
            EmbedProviderKind::Ollama => {
                let endpoint = std::env::var("OLLAMA_HOST")
                    .unwrap_or_else(|_| "http://localhost:11434".to_string());
                Ok(Self::Ollama { endpoint, model })
            }
            EmbedProviderKind::Hashing => Ok(Self::Hashing(HashingEmbedder::new(config.dimensions))),
        }
    }

    async fn embed_openai(&self, texts: &[String], api_key: &str, model: &str) -> Result<Vec<Vec<f32>>> {
        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            index: usize,
            embedding: Vec<f32>,
        }

        let client = reqwest::Client::new();
        let response = client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&serde_json::json!({
                "model": model,
                "input": texts,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AnalysisError::service("embedding", format!("OpenAI API error: {}", text)));
        }

        let mut result: EmbeddingResponse = response.json().await?;
        // The API documents `index`; sort so output order always matches input order
        result.data.sort_by_key(|d| d.index);
        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }

    async fn embed_gemini(&self, texts: &[String], api_key: &str, model: &str) -> Result<Vec<Vec<f32>>> {
        let client = reqwest::Client::new();
        let mut embeddings = Vec::new();

        for text in texts {
            let response = client
                .post(format!(
                    "https://generativelanguage.googleapis.com/v1/models/{}:embedContent?key={}",
                    model, api_key
                ))
                .json(&serde_json::json!({
                    "content": {
                        "parts": [{
                            "text": text
                        }]
                    }
                }))
                .send()
                .await?;

            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(AnalysisError::service("embedding", format!("Gemini API error: {}", text)));
            }

            let result: serde_json::Value = response.json().await?;
            embeddings.push(parse_float_array(
                result.get("embedding").and_then(|e| e.get("values")),
                "Gemini",
            )?);
        }

        Ok(embeddings)
    }

    async fn embed_ollama(&self, texts: &[String], endpoint: &str, model: &str) -> Result<Vec<Vec<f32>>> {
        let client = reqwest::Client::new();
        let mut embeddings = Vec::new();

        for text in texts {
            let response = client
                .post(format!("{}/api/embeddings", endpoint.trim_end_matches('/')))
                .json(&serde_json::json!({
                    "model": model,
                    "prompt": text,
                }))
                .send()
                .await?;

            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(AnalysisError::service("embedding", format!("Ollama API error: {}", text)));
            }

            let result: serde_json::Value = response.json().await?;
            embeddings.push(parse_float_array(result.get("embedding"), "Ollama")?);
        }

        Ok(embeddings)
    }
}

/// Strict conversion of a JSON number array; any non-number is a malformed response.
fn parse_float_array(value: Option<&serde_json::Value>, provider: &str) -> Result<Vec<f32>> {
    let arr = value.and_then(|v| v.as_array()).ok_or_else(|| {
        AnalysisError::service("embedding", format!("Invalid {} embedding response", provider))
    })?;
    arr.iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                AnalysisError::service(
                    "embedding",
                    format!("{} embedding contains a non-numeric value", provider),
                )
            })
        })
        .collect()
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            Self::OpenAI { api_key, model } => self.embed_openai(texts, api_key, model).await,
            Self::Gemini { api_key, model } => self.embed_gemini(texts, api_key, model).await,
            Self::Ollama { endpoint, model } => self.embed_ollama(texts, endpoint, model).await,
            Self::Hashing(h) => h.embed_batch(texts).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::OpenAI { .. } => "openai",
            Self::Gemini { .. } => "gemini",
            Self::Ollama { .. } => "ollama",
            Self::Hashing(_) => "hashing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_provider_needs_no_credentials() {
        let provider = EmbeddingProvider::from_config(&EmbeddingConfig::default()).unwrap();
        assert_eq!(provider.name(), "hashing");
    }

    #[test]
    fn test_parse_float_array_rejects_strings() {
        let v = serde_json::json!([0.1, "oops"]);
        assert!(parse_float_array(Some(&v), "Ollama").is_err());
        assert!(parse_float_array(None, "Ollama").is_err());
    }

    #[test]
    fn test_parse_float_array_ok() {
        let v = serde_json::json!([0.5, -1.0]);
        assert_eq!(parse_float_array(Some(&v), "Gemini").unwrap(), vec![0.5, -1.0]);
    }
}
