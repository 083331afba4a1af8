use crate::error::RetrievalError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Texts in, one fixed-dimensionality vector per text out. Network, auth,
/// and rate-limit failures all collapse to `EmbeddingUnavailable` at this
/// boundary.
#[async_trait]
pub trait EmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError>;

    fn dimensions(&self) -> usize;
}

pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// A missing credential surfaces here, at startup, not at the first batch.
    pub fn new(api_key: impl Into<String>) -> Result<Self, RetrievalError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RetrievalError::MissingCredential(
                "embedding api key is empty".to_string(),
            ));
        }

        Ok(Self {
            client: Client::new(),
            api_key,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(OPENAI_EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|error| RetrievalError::EmbeddingUnavailable(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(RetrievalError::EmbeddingUnavailable(format!(
                "provider returned {status}: {detail}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|error| RetrievalError::EmbeddingUnavailable(error.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(RetrievalError::EmbeddingUnavailable(format!(
                "provider returned {} vectors for {} texts",
                parsed.data.len(),
                texts.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_a_configuration_error() {
        let result = OpenAiEmbedder::new("  ");
        assert!(matches!(
            result,
            Err(RetrievalError::MissingCredential(_))
        ));
    }

    #[test]
    fn model_override_updates_dimensions() {
        let embedder = OpenAiEmbedder::new("sk-test")
            .unwrap()
            .with_model("text-embedding-3-small", 512);
        assert_eq!(embedder.dimensions(), 512);
    }

    #[tokio::test]
    async fn embedding_no_texts_skips_the_network() {
        let embedder = OpenAiEmbedder::new("sk-test").unwrap();
        let vectors = embedder.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
