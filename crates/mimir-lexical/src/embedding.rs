//! Voyage Code 3 API client for embedding chunks.
//!
//! Batch embedding for indexing (`input_type: "document"`) and single
//! queries for search (`input_type: "query"`). Embedding is optional: an
//! unconfigured key simply leaves the BLOB column empty.

use mimir_core::{EmbeddingConfig, MimirError};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.voyageai.com/v1";
const BATCH_SIZE: usize = 64;
const BATCH_DELAY_MS: u64 = 200;

/// Client for the Voyage embedding API.
///
/// # Examples
///
/// ```
/// use mimir_lexical::embedding::EmbeddingClient;
///
/// let client = EmbeddingClient::new("test-key", "voyage-code-3");
/// assert_eq!(client.model(), "voyage-code-3");
/// ```
pub struct EmbeddingClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
    input_type: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDataItem>,
}

#[derive(Deserialize)]
struct EmbedDataItem {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    /// Create a new client with the given API key and model.
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.to_string(),
        }
    }

    /// Create a client from an [`EmbeddingConfig`].
    ///
    /// Falls back to the `VOYAGE_API_KEY` env var if no key is configured.
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Config`] if no API key is available.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mimir_core::EmbeddingConfig;
    /// use mimir_lexical::embedding::EmbeddingClient;
    ///
    /// let config = EmbeddingConfig::default();
    /// let client = EmbeddingClient::with_config(&config).unwrap();
    /// ```
    pub fn with_config(config: &EmbeddingConfig) -> Result<Self, MimirError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("VOYAGE_API_KEY").ok())
            .ok_or_else(|| {
                MimirError::Config(
                    "embedding API key not found: set embedding.api_key in .mimir.toml or VOYAGE_API_KEY env var".into(),
                )
            })?;

        Ok(Self::new(&api_key, &config.model))
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a batch of texts for indexing. Returns vectors in order.
    ///
    /// Splits into sub-batches of 64 with 200 ms delays for rate limiting.
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Embedding`] if the API call fails.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MimirError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for (i, batch) in texts.chunks(BATCH_SIZE).enumerate() {
            if i > 0 {
                tokio::time::sleep(tokio::time::Duration::from_millis(BATCH_DELAY_MS)).await;
            }
            let embeddings = self.call_api(batch.to_vec(), "document").await?;
            all_embeddings.extend(embeddings);
        }
        Ok(all_embeddings)
    }

    /// Embed a single search query (`input_type: "query"`).
    ///
    /// # Errors
    ///
    /// Returns [`MimirError::Embedding`] if the API call fails or returns
    /// an empty response.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, MimirError> {
        let mut embeddings = self.call_api(vec![query.to_string()], "query").await?;
        if embeddings.is_empty() {
            return Err(MimirError::Embedding("empty response from Voyage API".into()));
        }
        Ok(embeddings.remove(0))
    }

    async fn call_api(
        &self,
        input: Vec<String>,
        input_type: &str,
    ) -> Result<Vec<Vec<f32>>, MimirError> {
        let request = EmbedRequest {
            model: self.model.clone(),
            input,
            input_type: input_type.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| MimirError::Embedding(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".into());
            return Err(MimirError::Embedding(format!(
                "Voyage API returned {status}: {body}"
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| MimirError::Embedding(format!("failed to parse response: {e}")))?;

        Ok(embed_response
            .data
            .into_iter()
            .map(|item| item.embedding)
            .collect())
    }

    /// Build the JSON request body (for testing).
    #[cfg(test)]
    fn build_request(&self, texts: &[String], input_type: &str) -> EmbedRequest {
        EmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
            input_type: input_type.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_format_is_correct() {
        let client = EmbeddingClient::new("test-key", "voyage-code-3");
        let texts = vec!["class Pawn { }".to_string(), "<ThingDef/>".to_string()];
        let request = client.build_request(&texts, "document");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "voyage-code-3");
        assert_eq!(json["input_type"], "document");
        assert_eq!(json["input"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn response_parsing_works() {
        let json = r#"{
            "data": [
                {"embedding": [0.1, 0.2, 0.3]},
                {"embedding": [0.4, 0.5, 0.6]}
            ]
        }"#;
        let response: EmbedResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data[1].embedding, vec![0.4, 0.5, 0.6]);
    }

    #[test]
    fn batch_splitting_calculates_correctly() {
        let texts: Vec<String> = (0..150).map(|i| format!("text {i}")).collect();
        let batches: Vec<&[String]> = texts.chunks(BATCH_SIZE).collect();
        assert_eq!(batches.len(), 3); // 64 + 64 + 22
        assert_eq!(batches[2].len(), 22);
    }

    #[test]
    fn missing_api_key_gives_clear_error() {
        std::env::remove_var("VOYAGE_API_KEY");
        let config = EmbeddingConfig {
            api_key: None,
            ..EmbeddingConfig::default()
        };
        let result = EmbeddingClient::with_config(&config);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("API key"), "error should mention API key: {err}");
    }
}
