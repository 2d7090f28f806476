//! Embedding provider implementations.
//!
//! - **[`OpenAIEmbeddingProvider`]** calls `POST /v1/embeddings`.
//! - **[`OllamaEmbeddingProvider`]** calls a local Ollama instance's `/api/embed`.
//! - **[`LocalEmbeddingProvider`]** runs a fastembed model in-process (feature
//!   `local-embeddings`); no network calls after the model download.
//!
//! Remote providers share the retry loop in [`crate::http`]. Use
//! [`create_embedder`] to pick one from configuration.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use skincare_rag_core::embedding::EmbeddingProvider;

use crate::config::EmbeddingConfig;
use crate::http::{client_with_timeout, send_json_with_retry};

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAIEmbeddingProvider {
    model: String,
    dims: usize,
    api_key: String,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = remote_model(config, "OpenAI")?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            dims,
            api_key,
            url: OPENAI_EMBEDDINGS_URL.to_string(),
            max_retries: config.max_retries,
            client: client_with_timeout(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = send_json_with_retry("OpenAI embeddings API", self.max_retries, || {
            self.client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;
        indexed.push((index, to_f32_vec(embedding)));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Requires Ollama to be running with the model pulled
/// (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaEmbeddingProvider {
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = remote_model(config, "Ollama")?;
        Ok(Self {
            model,
            dims,
            url: config.url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            client: client_with_timeout(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let endpoint = format!("{}/api/embed", self.url);
        let json = send_json_with_retry("Ollama embed API", self.max_retries, || {
            self.client.post(&endpoint).json(&body)
        })
        .await
        .map_err(|e| anyhow::anyhow!("{} (is Ollama running at {}?)", e, self.url))?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;

    embeddings
        .iter()
        .map(|embedding| {
            embedding
                .as_array()
                .map(|values| to_f32_vec(values))
                .ok_or_else(|| {
                    anyhow::anyhow!("Invalid Ollama response: embedding is not an array")
                })
        })
        .collect()
}

fn to_f32_vec(values: &[serde_json::Value]) -> Vec<f32> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

fn remote_model(config: &EmbeddingConfig, provider: &str) -> Result<(String, usize)> {
    let model = config
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("embedding.model required for {} provider", provider))?;
    let dims = config
        .dims
        .filter(|d| *d > 0)
        .ok_or_else(|| anyhow::anyhow!("embedding.dims required for {} provider", provider))?;
    Ok((model, dims))
}

// ============ Local Provider (fastembed) ============

/// Embedding provider for in-process inference with fastembed.
///
/// The model is downloaded from Hugging Face on first use and cached; it
/// is loaded lazily on the first `embed` call and then reused.
#[cfg(feature = "local-embeddings")]
pub struct LocalEmbeddingProvider {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<std::sync::Mutex<Option<fastembed::TextEmbedding>>>,
}

#[cfg(feature = "local-embeddings")]
impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model_name, dims) = resolve_local_model(config);
        // Reject unknown names at startup rather than on first use.
        config_to_fastembed_model(&model_name)?;
        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size,
            model: Arc::new(std::sync::Mutex::new(None)),
        })
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let slot = self.model.clone();
        let model_name = self.model_name.clone();
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if guard.is_none() {
                tracing::info!(model = %model_name, "loading local embedding model");
                let model = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(config_to_fastembed_model(&model_name)?)
                        .with_show_download_progress(false),
                )
                .map_err(|e| anyhow::anyhow!("Failed to initialize local embedding model: {}", e))?;
                *guard = Some(model);
            }
            let model = guard
                .as_mut()
                .ok_or_else(|| anyhow::anyhow!("local embedding model unavailable"))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| anyhow::anyhow!("Local embedding failed: {}", e))
        })
        .await?
    }
}

/// Model name and dimensionality of a local model. `dims` in config wins.
pub fn resolve_local_model(config: &EmbeddingConfig) -> (String, usize) {
    let model_name = config
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());

    let dims = config.dims.unwrap_or(match model_name.as_str() {
        "all-minilm-l6-v2" | "bge-small-en-v1.5" | "multilingual-e5-small" => 384,
        "bge-base-en-v1.5" | "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => 768,
        "multilingual-e5-base" => 768,
        "bge-large-en-v1.5" | "multilingual-e5-large" => 1024,
        _ => 384,
    });

    (model_name, dims)
}

#[cfg(feature = "local-embeddings")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5, \
             multilingual-e5-small, multilingual-e5-base, multilingual-e5-large",
            other
        ),
    }
}

/// Create the configured [`EmbeddingProvider`].
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"openai"` | [`OpenAIEmbeddingProvider`] |
/// | `"ollama"` | [`OllamaEmbeddingProvider`] |
/// | `"local"` | `LocalEmbeddingProvider` (feature `local-embeddings`) |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIEmbeddingProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbeddingProvider::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Arc::new(LocalEmbeddingProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    fn ollama_config(url: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: Some("nomic-embed-text".to_string()),
            dims: Some(3),
            url: url.to_string(),
            max_retries: 0,
            ..EmbeddingConfig::default()
        }
    }

    #[test]
    fn test_openai_response_is_ordered_by_index() {
        let json = serde_json::json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]},
            ]
        });
        let vectors = parse_openai_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_malformed_responses_are_errors() {
        assert!(parse_openai_response(&serde_json::json!({"object": "list"})).is_err());
        assert!(parse_ollama_response(&serde_json::json!({"embeddings": [1, 2]})).is_err());
    }

    #[test]
    fn test_local_model_dims() {
        let mut config = EmbeddingConfig::default();
        assert_eq!(resolve_local_model(&config), ("all-minilm-l6-v2".to_string(), 384));
        config.model = Some("bge-large-en-v1.5".to_string());
        assert_eq!(resolve_local_model(&config).1, 1024);
        config.dims = Some(512);
        assert_eq!(resolve_local_model(&config).1, 512);
    }

    #[test]
    fn test_remote_provider_requires_model() {
        let mut config = ollama_config("http://localhost:11434");
        config.model = None;
        assert!(create_embedder(&config).is_err());
        config.provider = "cohere".to_string();
        assert!(create_embedder(&config).is_err());
    }

    #[tokio::test]
    async fn test_ollama_embeds_against_server() {
        let router = Router::new().route(
            "/api/embed",
            post(|Json(body): Json<serde_json::Value>| async move {
                let n = body["input"].as_array().map(|a| a.len()).unwrap_or(0);
                Json(serde_json::json!({ "embeddings": vec![vec![0.5, 0.5, 0.0]; n] }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let provider = create_embedder(&ollama_config(&format!("http://{}", addr))).unwrap();
        assert_eq!(provider.model_name(), "nomic-embed-text");
        let vectors = provider
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.5, 0.5, 0.0]);
    }

    #[tokio::test]
    async fn test_ollama_unreachable_mentions_url() {
        let provider = create_embedder(&ollama_config("http://127.0.0.1:9")).unwrap();
        let err = provider.embed(&["a".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("is Ollama running"));
    }
}
