//! Embedding providers
//!
//! Two remote providers (OpenAI-compatible embeddings through `async_openai`
//! and Ollama's `/api/embed`) plus a local feature-hashing provider that needs
//! no network and produces identical vectors for identical text.

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::embeddings::CreateEmbeddingRequestArgs;
use async_openai::Client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Embedding failures
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Transport failure talking to the provider
    #[error("Embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The OpenAI-compatible API rejected the request or could not be reached
    #[error("Embedding request failed: {0}")]
    OpenAI(#[from] OpenAIError),

    /// The provider answered with a non-success status
    #[error("Embedding provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response could not be interpreted
    #[error("Malformed embedding response: {0}")]
    Malformed(String),

    /// Configuration is incomplete
    #[error("Embedding configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Turns text into vectors
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts; the result has one vector per input, in order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    OpenAI,
    Ollama,
    Hashing,
}

/// Embedding settings, deserialized from the `[embeddings]` config table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Vector size of the hashing provider
    pub dimension: usize,
    /// Rows per embedding request when building an index
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::OpenAI,
            model: "text-embedding-3-small".to_string(),
            base_url: None,
            api_key: None,
            dimension: 256,
            batch_size: 64,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn hashing(dimension: usize) -> Self {
        Self {
            provider: EmbeddingProviderKind::Hashing,
            dimension,
            ..Self::default()
        }
    }

    /// Build the configured provider
    pub fn build(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let timeout = Duration::from_secs(self.timeout_secs.max(1));
        let provider: Arc<dyn EmbeddingProvider> = match self.provider {
            EmbeddingProviderKind::OpenAI => {
                let base_url = self
                    .base_url
                    .clone()
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
                Arc::new(OpenAiEmbeddings::new(
                    base_url,
                    self.api_key.clone(),
                    self.model.clone(),
                    timeout,
                )?)
            }
            EmbeddingProviderKind::Ollama => {
                let base_url = self
                    .base_url
                    .clone()
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| "http://localhost:11434".to_string());
                Arc::new(OllamaEmbeddings::new(base_url, self.model.clone(), timeout)?)
            }
            EmbeddingProviderKind::Hashing => Arc::new(HashingEmbeddings::new(self.dimension)),
        };
        info!("Embedding provider: {} ({})", provider.name(), self.model);
        Ok(provider)
    }
}

// ============================================================================
// OpenAI-compatible
// ============================================================================

pub struct OpenAiEmbeddings {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEmbeddings {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let mut config = OpenAIConfig::new().with_api_base(base_url.trim_end_matches('/'));
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            config = config.with_api_key(key);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client: Client::with_config(config).with_http_client(http),
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::Malformed("empty data".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.as_str())
            .input(texts.to_vec())
            .build()?;
        let mut response = self.client.embeddings().create(request).await?;

        if response.data.len() != texts.len() {
            return Err(EmbeddingError::Malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }
        response.data.sort_by_key(|d| d.index);
        debug!("Embedded {} texts via OpenAI", texts.len());
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

// ============================================================================
// Ollama
// ============================================================================

pub struct OllamaEmbeddings {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddings {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::Malformed("no embeddings".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&serde_json::json!({ "model": self.model, "input": texts }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: OllamaEmbedResponse = response.json().await?;
        if parsed.embeddings.len() != texts.len() {
            return Err(EmbeddingError::Malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

// ============================================================================
// Local feature hashing
// ============================================================================

/// Bag-of-words vectors via signed feature hashing
///
/// Lexical rather than semantic, but deterministic and offline.
#[derive(Debug, Clone)]
pub struct HashingEmbeddings {
    dimension: usize,
}

impl HashingEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(8),
        }
    }

    fn fnv1a(bytes: &[u8]) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for b in bytes {
            hash ^= u64::from(*b);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        let tokens = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty());

        for token in tokens {
            let hash = Self::fnv1a(token.as_bytes());
            let slot = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            v[slot] += sign;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddings {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }
}
