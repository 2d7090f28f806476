//! TOML configuration.
//!
//! Every section has defaults, so an empty file is a valid configuration.
//! [`load_config`] reads, parses and validates; [`Config::validate`] holds
//! the rules so tests can check them without touching the filesystem.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use skincare_rag_core::embedding::Metric;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    #[serde(default = "default_documents_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            root: default_documents_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_documents_root() -> PathBuf {
    PathBuf::from("./Data")
}
fn default_include_globs() -> Vec<String> {
    ["**/*.pdf", "**/*.txt", "**/*.md", "**/*.docx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    800
}
fn default_overlap_chars() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    #[serde(default = "default_metric")]
    pub metric: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_index_path(),
            metric: default_metric(),
        }
    }
}

impl IndexConfig {
    /// The configured metric. Only meaningful after validation.
    pub fn metric(&self) -> Result<Metric> {
        self.metric
            .parse::<Metric>()
            .map_err(|e| anyhow::anyhow!("index.metric: {}", e))
    }
}

fn default_backend() -> String {
    "file".to_string()
}
fn default_index_path() -> PathBuf {
    PathBuf::from("./data/index")
}
fn default_metric() -> String {
    "cosine".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: default_ollama_url(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_remote(&self) -> bool {
        matches!(self.provider.as_str(), "openai" | "ollama")
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: None,
            api_key_env: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_llm_max_retries(),
        }
    }
}

impl LlmConfig {
    /// Environment variable holding the API key, falling back to the
    /// provider's conventional name.
    pub fn api_key_var(&self) -> &str {
        match (&self.api_key_env, self.provider.as_str()) {
            (Some(var), _) => var,
            (None, "anthropic") => "ANTHROPIC_API_KEY",
            (None, _) => "OPENAI_API_KEY",
        }
    }

    pub fn base_url(&self) -> &str {
        match (&self.base_url, self.provider.as_str()) {
            (Some(url), _) => url.trim_end_matches('/'),
            (None, "anthropic") => "https://api.anthropic.com",
            (None, _) => "https://api.openai.com/v1",
        }
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    1500
}
fn default_llm_timeout_secs() -> u64 {
    60
}
fn default_llm_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Chunking
        if self.chunking.max_chars == 0 {
            anyhow::bail!("chunking.max_chars must be > 0");
        }
        if self.chunking.overlap_chars >= self.chunking.max_chars {
            anyhow::bail!(
                "chunking.overlap_chars ({}) must be smaller than chunking.max_chars ({})",
                self.chunking.overlap_chars,
                self.chunking.max_chars
            );
        }

        // Retrieval
        if self.retrieval.top_k < 1 {
            anyhow::bail!("retrieval.top_k must be >= 1");
        }

        // Index
        match self.index.backend.as_str() {
            "file" | "sqlite" | "memory" => {}
            other => anyhow::bail!(
                "Unknown index backend: '{}'. Must be file, sqlite, or memory.",
                other
            ),
        }
        self.index.metric()?;

        // Embedding
        match self.embedding.provider.as_str() {
            "local" | "openai" | "ollama" => {}
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be local, openai, or ollama.",
                other
            ),
        }
        if self.embedding.batch_size < 1 {
            anyhow::bail!("embedding.batch_size must be >= 1");
        }
        if self.embedding.is_remote() {
            if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                anyhow::bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    self.embedding.provider
                );
            }
            if self.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    self.embedding.provider
                );
            }
        }

        // LLM
        match self.llm.provider.as_str() {
            "openai" | "anthropic" => {}
            other => anyhow::bail!(
                "Unknown llm provider: '{}'. Must be openai or anthropic.",
                other
            ),
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    Config::from_toml_str(&content)
}
