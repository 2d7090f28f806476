//! Pipeline orchestration: index lifecycle and recommendation requests.
//!
//! A [`Pipeline`] owns the resident index and is shared (`Arc`) by every
//! request. The index is published as an `Arc<Index>` behind a short-lived
//! `RwLock`: a request clones the `Arc` once and searches that snapshot, so
//! a concurrent rebuild (serialised by an async mutex, built aside, then
//! swapped in) is never observed half-way.
//!
//! # Request flow
//!
//! ```text
//! UserProfile ─▶ format_query ─▶ Indexer::search ─▶ build_prompt
//!             ─▶ CompletionProvider::complete ─▶ parse_response ─▶ Recommendation
//! ```
//!
//! [`Pipeline::generate`] never fails: empty retrieval short-circuits to the
//! insufficient-information result, and any error becomes the degraded
//! result after being logged.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use thiserror::Error;

use skincare_rag_core::chunk::chunk_corpus;
use skincare_rag_core::completion::CompletionProvider;
use skincare_rag_core::corpus::DocumentSource;
use skincare_rag_core::index::{Index, IndexError, IndexManifest, Indexer};
use skincare_rag_core::models::{DegradedCause, Recommendation, ScoredChunk, UserProfile};
use skincare_rag_core::prompt::build_prompt;
use skincare_rag_core::query::format_query;
use skincare_rag_core::response::parse_response;

use crate::completion::create_completion;
use crate::config::Config;
use crate::documents::FsDocumentSource;
use crate::embedding::create_embedder;
use crate::index::{create_indexer, create_store};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("failed to load documents: {0:#}")]
    Documents(anyhow::Error),
    #[error("completion failed: {0:#}")]
    Completion(anyhow::Error),
}

/// Chunking and retrieval parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub max_chars: usize,
    pub overlap_chars: usize,
    pub top_k: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_chars: 800,
            overlap_chars: 100,
            top_k: 5,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_chars: config.chunking.max_chars,
            overlap_chars: config.chunking.overlap_chars,
            top_k: config.retrieval.top_k,
        }
    }
}

/// Whether an index is resident.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexState {
    Uninitialized,
    Ready(IndexManifest),
}

/// What [`Pipeline::rebuild_index`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// A persisted index was loaded.
    Loaded { chunks: usize },
    /// A new index was built from the documents and persisted.
    Built { documents: usize, chunks: usize },
}

/// Result of chunking the corpus without embedding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusPlan {
    pub documents: usize,
    pub chunks: usize,
}

pub struct Pipeline {
    indexer: Indexer,
    documents: Arc<dyn DocumentSource>,
    completion: Option<Arc<dyn CompletionProvider>>,
    settings: PipelineSettings,
    current: RwLock<Option<Arc<Index>>>,
    rebuild_lock: tokio::sync::Mutex<()>,
}

impl Pipeline {
    pub fn new(
        indexer: Indexer,
        documents: Arc<dyn DocumentSource>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            indexer,
            documents,
            completion: None,
            settings,
            current: RwLock::new(None),
            rebuild_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_completion(mut self, completion: Arc<dyn CompletionProvider>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Build a pipeline for indexing and raw retrieval only; no model is
    /// configured, so [`Pipeline::generate`] degrades.
    pub async fn retrieval_from_config(config: &Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let store = create_store(config).await?;
        let indexer = create_indexer(config, embedder, store)?;
        let documents = Arc::new(FsDocumentSource::new(config.documents.clone()));
        Ok(Self::new(
            indexer,
            documents,
            PipelineSettings::from_config(config),
        ))
    }

    /// Build the full pipeline, including the completion provider.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let completion = create_completion(&config.llm)?;
        Ok(Self::retrieval_from_config(config)
            .await?
            .with_completion(completion))
    }

    pub fn settings(&self) -> PipelineSettings {
        self.settings
    }

    pub fn state(&self) -> IndexState {
        match self.current_index() {
            Some(index) => IndexState::Ready(index.manifest().clone()),
            None => IndexState::Uninitialized,
        }
    }

    /// Snapshot of the resident index.
    pub fn current_index(&self) -> Option<Arc<Index>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make `index` the resident index. Readers holding the previous
    /// snapshot keep using it until they finish.
    pub fn publish(&self, index: Index) {
        let index = Arc::new(index);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(index);
    }

    /// Load the persisted index or (re)build it from the documents.
    ///
    /// With `force = false`, a load failure of any kind is logged and
    /// followed by a rebuild. With `force = true` the load is skipped.
    /// On error the previously published index stays live.
    pub async fn rebuild_index(&self, force: bool) -> Result<IndexOutcome, PipelineError> {
        let _guard = self.rebuild_lock.lock().await;

        if !force {
            match self.indexer.load().await {
                Ok(index) => {
                    let chunks = index.len();
                    tracing::info!(
                        location = %self.indexer.store_location(),
                        chunks,
                        "loaded persisted index"
                    );
                    self.publish(index);
                    return Ok(IndexOutcome::Loaded { chunks });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not load persisted index, rebuilding");
                }
            }
        }

        tracing::info!(source = %self.documents.describe(), "building index from documents");
        let documents = self
            .documents
            .load_documents()
            .await
            .map_err(PipelineError::Documents)?;
        let chunks = chunk_corpus(
            &documents,
            self.settings.max_chars,
            self.settings.overlap_chars,
        );
        let outcome = IndexOutcome::Built {
            documents: documents.len(),
            chunks: chunks.len(),
        };

        let index = self.indexer.build(chunks).await?;
        self.indexer.persist(&index).await?;
        self.publish(index);
        tracing::info!(?outcome, "index ready");
        Ok(outcome)
    }

    /// Load the persisted index and publish it, without falling back to a
    /// rebuild. Returns the number of chunks.
    pub async fn load_index(&self) -> Result<usize, PipelineError> {
        let _guard = self.rebuild_lock.lock().await;
        let index = self.indexer.load().await?;
        let chunks = index.len();
        self.publish(index);
        Ok(chunks)
    }

    /// Load and chunk the documents without embedding anything.
    pub async fn plan(&self) -> Result<CorpusPlan, PipelineError> {
        let documents = self
            .documents
            .load_documents()
            .await
            .map_err(PipelineError::Documents)?;
        let chunks = chunk_corpus(
            &documents,
            self.settings.max_chars,
            self.settings.overlap_chars,
        );
        Ok(CorpusPlan {
            documents: documents.len(),
            chunks: chunks.len(),
        })
    }

    /// Raw retrieval against the resident index.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, PipelineError> {
        let index = self.current_index();
        Ok(self.indexer.search(index.as_deref(), query, k).await?)
    }

    /// Produce a recommendation for `profile`. Never fails.
    pub async fn generate(&self, profile: &UserProfile) -> Recommendation {
        let mut sources = BTreeSet::new();
        match self.try_generate(profile, &mut sources).await {
            Ok(recommendation) => recommendation,
            Err(e) => {
                tracing::error!(error = %e, "recommendation generation failed");
                Recommendation::degraded(DegradedCause::SystemError, sources)
            }
        }
    }

    async fn try_generate(
        &self,
        profile: &UserProfile,
        sources: &mut BTreeSet<String>,
    ) -> Result<Recommendation, PipelineError> {
        let query = format_query(profile);
        tracing::info!(%query, "retrieving context");

        let hits = self.search(&query, self.settings.top_k).await?;
        if hits.is_empty() {
            tracing::info!("no context retrieved, returning insufficient-information result");
            return Ok(Recommendation::insufficient_information());
        }
        sources.extend(hits.iter().map(|h| h.chunk.source_id.clone()));

        let completion = self.completion.as_ref().ok_or_else(|| {
            PipelineError::Completion(anyhow::anyhow!("no completion provider configured"))
        })?;
        let prompt = build_prompt(&hits, profile);
        tracing::debug!(
            model = completion.model_name(),
            prompt_chars = prompt.len(),
            chunks = hits.len(),
            "calling completion provider"
        );
        let raw = completion
            .complete(&prompt)
            .await
            .map_err(PipelineError::Completion)?;
        tracing::debug!(response_chars = raw.len(), "model responded");

        Ok(parse_response(&raw, sources))
    }
}
