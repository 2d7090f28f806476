//! Vector index, its persistence seam, and the [`Indexer`] capability.
//!
//! An [`Index`] is a flat, append-ordered collection of [`IndexEntry`]s plus
//! an [`IndexManifest`] describing how it was built. Search is brute force
//! over every entry, which is fine for a curated document corpus.
//!
//! Where an index lives is owned by an [`IndexStore`] backend chosen once at
//! construction: on-disk file layout and SQLite stores live in the app
//! crate, [`memory::InMemoryIndexStore`] lives here.
//!
//! # Search ordering
//!
//! Results are sorted by non-increasing score. Ties keep insertion order
//! (the stable sort preserves the order chunks were passed to
//! [`Indexer::build`]). NaN scores sort last.

pub mod memory;

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::embedding::{embed_one, EmbeddingProvider, Metric};
use crate::models::{Chunk, IndexEntry, ScoredChunk};

/// Bumped whenever the persisted layout changes incompatibly.
pub const INDEX_FORMAT_VERSION: u32 = 1;

const DEFAULT_BATCH_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,
    #[error("no index found at {location}")]
    NotFound { location: String },
    #[error("index at {location} is corrupt: {reason}")]
    Corrupt { location: String, reason: String },
    #[error("index has not been initialized")]
    NotInitialized,
    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),
    #[error("index storage failed: {0:#}")]
    Storage(anyhow::Error),
}

impl IndexError {
    pub fn corrupt(location: impl Into<String>, reason: impl Into<String>) -> Self {
        IndexError::Corrupt {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

/// Metadata persisted alongside index entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_model: String,
    pub dims: usize,
    pub metric: Metric,
    pub chunk_count: usize,
    /// SHA-256 over every chunk's `source_id` and text, in index order.
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

/// An immutable, searchable set of embedded chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    manifest: IndexManifest,
    entries: Vec<IndexEntry>,
}

impl Index {
    /// Assemble a fresh index. Entries may be empty.
    pub fn from_entries(
        embedding_model: &str,
        dims: usize,
        metric: Metric,
        entries: Vec<IndexEntry>,
    ) -> Self {
        let manifest = IndexManifest {
            format_version: INDEX_FORMAT_VERSION,
            embedding_model: embedding_model.to_string(),
            dims,
            metric,
            chunk_count: entries.len(),
            fingerprint: fingerprint(entries.iter().map(|e| &e.chunk)),
            created_at: Utc::now(),
        };
        Self { manifest, entries }
    }

    /// Reassemble a persisted index, validating the manifest against the
    /// entries. `location` is only used in error messages.
    pub fn from_parts(
        manifest: IndexManifest,
        entries: Vec<IndexEntry>,
        location: &str,
    ) -> Result<Self, IndexError> {
        if manifest.format_version != INDEX_FORMAT_VERSION {
            return Err(IndexError::corrupt(
                location,
                format!(
                    "format version {} (expected {})",
                    manifest.format_version, INDEX_FORMAT_VERSION
                ),
            ));
        }
        if manifest.chunk_count != entries.len() {
            return Err(IndexError::corrupt(
                location,
                format!(
                    "manifest lists {} chunks but {} entries were read",
                    manifest.chunk_count,
                    entries.len()
                ),
            ));
        }
        if let Some((i, entry)) = entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.embedding.len() != manifest.dims)
        {
            return Err(IndexError::corrupt(
                location,
                format!(
                    "entry {} has {} dimensions, manifest says {}",
                    i,
                    entry.embedding.len(),
                    manifest.dims
                ),
            ));
        }
        Ok(Self { manifest, entries })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct source ids of the indexed chunks.
    pub fn source_ids(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .map(|e| e.chunk.source_id.clone())
            .collect()
    }

    /// The `k` entries most similar to `query` under the index metric.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let metric = self.manifest.metric;
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let score = metric.score(query, &e.embedding);
                (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect()
    }
}

/// Hex SHA-256 over chunk provenance and text.
pub fn fingerprint<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.source_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(chunk.text.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Persistence backend for a single index.
///
/// `persist` must replace any previous index atomically: a concurrent or
/// later `load` sees either the old index or the new one, never a mix.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Human-readable location (path, database URL, `"memory"`).
    fn location(&self) -> String;

    async fn persist(&self, index: &Index) -> Result<(), IndexError>;

    /// Fails with [`IndexError::NotFound`] when nothing was persisted yet and
    /// [`IndexError::Corrupt`] when the stored data cannot be read back.
    async fn load(&self) -> Result<Index, IndexError>;
}

/// Builds, persists, loads and searches indexes with one embedding
/// provider and one store.
#[derive(Clone)]
pub struct Indexer {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn IndexStore>,
    metric: Metric,
    batch_size: usize,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn IndexStore>) -> Self {
        Self {
            embedder,
            store,
            metric: Metric::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    pub fn store_location(&self) -> String {
        self.store.location()
    }

    /// Embed every chunk and assemble an index.
    ///
    /// Any embedding failure aborts the whole build.
    pub async fn build(&self, chunks: Vec<Chunk>) -> Result<Index, IndexError> {
        if chunks.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }

        let dims = self.embedder.dims();
        let total = chunks.len();
        let mut entries = Vec::with_capacity(total);
        let mut pending = chunks.into_iter().peekable();

        while pending.peek().is_some() {
            let batch: Vec<Chunk> = pending.by_ref().take(self.batch_size).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self
                .embedder
                .embed(&texts)
                .await
                .map_err(IndexError::Embedding)?;

            if vectors.len() != batch.len() {
                return Err(IndexError::Embedding(anyhow::anyhow!(
                    "provider returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            for (chunk, embedding) in batch.into_iter().zip(vectors) {
                if embedding.len() != dims {
                    return Err(IndexError::Embedding(anyhow::anyhow!(
                        "provider returned a {}-dimensional vector, expected {}",
                        embedding.len(),
                        dims
                    )));
                }
                entries.push(IndexEntry { chunk, embedding });
            }
            tracing::debug!(embedded = entries.len(), total, "embedding batch done");
        }

        Ok(Index::from_entries(
            self.embedder.model_name(),
            dims,
            self.metric,
            entries,
        ))
    }

    pub async fn persist(&self, index: &Index) -> Result<(), IndexError> {
        self.store.persist(index).await
    }

    /// Load the persisted index, rejecting one built with a different
    /// model, dimensionality or metric.
    pub async fn load(&self) -> Result<Index, IndexError> {
        let index = self.store.load().await?;
        let manifest = index.manifest();
        let location = self.store.location();

        if manifest.embedding_model != self.embedder.model_name() {
            return Err(IndexError::corrupt(
                location,
                format!(
                    "built with model '{}', configured model is '{}'",
                    manifest.embedding_model,
                    self.embedder.model_name()
                ),
            ));
        }
        if manifest.dims != self.embedder.dims() {
            return Err(IndexError::corrupt(
                location,
                format!(
                    "built with {} dimensions, provider has {}",
                    manifest.dims,
                    self.embedder.dims()
                ),
            ));
        }
        if manifest.metric != self.metric {
            return Err(IndexError::corrupt(
                location,
                format!(
                    "built with metric {}, configured metric is {}",
                    manifest.metric, self.metric
                ),
            ));
        }
        Ok(index)
    }

    /// Retrieve the `k` chunks most similar to `query_text`.
    pub async fn search(
        &self,
        index: Option<&Index>,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        let index = index.ok_or(IndexError::NotInitialized)?;
        if k == 0 || index.is_empty() {
            return Ok(Vec::new());
        }

        let query = embed_one(self.embedder.as_ref(), query_text)
            .await
            .map_err(IndexError::Embedding)?;
        if query.len() != index.manifest().dims {
            return Err(IndexError::corrupt(
                self.store.location(),
                format!(
                    "query vector has {} dimensions, index has {}",
                    query.len(),
                    index.manifest().dims
                ),
            ));
        }
        Ok(index.nearest(&query, k))
    }
}
