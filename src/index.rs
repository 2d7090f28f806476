//! Backend selection for the index store and indexer construction.
//!
//! The backend is chosen once here from `index.backend`; nothing
//! downstream branches on it.

use anyhow::{bail, Result};
use std::sync::Arc;

use skincare_rag_core::embedding::EmbeddingProvider;
use skincare_rag_core::index::memory::InMemoryIndexStore;
use skincare_rag_core::index::{IndexStore, Indexer};

use crate::config::Config;
use crate::sqlite_store::SqliteIndexStore;
use crate::store_file::FileIndexStore;

/// Instantiate the configured [`IndexStore`].
///
/// | `index.backend` | Store |
/// |-----------------|-------|
/// | `"file"` | [`FileIndexStore`] at `index.path` |
/// | `"sqlite"` | [`SqliteIndexStore`], database file at `index.path` |
/// | `"memory"` | [`InMemoryIndexStore`] (nothing persists) |
pub async fn create_store(config: &Config) -> Result<Arc<dyn IndexStore>> {
    match config.index.backend.as_str() {
        "file" => Ok(Arc::new(FileIndexStore::new(&config.index.path))),
        "sqlite" => Ok(Arc::new(SqliteIndexStore::open(&config.index.path).await?)),
        "memory" => Ok(Arc::new(InMemoryIndexStore::new())),
        other => bail!("Unknown index backend: {}", other),
    }
}

pub fn create_indexer(
    config: &Config,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn IndexStore>,
) -> Result<Indexer> {
    Ok(Indexer::new(embedder, store)
        .with_metric(config.index.metric()?)
        .with_batch_size(config.embedding.batch_size))
}
