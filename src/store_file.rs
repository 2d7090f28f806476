//! Directory-backed [`IndexStore`].
//!
//! Layout under `index.path`:
//!
//! ```text
//! manifest.json   IndexManifest
//! chunks.json     [Chunk, ...] in index order
//! vectors.bin     chunk_count × dims little-endian f32, row-major
//! ```
//!
//! `persist` writes a sibling staging directory and renames it into place,
//! so a reader never sees a half-written index.

use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use skincare_rag_core::embedding::{blob_to_vec, vec_to_blob};
use skincare_rag_core::index::{Index, IndexError, IndexManifest, IndexStore};
use skincare_rag_core::models::{Chunk, IndexEntry};

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_FILE: &str = "chunks.json";
const VECTORS_FILE: &str = "vectors.bin";

pub struct FileIndexStore {
    path: PathBuf,
}

impl FileIndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "index".into());
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn location_str(&self) -> String {
        self.path.display().to_string()
    }
}

fn storage(e: impl Into<anyhow::Error>) -> IndexError {
    IndexError::Storage(e.into())
}

async fn remove_dir_if_exists(path: &Path) -> anyhow::Result<()> {
    if tokio::fs::try_exists(path).await? {
        tokio::fs::remove_dir_all(path)
            .await
            .with_context(|| format!("failed to remove {}", path.display()))?;
    }
    Ok(())
}

#[async_trait]
impl IndexStore for FileIndexStore {
    fn location(&self) -> String {
        self.location_str()
    }

    async fn persist(&self, index: &Index) -> Result<(), IndexError> {
        let staging = self.sibling(".staging");
        let previous = self.sibling(".previous");

        remove_dir_if_exists(&staging).await.map_err(storage)?;
        tokio::fs::create_dir_all(&staging)
            .await
            .with_context(|| format!("failed to create {}", staging.display()))
            .map_err(storage)?;

        let manifest = serde_json::to_vec_pretty(index.manifest()).map_err(storage)?;
        let chunks: Vec<&Chunk> = index.entries().iter().map(|e| &e.chunk).collect();
        let chunks = serde_json::to_vec(&chunks).map_err(storage)?;
        let mut vectors = Vec::with_capacity(index.len() * index.manifest().dims * 4);
        for entry in index.entries() {
            vectors.extend_from_slice(&vec_to_blob(&entry.embedding));
        }

        for (name, bytes) in [
            (CHUNKS_FILE, chunks),
            (VECTORS_FILE, vectors),
            (MANIFEST_FILE, manifest),
        ] {
            tokio::fs::write(staging.join(name), bytes)
                .await
                .with_context(|| format!("failed to write {}", name))
                .map_err(storage)?;
        }

        // Swap: current → previous, staging → current, drop previous.
        remove_dir_if_exists(&previous).await.map_err(storage)?;
        let had_current = tokio::fs::try_exists(&self.path).await.map_err(storage)?;
        if had_current {
            tokio::fs::rename(&self.path, &previous)
                .await
                .map_err(storage)?;
        }
        tokio::fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("failed to move index into {}", self.path.display()))
            .map_err(storage)?;
        if had_current {
            remove_dir_if_exists(&previous).await.map_err(storage)?;
        }

        tracing::info!(path = %self.path.display(), entries = index.len(), "index persisted");
        Ok(())
    }

    async fn load(&self) -> Result<Index, IndexError> {
        let location = self.location_str();
        let manifest_path = self.path.join(MANIFEST_FILE);
        if !tokio::fs::try_exists(&manifest_path).await.map_err(storage)? {
            return Err(IndexError::NotFound { location });
        }

        let manifest_bytes = tokio::fs::read(&manifest_path).await.map_err(storage)?;
        let manifest: IndexManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| IndexError::corrupt(&location, format!("{}: {}", MANIFEST_FILE, e)))?;

        let chunk_bytes = tokio::fs::read(self.path.join(CHUNKS_FILE))
            .await
            .map_err(|e| IndexError::corrupt(&location, format!("{}: {}", CHUNKS_FILE, e)))?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&chunk_bytes)
            .map_err(|e| IndexError::corrupt(&location, format!("{}: {}", CHUNKS_FILE, e)))?;

        let vector_bytes = tokio::fs::read(self.path.join(VECTORS_FILE))
            .await
            .map_err(|e| IndexError::corrupt(&location, format!("{}: {}", VECTORS_FILE, e)))?;
        let expected_bytes = manifest
            .dims
            .checked_mul(4)
            .and_then(|row| chunks.len().checked_mul(row).map(|total| (row, total)));
        let Some((row_bytes, expected_bytes)) = expected_bytes else {
            return Err(IndexError::corrupt(
                &location,
                format!(
                    "{} chunks × {} dims overflows the vector size",
                    chunks.len(),
                    manifest.dims
                ),
            ));
        };
        if chunks.len() != manifest.chunk_count || vector_bytes.len() != expected_bytes {
            return Err(IndexError::corrupt(
                &location,
                format!(
                    "{} holds {} bytes, expected {} chunks × {} dims",
                    VECTORS_FILE,
                    vector_bytes.len(),
                    manifest.chunk_count,
                    manifest.dims
                ),
            ));
        }

        let entries = if row_bytes == 0 {
            chunks
                .into_iter()
                .map(|chunk| IndexEntry {
                    chunk,
                    embedding: Vec::new(),
                })
                .collect()
        } else {
            chunks
                .into_iter()
                .zip(vector_bytes.chunks_exact(row_bytes))
                .map(|(chunk, row)| IndexEntry {
                    chunk,
                    embedding: blob_to_vec(row),
                })
                .collect()
        };

        Index::from_parts(manifest, entries, &location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skincare_rag_core::embedding::Metric;
    use tempfile::TempDir;

    fn sample_index(texts: &[&str]) -> Index {
        let entries = texts
            .iter()
            .enumerate()
            .map(|(i, t)| IndexEntry {
                chunk: Chunk {
                    text: t.to_string(),
                    source_id: format!("doc{}.txt", i),
                    sequence_index: 0,
                    sibling_count: 1,
                    overlap: 0,
                },
                embedding: vec![i as f32, 1.0, -0.5],
            })
            .collect();
        Index::from_entries("test-model", 3, Metric::Cosine, entries)
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = FileIndexStore::new(tmp.path().join("index"));
        assert!(matches!(store.load().await, Err(IndexError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_persist_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = FileIndexStore::new(tmp.path().join("index"));
        let index = sample_index(&["cleanse", "tone", "moisturise"]);
        store.persist(&index).await.unwrap();
        assert_eq!(store.load().await.unwrap(), index);
    }

    #[tokio::test]
    async fn test_persist_replaces_existing_index() {
        let tmp = TempDir::new().unwrap();
        let store = FileIndexStore::new(tmp.path().join("index"));
        store.persist(&sample_index(&["old"])).await.unwrap();
        store.persist(&sample_index(&["new", "newer"])).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.entries()[0].chunk.text, "new");
        assert!(!tmp.path().join("index.staging").exists());
        assert!(!tmp.path().join("index.previous").exists());
    }

    #[tokio::test]
    async fn test_truncated_vectors_are_corrupt() {
        let tmp = TempDir::new().unwrap();
        let store = FileIndexStore::new(tmp.path().join("index"));
        store.persist(&sample_index(&["a", "b"])).await.unwrap();
        std::fs::write(tmp.path().join("index").join(VECTORS_FILE), [0u8; 7]).unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, IndexError::Corrupt { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_garbage_manifest_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("index");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), "{not json").unwrap();

        let store = FileIndexStore::new(&dir);
        assert!(matches!(store.load().await, Err(IndexError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_oversized_dims_are_corrupt() {
        let tmp = TempDir::new().unwrap();
        let store = FileIndexStore::new(tmp.path().join("index"));
        store.persist(&sample_index(&["a"])).await.unwrap();

        let dir = tmp.path().join("index");
        let raw = std::fs::read(dir.join(MANIFEST_FILE)).unwrap();
        let mut manifest: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        manifest["dims"] = serde_json::json!(usize::MAX / 2);
        std::fs::write(dir.join(MANIFEST_FILE), manifest.to_string()).unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, IndexError::Corrupt { .. }), "{err}");
        assert!(err.to_string().contains("overflows"), "{err}");
    }
}
