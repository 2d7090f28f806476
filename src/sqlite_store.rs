//! SQLite-backed [`IndexStore`].
//!
//! Two tables: `index_manifest` (a single row) and `index_entries` (one row
//! per chunk, ordered by `position`). `persist` replaces both inside one
//! transaction.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::path::Path;

use skincare_rag_core::embedding::{blob_to_vec, vec_to_blob, Metric};
use skincare_rag_core::index::{Index, IndexError, IndexManifest, IndexStore};
use skincare_rag_core::models::{Chunk, IndexEntry};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS index_manifest (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        format_version INTEGER NOT NULL,
        embedding_model TEXT NOT NULL,
        dims INTEGER NOT NULL,
        metric TEXT NOT NULL,
        chunk_count INTEGER NOT NULL,
        fingerprint TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS index_entries (
        position INTEGER PRIMARY KEY,
        source_id TEXT NOT NULL,
        sequence_index INTEGER NOT NULL,
        sibling_count INTEGER NOT NULL,
        overlap INTEGER NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL
    )
    "#,
];

pub struct SqliteIndexStore {
    pool: SqlitePool,
    location: String,
}

impl SqliteIndexStore {
    /// Connect to the database at `path` and create the tables if needed.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = crate::db::connect(path).await?;
        Self::with_pool(pool, path.display().to_string()).await
    }

    pub async fn with_pool(pool: SqlitePool, location: String) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool, location })
    }
}

fn storage(e: sqlx::Error) -> IndexError {
    IndexError::Storage(e.into())
}

#[async_trait]
impl IndexStore for SqliteIndexStore {
    fn location(&self) -> String {
        self.location.clone()
    }

    async fn persist(&self, index: &Index) -> Result<(), IndexError> {
        let manifest = index.manifest();
        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query("DELETE FROM index_entries")
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        sqlx::query("DELETE FROM index_manifest")
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        sqlx::query(
            r#"
            INSERT INTO index_manifest (id, format_version, embedding_model, dims, metric,
                                        chunk_count, fingerprint, created_at)
            VALUES (1, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(manifest.format_version as i64)
        .bind(&manifest.embedding_model)
        .bind(manifest.dims as i64)
        .bind(manifest.metric.as_str())
        .bind(manifest.chunk_count as i64)
        .bind(&manifest.fingerprint)
        .bind(manifest.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        for (position, entry) in index.entries().iter().enumerate() {
            let chunk = &entry.chunk;
            sqlx::query(
                r#"
                INSERT INTO index_entries (position, source_id, sequence_index, sibling_count,
                                           overlap, text, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(position as i64)
            .bind(&chunk.source_id)
            .bind(chunk.sequence_index as i64)
            .bind(chunk.sibling_count as i64)
            .bind(chunk.overlap as i64)
            .bind(&chunk.text)
            .bind(vec_to_blob(&entry.embedding))
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;
        tracing::info!(location = %self.location, entries = index.len(), "index persisted");
        Ok(())
    }

    async fn load(&self) -> Result<Index, IndexError> {
        let location = self.location.clone();
        let corrupt = |reason: String| IndexError::corrupt(&location, reason);

        let row = sqlx::query(
            "SELECT format_version, embedding_model, dims, metric, chunk_count, fingerprint, created_at \
             FROM index_manifest WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        let Some(row) = row else {
            return Err(IndexError::NotFound {
                location: location.clone(),
            });
        };

        let metric: String = row.try_get("metric").map_err(|e| corrupt(e.to_string()))?;
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| corrupt(e.to_string()))?;
        let manifest = IndexManifest {
            format_version: row
                .try_get::<i64, _>("format_version")
                .map_err(|e| corrupt(e.to_string()))? as u32,
            embedding_model: row
                .try_get("embedding_model")
                .map_err(|e| corrupt(e.to_string()))?,
            dims: row
                .try_get::<i64, _>("dims")
                .map_err(|e| corrupt(e.to_string()))? as usize,
            metric: metric.parse::<Metric>().map_err(corrupt)?,
            chunk_count: row
                .try_get::<i64, _>("chunk_count")
                .map_err(|e| corrupt(e.to_string()))? as usize,
            fingerprint: row
                .try_get("fingerprint")
                .map_err(|e| corrupt(e.to_string()))?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| corrupt(format!("created_at: {}", e)))?
                .with_timezone(&Utc),
        };

        let rows = sqlx::query(
            "SELECT source_id, sequence_index, sibling_count, overlap, text, embedding \
             FROM index_entries ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let blob: Vec<u8> = row.try_get("embedding").map_err(|e| corrupt(e.to_string()))?;
            if blob.len() % 4 != 0 {
                return Err(corrupt(format!(
                    "embedding blob of {} bytes is not a whole number of f32 values",
                    blob.len()
                )));
            }
            entries.push(IndexEntry {
                chunk: Chunk {
                    text: row.try_get("text").map_err(|e| corrupt(e.to_string()))?,
                    source_id: row.try_get("source_id").map_err(|e| corrupt(e.to_string()))?,
                    sequence_index: row
                        .try_get::<i64, _>("sequence_index")
                        .map_err(|e| corrupt(e.to_string()))? as usize,
                    sibling_count: row
                        .try_get::<i64, _>("sibling_count")
                        .map_err(|e| corrupt(e.to_string()))? as usize,
                    overlap: row
                        .try_get::<i64, _>("overlap")
                        .map_err(|e| corrupt(e.to_string()))? as usize,
                },
                embedding: blob_to_vec(&blob),
            });
        }

        Index::from_parts(manifest, entries, &location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_index(n: usize) -> Index {
        let entries = (0..n)
            .map(|i| IndexEntry {
                chunk: Chunk {
                    text: format!("chunk {}", i),
                    source_id: "guide.pdf".to_string(),
                    sequence_index: i,
                    sibling_count: n,
                    overlap: if i == 0 { 0 } else { 2 },
                },
                embedding: vec![0.25, i as f32],
            })
            .collect();
        Index::from_entries("test-model", 2, Metric::InnerProduct, entries)
    }

    #[tokio::test]
    async fn test_empty_database_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteIndexStore::open(&tmp.path().join("index.sqlite"))
            .await
            .unwrap();
        assert!(matches!(store.load().await, Err(IndexError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_persist_then_load_preserves_order_and_fields() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteIndexStore::open(&tmp.path().join("index.sqlite"))
            .await
            .unwrap();
        let index = sample_index(4);
        store.persist(&index).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.entries(), index.entries());
        assert_eq!(loaded.manifest().metric, Metric::InnerProduct);
        assert_eq!(loaded.manifest().fingerprint, index.manifest().fingerprint);
    }

    #[tokio::test]
    async fn test_persist_replaces_previous_rows() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteIndexStore::open(&tmp.path().join("index.sqlite"))
            .await
            .unwrap();
        store.persist(&sample_index(5)).await.unwrap();
        store.persist(&sample_index(2)).await.unwrap();
        assert_eq!(store.load().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_count_mismatch_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteIndexStore::open(&tmp.path().join("index.sqlite"))
            .await
            .unwrap();
        store.persist(&sample_index(3)).await.unwrap();
        sqlx::query("DELETE FROM index_entries WHERE position = 2")
            .execute(&store.pool)
            .await
            .unwrap();
        assert!(matches!(store.load().await, Err(IndexError::Corrupt { .. })));
    }
}
