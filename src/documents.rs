//! Filesystem document source.
//!
//! Walks `documents.root`, filters paths with include/exclude globs, and
//! extracts each matching file into a [`SourceDocument`]. Files that fail
//! to extract, come out empty, or exceed `max_file_bytes` are skipped with
//! a warning. Output is sorted by `source_id`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use skincare_rag_core::corpus::DocumentSource;
use skincare_rag_core::models::SourceDocument;

use crate::config::DocumentsConfig;
use crate::extract::{extract_text, ContentKind};

const DEFAULT_EXCLUDES: [&str; 2] = ["**/.git/**", "**/node_modules/**"];

pub struct FsDocumentSource {
    config: DocumentsConfig,
}

impl FsDocumentSource {
    pub fn new(config: DocumentsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DocumentSource for FsDocumentSource {
    fn describe(&self) -> String {
        format!("filesystem:{}", self.config.root.display())
    }

    async fn load_documents(&self) -> Result<Vec<SourceDocument>> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || scan_documents(&config))
            .await
            .context("document scan task failed")?
    }
}

/// Blocking scan of the document tree.
pub fn scan_documents(config: &DocumentsConfig) -> Result<Vec<SourceDocument>> {
    let root = &config.root;
    if !root.is_dir() {
        bail!("Document root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;
    let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut documents = Vec::new();
    let mut skipped = 0usize;

    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        match load_one(path, config.max_file_bytes) {
            Ok(text) if text.is_empty() => {
                tracing::warn!(file = %rel_str, "no text extracted, skipping");
                skipped += 1;
            }
            Ok(text) => {
                tracing::debug!(file = %rel_str, chars = text.chars().count(), "loaded document");
                documents.push(SourceDocument {
                    source_id: rel_str,
                    text,
                });
            }
            Err(e) => {
                tracing::warn!(file = %rel_str, error = %format!("{:#}", e), "skipping document");
                skipped += 1;
            }
        }
    }

    documents.sort_by(|a, b| a.source_id.cmp(&b.source_id));
    tracing::info!(
        root = %root.display(),
        loaded = documents.len(),
        skipped,
        "document scan complete"
    );
    Ok(documents)
}

fn load_one(path: &Path, max_file_bytes: u64) -> Result<String> {
    let size = std::fs::metadata(path)?.len();
    if size > max_file_bytes {
        bail!("file is {} bytes, limit is {}", size, max_file_bytes);
    }
    let bytes = std::fs::read(path)?;
    Ok(extract_text(&bytes, ContentKind::from_path(path))?)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}
