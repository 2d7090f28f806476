use anyhow::Result;

use skincare_rag_core::index::{IndexError, IndexManifest};

use crate::config::Config;
use crate::index::create_store;
use crate::pipeline::{IndexOutcome, Pipeline};

/// Load-or-build the index. `force` always rebuilds; `dry_run` only
/// reports document and chunk counts.
pub async fn run_index(config: &Config, force: bool, dry_run: bool) -> Result<()> {
    let pipeline = Pipeline::retrieval_from_config(config).await?;

    if dry_run {
        let plan = pipeline.plan().await?;
        println!("index (dry-run)");
        println!("  documents: {}", plan.documents);
        println!("  chunks: {}", plan.chunks);
        return Ok(());
    }

    match pipeline.rebuild_index(force).await? {
        IndexOutcome::Loaded { chunks } => {
            println!("index loaded");
            println!("  chunks: {}", chunks);
            println!("  (use --force to rebuild from the documents)");
        }
        IndexOutcome::Built { documents, chunks } => {
            println!("index built");
            println!("  documents: {}", documents);
            println!("  chunks: {}", chunks);
        }
    }
    println!("  location: {}", config.index.path.display());
    Ok(())
}

/// Print the persisted manifest, if any.
pub async fn run_status(config: &Config) -> Result<()> {
    let store = create_store(config).await?;
    match store.load().await {
        Ok(index) => print_manifest(&store.location(), index.manifest()),
        Err(IndexError::NotFound { location }) => {
            println!("No index at {}. Run `skinrag index` to build one.", location);
        }
        Err(e) => {
            println!("index at {} is unusable: {}", store.location(), e);
        }
    }
    Ok(())
}

fn print_manifest(location: &str, manifest: &IndexManifest) {
    println!("{:<16} {}", "location", location);
    println!("{:<16} {}", "chunks", manifest.chunk_count);
    println!("{:<16} {}", "model", manifest.embedding_model);
    println!("{:<16} {}", "dims", manifest.dims);
    println!("{:<16} {}", "metric", manifest.metric);
    println!(
        "{:<16} {}",
        "created",
        manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("{:<16} {}", "fingerprint", &manifest.fingerprint);
}
