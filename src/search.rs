use anyhow::{Context, Result};

use skincare_rag_core::models::ScoredChunk;

use crate::config::Config;
use crate::pipeline::Pipeline;

/// Raw retrieval against the persisted index.
pub async fn run_search(config: &Config, query: &str, k: Option<usize>) -> Result<()> {
    let pipeline = Pipeline::retrieval_from_config(config).await?;
    pipeline
        .load_index()
        .await
        .context("No usable index; run `skinrag index` first")?;

    let k = k.unwrap_or(config.retrieval.top_k);
    let hits = pipeline.search(query, k).await?;
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, hit) in hits.iter().enumerate() {
        print_hit(i + 1, hit);
    }
    Ok(())
}

fn print_hit(rank: usize, hit: &ScoredChunk) {
    let chunk = &hit.chunk;
    println!(
        "{}. [{:.3}] {} (chunk {}/{})",
        rank,
        hit.score,
        chunk.source_id,
        chunk.sequence_index + 1,
        chunk.sibling_count
    );
    println!("    excerpt: \"{}\"", snippet(chunk.fresh_text(), 200));
    println!();
}

/// First `max_chars` characters of `text` on one line.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}
