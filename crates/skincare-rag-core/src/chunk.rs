//! Recursive separator text chunker.
//!
//! Splits document text into bounded, overlapping [`Chunk`]s. Sizes are
//! counted in characters, not bytes.
//!
//! # Algorithm
//!
//! 1. If the whole text fits in `max_size`, return it as a single chunk.
//! 2. Otherwise split on the highest-priority separator present
//!    (`"\n\n"`, `"\n"`, `" "`), keeping each separator attached to the
//!    piece it ends. Pieces still above the body limit are split again with
//!    the next separator, and finally into fixed runs of characters.
//! 3. Greedily merge consecutive pieces into bodies of at most
//!    `max_size - overlap` characters.
//! 4. Prefix every body after the first with the `overlap` characters that
//!    precede it in the document.
//!
//! # Example
//!
//! ```rust
//! use skincare_rag_core::chunk::chunk_document;
//!
//! let chunks = chunk_document("notes.txt", "Cleanse.\n\nMoisturise.", 800, 100);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].text, "Cleanse.\n\nMoisturise.");
//! ```

use std::ops::Range;

use crate::models::{Chunk, SourceDocument};

/// Separators in priority order. Below the last one, text is split per character.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Split one document into chunks of at most `max_size` characters.
///
/// Adjacent chunks share `overlap` characters. `max_size` is raised to 1 if
/// zero and `overlap` is clamped to `max_size - 1`.
///
/// # Guarantees
///
/// - At least one chunk is returned (empty text yields one empty chunk).
/// - `sequence_index` runs `0..n` and `sibling_count == n` on every chunk.
/// - Concatenating [`Chunk::fresh_text`] across the chunks yields `text`.
pub fn chunk_document(source_id: &str, text: &str, max_size: usize, overlap: usize) -> Vec<Chunk> {
    let max_size = max_size.max(1);
    let overlap = overlap.min(max_size - 1);

    if char_len(text) <= max_size {
        return vec![Chunk {
            text: text.to_string(),
            source_id: source_id.to_string(),
            sequence_index: 0,
            sibling_count: 1,
            overlap: 0,
        }];
    }

    let body_limit = max_size - overlap;
    let mut pieces = Vec::new();
    split_recursive(text, 0..text.len(), 0, body_limit, &mut pieces);
    let bodies = merge_pieces(text, &pieces, body_limit);

    let sibling_count = bodies.len();
    bodies
        .into_iter()
        .enumerate()
        .map(|(sequence_index, body)| {
            let start = if sequence_index == 0 {
                body.start
            } else {
                overlap_start(text, body.start, overlap)
            };
            Chunk {
                text: text[start..body.end].to_string(),
                source_id: source_id.to_string(),
                sequence_index,
                sibling_count,
                overlap: char_len(&text[start..body.start]),
            }
        })
        .collect()
}

/// Chunk every document of a corpus, in corpus order.
///
/// Documents whose text is blank produce no chunks.
pub fn chunk_corpus(documents: &[SourceDocument], max_size: usize, overlap: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for doc in documents {
        if doc.text.trim().is_empty() {
            tracing::debug!(source_id = %doc.source_id, "skipping blank document");
            continue;
        }
        chunks.extend(chunk_document(&doc.source_id, &doc.text, max_size, overlap));
    }
    chunks
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Push byte ranges covering `range` in order, each at most `limit` characters.
fn split_recursive(
    text: &str,
    range: Range<usize>,
    level: usize,
    limit: usize,
    out: &mut Vec<Range<usize>>,
) {
    let slice = &text[range.clone()];
    if char_len(slice) <= limit {
        out.push(range);
        return;
    }
    let Some(separator) = SEPARATORS.get(level) else {
        split_chars(text, range, limit, out);
        return;
    };
    if !slice.contains(separator) {
        split_recursive(text, range, level + 1, limit, out);
        return;
    }

    let mut offset = range.start;
    for part in slice.split_inclusive(separator) {
        let part_range = offset..offset + part.len();
        offset = part_range.end;
        if char_len(part) <= limit {
            out.push(part_range);
        } else {
            split_recursive(text, part_range, level + 1, limit, out);
        }
    }
}

fn split_chars(text: &str, range: Range<usize>, limit: usize, out: &mut Vec<Range<usize>>) {
    let slice = &text[range.clone()];
    let mut start = range.start;
    let mut count = 0;
    for (idx, _) in slice.char_indices() {
        if count == limit {
            out.push(start..range.start + idx);
            start = range.start + idx;
            count = 0;
        }
        count += 1;
    }
    if start < range.end {
        out.push(start..range.end);
    }
}

/// Greedily merge contiguous pieces into bodies of at most `limit` characters.
fn merge_pieces(text: &str, pieces: &[Range<usize>], limit: usize) -> Vec<Range<usize>> {
    let mut bodies: Vec<Range<usize>> = Vec::new();
    let mut current: Option<(Range<usize>, usize)> = None;

    for piece in pieces {
        let piece_len = char_len(&text[piece.clone()]);
        match current.take() {
            Some((range, len)) if len + piece_len <= limit => {
                current = Some((range.start..piece.end, len + piece_len));
            }
            Some((range, _)) => {
                bodies.push(range);
                current = Some((piece.clone(), piece_len));
            }
            None => current = Some((piece.clone(), piece_len)),
        }
    }
    if let Some((range, _)) = current {
        bodies.push(range);
    }
    bodies
}

/// Byte offset `overlap` characters before `start` (or 0 if the prefix is shorter).
fn overlap_start(text: &str, start: usize, overlap: usize) -> usize {
    if overlap == 0 {
        return start;
    }
    text[..start]
        .char_indices()
        .rev()
        .take(overlap)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reconstruct(chunks: &[Chunk]) -> String {
        chunks.iter().map(|c| c.fresh_text()).collect()
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_document("a.txt", "Use sunscreen daily.", 800, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Use sunscreen daily.");
        assert_eq!(chunks[0].sibling_count, 1);
        assert_eq!(chunks[0].overlap, 0);
    }

    #[test]
    fn test_empty_text_single_chunk() {
        let chunks = chunk_document("a.txt", "", 10, 2);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let text = "aaaa aaaa\n\nbbbb bbbb\n\ncccc cccc";
        let chunks = chunk_document("a.txt", text, 12, 0);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["aaaa aaaa\n\n", "bbbb bbbb\n\n", "cccc cccc"]);
    }

    #[test]
    fn test_falls_back_to_spaces_and_chars() {
        let text = "abcdefghij klm";
        let chunks = chunk_document("a.txt", text, 4, 0);
        assert!(chunks.iter().all(|c| char_len(&c.text) <= 4));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_overlap_is_shared_with_previous_chunk() {
        let text = "one two three four five six seven eight nine ten";
        let chunks = chunk_document("a.txt", text, 15, 5);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev = &pair[0].text;
            let next = &pair[1];
            assert_eq!(next.overlap, 5);
            let shared: String = next.text.chars().take(next.overlap).collect();
            assert!(prev.ends_with(&shared), "{prev:?} / {shared:?}");
        }
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_indices_and_sibling_counts() {
        let text = "x ".repeat(50);
        let chunks = chunk_document("doc.md", &text, 10, 2);
        let n = chunks.len();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence_index, i);
            assert_eq!(chunk.sibling_count, n);
            assert_eq!(chunk.source_id, "doc.md");
        }
    }

    #[test]
    fn test_multibyte_sizes_counted_in_chars() {
        let text = "é".repeat(25);
        let chunks = chunk_document("a.txt", &text, 10, 3);
        assert!(chunks.iter().all(|c| char_len(&c.text) <= 10));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_degenerate_parameters_are_clamped() {
        let chunks = chunk_document("a.txt", "abcdef", 0, 5);
        assert_eq!(chunks.len(), 6);
        assert!(chunks.iter().all(|c| c.overlap == 0));
        let chunks = chunk_document("a.txt", "abcdef", 3, 9);
        assert!(chunks.iter().all(|c| char_len(&c.text) <= 3));
        assert_eq!(reconstruct(&chunks), "abcdef");
    }

    #[test]
    fn test_chunk_corpus_skips_blank_documents() {
        let docs = vec![
            SourceDocument {
                source_id: "blank.txt".into(),
                text: "  \n ".into(),
            },
            SourceDocument {
                source_id: "acne.txt".into(),
                text: "Salicylic acid helps oily skin.".into(),
            },
        ];
        let chunks = chunk_corpus(&docs, 800, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source_id, "acne.txt");
    }

    proptest! {
        #[test]
        fn prop_fresh_text_reconstructs_document(
            text in "[a-cé \n]{0,400}",
            max_size in 1usize..60,
            overlap in 0usize..30,
        ) {
            let chunks = chunk_document("p.txt", &text, max_size, overlap);
            prop_assert_eq!(reconstruct(&chunks), text);
            for chunk in &chunks {
                prop_assert!(char_len(&chunk.text) <= max_size);
            }
        }

        #[test]
        fn prop_short_text_is_single_chunk(text in "[a-z \n]{0,50}", extra in 0usize..20) {
            let max_size = char_len(&text).max(1) + extra;
            let chunks = chunk_document("p.txt", &text, max_size, 10);
            prop_assert_eq!(chunks.len(), 1);
            prop_assert_eq!(&chunks[0].text, &text);
        }
    }
}
