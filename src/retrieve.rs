//! Retrieval and deduplication of indexed chunks.
//!
//! The [`Retriever`] embeds a query with the same provider configuration
//! used at ingestion and asks the vector index for the top-K nearest
//! chunks. [`dedup_chunks`] then collapses near-duplicate passages that
//! overlap-heavy chunking tends to surface for the same query.

use anyhow::{Context, Result};
use std::collections::HashSet;

use crate::config::{EmbeddingConfig, RetrievalConfig};
use crate::embedding::{self, EmbeddingProvider};
use crate::index::{ScoredChunk, VectorIndex};

pub struct Retriever {
    index: VectorIndex,
    embedding: EmbeddingConfig,
    provider: Box<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        index: VectorIndex,
        embedding: EmbeddingConfig,
        provider: Box<dyn EmbeddingProvider>,
        retrieval: &RetrievalConfig,
    ) -> Self {
        Self {
            index,
            embedding,
            provider,
            top_k: retrieval.top_k,
        }
    }

    /// Return the top-K chunks nearest to `query`, most-similar first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let query_vec = embedding::embed_query(self.provider.as_ref(), &self.embedding, query)
            .await
            .context("Failed to embed query")?;

        self.index
            .nearest(&query_vec, self.top_k)
            .await
            .context("Vector index search failed")
    }
}

/// Collapse near-duplicate chunks, preserving first-seen order.
///
/// Two chunks are duplicates when the lowercased, alphanumeric-only prefix
/// (first `prefix_len` characters after filtering) of their text is
/// identical. Surviving chunks are never reordered.
pub fn dedup_chunks(chunks: Vec<ScoredChunk>, prefix_len: usize) -> Vec<ScoredChunk> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        let key = dedup_key(&chunk.text, prefix_len);
        if seen.insert(key) {
            unique.push(chunk);
        }
    }

    unique
}

fn dedup_key(text: &str, prefix_len: usize) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(prefix_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, score: f64) -> ScoredChunk {
        ScoredChunk {
            chunk_id: format!("id-{}", score),
            book_name: "book".to_string(),
            text: text.to_string(),
            score,
        }
    }

    #[test]
    fn dedup_collapses_same_prefix() {
        let chunks = vec![
            chunk("Gradient descent is an optimizer.", 0.9),
            chunk("Gradient Descent... is an optimizer!", 0.8),
            chunk("Momentum is something else.", 0.7),
        ];
        let unique = dedup_chunks(chunks, 200);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].score, 0.9);
        assert_eq!(unique[1].text, "Momentum is something else.");
    }

    #[test]
    fn dedup_keeps_first_occurrence_position() {
        let chunks = vec![
            chunk("alpha passage", 0.9),
            chunk("beta passage", 0.8),
            chunk("ALPHA passage", 0.7),
            chunk("gamma passage", 0.6),
        ];
        let unique = dedup_chunks(chunks, 200);
        let texts: Vec<&str> = unique.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha passage", "beta passage", "gamma passage"]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let chunks = vec![
            chunk("one two three", 0.9),
            chunk("one, two... three", 0.8),
            chunk("four five six", 0.7),
        ];
        let once = dedup_chunks(chunks, 200);
        let twice = dedup_chunks(once.clone(), 200);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.text, b.text);
        }
    }

    #[test]
    fn dedup_compares_only_the_prefix() {
        // Same first 10 alphanumeric characters, different tails.
        let chunks = vec![
            chunk("abcdefghij first tail", 0.9),
            chunk("abc def ghij second tail", 0.8),
        ];
        let unique = dedup_chunks(chunks, 10);
        assert_eq!(unique.len(), 1);
    }

    #[test]
    fn dedup_ignores_punctuation_and_case() {
        assert_eq!(dedup_key("Hello, World! 42", 200), "helloworld42");
    }

    #[test]
    fn dedup_empty_input() {
        assert!(dedup_chunks(Vec::new(), 200).is_empty());
    }
}
