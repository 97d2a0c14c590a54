//! Core data models used throughout Tutorbot.
//!
//! These types represent the pages, chunks, and links that flow through the
//! ingestion and question-answering pipeline.

use serde::Serialize;

/// A single extracted PDF page, tagged with its owning book.
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// Source filename minus its extension.
    pub book_name: String,
    /// Zero-based page position within the source file.
    pub page_index: usize,
    pub text: String,
}

/// A chunk of page text, the unit of embedding and retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub book_name: String,
    /// Running index per book, contiguous across pages.
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// An external video resource returned by the best-effort search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoLink {
    pub title: String,
    pub href: String,
}
