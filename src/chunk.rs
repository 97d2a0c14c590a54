//! Recursive text chunker with overlap.
//!
//! Splits page text into chunks of at most `chunk_size` characters, trying
//! paragraph boundaries (`\n\n`) first, then line boundaries, then word
//! boundaries, then a hard character split. Separators stay attached to the
//! preceding piece, so the ordered pieces exactly partition the input — no
//! text is ever dropped. Each chunk after the first gets the last `overlap`
//! characters of the previous piece prepended to preserve context across a
//! split boundary.
//!
//! Each chunk receives a UUID plus a SHA-256 hash of its text.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::models::Chunk;

/// Split separators, largest semantic unit first.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Split page text into chunk texts of at most `chunk_size + overlap`
/// characters each. Whitespace-only input yields no chunks.
pub fn split_page(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let pieces = split_exact(text, chunk_size);
    let mut chunks = Vec::with_capacity(pieces.len());

    for (i, piece) in pieces.iter().enumerate() {
        if i == 0 {
            chunks.push(piece.clone());
        } else {
            let tail = overlap_tail(&pieces[i - 1], overlap);
            let mut chunk = String::with_capacity(tail.len() + piece.len());
            chunk.push_str(tail);
            chunk.push_str(piece);
            chunks.push(chunk);
        }
    }

    chunks
}

/// Build [`Chunk`] records for one page, numbering from `start_index`.
pub fn build_chunks(
    book_name: &str,
    start_index: i64,
    page_text: &str,
    config: &ChunkingConfig,
) -> Vec<Chunk> {
    split_page(page_text, config.chunk_size, config.overlap)
        .into_iter()
        .enumerate()
        .map(|(i, text)| make_chunk(book_name, start_index + i as i64, text))
        .collect()
}

fn make_chunk(book_name: &str, index: i64, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        book_name: book_name.to_string(),
        chunk_index: index,
        text,
        hash,
    }
}

/// Partition `text` into ordered pieces of at most `max_chars` characters
/// whose concatenation equals `text` exactly.
fn split_exact(text: &str, max_chars: usize) -> Vec<String> {
    split_recursive(text, max_chars, 0)
}

fn split_recursive(text: &str, max_chars: usize, level: usize) -> Vec<String> {
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }
    if level >= SEPARATORS.len() {
        return hard_split(text, max_chars);
    }

    let separator = SEPARATORS[level];
    let segments: Vec<&str> = text.split_inclusive(separator).collect();
    if segments.len() == 1 {
        return split_recursive(text, max_chars, level + 1);
    }

    let mut pieces = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0usize;

    for segment in segments {
        let segment_len = char_len(segment);

        // A single segment over the limit gets split by the next-smaller unit.
        if segment_len > max_chars {
            if !buf.is_empty() {
                pieces.push(std::mem::take(&mut buf));
                buf_len = 0;
            }
            pieces.extend(split_recursive(segment, max_chars, level + 1));
            continue;
        }

        if !buf.is_empty() && buf_len + segment_len > max_chars {
            pieces.push(std::mem::take(&mut buf));
            buf_len = 0;
        }
        buf.push_str(segment);
        buf_len += segment_len;
    }

    if !buf.is_empty() {
        pieces.push(buf);
    }

    pieces
}

/// Hard split into groups of exactly `max_chars` characters (last may be
/// shorter). Never lands inside a UTF-8 boundary.
fn hard_split(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut buf = String::new();
    let mut count = 0usize;

    for ch in text.chars() {
        buf.push(ch);
        count += 1;
        if count == max_chars {
            pieces.push(std::mem::take(&mut buf));
            count = 0;
        }
    }
    if !buf.is_empty() {
        pieces.push(buf);
    }

    pieces
}

/// The last `overlap` characters of `piece` (all of it when shorter).
fn overlap_tail(piece: &str, overlap: usize) -> &str {
    let len = char_len(piece);
    if len <= overlap {
        return piece;
    }
    let byte_start = piece
        .char_indices()
        .nth(len - overlap)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &piece[byte_start..]
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
