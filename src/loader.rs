//! PDF discovery and page extraction.
//!
//! Scans the library directory for PDF files and extracts their text page
//! by page. Extraction failures are reported through [`LoadError`] so the
//! ingestion pipeline can skip one bad file and continue with the rest.

use anyhow::Result;
use std::path::Path;
use walkdir::WalkDir;

use crate::models::PageRecord;

/// Load failure for a single source file (no panic; pipeline skips the file).
#[derive(Debug)]
pub enum LoadError {
    Unreadable(String),
    Pdf(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Unreadable(e) => write!(f, "file unreadable: {}", e),
            LoadError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for LoadError {}

/// List candidate PDF filenames in `dir` (depth 1), sorted lexicographically
/// for deterministic processing order. The extension check is
/// case-insensitive; everything else is ignored.
pub fn list_pdfs(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        anyhow::bail!("PDF directory does not exist: {}", dir.display());
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.to_lowercase().ends_with(".pdf") {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

/// The book name for a source file: the filename minus its extension.
pub fn book_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string())
}

/// Extract one [`PageRecord`] per page of the given PDF file.
pub fn load_pages(dir: &Path, file_name: &str) -> Result<Vec<PageRecord>, LoadError> {
    let path = dir.join(file_name);
    let bytes = std::fs::read(&path).map_err(|e| LoadError::Unreadable(e.to_string()))?;

    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .map_err(|e| LoadError::Pdf(e.to_string()))?;

    let book = book_name(file_name);
    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(page_index, text)| PageRecord {
            book_name: book.clone(),
            page_index,
            text,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_name_strips_extension() {
        assert_eq!(book_name("deep-learning.pdf"), "deep-learning");
        assert_eq!(book_name("Notes.PDF"), "Notes");
        assert_eq!(book_name("dotted.name.pdf"), "dotted.name");
    }

    #[test]
    fn list_pdfs_filters_and_sorts() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("zeta.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("Alpha.PDF"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(tmp.path().join("ingested.txt"), b"x").unwrap();

        let names = list_pdfs(tmp.path()).unwrap();
        assert_eq!(names, vec!["Alpha.PDF".to_string(), "zeta.pdf".to_string()]);
    }

    #[test]
    fn list_pdfs_missing_dir_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(list_pdfs(&missing).is_err());
    }

    #[test]
    fn load_pages_invalid_pdf_is_load_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("bad.pdf"), b"not a pdf").unwrap();
        let err = load_pages(tmp.path(), "bad.pdf").unwrap_err();
        assert!(matches!(err, LoadError::Pdf(_)));
    }

    #[test]
    fn load_pages_missing_file_is_unreadable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = load_pages(tmp.path(), "ghost.pdf").unwrap_err();
        assert!(matches!(err, LoadError::Unreadable(_)));
    }
}
