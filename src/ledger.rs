//! Ingestion tracker: an append-only ledger of processed filenames.
//!
//! One filename per line, UTF-8, colocated with the PDF directory. A file
//! is appended only after all of its chunks were embedded and persisted, so
//! a failed run never marks a file as ingested. The ledger is never
//! rewritten or pruned.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read the set of already-ingested filenames. A missing ledger file is
    /// an empty set, not an error.
    pub fn read(&self) -> Result<BTreeSet<String>> {
        if !self.path.exists() {
            return Ok(BTreeSet::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read ledger: {}", self.path.display()))?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Append one filename. The file handle is opened, appended, flushed,
    /// and closed within this call so a crash cannot leave a partial batch.
    pub fn append(&self, file_name: &str) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open ledger: {}", self.path.display()))?;
        writeln!(file, "{}", file_name)?;
        file.flush()?;
        Ok(())
    }
}
