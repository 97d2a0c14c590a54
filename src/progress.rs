//! Ingestion progress reporting.
//!
//! Reports observable progress during `tutor ingest` so users see how many
//! pages have been loaded and which file is being processed. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event from the ingestion pipeline.
#[derive(Clone, Debug)]
pub enum IngestEvent {
    /// One more page was extracted. `pages_loaded` is monotonically
    /// increasing across all files in the run.
    PageLoaded {
        pages_loaded: u64,
        file_index: usize,
        total_files: usize,
        file_name: String,
    },
    /// A file could not be loaded or embedded and was skipped.
    FileFailed { file_name: String, message: String },
    /// Terminal summary for the run.
    Finished {
        pages_loaded: u64,
        files_processed: u64,
        files_skipped: u64,
    },
}

/// Reports ingestion progress. Implementations write to stderr (human or JSON).
pub trait IngestProgressReporter: Send + Sync {
    fn report(&self, event: IngestEvent);
}

/// Human-friendly progress on stderr:
/// `Loaded 36 pages | PDFs 1/5 | book.pdf` (carriage-return overwritten).
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestEvent) {
        let line = match &event {
            IngestEvent::PageLoaded {
                pages_loaded,
                file_index,
                total_files,
                file_name,
            } => format!(
                "Loaded {} pages | PDFs {}/{} | {}\r",
                pages_loaded, file_index, total_files, file_name
            ),
            IngestEvent::FileFailed { file_name, message } => {
                format!("Skipping {}: {}\n", file_name, message)
            }
            IngestEvent::Finished {
                pages_loaded,
                files_processed,
                files_skipped,
            } => format!(
                "Loaded {} pages from {} PDFs, skipped {} PDFs already ingested.\n",
                pages_loaded, files_processed, files_skipped
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestEvent) {
        let obj = match &event {
            IngestEvent::PageLoaded {
                pages_loaded,
                file_index,
                total_files,
                file_name,
            } => serde_json::json!({
                "event": "progress",
                "pages_loaded": pages_loaded,
                "current_file_index": file_index,
                "total_files": total_files,
                "current_file_name": file_name
            }),
            IngestEvent::FileFailed { file_name, message } => serde_json::json!({
                "event": "error",
                "file_name": file_name,
                "message": message
            }),
            IngestEvent::Finished {
                pages_loaded,
                files_processed,
                files_skipped,
            } => serde_json::json!({
                "event": "finished",
                "pages_loaded_total": pages_loaded,
                "files_processed": files_processed,
                "files_skipped": files_skipped
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller passes it to ingest.
    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
