//! # Tutorbot CLI (`tutor`)
//!
//! The `tutor` binary is the primary interface for Tutorbot. It provides
//! commands for index initialization, PDF ingestion, one-shot questions,
//! an interactive chat session, and the HTTP API server.
//!
//! ## Usage
//!
//! ```bash
//! tutor --config ./config/tutor.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tutor init` | Create the SQLite index and run schema migrations |
//! | `tutor ingest` | Embed new PDFs from the library into the index |
//! | `tutor ask "<query>"` | Answer a single question |
//! | `tutor chat` | Interactive chat session |
//! | `tutor serve` | Start the HTTP API server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the index
//! tutor init --config ./config/tutor.toml
//!
//! # See what a run would ingest
//! tutor ingest --dry-run
//!
//! # Ingest with machine-readable progress
//! tutor ingest --progress json
//!
//! # Ask a one-shot question
//! tutor ask "what is a gradient?"
//! ```

mod chunk;
mod config;
mod db;
mod embedding;
mod index;
mod ingest;
mod ledger;
mod llm;
mod loader;
mod migrate;
mod models;
mod progress;
mod prompt;
mod qa;
mod retrieve;
mod router;
mod server;
mod video_search;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::progress::ProgressMode;

/// Tutorbot CLI — a local-first retrieval-augmented study tutor for PDF
/// libraries.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/tutor.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "tutor",
    about = "Tutorbot — a local-first retrieval-augmented study tutor for PDF libraries",
    version,
    long_about = "Tutorbot ingests a directory of PDFs into a persistent vector index and \
    answers questions by retrieving relevant passages and generating a grounded response. \
    Queries asking for external video resources are routed to a best-effort web search."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tutor.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the vector index.
    ///
    /// Creates the SQLite database file and all required tables. This
    /// command is idempotent — running it multiple times is safe.
    Init,

    /// Ingest new PDFs from the library into the index.
    ///
    /// Scans the PDF directory, skips files already recorded in the
    /// ledger, then chunks, embeds, and stores the rest. A file is added
    /// to the ledger only after all of its chunks are persisted, so an
    /// interrupted run re-attempts the file next time.
    Ingest {
        /// Show which files would be ingested, without embedding or
        /// writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Answer a single question and exit.
    Ask {
        /// The question to answer.
        query: String,
    },

    /// Start an interactive chat session.
    ///
    /// Opens with a greeting, then answers questions until `exit`.
    Chat,

    /// Start the HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// greeting, chat, and ingest endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Index initialized successfully.");
        }
        Commands::Ingest { dry_run, progress } => {
            if dry_run {
                let report = ingest::run_ingest_dry(&cfg)?;
                println!("ingest (dry-run)");
                println!("  new files: {}", report.new_files.len());
                for name in &report.new_files {
                    println!("    {}", name);
                }
                println!("  files skipped: {}", report.files_skipped);
                println!("  estimated chunks: {}", report.estimated_chunks);
                return Ok(());
            }

            let mode = match progress.as_deref() {
                None => ProgressMode::default_for_tty(),
                Some("off") => ProgressMode::Off,
                Some("human") => ProgressMode::Human,
                Some("json") => ProgressMode::Json,
                Some(other) => {
                    anyhow::bail!("Unknown progress mode: {}. Use off, human, or json.", other)
                }
            };
            let reporter = mode.reporter();

            let summary = ingest::run_ingest(&cfg, reporter.as_ref()).await?;
            match summary.status {
                ingest::IngestStatus::UpToDate => println!("All PDFs already ingested."),
                ingest::IngestStatus::NoData => println!("No data found."),
                ingest::IngestStatus::Completed => {}
            }
            println!("ingest");
            println!("  pages loaded: {}", summary.pages_loaded);
            println!("  files processed: {}", summary.files_processed);
            println!("  files skipped: {}", summary.files_skipped);
            println!("  files failed: {}", summary.files_failed);
            println!("  chunks embedded: {}", summary.chunks_embedded);
            println!("ok");
        }
        Commands::Ask { query } => {
            let service = qa::TutorService::new(&cfg).await?;
            let reply = service.answer(&query).await?;
            println!("{}", reply.answer);
            if let Some(links) = reply.youtube_links {
                for link in links {
                    println!("  {} — {}", link.title, link.href);
                }
            }
        }
        Commands::Chat => {
            run_chat(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

/// Interactive read-eval-print loop over stdin/stdout.
async fn run_chat(cfg: &config::Config) -> Result<()> {
    let service = qa::TutorService::new(cfg).await?;

    println!();
    println!("{}", "=".repeat(50));
    println!("Welcome to your library tutor!");
    println!("{}", "=".repeat(50));
    println!();

    match service.greeting().await {
        Ok(greeting) => println!("{}\n", greeting),
        Err(e) => eprintln!("Could not generate a greeting: {}\n", e),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"Enter your query, exit to quit: ").await?;
        stdout.flush().await?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let query = line.trim();
        if query == "exit" {
            break;
        }

        match service.answer(query).await {
            Ok(reply) => {
                println!("\n=== ANSWER ===");
                println!("{}\n", reply.answer);
                if let Some(links) = reply.youtube_links {
                    for link in links {
                        println!("  {} — {}", link.title, link.href);
                    }
                    println!();
                }
            }
            Err(e) => eprintln!("Error: {}\n", e),
        }
    }

    Ok(())
}
