use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub video_search: VideoSearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LibraryConfig {
    #[serde(default = "default_pdf_dir")]
    pub pdf_dir: PathBuf,
    /// Ledger of already-ingested filenames, colocated with `pdf_dir`.
    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            pdf_dir: default_pdf_dir(),
            ledger_file: default_ledger_file(),
        }
    }
}

impl LibraryConfig {
    pub fn ledger_path(&self) -> PathBuf {
        self.pdf_dir.join(&self.ledger_file)
    }
}

fn default_pdf_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_ledger_file() -> String {
    "ingested.txt".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/index/tutor.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    700
}
fn default_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_dedup_prefix_len")]
    pub dedup_prefix_len: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            dedup_prefix_len: default_dedup_prefix_len(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_dedup_prefix_len() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            base_url: default_embedding_base_url(),
            api_key_env: default_api_key_env(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct VideoSearchConfig {
    #[serde(default = "default_video_enabled")]
    pub enabled: bool,
    #[serde(default = "default_video_site")]
    pub site: String,
    #[serde(default = "default_video_max_results")]
    pub max_results: usize,
    #[serde(default = "default_video_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VideoSearchConfig {
    fn default() -> Self {
        Self {
            enabled: default_video_enabled(),
            site: default_video_site(),
            max_results: default_video_max_results(),
            timeout_secs: default_video_timeout_secs(),
        }
    }
}

fn default_video_enabled() -> bool {
    true
}
fn default_video_site() -> String {
    "youtube.com".to_string()
}
fn default_video_max_results() -> usize {
    5
}
fn default_video_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7400".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be < chunking.chunk_size");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.dedup_prefix_len == 0 {
        anyhow::bail!("retrieval.dedup_prefix_len must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.embedding.is_enabled() {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    if config.video_search.max_results < 1 {
        anyhow::bail!("video_search.max_results must be >= 1");
    }

    Ok(())
}
