//! Configuration management for the lexrag CLI.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (.lexrag/config.yaml)
//!
//! The configuration is workspace-centric: the corpus lives under the
//! workspace (by default `<workspace>/documents`) and all derived state
//! (snapshot, config) lives in `<workspace>/.lexrag/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Main application configuration.
///
/// This struct holds all global configuration options that affect
/// CLI behavior across commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .lexrag/)
    pub workspace: PathBuf,

    /// Explicit corpus directory override (default: <workspace>/documents)
    pub corpus: Option<PathBuf>,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Retrieval parameters (window, overlap, dimensionality, top-k)
    pub retrieval: RetrievalConfig,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Parameters of the retrieval pipeline.
///
/// The chunking and embedding parameters must match between index time and
/// query time; they are persisted alongside the snapshot so a change
/// invalidates the cache. `top_k` only affects queries and is not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Chunk window size in words
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Overlap between adjacent chunks in words
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    /// Embedding vector dimensionality
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: u32,

    /// Default number of chunks returned per query
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

fn default_chunk_size() -> u32 {
    1000
}

fn default_chunk_overlap() -> u32 {
    200
}

fn default_embedding_dim() -> u32 {
    384
}

fn default_top_k() -> u32 {
    5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embedding_dim: default_embedding_dim(),
            top_k: default_top_k(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    corpus: Option<CorpusConfig>,
    retrieval: Option<RetrievalConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CorpusConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            corpus: None,
            config_file: None,
            retrieval: RetrievalConfig::default(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `LEXRAG_WORKSPACE`: Override workspace path
    /// - `LEXRAG_CORPUS`: Override corpus directory
    /// - `LEXRAG_CONFIG`: Path to config file
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("LEXRAG_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(corpus) = std::env::var("LEXRAG_CORPUS") {
            config.corpus = Some(PathBuf::from(corpus));
        }

        if let Ok(config_file) = std::env::var("LEXRAG_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        // Load from YAML config file if it exists
        let config_path = if let Some(ref cf) = config.config_file {
            cf.clone()
        } else {
            config.workspace.join(".lexrag/config.yaml")
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Only override the file's logging.level when RUST_LOG is actually set
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(corpus) = config_file.corpus {
            if let Some(path) = corpus.path {
                result.corpus = Some(PathBuf::from(path));
            }
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        corpus: Option<PathBuf>,
        config_file: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(corpus) = corpus {
            self.corpus = Some(corpus);
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the corpus directory (explicit override or <workspace>/documents).
    pub fn corpus_dir(&self) -> PathBuf {
        self.corpus
            .clone()
            .unwrap_or_else(|| self.workspace.join("documents"))
    }

    /// Get the path to the .lexrag directory.
    pub fn lexrag_dir(&self) -> PathBuf {
        self.workspace.join(".lexrag")
    }

    /// Get the path to the persisted index snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.lexrag_dir().join("snapshot.sqlite")
    }

    /// Ensure the .lexrag directory exists.
    pub fn ensure_lexrag_dir(&self) -> AppResult<()> {
        let lexrag_dir = self.lexrag_dir();
        if !lexrag_dir.exists() {
            std::fs::create_dir_all(&lexrag_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .lexrag directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AppResult<()> {
        self.retrieval.validate()
    }
}

impl RetrievalConfig {
    /// Validate retrieval parameters.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Validation(
                "chunk_size must be at least 1 word".to_string(),
            ));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Validation(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.embedding_dim == 0 {
            return Err(AppError::Validation(
                "embedding_dim must be at least 1".to_string(),
            ));
        }

        if self.top_k == 0 {
            return Err(AppError::Validation(
                "top_k must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
