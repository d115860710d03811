// Ingestion configuration

use crate::parser::Decoding;
use nibrs_common::{NibrsError, Result};
use std::path::PathBuf;

/// Lines per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Destination database file
pub const DEFAULT_DATABASE_PATH: &str = "nibrs_data.db";

/// Number of available processing units, at least 1
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Plain parameters for one ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Master file to read (`.gz` is decompressed)
    pub source: PathBuf,

    /// SQLite database file
    pub database: PathBuf,

    /// Lines per chunk
    pub chunk_size: usize,

    /// Chunks processed concurrently
    pub workers: usize,

    /// Skip lines already committed by an earlier run of the same file
    pub resume: bool,

    pub decoding: Decoding,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            database: PathBuf::from(DEFAULT_DATABASE_PATH),
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: default_workers(),
            resume: false,
            decoding: Decoding::Strict,
        }
    }
}

impl IngestConfig {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_database(mut self, database: impl Into<PathBuf>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_decoding(mut self, decoding: Decoding) -> Self {
        self.decoding = decoding;
        self
    }

    /// Load configuration from the environment (and `.env` if present)
    ///
    /// - `NIBRS_SOURCE`: master file path (required)
    /// - `NIBRS_DATABASE`: destination file, default `nibrs_data.db`
    /// - `NIBRS_CHUNK_SIZE`: lines per chunk, default 100000
    /// - `NIBRS_WORKERS`: default is the number of CPUs
    /// - `NIBRS_RESUME`: true/false
    /// - `NIBRS_LOSSY_UTF8`: true/false
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Ok(source) = std::env::var("NIBRS_SOURCE") {
            config.source = PathBuf::from(source);
        }
        if let Ok(database) = std::env::var("NIBRS_DATABASE") {
            config.database = PathBuf::from(database);
        }
        if let Some(chunk_size) = parse_env("NIBRS_CHUNK_SIZE")? {
            config.chunk_size = chunk_size;
        }
        if let Some(workers) = parse_env("NIBRS_WORKERS")? {
            config.workers = workers;
        }
        if let Some(resume) = parse_env("NIBRS_RESUME")? {
            config.resume = resume;
        }
        if let Some(true) = parse_env::<bool>("NIBRS_LOSSY_UTF8")? {
            config.decoding = Decoding::Lossy;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.source.as_os_str().is_empty() {
            return Err(NibrsError::Config("Source path cannot be empty".to_string()));
        }

        if self.database.as_os_str().is_empty() {
            return Err(NibrsError::Config("Database path cannot be empty".to_string()));
        }

        if self.chunk_size == 0 {
            return Err(NibrsError::Config("Chunk size must be greater than 0".to_string()));
        }

        if self.workers == 0 {
            return Err(NibrsError::Config("Workers must be greater than 0".to_string()));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| NibrsError::Config(format!("Invalid value for {}: {}", name, raw))),
        Err(_) => Ok(None),
    }
}
