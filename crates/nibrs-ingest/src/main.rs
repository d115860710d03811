//! NIBRS Ingest - master file to SQLite conversion tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nibrs_common::logging::{init_logging, LogConfig, LogLevel};
use nibrs_ingest::config::{default_workers, IngestConfig, DEFAULT_CHUNK_SIZE, DEFAULT_DATABASE_PATH};
use nibrs_ingest::parser::Decoding;
use nibrs_ingest::progress::BarProgress;
use nibrs_ingest::storage::{table_summary, Destination, SqliteDestination};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "nibrs-ingest")]
#[command(author, version, about = "Load an NIBRS master file into SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a master file, appending to the destination tables
    Ingest {
        /// Master file path (.gz is decompressed on the fly)
        #[arg(env = "NIBRS_SOURCE")]
        source: PathBuf,

        /// SQLite database file
        #[arg(short, long, env = "NIBRS_DATABASE", default_value = DEFAULT_DATABASE_PATH)]
        database: PathBuf,

        /// Lines per chunk
        #[arg(short, long, env = "NIBRS_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Chunks parsed in parallel [default: number of CPUs]
        #[arg(short, long, env = "NIBRS_WORKERS")]
        workers: Option<usize>,

        /// Skip lines already committed by an earlier run of the same file
        #[arg(long, env = "NIBRS_RESUME")]
        resume: bool,

        /// Replace invalid UTF-8 instead of skipping the line
        #[arg(long, env = "NIBRS_LOSSY_UTF8")]
        lossy_utf8: bool,
    },

    /// List tables and row counts in a destination
    Summary {
        /// SQLite database file
        #[arg(short, long, env = "NIBRS_DATABASE", default_value = DEFAULT_DATABASE_PATH)]
        database: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // LOG_* variables override the flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("nibrs-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    match cli.command {
        Command::Ingest {
            source,
            database,
            chunk_size,
            workers,
            resume,
            lossy_utf8,
        } => {
            let config = IngestConfig::new(source)
                .with_database(database)
                .with_chunk_size(chunk_size)
                .with_workers(workers.unwrap_or_else(default_workers))
                .with_resume(resume)
                .with_decoding(if lossy_utf8 {
                    Decoding::Lossy
                } else {
                    Decoding::Strict
                });
            config.validate()?;

            info!("Ingesting {}", config.source.display());
            let summary = nibrs_ingest::ingest(&config, Arc::new(BarProgress::new()))
                .await
                .context("Ingestion failed")?;

            if !summary.is_clean() {
                warn!(
                    "{} lines skipped ({} in {} failed chunks)",
                    summary.lines_failed + summary.lines_in_failed_chunks,
                    summary.lines_in_failed_chunks,
                    summary.chunks_failed
                );
            }

            print_summary(&config.database).await?;
        },
        Command::Summary { database } => {
            print_summary(&database).await?;
        },
    }

    Ok(())
}

async fn print_summary(database: &Path) -> Result<()> {
    if !database.exists() {
        anyhow::bail!("Database {} does not exist", database.display());
    }

    let mut destination = SqliteDestination::connect(database).await?;
    let tables = table_summary(&mut destination).await?;
    destination.close().await?;

    println!("Tables in {}:", database.display());
    for (table, rows) in tables {
        println!("  {:<4} {:>12} rows", table, rows);
    }
    Ok(())
}
