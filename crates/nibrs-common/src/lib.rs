//! NIBRS Common Library
//!
//! Shared error handling, logging and source fingerprinting for the NIBRS
//! ingestion workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`NibrsError`] and the [`Result`] alias
//! - **Logging**: [`logging::LogConfig`] and [`logging::init_logging`]
//! - **Checksums**: [`checksum::source_fingerprint`] identifies a master file
//!   across runs so an interrupted ingestion can be resumed
//!
//! # Example
//!
//! ```no_run
//! use nibrs_common::checksum::source_fingerprint;
//! use nibrs_common::Result;
//!
//! fn identify(path: &str) -> Result<()> {
//!     let key = source_fingerprint(path)?;
//!     tracing::info!(%key, "Fingerprinted source");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{NibrsError, Result};
