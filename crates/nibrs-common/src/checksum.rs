//! Source fingerprinting
//!
//! A master file is identified by its name, its size and the SHA-256 of its
//! leading bytes. Only the first [`FINGERPRINT_HEAD_BYTES`] are read.

use crate::error::{NibrsError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Number of leading bytes hashed into a fingerprint
pub const FINGERPRINT_HEAD_BYTES: u64 = 64 * 1024;

/// Compute the SHA-256 of at most `limit` bytes from any readable source
pub fn compute_head_checksum<R: Read>(reader: &mut R, limit: u64) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    let mut limited = reader.take(limit);

    loop {
        let bytes_read = limited.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Fingerprint a source file as `name:size:sha256(head)`
pub fn source_fingerprint(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let open_err = |source| NibrsError::SourceOpen {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::open(path).map_err(open_err)?;
    let size = file.metadata().map_err(open_err)?.len();
    let head = compute_head_checksum(&mut file, FINGERPRINT_HEAD_BYTES)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(format!("{}:{}:{}", name, size, head))
}
