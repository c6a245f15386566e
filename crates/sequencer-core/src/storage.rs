//! Persistence boundary: the sequence document as pretty JSON on disk.
//!
//! Serialization never happens while the player's lock is held; the
//! player clones the document inside the lock and calls into here
//! outside it.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::sequence::Sequence;

/// Errors crossing the persistence boundary. Reported as values, never
/// thrown across the player's lock.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("sequence parse error: {0}")]
    Parse(serde_json::Error),
    #[error("invalid sequence: {0}")]
    Invalid(String),
}

/// Read, parse and validate a sequence document. The derived duration is
/// recomputed rather than trusted.
pub fn load_sequence(path: &Path) -> Result<Sequence, StorageError> {
    let json = fs::read_to_string(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut sequence: Sequence = serde_json::from_str(&json).map_err(StorageError::Parse)?;
    sequence.validate_basic().map_err(StorageError::Invalid)?;
    sequence.update_duration();
    Ok(sequence)
}

/// Serialize a sequence document to disk, creating the parent directory
/// when missing.
pub fn save_sequence(path: &Path, sequence: &Sequence) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }
    let json = serde_json::to_string_pretty(sequence).map_err(StorageError::Parse)?;
    fs::write(path, json).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })
}
