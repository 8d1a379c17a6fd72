//! Saving and reloading Markdown buffers without losing anchors.
//!
//! Buffers are written and read byte for byte. [`verify_round_trip`]
//! checks that a reload still carries the same anchors, in the same order,
//! as the buffer that was saved.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::anchor::{Anchor, parse_anchors};
use crate::layout::{BlockId, Coordinates};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("{} is not valid UTF-8", path.display())]
    Utf8 {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },
}

/// A reloaded buffer whose anchors differ from the saved one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundTripError {
    #[error("anchor count changed from {before} to {after}")]
    CountMismatch { before: usize, after: usize },
    #[error("anchor {index} changed from {before} to {after}")]
    AnchorMismatch {
        index: usize,
        before: String,
        after: String,
    },
}

/// Write `text` to `path`, creating parent directories as needed.
///
/// # Errors
/// Returns [`PersistError::Write`] if a directory or the file cannot be written.
pub fn save_buffer(path: &Path, text: &str) -> Result<(), PersistError> {
    let write_err = |source: io::Error| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, text.as_bytes()).map_err(write_err)?;
    tracing::debug!(path = %path.display(), bytes = text.len(), "buffer saved");
    Ok(())
}

/// Read a buffer back exactly as stored.
///
/// # Errors
/// Returns an error if the file cannot be read or is not UTF-8.
pub fn load_buffer(path: &Path) -> Result<String, PersistError> {
    let bytes = fs::read(path).map_err(|source| PersistError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|source| PersistError::Utf8 {
        path: path.to_path_buf(),
        source,
    })
}

/// Check that `after` carries the anchors of `before`.
///
/// Anchors are compared by block id and coordinates in buffer order;
/// positions may shift if surrounding text changed. Returns the number of
/// anchors checked.
///
/// # Errors
/// Returns the first difference found.
pub fn verify_round_trip(before: &str, after: &str) -> Result<usize, RoundTripError> {
    let before = parse_anchors(before);
    let after = parse_anchors(after);
    if before.len() != after.len() {
        return Err(RoundTripError::CountMismatch {
            before: before.len(),
            after: after.len(),
        });
    }
    for (index, (old, new)) in before.iter().zip(&after).enumerate() {
        if old.identity() != new.identity() {
            return Err(RoundTripError::AnchorMismatch {
                index,
                before: old.marker(),
                after: new.marker(),
            });
        }
    }
    Ok(before.len())
}

/// Save `text`, reload it, and verify its anchors survived.
///
/// # Errors
/// Returns an error if the file cannot be written or read back, or if the
/// reloaded anchors differ.
pub fn save_and_verify(path: &Path, text: &str) -> anyhow::Result<Vec<Anchor>> {
    save_buffer(path, text)?;
    let reloaded = load_buffer(path)?;
    verify_round_trip(text, &reloaded)?;
    Ok(parse_anchors(&reloaded))
}

/// Block ids and coordinates, in order, as a comparable list.
pub fn anchor_identities(text: &str) -> Vec<(BlockId, Coordinates)> {
    parse_anchors(text)
        .into_iter()
        .map(|anchor| (anchor.block_id, anchor.coords))
        .collect()
}
