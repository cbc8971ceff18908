//! Append-only shard writes and fixed-depth enumeration.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::encoder::EncodedLine;
use crate::shard::router::{shard_depth, shard_path, SHARD_EXTENSION};
use crate::shard::ShardError;

/// Appends fingerprinted batches to the shard tree.
///
/// The writer groups a batch by `(prefix, fingerprint)` and appends one
/// `"<fingerprint> <line>"` record per member. It never overwrites and never
/// deduplicates: duplicate fingerprints simply accumulate until merge time.
#[derive(Debug, Clone)]
pub struct ShardWriter {
    root: PathBuf,
    prefix_length: usize,
}

impl ShardWriter {
    /// Create a writer rooted at `root`, routing on the first
    /// `prefix_length` fingerprint characters.
    #[must_use]
    pub fn new(root: &Path, prefix_length: usize) -> Self {
        Self {
            root: root.to_path_buf(),
            prefix_length,
        }
    }

    /// Append an encoded batch to the shard tree.
    ///
    /// Parent directories are created as needed. Records sharing a
    /// fingerprint are written adjacently so merge-time first-seen ordering
    /// within one batch matches encode order per fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::Io`] when a shard directory cannot be created
    /// or a shard file cannot be opened or appended to.
    pub fn write_batch(&self, batch: &[EncodedLine]) -> Result<(), ShardError> {
        let mut groups: HashMap<(&str, &str), Vec<&str>> = HashMap::new();
        for entry in batch {
            let cut = entry.fingerprint.len().min(self.prefix_length);
            let prefix = entry.fingerprint.get(..cut).unwrap_or(&entry.fingerprint);
            groups
                .entry((prefix, entry.fingerprint.as_str()))
                .or_default()
                .push(entry.line.as_str());
        }

        for ((prefix, fingerprint), lines) in groups {
            let path = shard_path(&self.root, prefix);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|source| ShardError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }

            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(&path)
                .map_err(|source| ShardError::Io {
                    path: path.clone(),
                    source,
                })?;
            let mut writer = BufWriter::new(file);
            for line in lines {
                writeln!(writer, "{fingerprint} {line}").map_err(|source| ShardError::Io {
                    path: path.clone(),
                    source,
                })?;
            }
            writer.flush().map_err(|source| ShardError::Io {
                path: path.clone(),
                source,
            })?;
        }

        Ok(())
    }
}

/// Enumerate every shard file at the depth implied by `prefix_length`.
///
/// Enumeration order is filesystem order, not otherwise guaranteed sorted.
/// A missing shard root yields an empty list, matching a run that produced
/// zero shards.
///
/// # Errors
///
/// Returns [`ShardError::Io`] when the tree cannot be traversed.
pub fn enumerate_shards(root: &Path, prefix_length: usize) -> Result<Vec<PathBuf>, ShardError> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let depth = shard_depth(prefix_length);
    let mut shards = Vec::new();
    for entry in WalkDir::new(root).min_depth(depth).max_depth(depth) {
        let entry = entry.map_err(|err| {
            let path = err
                .path()
                .map_or_else(|| root.to_path_buf(), Path::to_path_buf);
            ShardError::Io {
                path,
                source: err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("walk error")),
            }
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some(SHARD_EXTENSION)
        {
            shards.push(entry.into_path());
        }
    }
    Ok(shards)
}
