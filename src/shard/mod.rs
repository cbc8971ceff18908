//! On-disk shard routing and writing.
//!
//! The shard tree is a filesystem-as-hash-table: the leading `prefix_length`
//! characters of a fingerprint are split into fixed-width path segments under
//! the shard root, and every record with that prefix lands in the same
//! append-only `.shard` file. This is the memory-bounding mechanism of the
//! whole pipeline - at no point does more than one batch of records live in
//! memory during encoding.
//!
//! - [`router`]: prefix to path derivation and fixed-depth enumeration
//! - [`writer`]: batch grouping and append-only record writes

pub mod router;
pub mod writer;

use std::path::PathBuf;

pub use router::{shard_depth, shard_path, SEGMENT_WIDTH, SHARD_EXTENSION};
pub use writer::{enumerate_shards, ShardWriter};

/// Errors that can occur while writing or enumerating shard files.
#[derive(thiserror::Error, Debug)]
pub enum ShardError {
    /// An I/O error occurred while touching a shard file or directory.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
