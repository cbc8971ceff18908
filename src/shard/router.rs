//! Deterministic fingerprint-prefix to shard-path routing.

use std::path::{Path, PathBuf};

/// Number of prefix characters per directory level.
pub const SEGMENT_WIDTH: usize = 2;

/// File extension of shard files.
pub const SHARD_EXTENSION: &str = "shard";

/// Derive the shard path for a fingerprint prefix.
///
/// The prefix is split into [`SEGMENT_WIDTH`]-character segments joined under
/// `root`; an odd-length prefix leaves a shorter final segment. Two
/// fingerprints sharing the prefix always map to the same path, and differing
/// prefixes never collide.
///
/// # Example
///
/// ```
/// use std::path::{Path, PathBuf};
/// use linedup::shard::shard_path;
///
/// assert_eq!(
///     shard_path(Path::new("path/to"), "12345678"),
///     PathBuf::from("path/to/12/34/56/78.shard")
/// );
/// ```
#[must_use]
pub fn shard_path(root: &Path, prefix: &str) -> PathBuf {
    let chars: Vec<char> = prefix.chars().collect();
    let mut path = root.to_path_buf();
    for segment in chars.chunks(SEGMENT_WIDTH) {
        path.push(segment.iter().collect::<String>());
    }
    path.set_extension(SHARD_EXTENSION);
    path
}

/// Directory depth of shard files below the root for a given prefix length.
#[must_use]
pub fn shard_depth(prefix_length: usize) -> usize {
    prefix_length.div_ceil(SEGMENT_WIDTH)
}
