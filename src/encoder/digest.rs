//! Digest selection and parallel batch fingerprinting.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::config::ConfigError;
use crate::encoder::Normalizer;

/// A caller-supplied digest: accepts bytes, returns a hex digest.
pub type CustomDigest = Arc<dyn Fn(&[u8]) -> String + Send + Sync>;

/// Closed choice of digest functions.
///
/// Named built-ins cover the common cases; [`DigestFn::Custom`] accepts any
/// closure satisfying "bytes in, hex digest out" for library callers. An
/// unsupported name is rejected at construction time via [`DigestFn::named`],
/// never per record.
#[derive(Clone)]
pub enum DigestFn {
    /// SHA-1, the default 160-bit fingerprint (40 hex characters).
    Sha1,
    /// SHA-256 (64 hex characters).
    Sha256,
    /// BLAKE3 (64 hex characters).
    Blake3,
    /// Caller-supplied digest function.
    Custom(CustomDigest),
}

impl DigestFn {
    /// Resolve a named built-in digest.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownDigest`] for anything other than
    /// `sha1`, `sha256`, or `blake3` (case-insensitive).
    pub fn named(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            _ => Err(ConfigError::UnknownDigest(name.to_string())),
        }
    }

    /// Compute the hex digest of `bytes`.
    #[must_use]
    pub fn digest(&self, bytes: &[u8]) -> String {
        match self {
            Self::Sha1 => hex::encode(Sha1::digest(bytes)),
            Self::Sha256 => hex::encode(Sha256::digest(bytes)),
            Self::Blake3 => blake3::hash(bytes).to_hex().to_string(),
            Self::Custom(f) => f(bytes),
        }
    }
}

impl fmt::Debug for DigestFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "DigestFn::Sha1"),
            Self::Sha256 => write!(f, "DigestFn::Sha256"),
            Self::Blake3 => write!(f, "DigestFn::Blake3"),
            Self::Custom(_) => write!(f, "DigestFn::Custom(<fn>)"),
        }
    }
}

/// A line paired with the fingerprint of its normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedLine {
    /// The original, unmodified line.
    pub line: String,
    /// Hex digest of the normalized line bytes.
    pub fingerprint: String,
}

/// Fingerprints lines, batching work over a bounded worker pool.
///
/// Batch encoding guarantees that every line is paired with its own digest;
/// it makes no guarantee about completion order across workers. Downstream
/// shard routing is order-independent, so neither does it need one.
pub struct Fingerprinter {
    digest: DigestFn,
    normalizer: Normalizer,
    pool: rayon::ThreadPool,
}

impl fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fingerprinter")
            .field("digest", &self.digest)
            .field("workers", &self.pool.current_num_threads())
            .finish()
    }
}

impl Fingerprinter {
    /// Create a fingerprinter with a dedicated pool of `workers` threads.
    #[must_use]
    pub fn new(digest: DigestFn, normalizer: Normalizer, workers: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
            .unwrap_or_else(|_| {
                log::warn!(
                    "Failed to create custom thread pool, using global pool with {} threads",
                    rayon::current_num_threads()
                );
                rayon::ThreadPoolBuilder::new().build().unwrap()
            });

        Self {
            digest,
            normalizer,
            pool,
        }
    }

    /// Fingerprint a single line: `(line) -> (line, digest)`.
    #[must_use]
    pub fn encode(&self, line: String) -> EncodedLine {
        let normalized = self.normalizer.normalize(&line);
        let fingerprint = self.digest.digest(normalized.as_bytes());
        EncodedLine { line, fingerprint }
    }

    /// Fingerprint a batch of lines in parallel.
    ///
    /// `chunk_size` bounds the work-unit granularity handed to each worker.
    #[must_use]
    pub fn encode_batch(&self, lines: Vec<String>, chunk_size: usize) -> Vec<EncodedLine> {
        self.pool.install(|| {
            lines
                .into_par_iter()
                .with_min_len(chunk_size.max(1))
                .map(|line| self.encode(line))
                .collect()
        })
    }
}
