//! Line encoding: normalization and parallel fingerprinting.
//!
//! This module turns raw input lines into `(line, fingerprint)` pairs:
//! - [`normalize`]: strips every character outside an inclusion class; the
//!   result exists only to feed the digest and is never stored.
//! - [`digest`]: the digest function (a closed choice of named built-ins or
//!   a caller-supplied closure) and the [`Fingerprinter`] that fans batches
//!   out over a bounded worker pool.
//!
//! The fingerprint is a pure function of the normalized bytes: identical
//! normalized input always yields an identical digest, regardless of which
//! worker computed it.
//!
//! # Example
//!
//! ```
//! use linedup::encoder::{DigestFn, Fingerprinter, Normalizer};
//!
//! let normalizer = Normalizer::new("0-9a-zA-Z").unwrap();
//! let fingerprinter = Fingerprinter::new(DigestFn::Sha1, normalizer, 2);
//! let encoded = fingerprinter.encode("hello, world".to_string());
//! assert_eq!(encoded.line, "hello, world");
//! assert_eq!(encoded.fingerprint.len(), 40);
//! ```

pub mod digest;
pub mod normalize;

pub use digest::{CustomDigest, DigestFn, EncodedLine, Fingerprinter};
pub use normalize::Normalizer;
