//! Content digests for cache validity checks.
//!
//! A digest is SHA-1 over the payload bytes, rendered as 40 uppercase hex
//! characters with no separators. It only decides whether a cached file still
//! matches a payload and makes no integrity promise against tampering.

use std::io::{self, Read};

use sha1::{Digest, Sha1};

/// A content digest (uppercase SHA-1 hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the digest of the given bytes.
    pub fn compute(data: &[u8]) -> Self {
        ContentDigest(hex::encode_upper(Sha1::digest(data)))
    }

    /// Compute the digest of everything readable from `reader`.
    pub fn of_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut hasher = Sha1::new();
        io::copy(&mut reader, &mut hasher)?;
        Ok(ContentDigest(hex::encode_upper(hasher.finalize())))
    }

    /// Get the hex string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `data` hashes to this digest.
    pub fn matches(&self, data: &[u8]) -> bool {
        ContentDigest::compute(data) == *self
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
