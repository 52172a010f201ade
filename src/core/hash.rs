//! Hashing Helpers
//!
//! SHA-256 primitives shared by the seed commitment and the crash point
//! derivation. Everything here is pure and platform independent so a third
//! party can recompute the same digests from revealed inputs.

use sha2::{Digest, Sha256};

/// Hash output type (256 bits / 32 bytes)
pub type Digest256 = [u8; 32];

/// Incremental SHA-256 over several byte segments.
///
/// Segments are concatenated with no separator, so `["ab", "c"]` and
/// `["a", "bc"]` hash to the same digest.
pub struct SegmentHasher {
    hasher: Sha256,
}

impl SegmentHasher {
    /// Create an empty hasher.
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    /// Append raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Append the UTF-8 bytes of a string.
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.hasher.update(value.as_bytes());
    }

    /// Append the decimal representation of a counter.
    #[inline]
    pub fn update_decimal(&mut self, value: u64) {
        self.hasher.update(value.to_string().as_bytes());
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> Digest256 {
        self.hasher.finalize().into()
    }
}

impl Default for SegmentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute a simple hash of arbitrary data.
pub fn sha256(data: &[u8]) -> Digest256 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Lowercase hex SHA-256 of arbitrary data.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// First 32 bits of a digest, read big-endian.
///
/// Equivalent to parsing the first eight hex characters of the digest.
#[inline]
pub fn leading_u32(digest: &Digest256) -> u32 {
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}
