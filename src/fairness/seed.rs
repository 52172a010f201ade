//! Server Seed Commitment
//!
//! A fresh secret is drawn for every round and only its SHA-256 hash is
//! published before play. The secret is revealed after the crash so anyone can
//! check that the hash and the crash point were fixed in advance.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::core::hash::sha256_hex;

/// Bytes of entropy in a server seed.
pub const SERVER_SEED_BYTES: usize = 32;

/// Secret round seed, carried as its lowercase hex string.
///
/// All derivations hash the UTF-8 bytes of the hex string, not the raw
/// entropy. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerSeed(String);

impl ServerSeed {
    /// Draw a new seed from the operating system CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SERVER_SEED_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a previously revealed seed.
    pub fn new(seed: impl Into<String>) -> Self {
        Self(seed.into())
    }

    /// Seed text as hashed by the derivations.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// One-way commitment published before the round starts.
    pub fn commit(&self) -> HashedServerSeed {
        HashedServerSeed(sha256_hex(self.0.as_bytes()))
    }
}

impl fmt::Debug for ServerSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServerSeed(<redacted>)")
    }
}

impl fmt::Display for ServerSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Published commitment: lowercase hex SHA-256 of the seed string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashedServerSeed(String);

impl HashedServerSeed {
    /// Wrap a published commitment (e.g. copied from a round announcement).
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into().to_ascii_lowercase())
    }

    /// Hex text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashedServerSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
