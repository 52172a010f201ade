//! Core primitives.
//!
//! Pure hashing and multiplier arithmetic shared by the fairness and round
//! modules. Nothing here touches the clock or the network.

pub mod hash;
pub mod multiplier;

// Re-export core types
pub use hash::{sha256, sha256_hex, Digest256, SegmentHasher};
pub use multiplier::{round_cents, Multiplier};
