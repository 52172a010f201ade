//! Provably Fair Crash Points
//!
//! Commit-reveal scheme for crash rounds:
//!
//! ```text
//! start:  seed = OsRng(32 bytes) -> publish SHA-256(seed)
//! play:   crash = f(seed, client_seed, nonce)       (kept private)
//! end:    publish crash, reveal seed -> anyone can re-run f
//! ```

pub mod crash;
pub mod seed;
pub mod verify;

// Re-export key types
pub use crash::{crash_point, derive_crash, CrashDerivation, INSTANT_CRASH};
pub use seed::{HashedServerSeed, ServerSeed};
pub use verify::{RoundReveal, VerifyError};
