//! Post-Round Verification
//!
//! Recomputes a finished round from its revealed seed and checks it against
//! what was published while the round was live.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::multiplier::Multiplier;
use crate::fairness::crash::crash_point;
use crate::fairness::seed::{HashedServerSeed, ServerSeed};

/// Everything a player needs to audit one round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundReveal {
    /// Commitment published at round start.
    pub hashed_seed: HashedServerSeed,
    /// Seed revealed at round end.
    pub server_seed: ServerSeed,
    /// Client seed the crash point was derived with.
    pub client_seed: String,
    /// Round nonce.
    pub nonce: u64,
    /// Crash point announced at round end.
    pub crash_point: Multiplier,
}

impl RoundReveal {
    /// Verify reveal against the published commitment and crash point.
    pub fn verify(&self) -> Result<(), VerifyError> {
        let recomputed = self.server_seed.commit();
        if recomputed != self.hashed_seed {
            return Err(VerifyError::SeedMismatch {
                published: self.hashed_seed.to_string(),
                recomputed: recomputed.to_string(),
            });
        }

        let expected = crash_point(&self.server_seed, &self.client_seed, self.nonce);
        if expected != self.crash_point {
            return Err(VerifyError::CrashPointMismatch {
                announced: self.crash_point,
                recomputed: expected,
            });
        }

        Ok(())
    }
}

/// Errors that can occur during reveal verification.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerifyError {
    /// Revealed seed does not hash to the published commitment.
    #[error("seed does not match commitment (published {published}, recomputed {recomputed})")]
    SeedMismatch {
        /// Commitment announced at round start.
        published: String,
        /// Hash of the revealed seed.
        recomputed: String,
    },

    /// Announced crash point differs from the derivation.
    #[error("crash point mismatch (announced {announced}x, recomputed {recomputed}x)")]
    CrashPointMismatch {
        /// Crash point announced at round end.
        announced: Multiplier,
        /// Crash point derived from the revealed inputs.
        recomputed: Multiplier,
    },
}
