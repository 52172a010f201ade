//! Crash Point Derivation
//!
//! `crash_point(seed, client_seed, nonce)` is a pure function of its three
//! inputs:
//!
//! 1. `digest = SHA-256(seed_hex || client_seed || decimal(nonce))`
//! 2. `r` = first 32 bits of `digest`, big-endian
//! 3. `x = r / (2^32 - 1)`
//! 4. `x < 0.01` gives exactly `1.00` (house edge), otherwise `round(1 / x, 2)`
//!
//! Rounding is half away from zero on `100 / x`, see [`round_cents`].

use crate::core::hash::{leading_u32, Digest256, SegmentHasher};
use crate::core::multiplier::{round_cents, Multiplier};
use crate::fairness::seed::ServerSeed;

/// Normalisation divisor: `2^32 - 1`.
pub const MAX_DRAW: f64 = u32::MAX as f64;

/// Draws below this value crash instantly.
pub const INSTANT_CRASH_THRESHOLD: f64 = 0.01;

/// Crash point of an instant crash.
pub const INSTANT_CRASH: Multiplier = Multiplier::ONE;

/// Every intermediate value of a derivation, for audits and test vectors.
#[derive(Clone, Debug, PartialEq)]
pub struct CrashDerivation {
    /// SHA-256 of the concatenated inputs.
    pub digest: Digest256,
    /// First 32 bits of the digest.
    pub draw: u32,
    /// `draw` normalised into `[0, 1]`.
    pub normalized: f64,
    /// Whether the house-edge branch fired.
    pub instant: bool,
    /// Resulting crash point.
    pub crash_point: Multiplier,
}

impl CrashDerivation {
    /// Digest as lowercase hex.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

/// Run the full derivation.
pub fn derive_crash(seed: &ServerSeed, client_seed: &str, nonce: u64) -> CrashDerivation {
    let mut hasher = SegmentHasher::new();
    hasher.update_str(seed.as_str());
    hasher.update_str(client_seed);
    hasher.update_decimal(nonce);
    let digest = hasher.finalize();

    let draw = leading_u32(&digest);
    let normalized = draw as f64 / MAX_DRAW;

    let (instant, crash_point) = if normalized < INSTANT_CRASH_THRESHOLD {
        (true, INSTANT_CRASH)
    } else {
        (false, Multiplier::new(round_cents(1.0 / normalized)))
    };

    CrashDerivation {
        digest,
        draw,
        normalized,
        instant,
        crash_point,
    }
}

/// Crash point for a round.
#[inline]
pub fn crash_point(seed: &ServerSeed, client_seed: &str, nonce: u64) -> Multiplier {
    derive_crash(seed, client_seed, nonce).crash_point
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SEED: &str = "4a914640d8fccf507beb813f1f09b1d5bf887f0162909f1c6ac05bd8acc48e16";

    #[test]
    fn test_scenario_vector() {
        let seed = ServerSeed::new(SEED);
        let derivation = derive_crash(&seed, "abc", 1);

        assert_eq!(
            derivation.digest_hex(),
            "11b9109421a965168576444a5372568665b237fe18a71253559354c584f25ad0"
        );
        assert_eq!(derivation.draw, 297_341_076);
        assert!((derivation.normalized - 0.069_230_114_125_933_06).abs() < 1e-15);
        assert!(!derivation.instant);
        assert_eq!(derivation.crash_point, Multiplier::new(14.44));
    }

    #[test]
    fn test_other_vectors() {
        let seed = ServerSeed::new(SEED);
        assert_eq!(crash_point(&seed, "abc", 2), Multiplier::new(1.56));
        assert_eq!(crash_point(&seed, "default_seed", 1), Multiplier::new(1.88));
    }

    #[test]
    fn test_instant_crash_vector() {
        let seed = ServerSeed::new(SEED);
        let derivation = derive_crash(&seed, "abc", 21);

        assert_eq!(derivation.draw, 25_537_700);
        assert!(derivation.instant);
        assert_eq!(derivation.crash_point, INSTANT_CRASH);
    }

    #[test]
    fn test_nonce_changes_outcome() {
        let seed = ServerSeed::new(SEED);
        assert_ne!(derive_crash(&seed, "abc", 1).digest, derive_crash(&seed, "abc", 2).digest);
    }

    #[test]
    fn test_instant_crash_rate() {
        let samples = 20_000;
        let instant = (0..samples)
            .filter(|i| {
                let seed = ServerSeed::new(crate::core::hash::sha256_hex(format!("seed-{}", i).as_bytes()));
                derive_crash(&seed, "abc", 1).instant
            })
            .count();

        let rate = instant as f64 / samples as f64;
        assert!((0.007..0.013).contains(&rate), "instant crash rate {}", rate);
    }

    proptest! {
        #[test]
        fn prop_deterministic(seed in "[0-9a-f]{64}", client in ".{0,32}", nonce in any::<u64>()) {
            let seed = ServerSeed::new(seed);
            prop_assert_eq!(derive_crash(&seed, &client, nonce), derive_crash(&seed, &client, nonce));
        }

        #[test]
        fn prop_never_below_one(seed in "[0-9a-f]{64}", client in ".{0,32}", nonce in any::<u64>()) {
            let seed = ServerSeed::new(seed);
            prop_assert!(crash_point(&seed, &client, nonce) >= Multiplier::ONE);
        }

        #[test]
        fn prop_two_decimals(seed in "[0-9a-f]{64}", nonce in 0u64..10_000) {
            let seed = ServerSeed::new(seed);
            let value = crash_point(&seed, "abc", nonce).value();
            prop_assert_eq!(round_cents(value), value);
        }
    }
}
