//! Payout Multiplier
//!
//! The climbing value players cash out against. Stored as a raw `f64` so
//! compound growth is exact to IEEE-754; rounding only happens for display
//! and for crash point derivation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A payout multiplier (1.00x and up during play).
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Multiplier(f64);

impl Multiplier {
    /// Starting multiplier of every round.
    pub const ONE: Multiplier = Multiplier(1.0);

    /// Wrap a raw value.
    #[inline]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Raw value.
    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Compound one step: `m + rate * m`.
    #[inline]
    pub fn grow(self, rate: f64) -> Self {
        Self(self.0 + rate * self.0)
    }

    /// Value rounded to two decimals (half away from zero).
    #[inline]
    pub fn rounded(self) -> Self {
        Self(round_cents(self.0))
    }

    /// Payout for a stake at this multiplier.
    #[inline]
    pub fn payout(self, amount: f64) -> f64 {
        amount * self.0
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Self::ONE
    }
}

/// Formats as `X.XX`, without the trailing `x`.
impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Round to two decimals, half away from zero.
///
/// This is the rounding rule verifiers must use when recomputing crash points.
#[inline]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_is_compound() {
        let m = Multiplier::ONE.grow(0.05).grow(0.05);
        assert!((m.value() - 1.1025).abs() < 1e-12);
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Multiplier::new(1.0).to_string(), "1.00");
        assert_eq!(Multiplier::new(2.3456).to_string(), "2.35");
        assert_eq!(Multiplier::new(14.44).to_string(), "14.44");
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(1.004), 1.0);
        assert_eq!(round_cents(1.5649), 1.56);
        assert_eq!(round_cents(100.0), 100.0);
    }

    #[test]
    fn test_ordering() {
        assert!(Multiplier::new(2.0) <= Multiplier::new(2.0));
        assert!(Multiplier::new(1.99) < Multiplier::new(2.0));
    }

    #[test]
    fn test_payout() {
        assert_eq!(Multiplier::new(2.0).payout(100.0), 200.0);
    }
}
