//! Settlement
//!
//! Pays out the bets of a crashed round. A cash-out at or below the crash
//! point wins `amount * cash_out`; anything else forfeits the stake.

use serde::Serialize;

use crate::core::multiplier::Multiplier;
use crate::round::ledger::{Bet, PlayerId};

/// Result of one bet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// Cashed out in time.
    Won {
        /// Locked-in multiplier.
        cash_out: Multiplier,
        /// `amount * cash_out`.
        payout: f64,
    },
    /// No cash-out, or a cash-out past the crash point.
    Lost {
        /// Forfeited stake.
        stake: f64,
    },
}

impl Outcome {
    /// Whether the bet won.
    pub fn is_win(&self) -> bool {
        matches!(self, Outcome::Won { .. })
    }
}

/// Settlement of one player's bet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settlement {
    /// Player.
    pub player_id: PlayerId,
    /// Stake.
    pub amount: f64,
    /// Win or loss.
    pub outcome: Outcome,
}

/// Settle a single bet against the crash point.
pub fn settle_bet(bet: &Bet, crash_point: Multiplier) -> Settlement {
    let outcome = match bet.cash_out {
        // Inclusive: cashing out exactly at the crash point wins.
        Some(cash_out) if cash_out <= crash_point => Outcome::Won {
            cash_out,
            payout: cash_out.payout(bet.amount),
        },
        _ => Outcome::Lost { stake: bet.amount },
    };

    Settlement {
        player_id: bet.player_id.clone(),
        amount: bet.amount,
        outcome,
    }
}

/// Settle every bet of a round, in ledger order.
pub fn settle(bets: &[Bet], crash_point: Multiplier) -> Vec<Settlement> {
    bets.iter().map(|bet| settle_bet(bet, crash_point)).collect()
}

/// House result of a settled round: stakes taken minus payouts made.
pub fn house_net(settlements: &[Settlement]) -> f64 {
    settlements
        .iter()
        .map(|s| match s.outcome {
            Outcome::Won { payout, .. } => s.amount - payout,
            Outcome::Lost { stake } => stake,
        })
        .sum()
}
