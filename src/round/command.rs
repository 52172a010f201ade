//! Player commands accepted by the round engine.

use serde::Serialize;

use crate::core::multiplier::Multiplier;

/// A validated player command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    /// Stake `amount` on the running round.
    PlaceBet {
        /// Stake, positive.
        amount: f64,
        /// Optional client seed; the default seed is used when absent.
        client_seed: Option<String>,
    },
    /// Lock in the current multiplier.
    CashOut,
}

/// What an accepted command did.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandAck {
    /// Bet stored; `replaced` if it overwrote an earlier bet this round.
    BetPlaced {
        /// Whether an earlier bet was overwritten.
        replaced: bool,
    },
    /// Cash-out recorded at this multiplier.
    CashedOut(Multiplier),
}
