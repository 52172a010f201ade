//! Bet Ledger
//!
//! Per-player bets for the active round. Many connection handlers write here
//! concurrently while the round clock is ticking; settlement reads a snapshot
//! only after the clock has stopped.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::multiplier::Multiplier;

/// Player identifier as supplied by the transport.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Create a new player ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A single player's stake in the current round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    /// Who placed it.
    pub player_id: PlayerId,
    /// Stake, always positive.
    pub amount: f64,
    /// Client seed supplied with the bet (or the default).
    pub client_seed: String,
    /// Multiplier snapshot taken at cash-out, if any.
    pub cash_out: Option<Multiplier>,
}

impl Bet {
    /// New bet with no cash-out.
    pub fn new(player_id: PlayerId, amount: f64, client_seed: impl Into<String>) -> Self {
        Self {
            player_id,
            amount,
            client_seed: client_seed.into(),
            cash_out: None,
        }
    }

    /// Has the player locked in a multiplier.
    pub fn is_cashed_out(&self) -> bool {
        self.cash_out.is_some()
    }
}

/// A bet plus the order in which its player first bet this round.
#[derive(Debug)]
struct Slot {
    placed: u64,
    bet: Bet,
}

#[derive(Debug, Default)]
struct Bets {
    slots: BTreeMap<PlayerId, Slot>,
    next_placed: u64,
}

/// Concurrent store of the round's bets, one per player.
///
/// Iteration is ordered by `PlayerId` so settlement output is deterministic.
/// Placement order is tracked separately; a re-bet keeps its first position.
#[derive(Debug, Default)]
pub struct BetLedger {
    bets: RwLock<Bets>,
}

impl BetLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bet, replacing any earlier bet by the same player.
    ///
    /// Returns the replaced bet.
    pub async fn place(&self, bet: Bet) -> Option<Bet> {
        let mut bets = self.bets.write().await;
        if let Some(slot) = bets.slots.get_mut(&bet.player_id) {
            return Some(std::mem::replace(&mut slot.bet, bet));
        }

        let placed = bets.next_placed;
        bets.next_placed += 1;
        bets.slots.insert(bet.player_id.clone(), Slot { placed, bet });
        None
    }

    /// Record a cash-out snapshot. Later calls overwrite earlier ones.
    ///
    /// Returns the previous snapshot, or `None` if the player has no bet.
    pub async fn cash_out(
        &self,
        player_id: &PlayerId,
        multiplier: Multiplier,
    ) -> Option<Option<Multiplier>> {
        let mut bets = self.bets.write().await;
        let slot = bets.slots.get_mut(player_id)?;
        Some(slot.bet.cash_out.replace(multiplier))
    }

    /// Get a player's bet.
    pub async fn get(&self, player_id: &PlayerId) -> Option<Bet> {
        self.bets.read().await.slots.get(player_id).map(|slot| slot.bet.clone())
    }

    /// Whether a player has a bet.
    pub async fn contains(&self, player_id: &PlayerId) -> bool {
        self.bets.read().await.slots.contains_key(player_id)
    }

    /// Client seed of the earliest placed bet, if any bet exists.
    pub async fn first_client_seed(&self) -> Option<String> {
        let bets = self.bets.read().await;
        bets.slots
            .values()
            .min_by_key(|slot| slot.placed)
            .map(|slot| slot.bet.client_seed.clone())
    }

    /// Copy of every bet, ordered by player.
    pub async fn snapshot(&self) -> Vec<Bet> {
        self.bets.read().await.slots.values().map(|slot| slot.bet.clone()).collect()
    }

    /// Number of bets.
    pub async fn len(&self) -> usize {
        self.bets.read().await.slots.len()
    }

    /// Whether the ledger is empty.
    pub async fn is_empty(&self) -> bool {
        self.bets.read().await.slots.is_empty()
    }

    /// Drop every bet. Returns how many were removed.
    pub async fn clear(&self) -> usize {
        let mut bets = self.bets.write().await;
        let removed = bets.slots.len();
        bets.slots.clear();
        bets.next_placed = 0;
        removed
    }
}
