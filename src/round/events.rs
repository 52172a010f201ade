//! Round Events
//!
//! Outbound messages produced by the engine and the port they are delivered
//! through. The engine only knows [`Broadcaster`]; the WebSocket hub and the
//! in-memory recorder are interchangeable implementations.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::multiplier::Multiplier;
use crate::fairness::seed::{HashedServerSeed, ServerSeed};
use crate::round::ledger::PlayerId;
use crate::round::settlement::{Outcome, Settlement};

/// Events published to every connected player.
#[derive(Clone, Debug, PartialEq)]
pub enum RoundEvent {
    /// Round opened; the seed commitment is public.
    RoundStarted {
        /// Commitment to this round's server seed.
        hashed_seed: HashedServerSeed,
    },
    /// Multiplier tick.
    Multiplier(Multiplier),
    /// Round crashed.
    Crashed {
        /// Final crash point.
        crash_point: Multiplier,
    },
    /// Server seed revealed for verification.
    SeedRevealed {
        /// The seed committed to at round start.
        server_seed: ServerSeed,
    },
}

impl fmt::Display for RoundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundEvent::RoundStarted { hashed_seed } => {
                write!(f, "New Round Started! Hashed Server Seed: {}", hashed_seed)
            }
            RoundEvent::Multiplier(m) => write!(f, "Multiplier: {}x", m),
            RoundEvent::Crashed { crash_point } => write!(f, "Game Crashed at: {}x", crash_point),
            RoundEvent::SeedRevealed { server_seed } => {
                write!(f, "Server Seed Revealed: {}", server_seed)
            }
        }
    }
}

/// Private settlement message to a single player.
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerNotice {
    /// Cashed out before the crash.
    Won {
        /// Locked-in multiplier.
        cash_out: Multiplier,
        /// Amount paid out.
        payout: f64,
    },
    /// Stake forfeited.
    Lost,
}

impl From<&Settlement> for PlayerNotice {
    fn from(settlement: &Settlement) -> Self {
        match settlement.outcome {
            Outcome::Won { cash_out, payout } => PlayerNotice::Won { cash_out, payout },
            Outcome::Lost { .. } => PlayerNotice::Lost,
        }
    }
}

impl fmt::Display for PlayerNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // The exact snapshot, so the line reconciles with the payout.
            PlayerNotice::Won { cash_out, payout } => write!(
                f,
                "You cashed out at {:?}x! You won {:.2}!",
                cash_out.value(),
                payout
            ),
            PlayerNotice::Lost => f.write_str("You lost!"),
        }
    }
}

/// Outbound port of the round engine.
///
/// Delivery is best-effort: implementations swallow and log per-recipient
/// failures instead of returning them.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Send an event to every connected player.
    async fn publish(&self, event: &RoundEvent);

    /// Send a private notice to one player.
    async fn notify(&self, player_id: &PlayerId, notice: &PlayerNotice);
}

/// Anything that went out through a [`MemoryBroadcaster`].
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    /// Published to everyone.
    Published(RoundEvent),
    /// Sent to one player.
    Notified(PlayerId, PlayerNotice),
}

/// Broadcaster that records everything in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryBroadcaster {
    log: Mutex<Vec<Outbound>>,
}

impl MemoryBroadcaster {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub async fn outbound(&self) -> Vec<Outbound> {
        self.log.lock().await.clone()
    }

    /// Published events only.
    pub async fn published(&self) -> Vec<RoundEvent> {
        self.log
            .lock()
            .await
            .iter()
            .filter_map(|o| match o {
                Outbound::Published(event) => Some(event.clone()),
                Outbound::Notified(..) => None,
            })
            .collect()
    }

    /// Notices sent to one player.
    pub async fn notices_for(&self, player_id: &PlayerId) -> Vec<PlayerNotice> {
        self.log
            .lock()
            .await
            .iter()
            .filter_map(|o| match o {
                Outbound::Notified(id, notice) if id == player_id => Some(notice.clone()),
                _ => None,
            })
            .collect()
    }

    /// Multiplier ticks published so far.
    pub async fn ticks(&self) -> Vec<Multiplier> {
        self.published()
            .await
            .into_iter()
            .filter_map(|event| match event {
                RoundEvent::Multiplier(m) => Some(m),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Broadcaster for MemoryBroadcaster {
    async fn publish(&self, event: &RoundEvent) {
        self.log.lock().await.push(Outbound::Published(event.clone()));
    }

    async fn notify(&self, player_id: &PlayerId, notice: &PlayerNotice) {
        self.log
            .lock()
            .await
            .push(Outbound::Notified(player_id.clone(), notice.clone()));
    }
}
