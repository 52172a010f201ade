//! Round State
//!
//! `RoundCore` holds every value the round clock owns: state, nonce,
//! multiplier, crash point and the current seed pair. The engine keeps it
//! behind a single lock so command handlers always read a consistent view.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::core::multiplier::Multiplier;
use crate::fairness::crash::crash_point;
use crate::fairness::seed::{HashedServerSeed, ServerSeed};
use crate::fairness::verify::RoundReveal;

/// Round lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// No round has run yet, or the last one was cancelled.
    ///
    /// A cancelled round lands here rather than in `Crashed`: it never reached
    /// its crash point, nothing was settled and no seed was revealed, yet it
    /// must not stay `Running` and keep accepting bets with no clock behind it.
    #[default]
    Idle,
    /// Multiplier is climbing; bets and cash-outs accepted.
    Running,
    /// Crash point reached; waiting for the next start.
    Crashed,
}

/// Per-round secrets and identity, fixed at start.
#[derive(Debug, Clone)]
pub struct RoundSeeds {
    /// Round identifier for logs.
    pub round_id: Uuid,
    /// When the round started.
    pub started_at: DateTime<Utc>,
    /// Secret seed (revealed at crash).
    pub server_seed: ServerSeed,
    /// Published commitment.
    pub hashed_seed: HashedServerSeed,
    /// Client seed the crash point was derived with.
    pub client_seed: String,
    /// Derived crash point.
    pub crash_point: Multiplier,
}

/// Public information announced when a round opens.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOpened {
    /// Round identifier.
    pub round_id: Uuid,
    /// Round nonce.
    pub nonce: u64,
    /// Commitment to the server seed.
    pub hashed_seed: HashedServerSeed,
    /// When the round started.
    pub started_at: DateTime<Utc>,
}

/// Result of one clock step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Multiplier grew and the round is still running.
    Advanced(Multiplier),
    /// Crash point reached. `last_tick` is the value produced by this step,
    /// absent when the round was already at its crash point.
    Crashed {
        /// Multiplier produced by the final step.
        last_tick: Option<Multiplier>,
        /// The round's crash point.
        crash_point: Multiplier,
    },
    /// Round is not running (cancelled or never started).
    Halted,
}

/// Read-only view of the round for status queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundSnapshot {
    /// Current state.
    pub state: RoundState,
    /// Nonce of the current or last round.
    pub nonce: u64,
    /// Current multiplier.
    pub multiplier: Multiplier,
    /// Commitment of the current or last round.
    pub hashed_seed: Option<HashedServerSeed>,
    /// Crash point, only once the round has crashed.
    pub crash_point: Option<Multiplier>,
}

/// Round precondition errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoundError {
    /// `start` while a round is running.
    #[error("Round already running")]
    AlreadyRunning,

    /// Operation requires a running round.
    #[error("Round not running")]
    NotRunning,

    /// Cash-out by a player with no bet this round.
    #[error("No active bet for player {0}")]
    NoActiveBet(String),

    /// `start` while the last round is still being settled.
    #[error("Previous round still settling")]
    Settling,

    /// The round clock task panicked or was aborted.
    #[error("Round clock failed: {0}")]
    ClockFailed(String),

    /// Bet amount not a positive finite number.
    #[error("Invalid bet amount: {0}")]
    InvalidAmount(f64),
}

/// Clock-owned round values.
#[derive(Debug, Default)]
pub struct RoundCore {
    state: RoundState,
    nonce: u64,
    multiplier: Multiplier,
    seeds: Option<RoundSeeds>,
    settling: bool,
}

impl RoundCore {
    /// Fresh core in `Idle` with nonce 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Current nonce.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Current multiplier.
    pub fn multiplier(&self) -> Multiplier {
        self.multiplier
    }

    /// Seeds of the current or last round.
    pub fn seeds(&self) -> Option<&RoundSeeds> {
        self.seeds.as_ref()
    }

    /// Whether the round is running.
    pub fn is_running(&self) -> bool {
        self.state == RoundState::Running
    }

    /// Open a round with a freshly generated server seed.
    pub fn begin(&mut self, client_seed: String) -> Result<RoundOpened, RoundError> {
        self.begin_with_seed(ServerSeed::generate(), client_seed)
    }

    /// Open a round with the given server seed.
    ///
    /// Increments the nonce, resets the multiplier and fixes the crash point.
    pub fn begin_with_seed(
        &mut self,
        server_seed: ServerSeed,
        client_seed: String,
    ) -> Result<RoundOpened, RoundError> {
        if self.is_running() {
            return Err(RoundError::AlreadyRunning);
        }
        if self.settling {
            return Err(RoundError::Settling);
        }

        self.nonce += 1;
        self.multiplier = Multiplier::ONE;

        let hashed_seed = server_seed.commit();
        let crash_point = crash_point(&server_seed, &client_seed, self.nonce);
        let seeds = RoundSeeds {
            round_id: Uuid::new_v4(),
            started_at: Utc::now(),
            server_seed,
            hashed_seed: hashed_seed.clone(),
            client_seed,
            crash_point,
        };

        let opened = RoundOpened {
            round_id: seeds.round_id,
            nonce: self.nonce,
            hashed_seed,
            started_at: seeds.started_at,
        };

        self.seeds = Some(seeds);
        self.state = RoundState::Running;

        Ok(opened)
    }

    /// Advance the clock one step.
    ///
    /// Growth and the crash transition happen together, so no reader can see
    /// a running round whose multiplier is past the crash point.
    pub fn advance(&mut self, growth_rate: f64) -> Tick {
        if !self.is_running() {
            return Tick::Halted;
        }
        let Some(crash_point) = self.seeds.as_ref().map(|s| s.crash_point) else {
            return Tick::Halted;
        };

        if self.multiplier >= crash_point {
            self.crash();
            return Tick::Crashed {
                last_tick: None,
                crash_point,
            };
        }

        self.multiplier = self.multiplier.grow(growth_rate);

        if self.multiplier >= crash_point {
            self.crash();
            Tick::Crashed {
                last_tick: Some(self.multiplier),
                crash_point,
            }
        } else {
            Tick::Advanced(self.multiplier)
        }
    }

    fn crash(&mut self) {
        self.state = RoundState::Crashed;
        self.settling = true;
    }

    /// Whether a crashed round is awaiting settlement.
    pub fn is_settling(&self) -> bool {
        self.settling
    }

    /// Mark the crashed round as settled, allowing the next start.
    pub fn finish_settlement(&mut self) {
        self.settling = false;
    }

    /// Stop a running round without crashing it. Multiplier is kept.
    ///
    /// The round goes to `Idle`, not `Crashed`, so `reveal()` and the public
    /// snapshot never expose the crash point of a round that did not crash.
    pub fn halt(&mut self) -> bool {
        if self.is_running() {
            self.state = RoundState::Idle;
            true
        } else {
            false
        }
    }

    /// Recover after the round clock died: not running, not settling.
    pub fn abandon(&mut self) {
        if self.is_running() {
            self.state = RoundState::Idle;
        }
        self.settling = false;
    }

    /// Multiplier snapshot for a cash-out.
    pub fn cash_out_multiplier(&self) -> Result<Multiplier, RoundError> {
        if self.is_running() {
            Ok(self.multiplier)
        } else {
            Err(RoundError::NotRunning)
        }
    }

    /// Reveal data once the round has crashed.
    pub fn reveal(&self) -> Option<RoundReveal> {
        if self.state != RoundState::Crashed {
            return None;
        }
        let seeds = self.seeds.as_ref()?;
        Some(RoundReveal {
            hashed_seed: seeds.hashed_seed.clone(),
            server_seed: seeds.server_seed.clone(),
            client_seed: seeds.client_seed.clone(),
            nonce: self.nonce,
            crash_point: seeds.crash_point,
        })
    }

    /// Public view; the crash point stays hidden until the crash.
    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            state: self.state,
            nonce: self.nonce,
            multiplier: self.multiplier,
            hashed_seed: self.seeds.as_ref().map(|s| s.hashed_seed.clone()),
            crash_point: match self.state {
                RoundState::Crashed => self.seeds.as_ref().map(|s| s.crash_point),
                _ => None,
            },
        }
    }
}
