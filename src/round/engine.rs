//! Round Engine
//!
//! Drives one crash round at a time:
//!
//! ```text
//! start() ──► Running ──tick──► ... ──► Crashed ──► end(): publish crash,
//!    ▲           │                                 reveal seed, settle
//!    │           └── cancel() ──► Idle (no settlement)
//!    └──────────────── next start() ◄───────────────┘
//! ```
//!
//! The round clock is the only writer of state, nonce, multiplier and crash
//! point. Command handlers take a read lock on the same `RoundCore`, so a
//! cash-out snapshot can never straddle a tick. Lock order is always
//! `core` then `ledger`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::RwLock;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ClientSeedPolicy, EngineConfig};
use crate::core::multiplier::Multiplier;
use crate::fairness::verify::RoundReveal;
use crate::round::command::{Command, CommandAck};
use crate::round::events::{Broadcaster, PlayerNotice, RoundEvent};
use crate::round::ledger::{Bet, BetLedger, PlayerId};
use crate::round::settlement::{house_net, settle, Settlement};
use crate::round::state::{RoundCore, RoundError, RoundOpened, RoundSnapshot, Tick};

/// How a round ended.
#[derive(Debug, Clone)]
pub enum RoundEnd {
    /// Reached its crash point and was settled.
    Crashed {
        /// Final crash point.
        crash_point: Multiplier,
        /// Data for independent verification.
        reveal: Option<RoundReveal>,
    },
    /// Stopped by `cancel()`; nothing was settled.
    Cancelled {
        /// Multiplier at the moment of cancellation.
        multiplier: Multiplier,
    },
}

/// Result of a finished round.
#[derive(Debug, Clone)]
pub struct RoundSummary {
    /// Round identifier.
    pub round_id: Uuid,
    /// Round nonce.
    pub nonce: u64,
    /// When the round started.
    pub started_at: DateTime<Utc>,
    /// How it ended.
    pub end: RoundEnd,
    /// Per-bet results (empty when cancelled).
    pub settlements: Vec<Settlement>,
}

impl RoundSummary {
    /// Whether the round crashed (as opposed to being cancelled).
    pub fn crashed(&self) -> bool {
        matches!(self.end, RoundEnd::Crashed { .. })
    }
}

/// Handle to a started round's clock task.
#[derive(Debug)]
pub struct RoundHandle {
    /// Public round information.
    pub opened: RoundOpened,
    task: JoinHandle<RoundSummary>,
}

impl RoundHandle {
    /// Wait for the round to crash or be cancelled.
    pub async fn finished(self) -> Result<RoundSummary, JoinError> {
        self.task.await
    }
}

/// The crash round engine.
pub struct RoundEngine {
    config: EngineConfig,
    core: RwLock<RoundCore>,
    ledger: BetLedger,
    broadcaster: Arc<dyn Broadcaster>,
    cancel_tx: broadcast::Sender<()>,
}

impl RoundEngine {
    /// Create an engine publishing through `broadcaster`.
    pub fn new(config: EngineConfig, broadcaster: Arc<dyn Broadcaster>) -> Self {
        let (cancel_tx, _) = broadcast::channel(1);

        Self {
            config,
            core: RwLock::new(RoundCore::new()),
            ledger: BetLedger::new(),
            broadcaster,
            cancel_tx,
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The round's bets.
    pub fn ledger(&self) -> &BetLedger {
        &self.ledger
    }

    /// Start a new round and spawn its clock.
    ///
    /// Exactly one of several concurrent callers succeeds; the others get
    /// `AlreadyRunning` (or `Settling` while the last round pays out).
    pub async fn start(self: &Arc<Self>) -> Result<RoundHandle, RoundError> {
        let (opened, cancel_rx) = {
            let mut core = self.core.write().await;
            if core.is_running() {
                warn!("Start rejected: round {} already running", core.nonce());
                return Err(RoundError::AlreadyRunning);
            }

            let client_seed = self.select_client_seed().await;
            let opened = core.begin(client_seed)?;
            let cleared = self.ledger.clear().await;

            if cleared > 0 {
                debug!("Cleared {} bets from previous round", cleared);
            }
            if let Some(seeds) = core.seeds() {
                debug!("Round {} crash point {}x", opened.nonce, seeds.crash_point);
            }

            // Subscribed under the lock so an immediate cancel is not missed.
            (opened, self.cancel_tx.subscribe())
        };

        info!(
            "Round {} ({}) started, hashed seed {}",
            opened.nonce, opened.round_id, opened.hashed_seed
        );

        self.broadcaster
            .publish(&RoundEvent::RoundStarted {
                hashed_seed: opened.hashed_seed.clone(),
            })
            .await;

        let engine = Arc::clone(self);
        let summary_base = opened.clone();
        let task = tokio::spawn(async move { engine.run_clock(summary_base, cancel_rx).await });

        Ok(RoundHandle { opened, task })
    }

    /// Start a round and wait for it to finish.
    pub async fn run_round(self: &Arc<Self>) -> Result<RoundSummary, RoundError> {
        let handle = self.start().await?;
        let nonce = handle.opened.nonce;

        match handle.finished().await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                warn!("Round {} clock task failed: {}", nonce, e);
                self.recover().await;
                Err(RoundError::ClockFailed(e.to_string()))
            }
        }
    }

    /// Unblock the engine after a clock task failure so the next round can start.
    pub async fn recover(&self) {
        self.core.write().await.abandon();
    }

    /// Signal the running round's clock to stop without settling.
    pub async fn cancel(&self) -> Result<(), RoundError> {
        let core = self.core.read().await;
        if !core.is_running() {
            return Err(RoundError::NotRunning);
        }

        info!("Cancelling round {}", core.nonce());
        let _ = self.cancel_tx.send(());
        Ok(())
    }

    /// Place or replace a player's bet on the running round.
    pub async fn place_bet(
        &self,
        player_id: PlayerId,
        amount: f64,
        client_seed: Option<String>,
    ) -> Result<CommandAck, RoundError> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(RoundError::InvalidAmount(amount));
        }

        let core = self.core.read().await;
        if !core.is_running() {
            return Err(RoundError::NotRunning);
        }

        let client_seed = client_seed
            .filter(|seed| !seed.is_empty())
            .unwrap_or_else(|| self.config.default_client_seed.clone());

        info!(
            "Player {} placed a bet of {} with client seed {}",
            player_id, amount, client_seed
        );
        let replaced = self
            .ledger
            .place(Bet::new(player_id, amount, client_seed))
            .await
            .is_some();

        Ok(CommandAck::BetPlaced { replaced })
    }

    /// Lock in the current multiplier for a player's bet.
    ///
    /// A repeated call overwrites the earlier snapshot.
    pub async fn cash_out(&self, player_id: &PlayerId) -> Result<Multiplier, RoundError> {
        let core = self.core.read().await;
        let multiplier = core.cash_out_multiplier()?;

        match self.ledger.cash_out(player_id, multiplier).await {
            Some(_) => {
                info!("Player {} cashed out at {}x", player_id, multiplier);
                Ok(multiplier)
            }
            None => Err(RoundError::NoActiveBet(player_id.to_string())),
        }
    }

    /// Apply a validated command from a player.
    pub async fn handle_command(
        &self,
        player_id: &PlayerId,
        command: Command,
    ) -> Result<CommandAck, RoundError> {
        match command {
            Command::PlaceBet {
                amount,
                client_seed,
            } => self.place_bet(player_id.clone(), amount, client_seed).await,
            Command::CashOut => self.cash_out(player_id).await.map(CommandAck::CashedOut),
        }
    }

    /// Current public view of the round.
    pub async fn snapshot(&self) -> RoundSnapshot {
        self.core.read().await.snapshot()
    }

    /// Whether a round is running.
    pub async fn is_running(&self) -> bool {
        self.core.read().await.is_running()
    }

    async fn select_client_seed(&self) -> String {
        match self.config.client_seed_policy {
            ClientSeedPolicy::Fixed => self.config.default_client_seed.clone(),
            ClientSeedPolicy::CarryOver => self
                .ledger
                .first_client_seed()
                .await
                .unwrap_or_else(|| self.config.default_client_seed.clone()),
        }
    }

    /// The round clock. Ticks until the crash point or a cancel signal.
    async fn run_clock(
        self: Arc<Self>,
        opened: RoundOpened,
        mut cancel_rx: broadcast::Receiver<()>,
    ) -> RoundSummary {
        loop {
            match cancel_rx.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => return self.halt(&opened).await,
            }

            let (tick, crashed_bets) = {
                let mut core = self.core.write().await;
                let tick = core.advance(self.config.growth_rate);
                // Bets as they stood at the crash, before anyone can restart.
                let bets = match tick {
                    Tick::Crashed { .. } => Some(self.ledger.snapshot().await),
                    _ => None,
                };
                (tick, bets)
            };

            match tick {
                Tick::Advanced(multiplier) => {
                    #[cfg(feature = "debug-tracing")]
                    debug!("Round {} tick {}x", opened.nonce, multiplier);
                    self.broadcaster
                        .publish(&RoundEvent::Multiplier(multiplier))
                        .await;
                }
                Tick::Crashed {
                    last_tick,
                    crash_point,
                } => {
                    if let Some(multiplier) = last_tick {
                        self.broadcaster
                            .publish(&RoundEvent::Multiplier(multiplier))
                            .await;
                    }
                    let bets = crashed_bets.unwrap_or_default();
                    return self.end(&opened, crash_point, bets).await;
                }
                Tick::Halted => return self.halt(&opened).await,
            }

            tokio::select! {
                biased;
                _ = cancel_rx.recv() => return self.halt(&opened).await,
                _ = tokio::time::sleep(self.config.tick_interval) => {}
            }
        }
    }

    /// Crash: announce, reveal, settle. Runs once per crashed round.
    async fn end(&self, opened: &RoundOpened, crash_point: Multiplier, bets: Vec<Bet>) -> RoundSummary {
        info!("Round {} crashed at {}x", opened.nonce, crash_point);
        self.broadcaster
            .publish(&RoundEvent::Crashed { crash_point })
            .await;

        let reveal = self.core.read().await.reveal();
        if let Some(reveal) = &reveal {
            self.broadcaster
                .publish(&RoundEvent::SeedRevealed {
                    server_seed: reveal.server_seed.clone(),
                })
                .await;
        }

        let settlements = settle(&bets, crash_point);
        for settlement in &settlements {
            let notice = PlayerNotice::from(settlement);
            match &notice {
                PlayerNotice::Won { payout, .. } => {
                    info!("Player {} won {}", settlement.player_id, payout)
                }
                PlayerNotice::Lost => info!("Player {} lost {}", settlement.player_id, settlement.amount),
            }
            self.broadcaster.notify(&settlement.player_id, &notice).await;
        }

        info!(
            "Round {} settled: {} bets, house net {:.2}",
            opened.nonce,
            settlements.len(),
            house_net(&settlements)
        );
        self.core.write().await.finish_settlement();

        RoundSummary {
            round_id: opened.round_id,
            nonce: opened.nonce,
            started_at: opened.started_at,
            end: RoundEnd::Crashed {
                crash_point,
                reveal,
            },
            settlements,
        }
    }

    /// Cancellation path: stop without crash events or settlement.
    async fn halt(&self, opened: &RoundOpened) -> RoundSummary {
        let multiplier = {
            let mut core = self.core.write().await;
            core.halt();
            core.multiplier()
        };
        info!("Round {} cancelled at {}x", opened.nonce, multiplier);

        RoundSummary {
            round_id: opened.round_id,
            nonce: opened.nonce,
            started_at: opened.started_at,
            end: RoundEnd::Cancelled { multiplier },
            settlements: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::round::events::MemoryBroadcaster;
    use crate::round::state::RoundState;

    fn test_engine(tick_ms: u64) -> (Arc<RoundEngine>, Arc<MemoryBroadcaster>) {
        let broadcaster = Arc::new(MemoryBroadcaster::new());
        let config = EngineConfig {
            tick_interval: Duration::from_millis(tick_ms),
            ..Default::default()
        };
        (Arc::new(RoundEngine::new(config, broadcaster.clone())), broadcaster)
    }

    #[tokio::test]
    async fn test_place_bet_rejected_while_idle() {
        let (engine, _) = test_engine(10);
        let result = engine.place_bet(PlayerId::from("alice"), 10.0, None).await;
        assert_eq!(result, Err(RoundError::NotRunning));
        assert!(engine.ledger().is_empty().await);
    }

    #[tokio::test]
    async fn test_cash_out_rejected_while_idle() {
        let (engine, _) = test_engine(10);
        let result = engine.cash_out(&PlayerId::from("alice")).await;
        assert_eq!(result, Err(RoundError::NotRunning));
    }

    #[tokio::test]
    async fn test_cancel_rejected_while_idle() {
        let (engine, _) = test_engine(10);
        assert_eq!(engine.cancel().await, Err(RoundError::NotRunning));
    }

    #[tokio::test]
    async fn test_start_publishes_commitment_first() {
        let (engine, broadcaster) = test_engine(1);
        let handle = engine.start().await.unwrap();
        let opened = handle.opened.clone();
        handle.finished().await.unwrap();

        let published = broadcaster.published().await;
        assert_eq!(
            published.first(),
            Some(&RoundEvent::RoundStarted {
                hashed_seed: opened.hashed_seed.clone()
            })
        );
    }

    #[tokio::test]
    async fn test_round_runs_to_crash() {
        let (engine, broadcaster) = test_engine(1);
        let summary = engine.run_round().await.unwrap();

        let RoundEnd::Crashed { crash_point, reveal } = &summary.end else {
            panic!("round was cancelled");
        };
        let reveal = reveal.as_ref().unwrap();
        assert!(reveal.verify().is_ok());
        assert_eq!(reveal.crash_point, *crash_point);

        let ticks = broadcaster.ticks().await;
        assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
        if let Some(last) = ticks.last() {
            assert!(*last >= *crash_point);
        }

        let published = broadcaster.published().await;
        let n = published.len();
        assert_eq!(published[n - 2], RoundEvent::Crashed { crash_point: *crash_point });
        assert!(matches!(published[n - 1], RoundEvent::SeedRevealed { .. }));

        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.state, RoundState::Crashed);
        assert_eq!(snapshot.crash_point, Some(*crash_point));
    }

    #[tokio::test]
    async fn test_concurrent_start_single_winner() {
        let (engine, _) = test_engine(50);

        let (a, b) = tokio::join!(engine.start(), engine.start());
        let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(winners, 1);

        let rejection = if let Err(e) = &a { e.clone() } else { b.as_ref().unwrap_err().clone() };
        assert_eq!(rejection, RoundError::AlreadyRunning);

        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.nonce, 1);

        // The winner's round may already have crashed instantly.
        let handle = a.or(b).unwrap();
        let _ = engine.cancel().await;
        handle.finished().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_skips_settlement() {
        let (engine, broadcaster) = test_engine(10_000);
        let handle = engine.start().await.unwrap();
        let alice = PlayerId::from("alice");

        // The clock task has not been polled yet, so the round is live.
        engine.place_bet(alice.clone(), 10.0, None).await.unwrap();
        let before = engine.snapshot().await;

        engine.cancel().await.unwrap();
        let summary = handle.finished().await.unwrap();

        assert!(!summary.crashed());
        assert!(summary.settlements.is_empty());

        let after = engine.snapshot().await;
        assert_eq!(after.state, RoundState::Idle);
        assert_eq!(after.multiplier, before.multiplier);
        assert_eq!(engine.ledger().len().await, 1);
        assert!(broadcaster.notices_for(&alice).await.is_empty());
        assert!(!broadcaster
            .published()
            .await
            .iter()
            .any(|e| matches!(e, RoundEvent::Crashed { .. } | RoundEvent::SeedRevealed { .. })));
    }

    #[tokio::test]
    async fn test_invalid_amount_rejected() {
        let (engine, _) = test_engine(10_000);
        let alice = PlayerId::from("alice");

        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let result = engine.place_bet(alice.clone(), amount, None).await;
            assert!(matches!(result, Err(RoundError::InvalidAmount(_))));
        }
    }

    #[tokio::test]
    async fn test_fixed_policy_ignores_ledger() {
        let broadcaster = Arc::new(MemoryBroadcaster::new());
        let config = EngineConfig {
            tick_interval: Duration::from_millis(1),
            client_seed_policy: ClientSeedPolicy::Fixed,
            ..Default::default()
        };
        let engine = Arc::new(RoundEngine::new(config, broadcaster));

        engine
            .ledger()
            .place(Bet::new(PlayerId::from("alice"), 1.0, "alice-seed"))
            .await;
        let summary = engine.run_round().await.unwrap();

        let RoundEnd::Crashed { reveal: Some(reveal), .. } = summary.end else {
            panic!("round did not crash");
        };
        assert_eq!(reveal.client_seed, "default_seed");
    }

    #[tokio::test]
    async fn test_carry_over_uses_earliest_leftover_bet() {
        let (engine, _) = test_engine(1);
        engine
            .ledger()
            .place(Bet::new(PlayerId::from("zed"), 1.0, "zed-seed"))
            .await;
        engine
            .ledger()
            .place(Bet::new(PlayerId::from("amy"), 1.0, "amy-seed"))
            .await;

        let summary = engine.run_round().await.unwrap();
        let RoundEnd::Crashed { reveal: Some(reveal), .. } = summary.end else {
            panic!("round did not crash");
        };
        assert_eq!(reveal.client_seed, "zed-seed");
    }

    /// Panics on the first crash announcement only.
    #[derive(Default)]
    struct FailOnceBroadcaster {
        failed: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl Broadcaster for FailOnceBroadcaster {
        async fn publish(&self, event: &RoundEvent) {
            if matches!(event, RoundEvent::Crashed { .. })
                && !self.failed.swap(true, std::sync::atomic::Ordering::SeqCst)
            {
                panic!("broadcaster failure");
            }
        }

        async fn notify(&self, _player_id: &PlayerId, _notice: &PlayerNotice) {}
    }

    #[tokio::test]
    async fn test_clock_failure_does_not_block_next_round() {
        let config = EngineConfig {
            tick_interval: Duration::from_millis(1),
            ..Default::default()
        };
        let engine = Arc::new(RoundEngine::new(
            config,
            Arc::new(FailOnceBroadcaster::default()),
        ));

        let result = engine.run_round().await;
        assert!(matches!(result, Err(RoundError::ClockFailed(_))));
        assert!(!engine.is_running().await);

        let summary = engine.run_round().await.unwrap();
        assert!(summary.crashed());
        assert_eq!(summary.nonce, 2);
    }

    #[tokio::test]
    async fn test_carry_over_uses_leftover_bet_seed() {
        let (engine, _) = test_engine(1);

        engine
            .ledger()
            .place(Bet::new(PlayerId::from("alice"), 1.0, "alice-seed"))
            .await;
        let summary = engine.run_round().await.unwrap();

        let RoundEnd::Crashed { reveal: Some(reveal), .. } = summary.end else {
            panic!("round did not crash");
        };
        assert_eq!(reveal.client_seed, "alice-seed");
        assert_eq!(reveal.nonce, 1);
    }
}
