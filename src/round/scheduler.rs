//! Round Scheduler
//!
//! Runs rounds back to back with a fixed intermission until shutdown. A
//! shutdown during a round cancels it (no settlement).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::round::engine::{RoundEnd, RoundEngine};

/// Run rounds until `shutdown_rx` fires. Returns how many rounds finished.
pub async fn run_rounds(
    engine: Arc<RoundEngine>,
    intermission: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> u64 {
    let mut finished_rounds = 0;

    loop {
        match engine.start().await {
            Ok(handle) => {
                let nonce = handle.opened.nonce;
                let finished = handle.finished();
                tokio::pin!(finished);

                tokio::select! {
                    result = &mut finished => match result {
                        Ok(summary) => {
                            finished_rounds += 1;
                            match summary.end {
                                RoundEnd::Crashed { crash_point, .. } => info!(
                                    "Round {} finished at {}x with {} bets",
                                    nonce,
                                    crash_point,
                                    summary.settlements.len()
                                ),
                                RoundEnd::Cancelled { multiplier } => {
                                    info!("Round {} cancelled at {}x", nonce, multiplier)
                                }
                            }
                        }
                        Err(e) => {
                            warn!("Round {} clock task failed: {}", nonce, e);
                            engine.recover().await;
                        }
                    },
                    _ = shutdown_rx.recv() => {
                        info!("Shutdown during round {}, cancelling", nonce);
                        let _ = engine.cancel().await;
                        match (&mut finished).await {
                            Ok(_) => finished_rounds += 1,
                            Err(_) => engine.recover().await,
                        }
                        break;
                    }
                }
            }
            Err(e) => warn!("Could not start round: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(intermission) => {}
            _ = shutdown_rx.recv() => break,
        }
    }

    info!("Round scheduler stopped after {} rounds", finished_rounds);
    finished_rounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::round::events::{MemoryBroadcaster, RoundEvent};

    #[tokio::test]
    async fn test_runs_rounds_until_shutdown() {
        let broadcaster = Arc::new(MemoryBroadcaster::new());
        let config = EngineConfig {
            tick_interval: Duration::from_millis(1),
            ..Default::default()
        };
        let engine = Arc::new(RoundEngine::new(config, broadcaster.clone()));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let scheduler = tokio::spawn(run_rounds(
            engine.clone(),
            Duration::from_millis(1),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown_tx.send(()).unwrap();
        let rounds = scheduler.await.unwrap();

        assert!(rounds >= 1);
        assert!(!engine.is_running().await);

        let starts = broadcaster
            .published()
            .await
            .iter()
            .filter(|e| matches!(e, RoundEvent::RoundStarted { .. }))
            .count() as u64;
        assert!(starts >= rounds);
        assert!(engine.snapshot().await.nonce >= rounds);
    }
}
