//! Connection Hub
//!
//! Registry of connected players and their outbound queues. Implements the
//! engine's `Broadcaster` port: a full or closed queue is logged and skipped
//! so one slow client never stalls the round clock or other players.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::round::events::{Broadcaster, PlayerNotice, RoundEvent};
use crate::round::ledger::PlayerId;

/// Outbound text queue of one connection.
pub type OutboundSender = mpsc::Sender<String>;

/// Connected players.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    connections: RwLock<BTreeMap<PlayerId, OutboundSender>>,
}

impl ConnectionHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. A reconnect under the same id replaces the
    /// previous queue, which is returned.
    pub async fn register(&self, player_id: PlayerId, sender: OutboundSender) -> Option<OutboundSender> {
        let mut connections = self.connections.write().await;
        let previous = connections.insert(player_id.clone(), sender);
        debug!("Player {} connected ({} online)", player_id, connections.len());
        previous
    }

    /// Remove a connection, but only if `sender` is still the registered one.
    pub async fn unregister(&self, player_id: &PlayerId, sender: &OutboundSender) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(player_id) {
            Some(current) if current.same_channel(sender) => {
                connections.remove(player_id);
                debug!("Player {} disconnected", player_id);
                true
            }
            _ => false,
        }
    }

    /// Whether a player is connected.
    pub async fn is_connected(&self, player_id: &PlayerId) -> bool {
        self.connections.read().await.contains_key(player_id)
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    async fn send_to(&self, player_id: &PlayerId, text: String) {
        let connections = self.connections.read().await;
        match connections.get(player_id) {
            Some(sender) => {
                if let Err(e) = sender.try_send(text) {
                    warn!("Error sending to {}: {}", player_id, e);
                }
            }
            None => debug!("Player {} not connected, dropping notice", player_id),
        }
    }
}

#[async_trait]
impl Broadcaster for ConnectionHub {
    async fn publish(&self, event: &RoundEvent) {
        let text = event.to_string();
        let connections = self.connections.read().await;
        for (player_id, sender) in connections.iter() {
            if let Err(e) = sender.try_send(text.clone()) {
                warn!("Error broadcasting to {}: {}", player_id, e);
            }
        }
    }

    async fn notify(&self, player_id: &PlayerId, notice: &PlayerNotice) {
        self.send_to(player_id, notice.to_string()).await;
    }
}
