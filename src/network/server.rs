//! WebSocket Round Server
//!
//! Accepts player connections on `/ws/<player_id>`, feeds their commands to
//! the round engine and fans engine events back out through the
//! `ConnectionHub`. The round scheduler runs for the lifetime of the server.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ServerConfig;
use crate::network::hub::ConnectionHub;
use crate::network::protocol::{parse_command, ProtocolError};
use crate::round::command::CommandAck;
use crate::round::engine::RoundEngine;
use crate::round::ledger::PlayerId;
use crate::round::scheduler::run_rounds;
use crate::round::state::RoundError;

/// Per-connection outbound queue depth.
const OUTBOUND_QUEUE: usize = 64;

/// Path prefix players connect on.
const WS_PATH_PREFIX: &str = "/ws/";

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Why an inbound frame had no effect.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Frame could not be parsed into a command.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Engine refused the command.
    #[error(transparent)]
    Round(#[from] RoundError),
}

/// Extract the player id from a `/ws/<player_id>` request path.
pub fn player_id_from_path(path: &str) -> Option<PlayerId> {
    let id = path.strip_prefix(WS_PATH_PREFIX)?;
    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some(PlayerId::from(id))
}

/// Parse one text frame and apply it for `player_id`.
pub async fn dispatch_text(
    engine: &RoundEngine,
    player_id: &PlayerId,
    text: &str,
) -> Result<CommandAck, DispatchError> {
    let command = parse_command(text)?;
    Ok(engine.handle_command(player_id, command).await?)
}

/// The crash round server.
pub struct CrashServer {
    /// Server configuration.
    config: ServerConfig,
    /// Round engine shared by every connection.
    engine: Arc<RoundEngine>,
    /// Connected players.
    hub: Arc<ConnectionHub>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl CrashServer {
    /// Create a new server. The engine publishes through the connection hub.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let hub = Arc::new(ConnectionHub::new());
        let engine = Arc::new(RoundEngine::new(config.engine.clone(), hub.clone()));

        Self {
            config,
            engine,
            hub,
            shutdown_tx,
        }
    }

    /// The round engine.
    pub fn engine(&self) -> &Arc<RoundEngine> {
        &self.engine
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.hub.connection_count().await
    }

    /// A sender that stops the server when signalled.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Bind the configured address and run until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        info!(
            "Crash round server v{} listening on {}",
            self.config.version,
            listener.local_addr()?
        );

        let scheduler = tokio::spawn(run_rounds(
            self.engine.clone(),
            self.config.intermission,
            self.shutdown_tx.subscribe(),
        ));

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.hub.connection_count().await >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        if let Err(e) = scheduler.await {
            error!("Round scheduler failed: {}", e);
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let engine = self.engine.clone();
        let hub = self.hub.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut requested = None;
            let handshake = accept_hdr_async(stream, |request: &Request, response: Response| {
                match player_id_from_path(request.uri().path()) {
                    Some(player_id) => {
                        requested = Some(player_id);
                        Ok(response)
                    }
                    None => {
                        let mut rejection =
                            ErrorResponse::new(Some("expected /ws/<player_id>".to_string()));
                        *rejection.status_mut() = StatusCode::BAD_REQUEST;
                        Err(rejection)
                    }
                }
            })
            .await;

            let ws_stream = match handshake {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };
            let Some(player_id) = requested else {
                return;
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);

            if hub.register(player_id.clone(), msg_tx.clone()).await.is_some() {
                info!("Player {} reconnected, replacing previous connection", player_id);
            }

            let sender_task = tokio::spawn(async move {
                while let Some(text) = msg_rx.recv().await {
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match dispatch_text(&engine, &player_id, &text).await {
                                    Ok(ack) => debug!("{} -> {:?}", player_id, ack),
                                    Err(DispatchError::Protocol(e)) => {
                                        warn!("Invalid message from {}: {}", player_id, e);
                                    }
                                    Err(DispatchError::Round(e)) => {
                                        info!("Command from {} rejected: {}", player_id, e);
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Player {} closed the connection", player_id);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", player_id, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }

            sender_task.abort();
            hub.unregister(&player_id, &msg_tx).await;
            info!("Player {} ({}) cleaned up", player_id, addr);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::EngineConfig;
    use crate::round::events::MemoryBroadcaster;

    fn test_engine() -> Arc<RoundEngine> {
        let config = EngineConfig {
            tick_interval: Duration::from_secs(60),
            ..Default::default()
        };
        Arc::new(RoundEngine::new(config, Arc::new(MemoryBroadcaster::new())))
    }

    #[test]
    fn test_player_id_from_path() {
        assert_eq!(player_id_from_path("/ws/alice"), Some(PlayerId::from("alice")));
        assert_eq!(player_id_from_path("/ws/"), None);
        assert_eq!(player_id_from_path("/ws/a/b"), None);
        assert_eq!(player_id_from_path("/alice"), None);
        assert_eq!(player_id_from_path("/"), None);
    }

    #[tokio::test]
    async fn test_malformed_frame_changes_nothing() {
        let engine = test_engine();
        let handle = engine.start().await.unwrap();
        let alice = PlayerId::from("alice");
        let before = engine.snapshot().await;

        for text in ["not json", r#"{"action":"withdraw"}"#, r#"{"action":"place_bet"}"#] {
            let err = dispatch_text(&engine, &alice, text).await.unwrap_err();
            assert!(matches!(err, DispatchError::Protocol(_)));
        }

        assert!(engine.ledger().is_empty().await);
        assert_eq!(engine.snapshot().await, before);

        engine.cancel().await.unwrap();
        handle.finished().await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_reaches_engine() {
        let engine = test_engine();
        let alice = PlayerId::from("alice");

        let err = dispatch_text(&engine, &alice, r#"{"action":"place_bet","amount":10}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Round(RoundError::NotRunning)));

        let handle = engine.start().await.unwrap();
        let ack = dispatch_text(&engine, &alice, r#"{"action":"place_bet","amount":10}"#)
            .await
            .unwrap();
        assert_eq!(ack, CommandAck::BetPlaced { replaced: false });
        assert!(engine.ledger().contains(&alice).await);

        engine.cancel().await.unwrap();
        handle.finished().await.unwrap();
    }

    #[tokio::test]
    async fn test_players_receive_round_events() {
        let mut config = ServerConfig {
            intermission: Duration::from_millis(10),
            ..Default::default()
        };
        config.engine.tick_interval = Duration::from_millis(5);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(CrashServer::new(config));
        let serving = {
            let server = server.clone();
            tokio::spawn(async move { server.serve(listener).await })
        };

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws/alice", addr))
            .await
            .unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = frame.into_text().unwrap();
        assert!(
            text.starts_with("New Round Started!")
                || text.starts_with("Multiplier:")
                || text.starts_with("Game Crashed at:")
                || text.starts_with("Server Seed Revealed:"),
            "unexpected frame {:?}",
            text
        );

        server.shutdown();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bad_path_rejected() {
        let config = ServerConfig {
            intermission: Duration::from_secs(60),
            ..Default::default()
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(CrashServer::new(config));
        let serving = {
            let server = server.clone();
            tokio::spawn(async move { server.serve(listener).await })
        };

        let result = tokio_tungstenite::connect_async(format!("ws://{}/lobby", addr)).await;
        assert!(result.is_err());
        assert_eq!(server.connection_count().await, 0);

        server.shutdown();
        serving.await.unwrap().unwrap();
    }
}
