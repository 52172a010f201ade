//! Protocol Messages
//!
//! Inbound wire format. Clients send JSON objects tagged by `action`:
//!
//! ```text
//! {"action": "place_bet", "amount": 100, "client_seed": "optional"}
//! {"action": "cash_out"}
//! ```
//!
//! Outbound traffic is plain text (see `round::events`).

use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use thiserror::Error;

use crate::round::command::Command;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Stake on the running round.
    PlaceBet {
        /// Stake.
        amount: f64,
        /// Optional client seed.
        #[serde(default)]
        client_seed: Option<String>,
    },

    /// Lock in the current multiplier.
    CashOut,
}

impl ClientMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Validate into an engine command.
    pub fn into_command(self) -> Result<Command, ProtocolError> {
        match self {
            ClientMessage::PlaceBet {
                amount,
                client_seed,
            } => {
                if !(amount.is_finite() && amount > 0.0) {
                    return Err(ProtocolError::InvalidAmount(amount));
                }
                Ok(Command::PlaceBet {
                    amount,
                    client_seed,
                })
            }
            ClientMessage::CashOut => Ok(Command::CashOut),
        }
    }
}

/// Why an inbound message was dropped.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Not valid JSON at all.
    #[error("Invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    /// Valid JSON of the wrong shape: unknown action, missing or mistyped field.
    #[error("Invalid message: {0}")]
    InvalidMessage(serde_json::Error),

    /// `place_bet` with a non-positive amount.
    #[error("Invalid bet amount: {0}")]
    InvalidAmount(f64),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        match e.classify() {
            Category::Syntax | Category::Eof | Category::Io => ProtocolError::InvalidJson(e),
            Category::Data => ProtocolError::InvalidMessage(e),
        }
    }
}

/// Parse and validate one inbound text frame.
pub fn parse_command(text: &str) -> Result<Command, ProtocolError> {
    ClientMessage::from_json(text)?.into_command()
}
