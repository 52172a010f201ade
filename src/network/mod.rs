//! Network Layer
//!
//! WebSocket transport around the round engine. Nothing here decides round
//! outcomes; it parses commands in and fans events out.

pub mod hub;
pub mod protocol;
pub mod server;

pub use hub::ConnectionHub;
pub use protocol::{parse_command, ClientMessage, ProtocolError};
pub use server::{dispatch_text, player_id_from_path, CrashServer, DispatchError, ServerError};
