//! Round Engine Module
//!
//! ## Module Structure
//!
//! - `state`: Round state machine values owned by the clock
//! - `ledger`: Concurrent per-player bet store
//! - `settlement`: Pay-out rules applied at the crash
//! - `events`: Outbound events and the broadcaster port
//! - `command`: Validated player commands
//! - `engine`: Lifecycle, tick loop, cancellation
//! - `scheduler`: Back-to-back rounds until shutdown

pub mod command;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod scheduler;
pub mod settlement;
pub mod state;

// Re-export key types
pub use command::{Command, CommandAck};
pub use engine::{RoundEnd, RoundEngine, RoundHandle, RoundSummary};
pub use events::{Broadcaster, MemoryBroadcaster, Outbound, PlayerNotice, RoundEvent};
pub use ledger::{Bet, BetLedger, PlayerId};
pub use scheduler::run_rounds;
pub use settlement::{settle, Outcome, Settlement};
pub use state::{RoundCore, RoundError, RoundSnapshot, RoundState, Tick};
