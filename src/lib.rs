//! # Crash Round Server
//!
//! Provably fair crash rounds: a multiplier climbs from 1.00x until a crash
//! point committed to before the round started, and players cash out before
//! it hits.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CRASH ROUND SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Pure primitives                           │
//! │  ├── hash.rs     - SHA-256 segment hashing                   │
//! │  └── multiplier.rs - Two-decimal multiplier arithmetic       │
//! │                                                              │
//! │  fairness/       - Commit-reveal (deterministic)             │
//! │  ├── seed.rs     - Server seed and its public commitment     │
//! │  ├── crash.rs    - Crash point derivation                    │
//! │  └── verify.rs   - Post-round verification                   │
//! │                                                              │
//! │  round/          - Round lifecycle                           │
//! │  ├── state.rs    - Idle / Running / Crashed state machine    │
//! │  ├── ledger.rs   - Concurrent bet ledger                     │
//! │  ├── settlement.rs - Win / loss rules                        │
//! │  ├── events.rs   - Outbound events, broadcaster port         │
//! │  ├── engine.rs   - Tick loop, cancel, commands               │
//! │  └── scheduler.rs- Back-to-back rounds                       │
//! │                                                              │
//! │  network/        - Transport (non-deterministic)             │
//! │  ├── protocol.rs - Inbound JSON commands                     │
//! │  ├── hub.rs      - Connected players, fan-out                │
//! │  └── server.rs   - WebSocket server                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fairness Guarantee
//!
//! The crash point of a round is a pure function of
//! `(server_seed, client_seed, nonce)`. Only `SHA-256(server_seed)` is
//! public while the round runs; the seed is revealed after the crash so any
//! player can recompute the result with [`fairness::RoundReveal::verify`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod fairness;
pub mod network;
pub mod round;

// Re-export commonly used types
pub use config::{ClientSeedPolicy, ConfigError, EngineConfig, ServerConfig};
pub use core::multiplier::Multiplier;
pub use fairness::{crash_point, HashedServerSeed, RoundReveal, ServerSeed};
pub use network::{CrashServer, ServerError};
pub use round::{Broadcaster, PlayerId, RoundEngine, RoundError, RoundEvent, RoundState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Multiplier growth per tick (`m <- m * (1 + rate)`).
pub const DEFAULT_GROWTH_RATE: f64 = 0.05;

/// Tick interval of the round clock, in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Client seed used when no participant supplied one.
pub const DEFAULT_CLIENT_SEED: &str = "default_seed";
