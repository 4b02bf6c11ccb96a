//! # Pixel Arena Server
//!
//! Authoritative multiplayer server for Pixel Arena. Players join over plain
//! HTTP, hold a single WebSocket connection for the rest of their session, and
//! receive the full world state at a fixed broadcast rate.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PIXEL ARENA SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - World state (authoritative)               │
//! │  ├── player.rs   - Player records and identifiers            │
//! │  ├── registry.rs - Concurrent player registry                │
//! │  └── actions.rs  - Move and attack resolution                │
//! │                                                              │
//! │  network/        - Transport                                 │
//! │  ├── routes.rs   - HTTP endpoints (/join, /state, /ws)       │
//! │  ├── protocol.rs - Wire message types                        │
//! │  ├── session.rs  - Connection bindings per player            │
//! │  ├── broadcast.rs- Fixed-rate state fan-out                  │
//! │  └── server.rs   - Listener, socket loop, lifecycle          │
//! │                                                              │
//! │  persist.rs      - JSON save file (load / save / autosave)   │
//! │  config.rs       - Environment-driven configuration          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority Model
//!
//! Clients never mutate state directly:
//! - All world changes go through [`game::registry::Registry`]
//! - Actions arrive as JSON over the WebSocket and are applied in order
//! - Results are only observable through the next broadcast tick
//! - A player has at most one live connection; a rebind supersedes the old one
//!
//! State is eventually durable: the registry is dumped to a JSON file on a
//! timer and once more on shutdown.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod game;
pub mod network;
pub mod persist;

// Re-export commonly used types
pub use config::ServerConfig;
pub use game::actions::ActionOutcome;
pub use game::player::{Player, PlayerId, PlayerView};
pub use game::registry::{Registry, RegistryError};
pub use network::protocol::{ClientMessage, ServerMessage};
pub use network::server::{GameServer, GameServerError};
pub use network::session::{SessionError, SessionMap};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default broadcast rate (ticks per second)
pub const DEFAULT_TICK_RATE: u32 = 10;

/// Default side length of the square spawn area; spawns land in `[0, size)`
pub const DEFAULT_WORLD_SIZE: i64 = 100;

/// Default TCP listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default save file path, relative to the working directory
pub const DEFAULT_SAVE_PATH: &str = "world.json";

/// Default autosave cadence in milliseconds
pub const DEFAULT_SAVE_INTERVAL_MS: u64 = 60_000;

/// Health every player spawns with
pub const STARTING_HP: i32 = 100;

/// Health removed by a single attack
pub const ATTACK_DAMAGE: i32 = 5;
