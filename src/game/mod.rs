//! Game Logic Module
//!
//! Authoritative world state and the only code allowed to mutate it.
//!
//! ## Module Structure
//!
//! - `player`: Player records, ids, broadcast-safe views
//! - `registry`: Concurrent registry of all players
//! - `actions`: Move and attack resolution

pub mod actions;
pub mod player;
pub mod registry;

// Re-export key types
pub use actions::ActionOutcome;
pub use player::{Player, PlayerId, PlayerView};
pub use registry::{Registry, RegistryError};
