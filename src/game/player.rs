//! Player Records
//!
//! The registry stores full [`Player`] records, credential included. Anything
//! that leaves the server on the broadcast path goes out as a [`PlayerView`],
//! which carries everything except the credential.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::STARTING_HP;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier (UUID v4).
///
/// Implements Ord for stable BTreeMap iteration; serializes as the canonical
/// hyphenated string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(Uuid);

impl PlayerId {
    /// Generate a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a UUID string. Returns None for anything malformed.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// PLAYER RECORD
// =============================================================================

/// Full record of a registered player.
///
/// This is the persistence and lookup shape. It includes the bearer
/// credential, so it must never be serialized onto the broadcast path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique player ID, assigned at join
    pub id: PlayerId,
    /// Display name, unique among players (case-insensitive)
    pub name: String,
    /// World X coordinate
    pub x: i64,
    /// World Y coordinate
    pub y: i64,
    /// Current health; floors at zero and stays there
    pub hp: i32,
    /// Bearer token proving ownership of this player
    pub credential: String,
}

impl Player {
    /// Create a new player with a random id, spawn position and credential.
    ///
    /// Spawn coordinates are uniform in `[0, world_size)` on both axes.
    /// A world size below 1 is treated as 1.
    pub fn spawn(name: &str, world_size: i64) -> Self {
        let world_size = world_size.max(1);
        let mut rng = rand::thread_rng();
        Self {
            id: PlayerId::random(),
            name: name.to_string(),
            x: rng.gen_range(0..world_size),
            y: rng.gen_range(0..world_size),
            hp: STARTING_HP,
            credential: generate_credential(&mut rng),
        }
    }

    /// Strip the credential for broadcast.
    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            x: self.x,
            y: self.y,
            hp: self.hp,
        }
    }
}

/// Broadcast-safe projection of a [`Player`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Unique player ID
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// World X coordinate
    pub x: i64,
    /// World Y coordinate
    pub y: i64,
    /// Current health
    pub hp: i32,
}

/// 16 random bytes, hex encoded. Compared with plain string equality.
fn generate_credential(rng: &mut impl Rng) -> String {
    let bytes: [u8; 16] = rng.gen();
    hex::encode(bytes)
}
