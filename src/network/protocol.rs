//! Protocol Messages
//!
//! Wire format for client-server communication. WebSocket traffic and the
//! HTTP join/state bodies are all JSON; WebSocket messages carry a `type` tag.

use serde::{Deserialize, Serialize};

use crate::game::player::{Player, PlayerId, PlayerView};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server over the WebSocket.
///
/// Anything that fails to parse as one of these variants is dropped by the
/// read loop without an error reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Displace the sender by a delta per axis.
    Move {
        /// X displacement. Absent or non-numeric values read as 0;
        /// fractional values truncate toward zero.
        #[serde(default, deserialize_with = "lenient_delta")]
        dx: i64,
        /// Y displacement, same leniency as `dx`.
        #[serde(default, deserialize_with = "lenient_delta")]
        dy: i64,
    },

    /// Attack another player by id.
    Attack {
        /// Target's id in UUID string form.
        #[serde(rename = "targetId")]
        target_id: String,
    },
}

/// Accept any JSON value where a delta is expected.
///
/// Numbers pass through (floats truncate), everything else reads as 0.
/// Sloppy clients therefore move by zero instead of losing the connection.
fn lenient_delta<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().map(|v| v as i64).unwrap_or(0))
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full world state, sent at the broadcast rate to every connection.
    Tick {
        /// Every registered player, credentials stripped.
        players: Vec<PlayerView>,
    },
}

// =============================================================================
// HTTP BODIES
// =============================================================================

/// Body of `POST /join`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Requested display name.
    pub name: Option<String>,
}

/// Successful join reply. The only place a credential is ever handed out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    /// Always true on this shape.
    pub ok: bool,
    /// Assigned player id.
    #[serde(rename = "playerId")]
    pub player_id: PlayerId,
    /// Bearer credential; present the same value on every later request.
    pub credential: String,
    /// Where the player landed.
    pub spawn: SpawnPoint,
}

/// Spawn coordinates inside a join reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// World X coordinate
    pub x: i64,
    /// World Y coordinate
    pub y: i64,
}

/// Successful `GET /state` reply. Full records, credentials included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    /// Always true on this shape.
    pub ok: bool,
    /// The authenticated caller's record.
    pub player: Player,
    /// Every registered player.
    pub players: Vec<Player>,
}

/// Error reply body for the HTTP endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Always false on this shape.
    pub ok: bool,
    /// Short machine-friendly reason.
    pub error: String,
}

impl ErrorBody {
    /// Build an error body from a reason string.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
