//! Player Registry
//!
//! Single authoritative owner of all player records. Every mutation funnels
//! through here behind one async RwLock, so interleaved actions from many
//! connections serialize cleanly and a broadcast snapshot is always a
//! consistent point-in-time view.
//!
//! BTreeMap keeps iteration ordered by player id, which keeps broadcast and
//! save output stable across runs.

use std::collections::BTreeMap;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::game::player::{Player, PlayerId, PlayerView};
use crate::ATTACK_DAMAGE;

/// Registry errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Another player already holds this name (case-insensitive).
    #[error("name already taken")]
    NameTaken,
}

/// Concurrent registry of every player in the world.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Registry {
    players: RwLock<BTreeMap<PlayerId, Player>>,
    world_size: i64,
}

impl Registry {
    /// Create an empty registry. World sizes below 1 are treated as 1.
    pub fn new(world_size: i64) -> Self {
        Self {
            players: RwLock::new(BTreeMap::new()),
            world_size: world_size.max(1),
        }
    }

    /// Register a new player under `name`.
    ///
    /// Names are unique ignoring case: "Alice" blocks a later "ALICE".
    /// Returns the full record, credential included, exactly once; the
    /// credential is never handed out again after this.
    pub async fn create(&self, name: &str) -> Result<Player, RegistryError> {
        let folded = name.to_lowercase();
        let mut players = self.players.write().await;
        if players.values().any(|p| p.name.to_lowercase() == folded) {
            return Err(RegistryError::NameTaken);
        }
        let player = Player::spawn(name, self.world_size);
        info!("player {} registered as {:?}", player.id, player.name);
        players.insert(player.id, player.clone());
        Ok(player)
    }

    /// Look up a single player by id.
    pub async fn get(&self, id: &PlayerId) -> Option<Player> {
        self.players.read().await.get(id).cloned()
    }

    /// Check a bearer credential against the stored one.
    ///
    /// Unknown ids verify as false, same as a wrong credential.
    pub async fn verify(&self, id: &PlayerId, credential: &str) -> bool {
        self.players
            .read()
            .await
            .get(id)
            .is_some_and(|p| p.credential == credential)
    }

    /// Displace a player by `(dx, dy)` and return the new position.
    ///
    /// Deltas are applied verbatim, with no bound on magnitude; coordinates
    /// saturate at the i64 extremes instead of wrapping. Returns None if the
    /// player does not exist.
    pub async fn apply_move(&self, id: &PlayerId, dx: i64, dy: i64) -> Option<(i64, i64)> {
        let mut players = self.players.write().await;
        let player = players.get_mut(id)?;
        player.x = player.x.saturating_add(dx);
        player.y = player.y.saturating_add(dy);
        Some((player.x, player.y))
    }

    /// Deal one attack's damage to `target` and return their remaining hp.
    ///
    /// Health floors at zero; attacking a dead player is a no-op that still
    /// reports 0. Returns None if the target does not exist. No range or
    /// line-of-sight rules, and self-attack is allowed.
    pub async fn apply_attack(&self, target: &PlayerId) -> Option<i32> {
        let mut players = self.players.write().await;
        let target = players.get_mut(target)?;
        target.hp = (target.hp - ATTACK_DAMAGE).max(0);
        Some(target.hp)
    }

    /// Broadcast-safe snapshot of every player, credentials stripped.
    pub async fn snapshot(&self) -> Vec<PlayerView> {
        self.players.read().await.values().map(Player::view).collect()
    }

    /// Full dump of every record, credentials included. Persistence and the
    /// authenticated state query use this; the broadcast path must not.
    pub async fn dump(&self) -> Vec<Player> {
        self.players.read().await.values().cloned().collect()
    }

    /// Load records into the registry, replacing any with the same id.
    /// Runs at boot before the listener comes up.
    pub async fn restore(&self, records: Vec<Player>) {
        let mut players = self.players.write().await;
        for record in records {
            players.insert(record.id, record);
        }
        debug!("registry holds {} players after restore", players.len());
    }

    /// Number of registered players.
    pub async fn player_count(&self) -> usize {
        self.players.read().await.len()
    }
}
