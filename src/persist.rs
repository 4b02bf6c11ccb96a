//! World Persistence
//!
//! One JSON file holds the whole world: `{"players":[...]}` with
//! full-fidelity records, credentials included, so a restored player can
//! keep using the credential they were issued before the restart.
//!
//! Writes go to a sibling `.tmp` file first and are renamed into place, so
//! a crash mid-write leaves the previous save intact. Anything that happened
//! after the last save is lost on a crash.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, error};

use crate::game::player::Player;
use crate::game::registry::Registry;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Reading or writing the save file failed.
    #[error("save file io: {0}")]
    Io(#[from] std::io::Error),
    /// The save file exists but is not valid JSON of the expected shape.
    #[error("save file decode: {0}")]
    Decode(#[from] serde_json::Error),
}

/// On-disk shape of the save file.
#[derive(Debug, Serialize, Deserialize)]
struct SaveFile {
    players: Vec<Player>,
}

/// Load every player from `path`.
///
/// A missing file is an empty world, not an error. A corrupt file is
/// reported so the caller can decide to start fresh.
pub async fn load(path: &Path) -> Result<Vec<Player>, PersistError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let save: SaveFile = serde_json::from_slice(&raw)?;
    Ok(save.players)
}

/// Write every player to `path`, atomically on the same filesystem.
pub async fn save(path: &Path, players: &[Player]) -> Result<(), PersistError> {
    let save = SaveFile {
        players: players.to_vec(),
    };
    let encoded = serde_json::to_vec_pretty(&save)?;
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, &encoded).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Dump the registry to `path` every `period` until shutdown fires.
///
/// A failed save is logged and retried implicitly at the next firing; it
/// never takes the loop down.
pub async fn run_autosave_loop(
    registry: Arc<Registry>,
    path: PathBuf,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);
    // interval fires immediately; a save right after the startup restore
    // would only rewrite what was just read, so absorb the first firing.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let players = registry.dump().await;
                match save(&path, &players).await {
                    Ok(()) => {
                        debug!("autosaved {} players to {}", players.len(), path.display());
                    }
                    Err(e) => error!("autosave failed: {}", e),
                }
            }
            _ = shutdown.recv() => {
                debug!("autosave loop stopping");
                break;
            }
        }
    }
}
