//! Connection Bindings
//!
//! Maps an authenticated player id to the outbound frame channel of their
//! live WebSocket connection. At most one binding exists per player: a
//! reconnect with valid credentials replaces the previous one, and the
//! transport layer is handed the superseded channel so it can close the old
//! socket instead of leaking it.
//!
//! Every successful bind gets a monotonically increasing serial. Teardown
//! goes through [`SessionMap::release`] with that serial, so a slow
//! disconnect from a dead socket can never unbind the connection that
//! replaced it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::game::player::PlayerId;
use crate::game::registry::Registry;

/// Binding errors.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Unknown player id or credential mismatch.
    #[error("invalid player id or credential")]
    Unauthorized,
}

/// A live connection's entry in the map.
#[derive(Debug, Clone)]
pub struct BoundHandle {
    /// Serial of the bind that produced this handle.
    pub serial: u64,
    /// Outbound frame channel for the connection.
    pub sender: mpsc::Sender<Message>,
}

/// What a successful bind hands back to the connection task.
#[derive(Debug)]
pub struct BindTicket {
    /// Serial to present when releasing this binding.
    pub serial: u64,
    /// Previous handle for the same player, if one was replaced.
    /// The caller should close it.
    pub replaced: Option<BoundHandle>,
}

/// Registry of live connections, keyed by player id.
pub struct SessionMap {
    bindings: RwLock<BTreeMap<PlayerId, BoundHandle>>,
    next_serial: AtomicU64,
}

impl SessionMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(BTreeMap::new()),
            next_serial: AtomicU64::new(1),
        }
    }

    /// Bind `sender` as the live connection for `id`.
    ///
    /// The credential is checked against the registry even though the
    /// upgrade handler already did so; the map never trusts its callers.
    /// Any previous binding for the same player is replaced and returned
    /// in the ticket.
    pub async fn bind(
        &self,
        registry: &Registry,
        id: PlayerId,
        credential: &str,
        sender: mpsc::Sender<Message>,
    ) -> Result<BindTicket, SessionError> {
        if !registry.verify(&id, credential).await {
            return Err(SessionError::Unauthorized);
        }
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let mut bindings = self.bindings.write().await;
        let replaced = bindings.insert(id, BoundHandle { serial, sender });
        if replaced.is_some() {
            debug!("rebind for {} supersedes an earlier connection", id);
        }
        Ok(BindTicket { serial, replaced })
    }

    /// Drop the binding for `id` unconditionally. Idempotent.
    pub async fn unbind(&self, id: &PlayerId) {
        self.bindings.write().await.remove(id);
    }

    /// Drop the binding for `id` only if it still carries `serial`.
    ///
    /// Returns whether anything was removed. A false return means a newer
    /// bind already owns the slot and the caller must leave it alone.
    pub async fn release(&self, id: &PlayerId, serial: u64) -> bool {
        let mut bindings = self.bindings.write().await;
        match bindings.get(id) {
            Some(handle) if handle.serial == serial => {
                bindings.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Snapshot of every bound connection, for the broadcast tick.
    pub async fn active_handles(&self) -> Vec<(PlayerId, mpsc::Sender<Message>)> {
        self.bindings
            .read()
            .await
            .iter()
            .map(|(id, handle)| (*id, handle.sender.clone()))
            .collect()
    }

    /// Whether `id` currently has a live connection.
    pub async fn is_bound(&self, id: &PlayerId) -> bool {
        self.bindings.read().await.contains_key(id)
    }

    /// Number of live connections.
    pub async fn binding_count(&self) -> usize {
        self.bindings.read().await.len()
    }
}

impl Default for SessionMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn player_in(registry: &Registry) -> crate::game::player::Player {
        registry.create("binder").await.unwrap()
    }

    fn frame_channel() -> (mpsc::Sender<Message>, mpsc::Receiver<Message>) {
        mpsc::channel(8)
    }

    #[tokio::test]
    async fn bind_rejects_bad_identity() {
        let registry = Registry::new(100);
        let sessions = SessionMap::new();
        let player = player_in(&registry).await;
        let (tx, _rx) = frame_channel();

        // Unknown id.
        let result = sessions
            .bind(&registry, PlayerId::random(), &player.credential, tx.clone())
            .await;
        assert!(matches!(result, Err(SessionError::Unauthorized)));

        // Wrong credential.
        let result = sessions.bind(&registry, player.id, "ffff", tx).await;
        assert!(matches!(result, Err(SessionError::Unauthorized)));

        assert_eq!(sessions.binding_count().await, 0);
    }

    #[tokio::test]
    async fn bind_registers_the_handle() {
        let registry = Registry::new(100);
        let sessions = SessionMap::new();
        let player = player_in(&registry).await;
        let (tx, _rx) = frame_channel();

        let ticket = sessions
            .bind(&registry, player.id, &player.credential, tx)
            .await
            .unwrap();
        assert!(ticket.replaced.is_none());
        assert!(sessions.is_bound(&player.id).await);
        assert_eq!(sessions.binding_count().await, 1);
    }

    #[tokio::test]
    async fn rebind_returns_the_superseded_handle() {
        let registry = Registry::new(100);
        let sessions = SessionMap::new();
        let player = player_in(&registry).await;
        let (tx1, _rx1) = frame_channel();
        let (tx2, _rx2) = frame_channel();

        let first = sessions
            .bind(&registry, player.id, &player.credential, tx1)
            .await
            .unwrap();
        let second = sessions
            .bind(&registry, player.id, &player.credential, tx2)
            .await
            .unwrap();

        assert!(second.serial > first.serial);
        let replaced = second.replaced.unwrap();
        assert_eq!(replaced.serial, first.serial);
        // Still exactly one live binding.
        assert_eq!(sessions.binding_count().await, 1);
    }

    #[tokio::test]
    async fn release_is_serial_guarded() {
        let registry = Registry::new(100);
        let sessions = SessionMap::new();
        let player = player_in(&registry).await;
        let (tx1, _rx1) = frame_channel();
        let (tx2, _rx2) = frame_channel();

        let first = sessions
            .bind(&registry, player.id, &player.credential, tx1)
            .await
            .unwrap();
        let second = sessions
            .bind(&registry, player.id, &player.credential, tx2)
            .await
            .unwrap();

        // The stale connection's teardown must not evict the rebind.
        assert!(!sessions.release(&player.id, first.serial).await);
        assert!(sessions.is_bound(&player.id).await);

        assert!(sessions.release(&player.id, second.serial).await);
        assert!(!sessions.is_bound(&player.id).await);
    }

    #[tokio::test]
    async fn unbind_is_idempotent() {
        let registry = Registry::new(100);
        let sessions = SessionMap::new();
        let player = player_in(&registry).await;
        let (tx, _rx) = frame_channel();

        sessions
            .bind(&registry, player.id, &player.credential, tx)
            .await
            .unwrap();
        sessions.unbind(&player.id).await;
        sessions.unbind(&player.id).await;
        assert_eq!(sessions.binding_count().await, 0);
    }

    #[tokio::test]
    async fn active_handles_cover_all_bindings() {
        let registry = Registry::new(100);
        let sessions = SessionMap::new();
        let alice = registry.create("alice").await.unwrap();
        let bob = registry.create("bob").await.unwrap();
        let (tx1, _rx1) = frame_channel();
        let (tx2, _rx2) = frame_channel();

        sessions
            .bind(&registry, alice.id, &alice.credential, tx1)
            .await
            .unwrap();
        sessions
            .bind(&registry, bob.id, &bob.credential, tx2)
            .await
            .unwrap();

        let handles = sessions.active_handles().await;
        assert_eq!(handles.len(), 2);
        let ids: Vec<PlayerId> = handles.iter().map(|(id, _)| *id).collect();
        assert!(ids.contains(&alice.id));
        assert!(ids.contains(&bob.id));
    }
}
