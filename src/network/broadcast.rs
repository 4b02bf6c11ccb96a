//! Broadcast Ticker
//!
//! Fixed-rate fan-out of the full world state. Every tick takes one
//! credential-stripped snapshot, serializes it exactly once, and pushes the
//! same frame to every bound connection.
//!
//! Delivery is strictly best-effort: a connection whose outbound channel is
//! full or gone is skipped for this tick and the next tick supersedes it.
//! Nothing is queued and nobody else's frame is delayed.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, Utf8Bytes};
use tokio::sync::broadcast;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, trace};

use crate::game::registry::Registry;
use crate::network::protocol::ServerMessage;
use crate::network::session::SessionMap;

/// Run the tick loop until the shutdown channel fires.
///
/// If a tick's work overruns the period, missed firings are skipped rather
/// than bunched up.
pub async fn run_broadcast_loop(
    registry: Arc<Registry>,
    sessions: Arc<SessionMap>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!("broadcasting every {:?}", period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let delivered = broadcast_tick(&registry, &sessions).await;
                trace!("tick delivered to {} connections", delivered);
            }
            _ = shutdown.recv() => {
                debug!("broadcast loop stopping");
                break;
            }
        }
    }
}

/// Send one world snapshot to every bound connection.
///
/// Returns how many connections accepted the frame.
pub async fn broadcast_tick(registry: &Registry, sessions: &SessionMap) -> usize {
    let players = registry.snapshot().await;
    let message = ServerMessage::Tick { players };
    let frame = match message.to_json() {
        Ok(json) => Utf8Bytes::from(json),
        Err(e) => {
            error!("failed to serialize tick: {}", e);
            return 0;
        }
    };

    let mut delivered = 0;
    for (id, sender) in sessions.active_handles().await {
        match sender.try_send(Message::Text(frame.clone())) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Full(_)) => {
                debug!("connection for {} is backed up, skipping tick", id);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("connection for {} is gone, skipping tick", id);
            }
        }
    }
    delivered
}
