//! Action Resolution
//!
//! Turns decoded wire messages into registry mutations. The caller is
//! already authenticated (messages only arrive on a bound connection), so
//! no credential appears here.
//!
//! Outcomes are informational. The socket loop logs and discards them;
//! nothing is echoed back to the sender, and invalid targets cost nothing.

use crate::game::player::PlayerId;
use crate::game::registry::Registry;
use crate::network::protocol::ClientMessage;

/// What an applied action did to the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The actor moved; carries the new position.
    Moved {
        /// New X coordinate
        x: i64,
        /// New Y coordinate
        y: i64,
    },
    /// The attack landed; carries the target's remaining hp.
    Attacked {
        /// Who got hit
        target: PlayerId,
        /// Their hp after the hit
        hp: i32,
    },
    /// Attack target id did not parse or is not registered. No-op.
    UnknownTarget,
    /// The acting player is not in the registry. No-op.
    UnknownActor,
}

/// Apply one inbound message from `actor` to the world.
///
/// Messages are applied in arrival order per connection; ordering across
/// connections is whatever the lock hands out.
pub async fn apply(registry: &Registry, actor: PlayerId, message: ClientMessage) -> ActionOutcome {
    match message {
        ClientMessage::Move { dx, dy } => match registry.apply_move(&actor, dx, dy).await {
            Some((x, y)) => ActionOutcome::Moved { x, y },
            None => ActionOutcome::UnknownActor,
        },
        ClientMessage::Attack { target_id } => {
            let target = match PlayerId::parse(&target_id) {
                Some(target) => target,
                None => return ActionOutcome::UnknownTarget,
            };
            match registry.apply_attack(&target).await {
                Some(hp) => ActionOutcome::Attacked { target, hp },
                None => ActionOutcome::UnknownTarget,
            }
        }
    }
}
