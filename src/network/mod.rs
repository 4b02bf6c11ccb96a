//! Network Layer
//!
//! HTTP handshake, WebSocket sessions and the broadcast tick. All world
//! mutation runs through `game/`; this layer only moves frames.

pub mod broadcast;
pub mod protocol;
pub mod routes;
pub mod server;
pub mod session;

pub use broadcast::broadcast_tick;
pub use protocol::{ClientMessage, ErrorBody, JoinRequest, JoinResponse, ServerMessage};
pub use routes::{router, AppState};
pub use server::{GameServer, GameServerError};
pub use session::{BindTicket, BoundHandle, SessionError, SessionMap};
