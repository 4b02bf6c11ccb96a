//! Game Server
//!
//! Owns everything with a lifetime: configuration, the player registry, the
//! connection map and the shutdown channel. `run()` binds the listener,
//! spawns the broadcast and autosave loops, then serves the router until
//! shutdown is signalled.
//!
//! Each upgraded WebSocket gets two halves: a spawned forward task draining
//! the per-connection frame channel into the socket, and a sequential read
//! loop applying inbound actions in arrival order.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, instrument, trace};

use crate::config::ServerConfig;
use crate::game::actions;
use crate::game::player::PlayerId;
use crate::game::registry::Registry;
use crate::network::broadcast::run_broadcast_loop;
use crate::network::protocol::ClientMessage;
use crate::network::routes::{router, AppState};
use crate::network::session::{SessionError, SessionMap};
use crate::persist;

/// Outbound frames buffered per connection. A connection this many frames
/// behind starts losing ticks instead of stalling the broadcaster.
const FRAME_BUFFER: usize = 64;

/// Server errors.
#[derive(Debug, Error)]
pub enum GameServerError {
    /// Listener setup or serving failed.
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Authoritative player registry.
    registry: Arc<Registry>,
    /// Live connection bindings.
    sessions: Arc<SessionMap>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server around `config`.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let registry = Arc::new(Registry::new(config.world_size));

        Self {
            config,
            registry,
            sessions: Arc::new(SessionMap::new()),
            shutdown_tx,
        }
    }

    /// The registry this server mutates.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The live connection map.
    pub fn sessions(&self) -> &Arc<SessionMap> {
        &self.sessions
    }

    /// The configuration the server was built with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Signal every loop and connection to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Bind the configured port and serve until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener. Split from [`run`](Self::run) so
    /// tests can use an ephemeral port.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        let addr = listener.local_addr()?;
        info!("listening on {}", addr);

        // Background loops; both watch the shutdown channel themselves.
        let ticker_handle = tokio::spawn(run_broadcast_loop(
            self.registry.clone(),
            self.sessions.clone(),
            self.config.tick_interval(),
            self.shutdown_tx.subscribe(),
        ));
        let autosave_handle = tokio::spawn(persist::run_autosave_loop(
            self.registry.clone(),
            self.config.save_path.clone(),
            self.config.save_interval,
            self.shutdown_tx.subscribe(),
        ));

        let app = router(AppState {
            registry: self.registry.clone(),
            sessions: self.sessions.clone(),
            shutdown: self.shutdown_tx.clone(),
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await;

        ticker_handle.abort();
        autosave_handle.abort();
        info!("server stopped");
        result.map_err(GameServerError::from)
    }
}

/// Drive one upgraded WebSocket connection to completion.
///
/// The upgrade handler has already verified the credential; `bind` checks it
/// again because the registry, not the route, is the authority.
pub(crate) async fn handle_socket(
    socket: WebSocket,
    id: PlayerId,
    credential: String,
    state: AppState,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (frame_tx, mut frame_rx) = mpsc::channel::<Message>(FRAME_BUFFER);

    let ticket = match state
        .sessions
        .bind(&state.registry, id, &credential, frame_tx.clone())
        .await
    {
        Ok(ticket) => ticket,
        Err(SessionError::Unauthorized) => {
            debug!("bind refused for {}", id);
            let _ = ws_tx.close().await;
            return;
        }
    };

    if let Some(old) = ticket.replaced {
        info!("player {} reconnected, closing the previous socket", id);
        let _ = old.sender.try_send(Message::Close(None));
    }
    debug!("player {} connected", id);

    // Forward task: frame channel -> socket. Ends on send failure or after
    // a Close frame goes out.
    let forward = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            let closing = matches!(frame, Message::Close(_));
            if ws_tx.send(frame).await.is_err() || closing {
                break;
            }
        }
    });

    let mut shutdown_rx = state.shutdown.subscribe();
    loop {
        tokio::select! {
            received = ws_rx.next() => {
                match received {
                    Some(Ok(Message::Text(text))) => match ClientMessage::from_json(&text) {
                        Ok(message) => {
                            let outcome = actions::apply(&state.registry, id, message).await;
                            trace!("action from {}: {:?}", id, outcome);
                        }
                        Err(e) => {
                            debug!("ignoring malformed frame from {}: {}", id, e);
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("player {} disconnected", id);
                        break;
                    }
                    // Binary, ping and pong frames carry no actions.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("socket error for {}: {}", id, e);
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                let _ = frame_tx.try_send(Message::Close(None));
                break;
            }
        }
    }

    // Serial-guarded: if a rebind already replaced us, leave it alone.
    if state.sessions.release(&id, ticket.serial).await {
        debug!("released binding for {}", id);
    }
    forward.abort();
}
