//! HTTP Endpoints
//!
//! The three routes a client ever touches:
//!
//! - `POST /join` creates a player and hands out the credential (once).
//! - `GET /state` is the authenticated full-fidelity world query.
//! - `GET /ws` upgrades to the WebSocket session.
//!
//! Authentication failures are a uniform 401 that never says which part of
//! the identity was wrong.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::game::player::PlayerId;
use crate::game::registry::{Registry, RegistryError};
use crate::network::protocol::{ErrorBody, JoinRequest, JoinResponse, SpawnPoint, StateResponse};
use crate::network::server::handle_socket;
use crate::network::session::SessionMap;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The authoritative player registry.
    pub registry: Arc<Registry>,
    /// Live connection bindings.
    pub sessions: Arc<SessionMap>,
    /// Server shutdown signal; each connection subscribes.
    pub shutdown: broadcast::Sender<()>,
}

/// Build the router over the shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/join", post(join))
        .route("/state", get(state_query))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

/// Identity pair taken from the query string on `/state` and `/ws`.
#[derive(Debug, Deserialize)]
struct IdentityParams {
    #[serde(rename = "playerId")]
    player_id: Option<String>,
    credential: Option<String>,
}

impl IdentityParams {
    /// Both parameters present and the id parseable, or nothing.
    fn resolve(&self) -> Option<(PlayerId, &str)> {
        let id = PlayerId::parse(self.player_id.as_deref()?)?;
        Some((id, self.credential.as_deref()?))
    }
}

async fn join(State(state): State<AppState>, Json(request): Json<JoinRequest>) -> Response {
    let name = match request.name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new("name required")),
            )
                .into_response()
        }
    };

    match state.registry.create(name).await {
        Ok(player) => Json(JoinResponse {
            ok: true,
            player_id: player.id,
            credential: player.credential.clone(),
            spawn: SpawnPoint {
                x: player.x,
                y: player.y,
            },
        })
        .into_response(),
        Err(RegistryError::NameTaken) => {
            debug!("join rejected, name {:?} taken", name);
            (StatusCode::CONFLICT, Json(ErrorBody::new("name taken"))).into_response()
        }
    }
}

async fn state_query(
    State(state): State<AppState>,
    Query(params): Query<IdentityParams>,
) -> Response {
    let (id, credential) = match params.resolve() {
        Some(pair) => pair,
        None => return unauthorized(),
    };
    if !state.registry.verify(&id, credential).await {
        return unauthorized();
    }
    // verify just passed, but the record could vanish only if players were
    // ever removed; fall back to the same uniform reply.
    let player = match state.registry.get(&id).await {
        Some(player) => player,
        None => return unauthorized(),
    };
    let players = state.registry.dump().await;
    Json(StateResponse {
        ok: true,
        player,
        players,
    })
    .into_response()
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<IdentityParams>,
    State(state): State<AppState>,
) -> Response {
    let (id, credential) = match params.resolve() {
        Some(pair) => pair,
        None => {
            debug!("ws upgrade rejected, malformed identity");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };
    if !state.registry.verify(&id, credential).await {
        debug!("ws upgrade rejected for {}", id);
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let credential = credential.to_string();
    ws.on_upgrade(move |socket| handle_socket(socket, id, credential, state))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody::new("unauthorized")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn test_state() -> AppState {
        let (shutdown, _) = broadcast::channel(1);
        AppState {
            registry: Arc::new(Registry::new(100)),
            sessions: Arc::new(SessionMap::new()),
            shutdown,
        }
    }

    async fn body_json(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap();
        (status, value)
    }

    async fn call_join(state: &AppState, name: Option<&str>) -> (StatusCode, Value) {
        let request = JoinRequest {
            name: name.map(str::to_string),
        };
        body_json(join(State(state.clone()), Json(request)).await).await
    }

    async fn call_state(
        state: &AppState,
        player_id: Option<&str>,
        credential: Option<&str>,
    ) -> (StatusCode, Value) {
        let params = IdentityParams {
            player_id: player_id.map(str::to_string),
            credential: credential.map(str::to_string),
        };
        body_json(state_query(State(state.clone()), Query(params)).await).await
    }

    #[tokio::test]
    async fn join_requires_a_name() {
        let state = test_state();

        let (status, body) = call_join(&state, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "name required");

        let (status, body) = call_join(&state, Some("")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "name required");
    }

    #[tokio::test]
    async fn join_hands_out_identity_once() {
        let state = test_state();

        let (status, body) = call_join(&state, Some("alice")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        let id = body["playerId"].as_str().unwrap();
        assert!(PlayerId::parse(id).is_some());
        assert_eq!(body["credential"].as_str().unwrap().len(), 32);
        let x = body["spawn"]["x"].as_i64().unwrap();
        let y = body["spawn"]["y"].as_i64().unwrap();
        assert!((0..100).contains(&x));
        assert!((0..100).contains(&y));
    }

    #[tokio::test]
    async fn join_conflicts_on_case_folded_names() {
        let state = test_state();
        call_join(&state, Some("Bob")).await;

        let (status, body) = call_join(&state, Some("BOB")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "name taken");
    }

    #[tokio::test]
    async fn state_query_rejects_every_bad_identity_the_same_way() {
        let state = test_state();
        let player = state.registry.create("carol").await.unwrap();
        let id = player.id.to_string();

        let cases = [
            (None, None),
            (Some(id.as_str()), None),
            (None, Some(player.credential.as_str())),
            (Some("not-a-uuid"), Some(player.credential.as_str())),
            (Some(id.as_str()), Some("wrong")),
        ];
        for (pid, cred) in cases {
            let (status, body) = call_state(&state, pid, cred).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["ok"], false);
            assert_eq!(body["error"], "unauthorized");
        }
    }

    #[tokio::test]
    async fn state_query_returns_full_records() {
        let state = test_state();
        let carol = state.registry.create("carol").await.unwrap();
        state.registry.create("dave").await.unwrap();

        let (status, body) = call_state(
            &state,
            Some(&carol.id.to_string()),
            Some(&carol.credential),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["player"]["name"], "carol");
        // The state query is authenticated, so records keep their
        // credentials here; only the broadcast strips them.
        assert_eq!(body["player"]["credential"], carol.credential);
        let players = body["players"].as_array().unwrap();
        assert_eq!(players.len(), 2);
        assert!(players.iter().all(|p| p.get("credential").is_some()));
    }
}
