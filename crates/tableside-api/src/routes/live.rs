//! The live WebSocket channel.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::{Router, routing::get};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, instrument};
use uuid::Uuid;

use tableside_hub::OutboundFrame;

use crate::error::ApiError;
use crate::routes::bearer_token;
use crate::state::AppState;

/// Query parameters for GET /. Browsers cannot set headers on WebSocket
/// handshakes, so the token may ride in the query string instead.
#[derive(Debug, Deserialize)]
pub struct LiveParams {
    /// Bearer token, as an alternative to the `Authorization` header.
    pub token: Option<String>,
}

/// GET / — WebSocket upgrade.
#[instrument(skip(state, ws, headers, params))]
async fn live(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<LiveParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = match bearer_token(&headers) {
        Ok(token) => token.to_owned(),
        Err(err) => params.token.ok_or(err)?,
    };
    // Authenticate before the upgrade so a bad token gets a proper HTTP
    // status instead of a dropped socket.
    let (connection_id, receiver) = state.relay.connect(&token)?;

    Ok(ws.on_upgrade(move |socket| run_connection(state, connection_id, receiver, socket)))
}

/// Pumps outbound frames to the socket and treats every inbound message as a
/// heartbeat. Returns when either side closes.
async fn run_connection(
    state: AppState,
    connection_id: Uuid,
    mut receiver: mpsc::UnboundedReceiver<OutboundFrame>,
    mut socket: WebSocket,
) {
    loop {
        tokio::select! {
            frame = receiver.recv() => {
                let Some(frame) = frame else { break };
                let Ok(text) = serde_json::to_string(&frame) else {
                    debug!(%connection_id, "dropping unserializable frame");
                    continue;
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    None | Some(Ok(Message::Close(_))) | Some(Err(_)) => break,
                    // Inbound traffic carries no commands; any message
                    // refreshes the heartbeat.
                    Some(Ok(_)) => {
                        let _ = state.relay.heartbeat(connection_id);
                    }
                }
            }
        }
    }
    state.relay.disconnect(connection_id);
    debug!(%connection_id, "live connection closed");
}

/// Returns the router for the live channel.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(live))
}
