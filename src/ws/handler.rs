//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::attendee::{AttendeePreferences, AttendeeSession};
use crate::error::GatewayError;

/// Query parameters for the WebSocket upgrade.
#[derive(Debug, Deserialize)]
pub struct WsConnectParams {
    /// Room token issued by `POST /attendee/token`.
    pub token: String,
    /// Target language to receive.
    pub lang: String,
    /// Whether translated audio starts enabled. Defaults to true.
    pub audio: Option<bool>,
    /// Whether captions start enabled. Defaults to true.
    pub captions: Option<bool>,
}

/// `GET /ws` — Upgrade HTTP connection to an attendee WebSocket.
///
/// The room is taken from the verified token, never from the client,
/// so a token cannot be replayed against another event's room.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsConnectParams>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    let grants = state.token_issuer.verify(&params.token)?;
    let prefs = AttendeePreferences {
        language: params.lang,
        audio_enabled: params.audio.unwrap_or(true),
        captions_enabled: params.captions.unwrap_or(true),
    };
    let session =
        AttendeeSession::connect(&state.transport, &grants.room, &params.token, prefs, true)
            .await?;

    Ok(ws.on_upgrade(move |socket| run_connection(socket, session)))
}
