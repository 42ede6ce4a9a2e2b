//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single attendee connection,
//! dispatching incoming commands and forwarding filtered room traffic.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};

use super::messages::{WsCommand, WsMessage, WsMessageType};
use crate::attendee::{AttendeeEvent, AttendeeSession};
use crate::protocol::language_for_track;

/// Runs the read/write loop for a single attendee connection.
///
/// - Reads commands from the client and applies them to the session.
/// - Forwards captions, audio-segment notices, and track lifecycle
///   notices for the session's selected language to the client.
pub async fn run_connection(socket: WebSocket, mut session: AttendeeSession) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut session).await;
                        let Ok(json) = serde_json::to_string(&response) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            // Room traffic for the selected language
            event = session.next_event() => {
                match event {
                    AttendeeEvent::Update(update) => {
                        let payload = serde_json::to_value(&update).unwrap_or_default();
                        if send_event(&mut ws_tx, payload).await.is_err() {
                            break;
                        }
                    }
                    AttendeeEvent::TrackPublished { track_name, matches_selection } => {
                        let payload = serde_json::json!({
                            "kind": "track_published",
                            "track_name": track_name,
                            "lang": language_for_track(&track_name),
                            "matches_selection": matches_selection,
                        });
                        if send_event(&mut ws_tx, payload).await.is_err() {
                            break;
                        }
                    }
                    AttendeeEvent::TrackUnpublished { track_name, matches_selection } => {
                        let payload = serde_json::json!({
                            "kind": "track_unpublished",
                            "track_name": track_name,
                            "lang": language_for_track(&track_name),
                            "matches_selection": matches_selection,
                        });
                        if send_event(&mut ws_tx, payload).await.is_err() {
                            break;
                        }
                    }
                    AttendeeEvent::Closed => {
                        let payload = serde_json::json!({ "kind": "room_closed" });
                        let _ = send_event(&mut ws_tx, payload).await;
                        break;
                    }
                }
            }
        }
    }

    tracing::debug!(lang = session.language(), "ws connection closed");
}

/// Sends a server-generated event message to the client.
async fn send_event(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    payload: serde_json::Value,
) -> Result<(), axum::Error> {
    let msg = WsMessage {
        id: uuid::Uuid::new_v4().to_string(),
        msg_type: WsMessageType::Event,
        timestamp: chrono::Utc::now(),
        payload,
    };
    let json = serde_json::to_string(&msg).unwrap_or_default();
    ws_tx.send(Message::text(json)).await
}

/// Handles a text message from the client, returning the response envelope.
async fn handle_text_message(text: &str, session: &mut AttendeeSession) -> WsMessage {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return WsMessage {
            id: String::new(),
            msg_type: WsMessageType::Error,
            timestamp: chrono::Utc::now(),
            payload: serde_json::json!({
                "code": 400,
                "message": "malformed JSON"
            }),
        };
    };

    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload.clone()) else {
        return WsMessage {
            id: msg.id,
            msg_type: WsMessageType::Error,
            timestamp: chrono::Utc::now(),
            payload: serde_json::json!({
                "code": 404,
                "message": "unknown command"
            }),
        };
    };

    match command {
        WsCommand::SetLanguage { lang } => {
            session.switch_language(lang).await;
        }
        WsCommand::SetAudio { enabled } => {
            session.set_audio_enabled(enabled);
        }
        WsCommand::SetCaptions { enabled } => {
            session.set_captions_enabled(enabled);
        }
    }

    WsMessage {
        id: msg.id,
        msg_type: WsMessageType::Response,
        timestamp: chrono::Utc::now(),
        payload: serde_json::json!({
            "lang": session.language(),
            "audio_enabled": session.audio_enabled(),
            "captions_enabled": session.captions_enabled(),
        }),
    }
}
