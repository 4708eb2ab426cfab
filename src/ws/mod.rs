pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::error::{GameError, GameResult};
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;
use crate::types::{RoomId, User, UserRole};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub room: RoomId,
    pub token: String,
}

/// WebSocket upgrade handler
///
/// Players must be members of the room; admins may watch any room.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> GameResult<impl IntoResponse> {
    let user = state
        .user_for_token(&params.token)
        .await
        .ok_or(GameError::Unauthenticated)?;
    let room = state.get_room(&params.room).await?;
    if user.role != UserRole::Admin && !room.players.contains(&user.id) {
        return Err(GameError::NotInRoom);
    }

    tracing::info!(user_id = %user.id, room_id = %room.id, "WebSocket connection request");

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user, room.id, state)))
}

async fn send_json(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, user: User, room_id: RoomId, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the welcome so nothing emitted in between is lost
    let mut events_rx = state.events.subscribe();
    let mut stats_rx = state.stats_broadcast.subscribe();

    let welcome = match (state.get_room(&room_id).await, state.get_room_stats(&room_id).await) {
        (Ok(room), Ok(stats)) => ServerMessage::Welcome {
            protocol: PROTOCOL_VERSION.to_string(),
            player_id: user.id.clone(),
            room,
            stats,
            server_now: chrono::Utc::now().to_rfc3339(),
        },
        (Err(e), _) | (_, Err(e)) => {
            let _ = send_json(&mut sender, &ServerMessage::from(&e)).await;
            return;
        }
    };

    if !send_json(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    loop {
        tokio::select! {
            event = events_rx.recv() => {
                match event {
                    Ok(event) if event.room_id == room_id => {
                        if !send_json(&mut sender, &ServerMessage::Event { event }).await {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(room_id = %room_id, skipped, "WebSocket client lagging behind events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            stats = stats_rx.recv() => {
                match stats {
                    Ok(stats) if stats.room_id == room_id => {
                        if !send_json(&mut sender, &ServerMessage::RoomStats { stats }).await {
                            break;
                        }
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(client_msg, &user, &room_id, &state).await
                            }
                            Err(e) => {
                                tracing::debug!("Failed to parse client message: {}", e);
                                Some(ServerMessage::error(
                                    "PARSE_ERROR",
                                    format!("Invalid message format: {}", e),
                                ))
                            }
                        };
                        if let Some(response) = response {
                            if !send_json(&mut sender, &response).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!(user_id = %user.id, room_id = %room_id, "WebSocket connection closed");
}
