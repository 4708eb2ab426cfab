//! WebSocket message dispatch

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::User;
use std::sync::Arc;

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    user: &User,
    room_id: &str,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::UpdatePosition {
            latitude,
            longitude,
            accuracy,
        } => {
            match state
                .update_player_position(&user.id, room_id, latitude, longitude, accuracy)
                .await
            {
                Ok(position) => Some(ServerMessage::PositionAccepted { position }),
                Err(e) => {
                    tracing::debug!(player_id = %user.id, room_id, "Position rejected: {}", e);
                    Some(ServerMessage::from(&e))
                }
            }
        }

        ClientMessage::Ping => Some(ServerMessage::Pong {
            server_now: chrono::Utc::now().to_rfc3339(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserRole;

    async fn setup() -> (Arc<AppState>, User, String) {
        let state = Arc::new(AppState::new());
        let admin = state
            .create_user("Ada", "ada@example.com", UserRole::Admin)
            .await
            .unwrap();
        let player = state
            .create_user("Grace", "grace@example.com", UserRole::Player)
            .await
            .unwrap();
        let route = state
            .create_route(crate::state::test_support::route_input("Walk"), &admin.id)
            .await
            .unwrap();
        let room = state.create_room(&route.id, &admin.id, None).await.unwrap();
        state.add_player_to_room(&room.id, &player.id).await.unwrap();
        (state, player, room.id)
    }

    #[tokio::test]
    async fn test_update_position_is_stored() {
        let (state, player, room_id) = setup().await;

        let msg = ClientMessage::UpdatePosition {
            latitude: 37.8,
            longitude: -122.4,
            accuracy: Some(5.0),
        };
        let response = handle_message(msg, &player, &room_id, &state).await;
        assert!(matches!(
            response,
            Some(ServerMessage::PositionAccepted { .. })
        ));

        let stored = state.get_player_position(&player.id, &room_id).await.unwrap();
        assert_eq!(stored.latitude, 37.8);
    }

    #[tokio::test]
    async fn test_invalid_position_returns_error() {
        let (state, player, room_id) = setup().await;

        let msg = ClientMessage::UpdatePosition {
            latitude: 120.0,
            longitude: 0.0,
            accuracy: None,
        };
        match handle_message(msg, &player, &room_id, &state).await {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "INVALID_INPUT"),
            other => panic!("Expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ping() {
        let (state, player, room_id) = setup().await;
        let response = handle_message(ClientMessage::Ping, &player, &room_id, &state).await;
        assert!(matches!(response, Some(ServerMessage::Pong { .. })));
    }
}
