use super::AppState;
use crate::error::{GameError, GameResult};
use crate::geo::validate_coordinates;
use crate::types::*;

impl AppState {
    /// Store a player's latest GPS fix for a room and broadcast it
    pub async fn update_player_position(
        &self,
        player_id: &str,
        room_id: &str,
        latitude: f64,
        longitude: f64,
        accuracy: Option<f64>,
    ) -> GameResult<PlayerPosition> {
        validate_coordinates(latitude, longitude)?;
        if accuracy.is_some_and(|a| !a.is_finite() || a < 0.0) {
            return Err(GameError::InvalidInput(
                "Accuracy must be a non-negative number".to_string(),
            ));
        }

        let room = self.get_room(room_id).await?;
        if !room.players.iter().any(|p| p == player_id) {
            return Err(GameError::NotInRoom);
        }

        let position = PlayerPosition {
            player_id: player_id.to_string(),
            room_id: room_id.to_string(),
            latitude,
            longitude,
            accuracy,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        self.positions.write().await.insert(
            (player_id.to_string(), room_id.to_string()),
            position.clone(),
        );

        tracing::debug!(
            "Position for {} in room {}: {:.5}, {:.5}",
            player_id,
            room.code,
            latitude,
            longitude
        );
        self.emit(
            GameEventKind::PositionUpdate,
            room_id,
            Some(player_id),
            serde_json::json!({
                "latitude": latitude,
                "longitude": longitude,
                "accuracy": accuracy,
            }),
        )
        .await;

        Ok(position)
    }

    pub async fn get_player_position(&self, player_id: &str, room_id: &str) -> Option<PlayerPosition> {
        self.positions
            .read()
            .await
            .get(&(player_id.to_string(), room_id.to_string()))
            .cloned()
    }

    /// Latest positions of everyone in a room
    pub async fn get_room_player_positions(&self, room_id: &str) -> Vec<PlayerPosition> {
        let mut positions: Vec<PlayerPosition> = self
            .positions
            .read()
            .await
            .values()
            .filter(|p| p.room_id == room_id)
            .cloned()
            .collect();
        positions.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::*;

    #[tokio::test]
    async fn test_update_and_get_position() {
        let state = AppState::new();
        let alice = player(&state, "Alice").await;
        let (room, _) = active_room(&state, &[&alice]).await;

        state
            .update_player_position(&alice.id, &room.id, 37.79, -122.39, Some(8.0))
            .await
            .unwrap();
        let pos = state
            .update_player_position(&alice.id, &room.id, 37.80, -122.40, None)
            .await
            .unwrap();

        let stored = state.get_player_position(&alice.id, &room.id).await.unwrap();
        assert_eq!(stored, pos);
        assert_eq!(stored.latitude, 37.80);
        assert!(state.get_player_position(&alice.id, "other").await.is_none());
    }

    #[tokio::test]
    async fn test_room_positions() {
        let state = AppState::new();
        let alice = player(&state, "Alice").await;
        let bob = player(&state, "Bob").await;
        let (room, _) = active_room(&state, &[&alice, &bob]).await;

        state
            .update_player_position(&alice.id, &room.id, 1.0, 1.0, None)
            .await
            .unwrap();
        state
            .update_player_position(&bob.id, &room.id, 2.0, 2.0, None)
            .await
            .unwrap();

        assert_eq!(state.get_room_player_positions(&room.id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_position_validation() {
        let state = AppState::new();
        let alice = player(&state, "Alice").await;
        let outsider = player(&state, "Outsider").await;
        let (room, _) = active_room(&state, &[&alice]).await;

        assert!(matches!(
            state
                .update_player_position(&alice.id, &room.id, 91.0, 0.0, None)
                .await,
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            state
                .update_player_position(&alice.id, &room.id, 0.0, 0.0, Some(-1.0))
                .await,
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            state
                .update_player_position(&outsider.id, &room.id, 0.0, 0.0, None)
                .await,
            Err(GameError::NotInRoom)
        ));
        assert!(matches!(
            state
                .update_player_position(&alice.id, "missing", 0.0, 0.0, None)
                .await,
            Err(GameError::RoomNotFound)
        ));
    }

    #[tokio::test]
    async fn test_position_update_broadcast() {
        let state = AppState::new();
        let alice = player(&state, "Alice").await;
        let (room, _) = active_room(&state, &[&alice]).await;
        let mut rx = state.events.subscribe();

        state
            .update_player_position(&alice.id, &room.id, 10.0, 20.0, None)
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, GameEventKind::PositionUpdate);
        assert_eq!(event.data["latitude"], 10.0);
    }
}
