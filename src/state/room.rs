use super::{AppState, RoomResults};
use crate::error::{GameError, GameResult};
use crate::types::*;
use rand::Rng;

/// Safe character set for room codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;
const MAX_CODE_ATTEMPTS: usize = 10;
pub const MAX_PLAYERS_LIMIT: u32 = 100;

/// Generate a random room code (6 characters)
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl AppState {
    /// Check if a room status transition is valid
    fn is_valid_room_transition(from: RoomStatus, to: RoomStatus) -> bool {
        use RoomStatus::*;
        matches!((from, to), (Waiting, Active) | (Active, Completed))
    }

    pub async fn create_room(
        &self,
        route_id: &str,
        created_by: &str,
        max_players: Option<u32>,
    ) -> GameResult<Room> {
        self.create_room_with(route_id, created_by, max_players, generate_room_code)
            .await
    }

    async fn create_room_with(
        &self,
        route_id: &str,
        created_by: &str,
        max_players: Option<u32>,
        next_code: impl Fn() -> String,
    ) -> GameResult<Room> {
        let route = self
            .routes
            .read()
            .await
            .get(route_id)
            .cloned()
            .ok_or(GameError::RouteNotFound)?;
        if !route.is_active {
            return Err(GameError::RouteInactive);
        }

        let max_players = max_players.unwrap_or(self.config.default_max_players);
        if !(1..=MAX_PLAYERS_LIMIT).contains(&max_players) {
            return Err(GameError::InvalidInput(format!(
                "max_players must be between 1 and {}",
                MAX_PLAYERS_LIMIT
            )));
        }

        // Hold the write lock so no concurrent create can take the same code
        let mut rooms = self.rooms.write().await;
        let code = (0..MAX_CODE_ATTEMPTS)
            .map(|_| next_code())
            .find(|code| !rooms.values().any(|r| r.code == *code))
            .ok_or(GameError::RoomCodeExhausted)?;

        let room = Room {
            id: ulid::Ulid::new().to_string(),
            route_id: route_id.to_string(),
            code,
            created_by: created_by.to_string(),
            status: RoomStatus::Waiting,
            max_players,
            created_at: chrono::Utc::now().to_rfc3339(),
            started_at: None,
            completed_at: None,
            players: Vec::new(),
            stats_applied: false,
        };
        rooms.insert(room.id.clone(), room.clone());

        tracing::info!(
            "Created room {} (code {}) for route '{}'",
            room.id,
            room.code,
            route.name
        );
        Ok(room)
    }

    pub async fn get_room(&self, id: &str) -> GameResult<Room> {
        self.rooms
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(GameError::RoomNotFound)
    }

    pub async fn get_room_by_code(&self, code: &str) -> GameResult<Room> {
        let code = normalize_code(code);
        self.rooms
            .read()
            .await
            .values()
            .find(|r| r.code == code)
            .cloned()
            .ok_or(GameError::RoomNotFound)
    }

    /// Join a waiting room. Joining twice is a no-op.
    pub async fn add_player_to_room(&self, room_id: &str, player_id: &str) -> GameResult<Room> {
        let player = self.get_user(player_id).await.ok_or(GameError::UserNotFound)?;

        let room = {
            let mut rooms = self.rooms.write().await;
            let room = rooms.get_mut(room_id).ok_or(GameError::RoomNotFound)?;

            if room.players.iter().any(|p| p == player_id) {
                return Ok(room.clone());
            }
            if room.status != RoomStatus::Waiting {
                return Err(GameError::RoomNotJoinable);
            }
            if room.players.len() >= room.max_players as usize {
                return Err(GameError::RoomFull);
            }

            room.players.push(player_id.to_string());
            room.clone()
        };

        tracing::info!("{} joined room {}", player.username, room.code);
        self.emit(
            GameEventKind::PlayerJoined,
            room_id,
            Some(player_id),
            serde_json::json!({ "username": player.username }),
        )
        .await;

        Ok(room)
    }

    /// Returns whether the player was in the room
    pub async fn remove_player_from_room(&self, room_id: &str, player_id: &str) -> GameResult<bool> {
        let removed = {
            let mut rooms = self.rooms.write().await;
            let room = rooms.get_mut(room_id).ok_or(GameError::RoomNotFound)?;
            // Results of a finished game keep every player who was credited
            if room.status == RoomStatus::Completed {
                return Err(GameError::WrongRoomStatus(room.status, RoomStatus::Active));
            }
            let before = room.players.len();
            room.players.retain(|p| p != player_id);
            room.players.len() != before
        };

        if removed {
            self.positions
                .write()
                .await
                .remove(&(player_id.to_string(), room_id.to_string()));
            tracing::info!("Player {} left room {}", player_id, room_id);
            self.emit(
                GameEventKind::PlayerLeft,
                room_id,
                Some(player_id),
                serde_json::Value::Null,
            )
            .await;
        }

        Ok(removed)
    }

    /// Users in the room, in join order
    pub async fn get_room_players(&self, room_id: &str) -> GameResult<Vec<User>> {
        let room = self.get_room(room_id).await?;
        let users = self.users.read().await;
        Ok(room
            .players
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect())
    }

    /// Move a room to a new status, checking the transition
    async fn transition_room(&self, id: &str, to: RoomStatus) -> GameResult<Room> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(id).ok_or(GameError::RoomNotFound)?;

        if !Self::is_valid_room_transition(room.status, to) {
            return Err(GameError::InvalidTransition(room.status, to));
        }
        if to == RoomStatus::Active && room.players.is_empty() {
            return Err(GameError::NoPlayers);
        }

        let now = chrono::Utc::now().to_rfc3339();
        match to {
            RoomStatus::Active => room.started_at = Some(now),
            RoomStatus::Completed => room.completed_at = Some(now),
            RoomStatus::Waiting => {}
        }
        tracing::info!("Room {} transition: {:?} -> {:?}", room.code, room.status, to);
        room.status = to;

        Ok(room.clone())
    }

    pub async fn start_room(&self, id: &str) -> GameResult<Room> {
        let room = self.transition_room(id, RoomStatus::Active).await?;
        self.emit(
            GameEventKind::GameStarted,
            id,
            None,
            serde_json::json!({ "players": room.players.len() }),
        )
        .await;
        Ok(room)
    }

    /// End the game and credit each player's points to their stats
    pub async fn complete_room(&self, id: &str) -> GameResult<RoomResults> {
        self.transition_room(id, RoomStatus::Completed).await?;

        let results = self.apply_room_stats(id).await?;
        let winner = results.player_scores.first().map(|s| s.username.clone());
        self.emit(
            GameEventKind::GameEnded,
            id,
            None,
            serde_json::json!({
                "winner": winner,
                "duration_minutes": results.game_duration_minutes,
            }),
        )
        .await;

        Ok(results)
    }
}
