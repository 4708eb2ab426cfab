pub mod export;
mod monitor;
mod position;
mod room;
mod route;
mod score;
mod session;
mod submission;
mod user;

pub use monitor::{AdminDashboard, RoomStats, RoomStatsEntry};
pub use room::{generate_room_code, MAX_PLAYERS_LIMIT};
pub use route::{CheckpointInput, RouteInput};
pub use score::{
    calculate_bonus_points, difficulty_multiplier, generate_score_breakdown, GameStats,
    PlayerScore, RoomResults, ScoreBreakdown,
};
pub(crate) use session::hash_token;
pub use session::Session;
pub use submission::SubmissionInput;

use crate::llm::LlmManager;
use crate::types::*;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// How many events the admin dashboard keeps
pub const RECENT_EVENTS_CAPACITY: usize = 50;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<RwLock<HashMap<UserId, User>>>,
    pub routes: Arc<RwLock<HashMap<RouteId, Route>>>,
    pub checkpoints: Arc<RwLock<HashMap<CheckpointId, Checkpoint>>>,
    pub rooms: Arc<RwLock<HashMap<RoomId, Room>>>,
    pub submissions: Arc<RwLock<HashMap<SubmissionId, Submission>>>,
    /// Last known position per (player, room)
    pub positions: Arc<RwLock<HashMap<(UserId, RoomId), PlayerPosition>>>,
    /// SHA-256 hex of session token -> user
    pub sessions: Arc<RwLock<HashMap<String, UserId>>>,
    pub recent_events: Arc<RwLock<VecDeque<GameEvent>>>,
    /// Game events for all rooms; subscribers filter by room
    pub events: broadcast::Sender<GameEvent>,
    /// Periodic room stats for websocket clients
    pub stats_broadcast: broadcast::Sender<RoomStats>,
    pub config: GameConfig,
    pub llm: Option<Arc<LlmManager>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(GameConfig::default(), None)
    }

    pub fn with_config(config: GameConfig, llm: Option<LlmManager>) -> Self {
        let (events, _rx) = broadcast::channel(256);
        let (stats_broadcast, _rx) = broadcast::channel(64);
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            routes: Arc::new(RwLock::new(HashMap::new())),
            checkpoints: Arc::new(RwLock::new(HashMap::new())),
            rooms: Arc::new(RwLock::new(HashMap::new())),
            submissions: Arc::new(RwLock::new(HashMap::new())),
            positions: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            recent_events: Arc::new(RwLock::new(VecDeque::with_capacity(
                RECENT_EVENTS_CAPACITY,
            ))),
            events,
            stats_broadcast,
            config,
            llm: llm.map(Arc::new),
        }
    }

    /// Record an event for the dashboard and fan it out to subscribers
    pub(crate) async fn emit(
        &self,
        kind: GameEventKind,
        room_id: &str,
        player_id: Option<&str>,
        data: serde_json::Value,
    ) {
        let event = GameEvent {
            kind,
            room_id: room_id.to_string(),
            player_id: player_id.map(str::to_string),
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        if kind != GameEventKind::PositionUpdate {
            let mut recent = self.recent_events.write().await;
            if recent.len() == RECENT_EVENTS_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(event.clone());
        }

        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by the state tests

    use super::*;

    pub async fn admin(state: &AppState) -> User {
        state
            .create_user("Ada", "ada@example.com", UserRole::Admin)
            .await
            .unwrap()
    }

    pub async fn player(state: &AppState, name: &str) -> User {
        state
            .create_user(name, &format!("{}@example.com", name.to_lowercase()), UserRole::Player)
            .await
            .unwrap()
    }

    pub fn route_input(name: &str) -> RouteInput {
        RouteInput {
            name: name.to_string(),
            description: "Harbour walk".to_string(),
            city: "San Francisco".to_string(),
            theme: "history".to_string(),
            duration_minutes: 60,
            difficulty: Difficulty::Medium,
            is_active: true,
        }
    }

    pub fn trivia_checkpoint(order: u32, answer: &str, points: u32) -> CheckpointInput {
        CheckpointInput {
            name: format!("Stop {}", order),
            description: "A stop".to_string(),
            latitude: 37.7955 + f64::from(order) * 0.001,
            longitude: -122.3937,
            order_index: Some(order),
            points,
            challenge: Challenge::Trivia {
                question: "Question?".to_string(),
                answer: answer.to_string(),
                options: vec![],
                hint: None,
            },
        }
    }

    /// Route with two trivia checkpoints (answers "one"/"two", 10/20 points)
    pub async fn route_with_checkpoints(state: &AppState, admin: &User) -> Route {
        let route = state
            .create_route(route_input("Harbour"), &admin.id)
            .await
            .unwrap();
        state
            .create_checkpoint(&route.id, trivia_checkpoint(0, "one", 10))
            .await
            .unwrap();
        state
            .create_checkpoint(&route.id, trivia_checkpoint(1, "two", 20))
            .await
            .unwrap();
        state.get_route(&route.id).await.unwrap()
    }

    /// Active room on a two-checkpoint route with the given players joined
    pub async fn active_room(state: &AppState, players: &[&User]) -> (Room, Route) {
        let admin = admin(state).await;
        let route = route_with_checkpoints(state, &admin).await;
        let room = state.create_room(&route.id, &admin.id, None).await.unwrap();
        for p in players {
            state.add_player_to_room(&room.id, &p.id).await.unwrap();
        }
        let room = state.start_room(&room.id).await.unwrap();
        (room, route)
    }

    pub fn answer(checkpoint_id: &str, answer: &str) -> SubmissionInput {
        SubmissionInput {
            checkpoint_id: checkpoint_id.to_string(),
            answer: Some(answer.to_string()),
            photo_url: None,
            elapsed_seconds: None,
        }
    }
}
