use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::AppState;
use crate::error::GameResult;
use crate::types::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomStatsEntry {
    pub player_id: UserId,
    pub username: String,
    pub points: u32,
    pub completed_checkpoints: u32,
}

/// Live progress snapshot of a room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomStats {
    pub room_id: RoomId,
    pub status: RoomStatus,
    pub active_players: u32,
    pub completed_checkpoints: u32,
    pub total_checkpoints: u32,
    /// Percent of all player x checkpoint pairs solved
    pub game_progress: f64,
    pub leaderboard: Vec<RoomStatsEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub active_rooms: u32,
    /// Distinct players across active rooms
    pub total_players: u32,
    pub recent_events: Vec<GameEvent>,
}

impl AppState {
    pub async fn get_room_stats(&self, room_id: &str) -> GameResult<RoomStats> {
        let room = self.get_room(room_id).await?;
        let total_checkpoints = self.get_checkpoints_by_route(&room.route_id).await.len() as u32;

        // (points, solved checkpoints) per player
        let mut progress: HashMap<&str, (u32, HashSet<&str>)> = room
            .players
            .iter()
            .map(|p| (p.as_str(), (0, HashSet::new())))
            .collect();

        let submissions = self.submissions.read().await;
        for s in submissions
            .values()
            .filter(|s| s.room_id == room_id && s.is_correct)
        {
            if let Some((points, solved)) = progress.get_mut(s.player_id.as_str()) {
                if solved.insert(s.checkpoint_id.as_str()) {
                    *points += s.points;
                }
            }
        }

        let users = self.users.read().await;
        let mut leaderboard: Vec<RoomStatsEntry> = progress
            .into_iter()
            .map(|(player_id, (points, solved))| RoomStatsEntry {
                player_id: player_id.to_string(),
                username: users
                    .get(player_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
                points,
                completed_checkpoints: solved.len() as u32,
            })
            .collect();
        leaderboard.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| b.completed_checkpoints.cmp(&a.completed_checkpoints))
                .then_with(|| a.username.cmp(&b.username))
        });

        let completed_checkpoints: u32 = leaderboard.iter().map(|e| e.completed_checkpoints).sum();
        let possible = room.players.len() as u32 * total_checkpoints;
        let game_progress = if possible > 0 {
            (f64::from(completed_checkpoints) / f64::from(possible) * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        Ok(RoomStats {
            room_id: room.id,
            status: room.status,
            active_players: room.players.len() as u32,
            completed_checkpoints,
            total_checkpoints,
            game_progress,
            leaderboard,
        })
    }

    /// Ids of rooms currently being played
    pub async fn active_room_ids(&self) -> Vec<RoomId> {
        self.rooms
            .read()
            .await
            .values()
            .filter(|r| r.status == RoomStatus::Active)
            .map(|r| r.id.clone())
            .collect()
    }

    pub async fn get_admin_dashboard(&self) -> AdminDashboard {
        let (active_rooms, total_players) = {
            let rooms = self.rooms.read().await;
            let active: Vec<&Room> = rooms
                .values()
                .filter(|r| r.status == RoomStatus::Active)
                .collect();
            let players: HashSet<&str> = active
                .iter()
                .flat_map(|r| r.players.iter().map(String::as_str))
                .collect();
            (active.len() as u32, players.len() as u32)
        };

        // Newest first
        let recent_events = self
            .recent_events
            .read()
            .await
            .iter()
            .rev()
            .cloned()
            .collect();

        AdminDashboard {
            active_rooms,
            total_players,
            recent_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::*;

    #[tokio::test]
    async fn test_room_stats() {
        let state = AppState::new();
        let alice = player(&state, "Alice").await;
        let bob = player(&state, "Bob").await;
        let (room, route) = active_room(&state, &[&alice, &bob]).await;

        let mut input = answer(&route.checkpoints[0].id, "one");
        input.elapsed_seconds = Some(60);
        state.submit_answer(&room.id, &bob.id, input).await.unwrap();

        let stats = state.get_room_stats(&room.id).await.unwrap();
        assert_eq!(stats.active_players, 2);
        assert_eq!(stats.total_checkpoints, 2);
        assert_eq!(stats.completed_checkpoints, 1);
        assert_eq!(stats.game_progress, 25.0);
        assert_eq!(stats.leaderboard[0].username, "Bob");
        assert_eq!(stats.leaderboard[0].points, 10);
        assert_eq!(stats.leaderboard[1].points, 0);
    }

    #[tokio::test]
    async fn test_room_stats_empty_room() {
        let state = AppState::new();
        let admin = admin(&state).await;
        let route = route_with_checkpoints(&state, &admin).await;
        let room = state.create_room(&route.id, &admin.id, None).await.unwrap();

        let stats = state.get_room_stats(&room.id).await.unwrap();
        assert_eq!(stats.active_players, 0);
        assert_eq!(stats.game_progress, 0.0);
        assert!(stats.leaderboard.is_empty());
    }

    #[tokio::test]
    async fn test_admin_dashboard() {
        let state = AppState::new();
        let alice = player(&state, "Alice").await;
        let (room, _) = active_room(&state, &[&alice]).await;

        let dashboard = state.get_admin_dashboard().await;
        assert_eq!(dashboard.active_rooms, 1);
        assert_eq!(dashboard.total_players, 1);
        // joined, then started; newest first
        assert_eq!(dashboard.recent_events[0].kind, GameEventKind::GameStarted);
        assert_eq!(dashboard.recent_events[1].kind, GameEventKind::PlayerJoined);

        assert_eq!(state.active_room_ids().await, vec![room.id.clone()]);
        state.complete_room(&room.id).await.unwrap();
        assert_eq!(state.get_admin_dashboard().await.active_rooms, 0);
    }
}
