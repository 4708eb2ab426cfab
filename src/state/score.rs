use serde::Serialize;

use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::*;

#[derive(Debug, Clone, Serialize)]
pub struct PlayerScore {
    pub player_id: UserId,
    pub username: String,
    pub total_points: u32,
    pub completed_checkpoints: u32,
    pub total_checkpoints: u32,
    /// Percent of the route's checkpoints solved
    pub completion_rate: f64,
    /// Minutes from game start per solved checkpoint
    pub average_time_per_checkpoint: f64,
    /// Competition ranking: tied players share a rank
    pub rank: u32,
    pub submissions: Vec<Submission>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GameStats {
    pub average_completion_rate: f64,
    pub average_score: f64,
    pub fastest_completion: f64,
    pub most_points: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomResults {
    pub room_id: RoomId,
    pub route_id: RouteId,
    pub route_name: String,
    pub total_players: u32,
    pub game_duration_minutes: i64,
    pub total_possible_points: u32,
    pub player_scores: Vec<PlayerScore>,
    pub game_stats: GameStats,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreBreakdown {
    pub base_points: u32,
    pub time_bonus: f64,
    pub streak_bonus: f64,
    pub difficulty_bonus: f64,
    pub total_points: u32,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn parse_ts(ts: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    chrono::DateTime::parse_from_rfc3339(ts).ok()
}

fn minutes_between(start: Option<&str>, end: Option<&str>) -> Option<f64> {
    let start = parse_ts(start?)?;
    let end = parse_ts(end?)?;
    let secs = end.signed_duration_since(start).num_milliseconds().max(0) as f64 / 1000.0;
    Some(secs / 60.0)
}

/// Minutes from game start to the last solved checkpoint, per solved checkpoint
fn average_time_per_checkpoint(started_at: Option<&str>, correct: &[&Submission]) -> f64 {
    if correct.is_empty() {
        return 0.0;
    }
    let last = correct.iter().map(|s| s.submitted_at.as_str()).max();
    minutes_between(started_at, last)
        .map(|m| round2(m / correct.len() as f64))
        .unwrap_or(0.0)
}

/// Sort best first and assign competition ranks ("1, 2, 2, 4")
fn rank_players(scores: &mut [PlayerScore]) {
    scores.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| b.completed_checkpoints.cmp(&a.completed_checkpoints))
            .then_with(|| a.username.cmp(&b.username))
    });

    let mut previous: Option<u32> = None;
    let mut rank = 0;
    for (i, score) in scores.iter_mut().enumerate() {
        if previous != Some(score.total_points) {
            rank = i as u32 + 1;
            previous = Some(score.total_points);
        }
        score.rank = rank;
    }
}

fn calculate_game_stats(scores: &[PlayerScore]) -> GameStats {
    if scores.is_empty() {
        return GameStats {
            average_completion_rate: 0.0,
            average_score: 0.0,
            fastest_completion: 0.0,
            most_points: 0,
        };
    }

    let n = scores.len() as f64;
    let average_completion_rate = scores.iter().map(|s| s.completion_rate).sum::<f64>() / n;
    let average_score = scores.iter().map(|s| f64::from(s.total_points)).sum::<f64>() / n;

    // Players who solved nothing have no pace to compare
    let fastest_completion = scores
        .iter()
        .filter(|s| s.completed_checkpoints > 0)
        .map(|s| s.average_time_per_checkpoint)
        .fold(None, |min: Option<f64>, t| Some(min.map_or(t, |m| m.min(t))))
        .unwrap_or(0.0);

    GameStats {
        average_completion_rate: round2(average_completion_rate),
        average_score: round2(average_score),
        fastest_completion: round2(fastest_completion),
        most_points: scores.iter().map(|s| s.total_points).max().unwrap_or(0),
    }
}

/// Points after time, streak and difficulty bonuses
pub fn calculate_bonus_points(
    base_points: u32,
    time_bonus: bool,
    streak: u32,
    difficulty_multiplier: f64,
) -> u32 {
    let base = f64::from(base_points);
    let mut points = base;
    if time_bonus {
        points += base * 0.1;
    }

    // 5% per consecutive correct answer, max 50%
    let streak_multiplier = (1.0 + f64::from(streak) * 0.05).min(1.5);
    points *= streak_multiplier;
    points *= difficulty_multiplier;

    points.round() as u32
}

pub fn difficulty_multiplier(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Easy => 1.0,
        Difficulty::Medium => 1.25,
        Difficulty::Hard => 1.5,
    }
}

/// Display breakdown of a player's score; the bonus lines are estimates
pub fn generate_score_breakdown(score: &PlayerScore) -> ScoreBreakdown {
    let base_points: u32 = score
        .submissions
        .iter()
        .filter(|s| s.is_correct)
        .map(|s| s.points)
        .sum();
    let base = f64::from(base_points);

    ScoreBreakdown {
        base_points,
        time_bonus: round2(base * 0.1),
        streak_bonus: round2(base * 0.2),
        difficulty_bonus: round2(base * 0.15),
        total_points: score.total_points,
    }
}

impl AppState {
    /// Per-player scores and aggregate stats for a room
    pub async fn calculate_room_results(&self, room_id: &str) -> GameResult<RoomResults> {
        let room = self.get_room(room_id).await?;
        let route = self.get_route(&room.route_id).await?;
        let submissions = self.get_submissions_by_room(room_id).await;

        let total_checkpoints = route.checkpoints.len() as u32;
        let total_possible_points: u32 = route.checkpoints.iter().map(|c| c.points).sum();

        let mut player_scores = Vec::with_capacity(room.players.len());
        {
            let users = self.users.read().await;
            for player_id in &room.players {
                let Some(user) = users.get(player_id) else {
                    continue;
                };

                let player_submissions: Vec<Submission> = submissions
                    .iter()
                    .filter(|s| s.player_id == *player_id)
                    .cloned()
                    .collect();
                let correct: Vec<&Submission> =
                    player_submissions.iter().filter(|s| s.is_correct).collect();

                let completed_checkpoints = correct.len() as u32;
                let completion_rate = if total_checkpoints > 0 {
                    round2(f64::from(completed_checkpoints) / f64::from(total_checkpoints) * 100.0)
                } else {
                    0.0
                };

                player_scores.push(PlayerScore {
                    player_id: user.id.clone(),
                    username: user.username.clone(),
                    total_points: correct.iter().map(|s| s.points).sum(),
                    completed_checkpoints,
                    total_checkpoints,
                    completion_rate,
                    average_time_per_checkpoint: average_time_per_checkpoint(
                        room.started_at.as_deref(),
                        &correct,
                    ),
                    rank: 0,
                    submissions: player_submissions,
                });
            }
        }

        rank_players(&mut player_scores);
        let game_stats = calculate_game_stats(&player_scores);

        let game_duration_minutes =
            minutes_between(room.started_at.as_deref(), room.completed_at.as_deref())
                .map(|m| m.round() as i64)
                .unwrap_or(0);

        Ok(RoomResults {
            room_id: room.id,
            route_id: route.id,
            route_name: route.name,
            total_players: player_scores.len() as u32,
            game_duration_minutes,
            total_possible_points,
            player_scores,
            game_stats,
        })
    }

    /// Credit final points of a completed room to its players, once
    pub async fn apply_room_stats(&self, room_id: &str) -> GameResult<RoomResults> {
        let results = self.calculate_room_results(room_id).await?;

        {
            let mut rooms = self.rooms.write().await;
            let room = rooms.get_mut(room_id).ok_or(GameError::RoomNotFound)?;
            if room.status != RoomStatus::Completed {
                return Err(GameError::WrongRoomStatus(room.status, RoomStatus::Completed));
            }
            if room.stats_applied {
                return Ok(results);
            }
            room.stats_applied = true;
        }

        for score in &results.player_scores {
            if let Err(e) = self.update_user_stats(&score.player_id, score.total_points).await {
                tracing::warn!("Failed to update stats for {}: {}", score.player_id, e);
            }
        }

        tracing::info!(
            "Applied results of room {} to {} players",
            room_id,
            results.player_scores.len()
        );
        Ok(results)
    }
}
