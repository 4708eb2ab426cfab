use serde::Deserialize;

use super::AppState;
use crate::error::{GameError, GameResult};
use crate::geo;
use crate::photo;
use crate::types::*;
use crate::validation::{calculate_score, generate_feedback, validate_submission};

/// Answers faster than this earn a time bonus
const QUICK_BONUS_SECS: u64 = 30;
const QUICK_BONUS_RATIO: f64 = 0.1;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionInput {
    pub checkpoint_id: CheckpointId,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Seconds the player spent on the challenge, as measured by the client
    #[serde(default)]
    pub elapsed_seconds: Option<u64>,
}

fn seconds_since(started_at: Option<&str>) -> u64 {
    started_at
        .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
        .map(|start| {
            let elapsed = chrono::Utc::now().signed_duration_since(start);
            elapsed.num_seconds().max(0) as u64
        })
        .unwrap_or(0)
}

fn newest_first(submissions: &mut [Submission]) {
    submissions.sort_by(|a, b| {
        b.submitted_at
            .cmp(&a.submitted_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

impl AppState {
    /// Validate and score a player's attempt at a checkpoint
    pub async fn submit_answer(
        &self,
        room_id: &str,
        player_id: &str,
        input: SubmissionInput,
    ) -> GameResult<Submission> {
        let room = self.get_room(room_id).await?;
        if room.status != RoomStatus::Active {
            return Err(GameError::WrongRoomStatus(room.status, RoomStatus::Active));
        }
        if !room.players.iter().any(|p| p == player_id) {
            return Err(GameError::NotInRoom);
        }

        let checkpoint = self.get_checkpoint(&input.checkpoint_id).await?;
        if checkpoint.route_id != room.route_id {
            return Err(GameError::CheckpointNotInRoute);
        }

        if let Some(url) = input.photo_url.as_deref().filter(|u| !u.trim().is_empty()) {
            photo::validate_photo_url(url)?;
        }

        if self.config.enforce_proximity {
            let position = self
                .get_player_position(player_id, room_id)
                .await
                .ok_or(GameError::PositionUnknown)?;
            let radius_m = self.config.unlock_radius_m;
            if !geo::is_near(
                position.latitude,
                position.longitude,
                checkpoint.latitude,
                checkpoint.longitude,
                radius_m,
            ) {
                let distance_m = geo::distance_m(
                    position.latitude,
                    position.longitude,
                    checkpoint.latitude,
                    checkpoint.longitude,
                );
                return Err(GameError::TooFar {
                    distance_m,
                    radius_m,
                });
            }
        }

        let result = validate_submission(
            &checkpoint.challenge,
            input.answer.as_deref(),
            input.photo_url.as_deref(),
        );

        let seconds_taken = input
            .elapsed_seconds
            .unwrap_or_else(|| seconds_since(room.started_at.as_deref()));
        let time_bonus = if seconds_taken < QUICK_BONUS_SECS {
            f64::from(checkpoint.points) * QUICK_BONUS_RATIO
        } else {
            0.0
        };

        let submission = Submission {
            id: ulid::Ulid::new().to_string(),
            room_id: room_id.to_string(),
            player_id: player_id.to_string(),
            checkpoint_id: checkpoint.id.clone(),
            answer: input.answer,
            photo_url: input.photo_url,
            is_correct: result.is_correct,
            points: calculate_score(checkpoint.points, &result, time_bonus),
            feedback: generate_feedback(&result, seconds_taken),
            submitted_at: chrono::Utc::now().to_rfc3339(),
        };

        {
            // Lock order: rooms, then submissions. Holding the room read lock
            // keeps complete_room from landing between the check and the insert.
            let rooms = self.rooms.read().await;
            let current = rooms.get(room_id).ok_or(GameError::RoomNotFound)?;
            if current.status != RoomStatus::Active {
                return Err(GameError::WrongRoomStatus(current.status, RoomStatus::Active));
            }
            if !current.players.iter().any(|p| p == player_id) {
                return Err(GameError::NotInRoom);
            }

            // One attempt per checkpoint
            let mut submissions = self.submissions.write().await;
            let previous = submissions.values().find(|s| {
                s.room_id == room_id && s.player_id == player_id && s.checkpoint_id == checkpoint.id
            });
            match previous {
                Some(s) if s.is_correct => return Err(GameError::AlreadyCompleted),
                Some(_) => return Err(GameError::AlreadySubmitted),
                None => {}
            }
            submissions.insert(submission.id.clone(), submission.clone());
        }

        tracing::info!(
            "Player {} submitted at '{}' in room {}: correct={} points={}",
            player_id,
            checkpoint.name,
            room.code,
            submission.is_correct,
            submission.points
        );

        self.emit(
            GameEventKind::CheckpointReached,
            room_id,
            Some(player_id),
            serde_json::json!({
                "checkpoint_id": checkpoint.id,
                "checkpoint_name": checkpoint.name,
            }),
        )
        .await;
        if submission.is_correct {
            self.emit(
                GameEventKind::ChallengeCompleted,
                room_id,
                Some(player_id),
                serde_json::json!({
                    "checkpoint_id": checkpoint.id,
                    "challenge_type": checkpoint.challenge.kind().as_str(),
                    "points": submission.points,
                }),
            )
            .await;
        }

        Ok(submission)
    }

    /// All submissions in a room, newest first
    pub async fn get_submissions_by_room(&self, room_id: &str) -> Vec<Submission> {
        let mut list: Vec<Submission> = self
            .submissions
            .read()
            .await
            .values()
            .filter(|s| s.room_id == room_id)
            .cloned()
            .collect();
        newest_first(&mut list);
        list
    }

    /// All submissions by a player across rooms, newest first
    pub async fn get_submissions_by_player(&self, player_id: &str) -> Vec<Submission> {
        let mut list: Vec<Submission> = self
            .submissions
            .read()
            .await
            .values()
            .filter(|s| s.player_id == player_id)
            .cloned()
            .collect();
        newest_first(&mut list);
        list
    }
}
