//! Domain errors and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::llm::LlmError;
use crate::types::RoomStatus;

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("User with this email already exists")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,

    #[error("Route not found")]
    RouteNotFound,

    #[error("Route is not active")]
    RouteInactive,

    #[error("Checkpoint not found")]
    CheckpointNotFound,

    #[error("Checkpoint does not belong to this room's route")]
    CheckpointNotInRoute,

    #[error("Room not found")]
    RoomNotFound,

    #[error("Failed to generate unique room code")]
    RoomCodeExhausted,

    #[error("This room is not accepting new players")]
    RoomNotJoinable,

    #[error("This room is full")]
    RoomFull,

    #[error("Player is not in this room")]
    NotInRoom,

    #[error("Room is {0:?}, expected {1:?}")]
    WrongRoomStatus(RoomStatus, RoomStatus),

    #[error("Invalid room transition from {0:?} to {1:?}")]
    InvalidTransition(RoomStatus, RoomStatus),

    #[error("Room has no players")]
    NoPlayers,

    #[error("Checkpoint already completed")]
    AlreadyCompleted,

    #[error("Checkpoint already attempted")]
    AlreadySubmitted,

    #[error("You need to get closer to this checkpoint ({distance_m:.0} m away, must be within {radius_m:.0} m)")]
    TooFar { distance_m: f64, radius_m: f64 },

    #[error("No position reported yet for this room")]
    PositionUnknown,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Admin access required")]
    Forbidden,

    #[error("AI generation is not configured")]
    AiUnavailable,

    #[error("AI generation failed: {0}")]
    Ai(#[from] LlmError),

    #[error("State snapshot error: {0}")]
    Snapshot(String),
}

impl GameError {
    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidInput(_) => "INVALID_INPUT",
            GameError::EmailTaken => "EMAIL_TAKEN",
            GameError::UserNotFound => "USER_NOT_FOUND",
            GameError::RouteNotFound => "ROUTE_NOT_FOUND",
            GameError::RouteInactive => "ROUTE_INACTIVE",
            GameError::CheckpointNotFound => "CHECKPOINT_NOT_FOUND",
            GameError::CheckpointNotInRoute => "CHECKPOINT_NOT_IN_ROUTE",
            GameError::RoomNotFound => "ROOM_NOT_FOUND",
            GameError::RoomCodeExhausted => "ROOM_CODE_EXHAUSTED",
            GameError::RoomNotJoinable => "ROOM_NOT_JOINABLE",
            GameError::RoomFull => "ROOM_FULL",
            GameError::NotInRoom => "NOT_IN_ROOM",
            GameError::WrongRoomStatus(..) => "WRONG_ROOM_STATUS",
            GameError::InvalidTransition(..) => "INVALID_TRANSITION",
            GameError::NoPlayers => "NO_PLAYERS",
            GameError::AlreadyCompleted => "ALREADY_COMPLETED",
            GameError::AlreadySubmitted => "ALREADY_SUBMITTED",
            GameError::TooFar { .. } => "TOO_FAR",
            GameError::PositionUnknown => "POSITION_UNKNOWN",
            GameError::Unauthenticated => "UNAUTHENTICATED",
            GameError::Forbidden => "FORBIDDEN",
            GameError::AiUnavailable => "AI_UNAVAILABLE",
            GameError::Ai(_) => "AI_FAILED",
            GameError::Snapshot(_) => "SNAPSHOT_INVALID",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GameError::InvalidInput(_) | GameError::Snapshot(_) => StatusCode::BAD_REQUEST,
            GameError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GameError::Forbidden | GameError::NotInRoom => StatusCode::FORBIDDEN,
            GameError::UserNotFound
            | GameError::RouteNotFound
            | GameError::CheckpointNotFound
            | GameError::RoomNotFound => StatusCode::NOT_FOUND,
            GameError::AiUnavailable | GameError::RoomCodeExhausted => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GameError::Ai(_) => StatusCode::BAD_GATEWAY,
            GameError::EmailTaken
            | GameError::RouteInactive
            | GameError::CheckpointNotInRoute
            | GameError::RoomNotJoinable
            | GameError::RoomFull
            | GameError::WrongRoomStatus(..)
            | GameError::InvalidTransition(..)
            | GameError::NoPlayers
            | GameError::AlreadyCompleted
            | GameError::AlreadySubmitted
            | GameError::TooFar { .. }
            | GameError::PositionUnknown => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        } else {
            tracing::debug!(code = self.code(), "{}", self);
        }

        (status, Json(json!({ "code": self.code(), "msg": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GameError::RoomNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(GameError::RoomFull.status(), StatusCode::CONFLICT);
        assert_eq!(GameError::AlreadySubmitted.status(), StatusCode::CONFLICT);
        assert_eq!(GameError::AlreadySubmitted.code(), "ALREADY_SUBMITTED");
        assert_eq!(GameError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GameError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            GameError::InvalidInput("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GameError::AiUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_messages_match_client_copy() {
        assert_eq!(
            GameError::EmailTaken.to_string(),
            "User with this email already exists"
        );
        assert_eq!(
            GameError::RoomNotJoinable.to_string(),
            "This room is not accepting new players"
        );
        let too_far = GameError::TooFar {
            distance_m: 412.4,
            radius_m: 100.0,
        };
        assert!(too_far.to_string().contains("412 m away"));
    }
}
