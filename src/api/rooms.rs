use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::{AdminUser, AuthUser};
use crate::error::{GameError, GameResult};
use crate::state::{
    generate_score_breakdown, AppState, RoomResults, RoomStats, ScoreBreakdown, SubmissionInput,
};
use crate::types::*;

/// Members and admins may look into a room
fn ensure_can_view(room: &Room, user: &User) -> GameResult<()> {
    if user.role == UserRole::Admin || room.players.contains(&user.id) {
        Ok(())
    } else {
        Err(GameError::NotInRoom)
    }
}

async fn visible_room(state: &AppState, id: &str, user: &User) -> GameResult<Room> {
    let room = state.get_room(id).await?;
    ensure_can_view(&room, user)?;
    Ok(room)
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub route_id: RouteId,
    #[serde(default)]
    pub max_players: Option<u32>,
}

/// POST /api/rooms
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<CreateRoomRequest>,
) -> GameResult<Json<Room>> {
    let room = state
        .create_room(&req.route_id, &admin.id, req.max_players)
        .await?;
    Ok(Json(room))
}

/// GET /api/rooms/{id}
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> GameResult<Json<Room>> {
    Ok(Json(visible_room(&state, &id, &user).await?))
}

/// GET /api/rooms/code/{code}
///
/// Anyone signed in can look a room up by its code before joining.
pub async fn get_room_by_code(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(code): Path<String>,
) -> GameResult<Json<Room>> {
    Ok(Json(state.get_room_by_code(&code).await?))
}

/// GET /api/rooms/{id}/players
pub async fn players(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> GameResult<Json<Vec<User>>> {
    visible_room(&state, &id, &user).await?;
    Ok(Json(state.get_room_players(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub code: String,
}

/// POST /api/rooms/join
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<JoinRoomRequest>,
) -> GameResult<Json<Room>> {
    let room = state.get_room_by_code(&req.code).await?;
    Ok(Json(state.add_player_to_room(&room.id, &user.id).await?))
}

/// POST /api/rooms/{id}/leave
pub async fn leave_room(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> GameResult<Json<Value>> {
    let left = state.remove_player_from_room(&id, &user.id).await?;
    Ok(Json(json!({ "left": left })))
}

/// POST /api/rooms/{id}/start
pub async fn start_room(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> GameResult<Json<Room>> {
    Ok(Json(state.start_room(&id).await?))
}

/// POST /api/rooms/{id}/complete
pub async fn complete_room(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> GameResult<Json<RoomResults>> {
    Ok(Json(state.complete_room(&id).await?))
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    #[serde(flatten)]
    pub results: RoomResults,
    pub breakdowns: HashMap<UserId, ScoreBreakdown>,
}

/// GET /api/rooms/{id}/results
///
/// Players see scores for everyone but submissions only for themselves.
pub async fn results(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> GameResult<Json<ResultsResponse>> {
    visible_room(&state, &id, &user).await?;
    let mut results = state.calculate_room_results(&id).await?;
    let breakdowns = results
        .player_scores
        .iter()
        .map(|score| (score.player_id.clone(), generate_score_breakdown(score)))
        .collect();
    if user.role != UserRole::Admin {
        for score in &mut results.player_scores {
            if score.player_id != user.id {
                score.submissions.clear();
            }
        }
    }
    Ok(Json(ResultsResponse {
        results,
        breakdowns,
    }))
}

/// GET /api/rooms/{id}/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> GameResult<Json<RoomStats>> {
    visible_room(&state, &id, &user).await?;
    Ok(Json(state.get_room_stats(&id).await?))
}

/// GET /api/rooms/{id}/positions
pub async fn positions(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> GameResult<Json<Vec<PlayerPosition>>> {
    visible_room(&state, &id, &user).await?;
    Ok(Json(state.get_room_player_positions(&id).await))
}

#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

/// POST /api/rooms/{id}/position
pub async fn update_position(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<PositionRequest>,
) -> GameResult<Json<PlayerPosition>> {
    let position = state
        .update_player_position(&user.id, &id, req.latitude, req.longitude, req.accuracy)
        .await?;
    Ok(Json(position))
}

/// GET /api/rooms/{id}/submissions
///
/// Admins get every submission in the room, players only their own.
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> GameResult<Json<Vec<Submission>>> {
    visible_room(&state, &id, &user).await?;
    let mut submissions = state.get_submissions_by_room(&id).await;
    if user.role != UserRole::Admin {
        submissions.retain(|s| s.player_id == user.id);
    }
    Ok(Json(submissions))
}

/// POST /api/rooms/{id}/submissions
pub async fn submit(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<SubmissionInput>,
) -> GameResult<Json<Submission>> {
    Ok(Json(state.submit_answer(&id, &user.id, input).await?))
}
