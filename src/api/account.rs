use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{AuthUser, SessionToken};
use crate::error::GameResult;
use crate::photo;
use crate::state::{AppState, Session};
use crate::types::{LeaderboardEntry, Submission, User, UserRole};

const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const MAX_LEADERBOARD_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
}

/// POST /api/auth/signup
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignUpRequest>,
) -> GameResult<Json<Session>> {
    let session = state.sign_up(&req.email, &req.username, req.role).await?;
    Ok(Json(session))
}

/// POST /api/auth/signin
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> GameResult<Json<Session>> {
    Ok(Json(state.sign_in(&req.email).await?))
}

/// POST /api/auth/signout
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    SessionToken(token): SessionToken,
) -> Json<Value> {
    let signed_out = state.sign_out(&token).await;
    Json(json!({ "signed_out": signed_out }))
}

/// GET /api/auth/me
pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// GET /api/auth/me/submissions
pub async fn my_submissions(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Json<Vec<Submission>> {
    Json(state.get_submissions_by_player(&user.id).await)
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// GET /api/leaderboard?limit=
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Json<Vec<LeaderboardEntry>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);
    Json(state.get_leaderboard(limit).await)
}

#[derive(Debug, Deserialize)]
pub struct PhotoCheckRequest {
    pub content_type: String,
    pub size: u64,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PhotoCheckResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

const THUMBNAIL_SIZE: u32 = 200;

/// POST /api/photos/check
///
/// Lets clients vet a photo before uploading it to their store, and
/// resolves the thumbnail for an already stored one.
pub async fn check_photo(
    AuthUser(_user): AuthUser,
    Json(req): Json<PhotoCheckRequest>,
) -> GameResult<Json<PhotoCheckResponse>> {
    photo::validate_photo(&req.content_type, req.size)?;
    let thumbnail_url = match req.url.as_deref() {
        Some(url) => {
            photo::validate_photo_url(url)?;
            Some(photo::thumbnail_url(url, THUMBNAIL_SIZE, THUMBNAIL_SIZE))
        }
        None => None,
    };
    Ok(Json(PhotoCheckResponse {
        accepted: true,
        thumbnail_url,
    }))
}
