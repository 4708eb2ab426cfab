use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::{AdminUser, AuthUser};
use crate::error::{GameError, GameResult};
use crate::state::{AppState, CheckpointInput, RouteInput};
use crate::types::{Checkpoint, Route, User, UserRole};

/// Players see challenges without their answers
pub(crate) fn route_view(mut route: Route, viewer: &User) -> Route {
    if viewer.role != UserRole::Admin {
        for checkpoint in &mut route.checkpoints {
            checkpoint.challenge = checkpoint.challenge.redacted();
        }
    }
    route
}

/// GET /api/routes
pub async fn list_routes(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Json<Vec<Route>> {
    let routes = state
        .get_all_routes()
        .await
        .into_iter()
        .map(|r| route_view(r, &user))
        .collect();
    Json(routes)
}

/// GET /api/routes/mine
pub async fn my_routes(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
) -> Json<Vec<Route>> {
    Json(state.get_routes_by_user(&admin.id).await)
}

/// GET /api/routes/{id}
///
/// Inactive routes are only visible to admins.
pub async fn get_route(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> GameResult<Json<Route>> {
    let route = state.get_route(&id).await?;
    if !route.is_active && user.role != UserRole::Admin {
        return Err(GameError::RouteNotFound);
    }
    Ok(Json(route_view(route, &user)))
}

/// POST /api/routes
pub async fn create_route(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(input): Json<RouteInput>,
) -> GameResult<Json<Route>> {
    Ok(Json(state.create_route(input, &admin.id).await?))
}

/// POST /api/routes/{id}/checkpoints
pub async fn create_checkpoint(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(input): Json<CheckpointInput>,
) -> GameResult<Json<Checkpoint>> {
    Ok(Json(state.create_checkpoint(&id, input).await?))
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// POST /api/routes/{id}/active
pub async fn set_active(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<SetActiveRequest>,
) -> GameResult<Json<Route>> {
    Ok(Json(state.set_route_active(&id, req.is_active).await?))
}
