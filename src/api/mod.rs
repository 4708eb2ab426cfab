//! HTTP API
//!
//! JSON endpoints under `/api`, the room WebSocket at `/ws` and `/health`.
//! Failures are answered as `{"code": ..., "msg": ...}` via [`GameError`].
//!
//! [`GameError`]: crate::error::GameError

mod account;
mod admin;
mod ai;
mod rooms;
mod routes;

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::rate_limit::{rate_limit_middleware, RateLimitConfig};
use crate::state::AppState;
use crate::ws;

/// All routes, without the outer layers
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/auth/signup", post(account::sign_up))
        .route("/auth/signin", post(account::sign_in))
        .route("/auth/signout", post(account::sign_out))
        .route("/auth/me", get(account::me))
        .route("/auth/me/submissions", get(account::my_submissions))
        .route("/leaderboard", get(account::leaderboard))
        .route("/photos/check", post(account::check_photo))
        .route("/routes", get(routes::list_routes).post(routes::create_route))
        .route("/routes/mine", get(routes::my_routes))
        .route("/routes/{id}", get(routes::get_route))
        .route("/routes/{id}/checkpoints", post(routes::create_checkpoint))
        .route("/routes/{id}/active", post(routes::set_active))
        .route("/rooms", post(rooms::create_room))
        .route("/rooms/join", post(rooms::join_room))
        .route("/rooms/code/{code}", get(rooms::get_room_by_code))
        .route("/rooms/{id}", get(rooms::get_room))
        .route("/rooms/{id}/players", get(rooms::players))
        .route("/rooms/{id}/leave", post(rooms::leave_room))
        .route("/rooms/{id}/start", post(rooms::start_room))
        .route("/rooms/{id}/complete", post(rooms::complete_room))
        .route("/rooms/{id}/results", get(rooms::results))
        .route("/rooms/{id}/stats", get(rooms::stats))
        .route("/rooms/{id}/positions", get(rooms::positions))
        .route("/rooms/{id}/position", post(rooms::update_position))
        .route(
            "/rooms/{id}/submissions",
            get(rooms::list_submissions).post(rooms::submit),
        )
        .route("/ai/route", post(ai::generate_route))
        .route("/ai/challenge", post(ai::generate_challenge))
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/state/export", get(admin::export_state))
        .route("/admin/state/import", post(admin::import_state));

    Router::new()
        .nest("/api", api)
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health))
        .with_state(state)
}

/// Router with rate limiting, CORS and request tracing
pub fn app(state: Arc<AppState>, rate_limit: Arc<RateLimitConfig>) -> Router {
    router(state)
        .layer(middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
}

/// Span without the query string, which may carry a session token
fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path()
    )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
