use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::AdminUser;
use crate::error::{GameError, GameResult};
use crate::generator::{self, GeneratedRoute, RouteRequest};
use crate::llm::LlmManager;
use crate::state::AppState;
use crate::types::{Challenge, ChallengeKind, Route};

fn llm(state: &AppState) -> GameResult<&LlmManager> {
    state.llm.as_deref().ok_or(GameError::AiUnavailable)
}

#[derive(Debug, Deserialize)]
pub struct GenerateRouteRequest {
    #[serde(flatten)]
    pub request: RouteRequest,
    /// Store the draft as a route right away
    #[serde(default)]
    pub import: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerateRouteResponse {
    pub generated: GeneratedRoute,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
}

/// POST /api/ai/route
pub async fn generate_route(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<GenerateRouteRequest>,
) -> GameResult<Json<GenerateRouteResponse>> {
    let generated = generator::generate_route(llm(&state)?, &req.request).await?;
    tracing::info!(
        city = %req.request.city,
        checkpoints = generated.checkpoints.len(),
        "Generated route draft"
    );

    let route = if req.import {
        Some(
            state
                .import_generated_route(generated.clone(), &req.request, &admin.id)
                .await?,
        )
    } else {
        None
    };
    Ok(Json(GenerateRouteResponse { generated, route }))
}

#[derive(Debug, Deserialize)]
pub struct GenerateChallengeRequest {
    pub location: String,
    #[serde(default)]
    pub theme: String,
    pub kind: ChallengeKind,
    #[serde(default)]
    pub model: Option<String>,
}

/// POST /api/ai/challenge
pub async fn generate_challenge(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Json(req): Json<GenerateChallengeRequest>,
) -> GameResult<Json<Challenge>> {
    let challenge = generator::generate_challenge(
        llm(&state)?,
        &req.location,
        &req.theme,
        req.kind,
        req.model.as_deref(),
    )
    .await?;
    Ok(Json(challenge))
}
