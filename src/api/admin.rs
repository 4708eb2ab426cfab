use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::AdminUser;
use crate::error::GameResult;
use crate::state::export::StateExport;
use crate::state::{AdminDashboard, AppState};

/// GET /api/admin/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Json<AdminDashboard> {
    Json(state.get_admin_dashboard().await)
}

/// Export the entire store as JSON.
///
/// GET /api/admin/state/export
pub async fn export_state(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Json<StateExport> {
    Json(state.export_state().await)
}

/// Import a snapshot.
///
/// POST /api/admin/state/import
///
/// Replaces all current state with the imported data, including sessions.
pub async fn import_state(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(export): Json<StateExport>,
) -> GameResult<Json<Value>> {
    state.import_state(export).await?;
    tracing::warn!(admin_id = %admin.id, "State replaced from imported snapshot");
    Ok(Json(json!({ "imported": true })))
}
