//! State export/import for backup and restart survival.
//!
//! A snapshot holds every stored collection. It is served over the admin API
//! and, when a data file is configured, written on shutdown and read back at
//! startup.

use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Schema version for export format compatibility
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

/// A serializable snapshot of the game store.
///
/// Excludes runtime-only components:
/// - Broadcast channels and the recent event ring
/// - Player positions (re-reported by clients)
/// - LlmManager (reconstructed from config)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateExport {
    pub schema_version: u32,
    /// Export timestamp (RFC 3339)
    pub exported_at: String,
    pub users: HashMap<UserId, User>,
    pub routes: HashMap<RouteId, Route>,
    pub checkpoints: HashMap<CheckpointId, Checkpoint>,
    pub rooms: HashMap<RoomId, Room>,
    pub submissions: HashMap<SubmissionId, Submission>,
    /// Token digest -> user
    #[serde(default)]
    pub sessions: HashMap<String, UserId>,
}

impl StateExport {
    /// Validate the export before import
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version > EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Export schema version {} is newer than supported version {}. \
                 Please update the server.",
                self.schema_version, EXPORT_SCHEMA_VERSION
            ));
        }

        for (id, cp) in &self.checkpoints {
            if !self.routes.contains_key(&cp.route_id) {
                return Err(format!(
                    "Checkpoint '{}' references route '{}' which doesn't exist",
                    id, cp.route_id
                ));
            }
        }

        for (id, room) in &self.rooms {
            if !self.routes.contains_key(&room.route_id) {
                return Err(format!(
                    "Room '{}' references route '{}' which doesn't exist",
                    id, room.route_id
                ));
            }
            if let Some(player) = room.players.iter().find(|p| !self.users.contains_key(*p)) {
                return Err(format!(
                    "Room '{}' references player '{}' which doesn't exist",
                    id, player
                ));
            }
        }

        for (id, sub) in &self.submissions {
            if !self.rooms.contains_key(&sub.room_id) {
                return Err(format!(
                    "Submission '{}' references room '{}' which doesn't exist",
                    id, sub.room_id
                ));
            }
            if !self.checkpoints.contains_key(&sub.checkpoint_id) {
                return Err(format!(
                    "Submission '{}' references checkpoint '{}' which doesn't exist",
                    id, sub.checkpoint_id
                ));
            }
        }

        for user_id in self.sessions.values() {
            if !self.users.contains_key(user_id) {
                return Err(format!("Session references unknown user '{}'", user_id));
            }
        }

        Ok(())
    }
}

impl AppState {
    pub async fn export_state(&self) -> StateExport {
        let mut routes = self.routes.read().await.clone();
        // Checkpoints live in their own collection
        for route in routes.values_mut() {
            route.checkpoints.clear();
        }

        StateExport {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            users: self.users.read().await.clone(),
            routes,
            checkpoints: self.checkpoints.read().await.clone(),
            rooms: self.rooms.read().await.clone(),
            submissions: self.submissions.read().await.clone(),
            sessions: self.sessions.read().await.clone(),
        }
    }

    /// Replace the whole store with a validated snapshot
    pub async fn import_state(&self, export: StateExport) -> GameResult<()> {
        export.validate().map_err(GameError::Snapshot)?;

        let counts = (
            export.users.len(),
            export.routes.len(),
            export.rooms.len(),
            export.submissions.len(),
        );

        *self.users.write().await = export.users;
        *self.routes.write().await = export.routes;
        *self.checkpoints.write().await = export.checkpoints;
        *self.rooms.write().await = export.rooms;
        *self.submissions.write().await = export.submissions;
        *self.sessions.write().await = export.sessions;
        self.positions.write().await.clear();
        self.recent_events.write().await.clear();

        tracing::info!(
            "Imported state: {} users, {} routes, {} rooms, {} submissions",
            counts.0,
            counts.1,
            counts.2,
            counts.3
        );
        Ok(())
    }

    pub async fn save_to_file(&self, path: &Path) -> GameResult<()> {
        let export = self.export_state().await;
        let json = serde_json::to_vec_pretty(&export)
            .map_err(|e| GameError::Snapshot(e.to_string()))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| GameError::Snapshot(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Saved state snapshot to {}", path.display());
        Ok(())
    }

    /// Restore from a snapshot file. A missing file is not an error.
    pub async fn load_from_file(&self, path: &Path) -> GameResult<bool> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(GameError::Snapshot(format!("{}: {}", path.display(), e))),
        };
        let export: StateExport =
            serde_json::from_slice(&bytes).map_err(|e| GameError::Snapshot(e.to_string()))?;
        self.import_state(export).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::*;

    fn empty_export() -> StateExport {
        StateExport {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            users: HashMap::new(),
            routes: HashMap::new(),
            checkpoints: HashMap::new(),
            rooms: HashMap::new(),
            submissions: HashMap::new(),
            sessions: HashMap::new(),
        }
    }

    #[test]
    fn test_validation_future_schema() {
        let mut export = empty_export();
        export.schema_version = EXPORT_SCHEMA_VERSION + 1;

        let result = export.validate();
        assert!(result.unwrap_err().contains("newer than supported"));
    }

    #[tokio::test]
    async fn test_validation_dangling_route() {
        let state = AppState::new();
        let alice = player(&state, "Alice").await;
        let (room, _) = active_room(&state, &[&alice]).await;

        let mut export = state.export_state().await;
        export.routes.clear();

        let err = export.validate().unwrap_err();
        assert!(err.contains("which doesn't exist"), "got {}", err);

        let mut export = state.export_state().await;
        export.rooms.get_mut(&room.id).unwrap().players.push("ghost".to_string());
        assert!(export.validate().unwrap_err().contains("player 'ghost'"));
    }

    #[tokio::test]
    async fn test_export_import_roundtrip() {
        let state = AppState::new();
        let alice = player(&state, "Alice").await;
        let (room, route) = active_room(&state, &[&alice]).await;
        state
            .submit_answer(&room.id, &alice.id, answer(&route.checkpoints[0].id, "one"))
            .await
            .unwrap();
        let session = state.sign_in("alice@example.com").await.unwrap();

        let export = state.export_state().await;
        assert!(export.routes.values().all(|r| r.checkpoints.is_empty()));
        let json = serde_json::to_string(&export).unwrap();

        let restored = AppState::new();
        restored
            .import_state(serde_json::from_str(&json).unwrap())
            .await
            .unwrap();

        assert_eq!(restored.get_route(&route.id).await.unwrap().checkpoints.len(), 2);
        assert_eq!(restored.get_room(&room.id).await.unwrap().code, room.code);
        assert_eq!(restored.get_submissions_by_room(&room.id).await.len(), 1);
        assert!(restored.user_for_token(&session.token).await.is_some());
    }

    #[tokio::test]
    async fn test_invalid_import_leaves_state_alone() {
        let state = AppState::new();
        let alice = player(&state, "Alice").await;

        let mut export = empty_export();
        export.sessions.insert("digest".to_string(), "ghost".to_string());

        assert!(matches!(
            state.import_state(export).await,
            Err(GameError::Snapshot(_))
        ));
        assert!(state.get_user(&alice.id).await.is_some());
    }

    #[tokio::test]
    async fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let state = AppState::new();
        let alice = player(&state, "Alice").await;
        state.save_to_file(&path).await.unwrap();

        let restored = AppState::new();
        assert!(restored.load_from_file(&path).await.unwrap());
        assert_eq!(restored.get_user(&alice.id).await.unwrap().username, "Alice");

        let missing = dir.path().join("missing.json");
        assert!(!restored.load_from_file(&missing).await.unwrap());

        tokio::fs::write(&path, b"not json").await.unwrap();
        assert!(restored.load_from_file(&path).await.is_err());
    }
}
