use serde::Deserialize;

use super::AppState;
use crate::error::{GameError, GameResult};
use crate::geo::validate_coordinates;
use crate::types::*;

fn default_true() -> bool {
    true
}

/// Fields an admin supplies when authoring a route
#[derive(Debug, Clone, Deserialize)]
pub struct RouteInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub city: String,
    #[serde(default)]
    pub theme: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Fields for a new checkpoint; `order_index` defaults to the end of the route
#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub order_index: Option<u32>,
    pub points: u32,
    pub challenge: Challenge,
}

fn validate_challenge(challenge: &Challenge) -> GameResult<()> {
    match challenge {
        Challenge::Trivia {
            question, answer, ..
        }
        | Challenge::WordPuzzle {
            question, answer, ..
        } => {
            if question.trim().is_empty() {
                return Err(GameError::InvalidInput("Question is required".to_string()));
            }
            if answer.trim().is_empty() {
                return Err(GameError::InvalidInput("Answer is required".to_string()));
            }
        }
        Challenge::PhotoProof { photo_prompt, .. } => {
            if photo_prompt.trim().is_empty() {
                return Err(GameError::InvalidInput(
                    "Photo prompt is required".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Newest first, ties broken by id (ULIDs sort by creation)
fn sort_newest_first(routes: &mut [Route]) {
    routes.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

impl AppState {
    pub async fn create_route(&self, input: RouteInput, created_by: &str) -> GameResult<Route> {
        if input.name.trim().is_empty() {
            return Err(GameError::InvalidInput("Route name is required".to_string()));
        }
        if input.city.trim().is_empty() {
            return Err(GameError::InvalidInput("City is required".to_string()));
        }
        if input.duration_minutes == 0 {
            return Err(GameError::InvalidInput(
                "Duration must be greater than zero".to_string(),
            ));
        }

        let route = Route {
            id: ulid::Ulid::new().to_string(),
            name: input.name.trim().to_string(),
            description: input.description,
            city: input.city.trim().to_string(),
            theme: input.theme,
            duration_minutes: input.duration_minutes,
            difficulty: input.difficulty,
            created_by: created_by.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            is_active: input.is_active,
            checkpoints: Vec::new(),
        };

        self.routes
            .write()
            .await
            .insert(route.id.clone(), route.clone());

        tracing::info!("Created route '{}' ({}) in {}", route.name, route.id, route.city);
        Ok(route)
    }

    /// Route with its checkpoints in play order
    pub async fn get_route(&self, id: &str) -> GameResult<Route> {
        let mut route = self
            .routes
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(GameError::RouteNotFound)?;
        route.checkpoints = self.get_checkpoints_by_route(id).await;
        Ok(route)
    }

    pub async fn get_routes_by_user(&self, user_id: &str) -> Vec<Route> {
        let ids: Vec<RouteId> = self
            .routes
            .read()
            .await
            .values()
            .filter(|r| r.created_by == user_id)
            .map(|r| r.id.clone())
            .collect();
        self.hydrate_routes(ids).await
    }

    /// Active routes only
    pub async fn get_all_routes(&self) -> Vec<Route> {
        let ids: Vec<RouteId> = self
            .routes
            .read()
            .await
            .values()
            .filter(|r| r.is_active)
            .map(|r| r.id.clone())
            .collect();
        self.hydrate_routes(ids).await
    }

    async fn hydrate_routes(&self, ids: Vec<RouteId>) -> Vec<Route> {
        let mut routes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(route) = self.get_route(&id).await {
                routes.push(route);
            }
        }
        sort_newest_first(&mut routes);
        routes
    }

    pub async fn set_route_active(&self, id: &str, is_active: bool) -> GameResult<Route> {
        {
            let mut routes = self.routes.write().await;
            let route = routes.get_mut(id).ok_or(GameError::RouteNotFound)?;
            route.is_active = is_active;
            tracing::info!("Route {} is_active = {}", id, is_active);
        }
        self.get_route(id).await
    }

    pub async fn create_checkpoint(
        &self,
        route_id: &str,
        input: CheckpointInput,
    ) -> GameResult<Checkpoint> {
        if !self.routes.read().await.contains_key(route_id) {
            return Err(GameError::RouteNotFound);
        }
        if input.name.trim().is_empty() {
            return Err(GameError::InvalidInput(
                "Checkpoint name is required".to_string(),
            ));
        }
        validate_coordinates(input.latitude, input.longitude)?;
        if input.points == 0 {
            return Err(GameError::InvalidInput(
                "Points must be greater than zero".to_string(),
            ));
        }
        validate_challenge(&input.challenge)?;

        let mut checkpoints = self.checkpoints.write().await;
        let order_index = match input.order_index {
            Some(index) => index,
            None => checkpoints
                .values()
                .filter(|c| c.route_id == route_id)
                .map(|c| c.order_index.saturating_add(1))
                .max()
                .unwrap_or(0),
        };

        let checkpoint = Checkpoint {
            id: ulid::Ulid::new().to_string(),
            route_id: route_id.to_string(),
            name: input.name.trim().to_string(),
            description: input.description,
            latitude: input.latitude,
            longitude: input.longitude,
            order_index,
            points: input.points,
            challenge: input.challenge,
        };
        checkpoints.insert(checkpoint.id.clone(), checkpoint.clone());

        tracing::info!(
            "Added checkpoint '{}' #{} to route {}",
            checkpoint.name,
            order_index,
            route_id
        );
        Ok(checkpoint)
    }

    /// Checkpoints of a route sorted by `order_index`
    pub async fn get_checkpoints_by_route(&self, route_id: &str) -> Vec<Checkpoint> {
        let mut checkpoints: Vec<Checkpoint> = self
            .checkpoints
            .read()
            .await
            .values()
            .filter(|c| c.route_id == route_id)
            .cloned()
            .collect();
        checkpoints.sort_by(|a, b| {
            a.order_index
                .cmp(&b.order_index)
                .then_with(|| a.id.cmp(&b.id))
        });
        checkpoints
    }

    pub async fn get_checkpoint(&self, id: &str) -> GameResult<Checkpoint> {
        self.checkpoints
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(GameError::CheckpointNotFound)
    }
}
