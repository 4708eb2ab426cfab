use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::*;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AppState {
    /// Create a user account (email must be unique)
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        role: UserRole,
    ) -> GameResult<User> {
        let username = username.trim();
        let email = normalize_email(email);

        if username.is_empty() {
            return Err(GameError::InvalidInput("Username is required".to_string()));
        }
        if !email.contains('@') {
            return Err(GameError::InvalidInput("Invalid email address".to_string()));
        }

        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(GameError::EmailTaken);
        }

        let user = User {
            id: ulid::Ulid::new().to_string(),
            username: username.to_string(),
            email,
            role,
            created_at: chrono::Utc::now().to_rfc3339(),
            total_points: 0,
            games_played: 0,
        };
        users.insert(user.id.clone(), user.clone());

        tracing::info!("Created {:?} user {} ({})", role, user.username, user.id);
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Option<User> {
        self.users.read().await.get(id).cloned()
    }

    pub async fn get_user_by_email(&self, email: &str) -> Option<User> {
        let email = normalize_email(email);
        self.users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    /// Credit a finished game to a user
    pub async fn update_user_stats(&self, id: &str, add_points: u32) -> GameResult<User> {
        let mut users = self.users.write().await;
        let user = users.get_mut(id).ok_or(GameError::UserNotFound)?;

        user.total_points += add_points;
        user.games_played += 1;

        tracing::info!(
            "Updated stats for {}: {} points over {} games",
            user.username,
            user.total_points,
            user.games_played
        );
        Ok(user.clone())
    }

    /// Users by total points, best first
    pub async fn get_leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let users = self.users.read().await;

        let mut entries: Vec<LeaderboardEntry> = users
            .values()
            .map(|u| LeaderboardEntry {
                user_id: u.id.clone(),
                username: u.username.clone(),
                total_points: u.total_points,
                games_played: u.games_played,
                average_score: if u.games_played > 0 {
                    f64::from(u.total_points) / f64::from(u.games_played)
                } else {
                    0.0
                },
            })
            .collect();

        entries.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then_with(|| a.username.cmp(&b.username))
        });
        entries.truncate(limit);
        entries
    }
}
