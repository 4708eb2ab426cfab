use serde::Serialize;
use sha2::{Digest, Sha256};

use super::AppState;
use crate::error::{GameError, GameResult};
use crate::types::*;

/// Returned on sign up / sign in. The token is only ever shown here.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Sessions are stored by digest so a leaked snapshot holds no usable tokens
pub(crate) fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl AppState {
    async fn open_session(&self, user: User) -> Session {
        let token = ulid::Ulid::new().to_string();
        self.sessions
            .write()
            .await
            .insert(hash_token(&token), user.id.clone());
        Session { token, user }
    }

    pub async fn sign_up(&self, email: &str, username: &str, role: UserRole) -> GameResult<Session> {
        let user = self.create_user(username, email, role).await?;
        Ok(self.open_session(user).await)
    }

    pub async fn sign_in(&self, email: &str) -> GameResult<Session> {
        let user = self
            .get_user_by_email(email)
            .await
            .ok_or(GameError::UserNotFound)?;
        tracing::info!("{} signed in", user.username);
        Ok(self.open_session(user).await)
    }

    /// Returns whether the token was a live session
    pub async fn sign_out(&self, token: &str) -> bool {
        self.sessions
            .write()
            .await
            .remove(&hash_token(token))
            .is_some()
    }

    pub async fn user_for_token(&self, token: &str) -> Option<User> {
        let user_id = self.sessions.read().await.get(&hash_token(token)).cloned()?;
        self.get_user(&user_id).await
    }
}
