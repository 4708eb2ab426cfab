//! Per-session rate limiting for the API and WebSocket routes
//!
//! Requests are keyed by a digest of their session token (bearer header or
//! `token` query parameter). Anonymous requests are not limited, since many players
//! can share one public IP on mobile networks.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::state::hash_token;

/// Rate limiter state
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Map of key to (request count, window start)
    requests: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
    /// Maximum requests per window
    max_requests: u32,
    /// Time window duration
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(120, Duration::from_secs(10))
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Returns true if allowed, false if rate limited
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        match requests.get_mut(key) {
            Some((count, window_start)) => {
                if now.duration_since(*window_start) >= self.window {
                    *count = 1;
                    *window_start = now;
                    true
                } else if *count >= self.max_requests {
                    false
                } else {
                    *count += 1;
                    true
                }
            }
            None => {
                requests.insert(key.to_string(), (1, now));
                true
            }
        }
    }

    /// Drop stale windows (call periodically)
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window * 2);
    }

    pub async fn tracked_keys(&self) -> usize {
        self.requests.read().await.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// None = disabled
    pub rate_limiter: Option<RateLimiter>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate_limiter: Some(RateLimiter::default()),
        }
    }
}

impl RateLimitConfig {
    pub fn disabled() -> Self {
        Self { rate_limiter: None }
    }

    /// Load config from environment variables
    pub fn from_env() -> Self {
        let enabled = std::env::var("GEOQUEST_RATE_LIMIT")
            .map(|v| v != "0" && v.to_lowercase() != "false")
            .unwrap_or(true);

        let rate_limiter = if enabled {
            let max_requests = std::env::var("GEOQUEST_RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120);

            let window_secs = std::env::var("GEOQUEST_RATE_LIMIT_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10);

            Some(RateLimiter::new(max_requests, Duration::from_secs(window_secs)))
        } else {
            None
        };

        tracing::info!(rate_limit_enabled = enabled, "Rate limit config loaded");
        Self { rate_limiter }
    }
}

/// Digest of the session token to rate limit by, header first then query string
fn get_rate_limit_key(request: &Request<Body>) -> Option<String> {
    let token = crate::auth::bearer_token(request.headers()).or_else(|| {
        request
            .uri()
            .query()?
            .split('&')
            .find_map(|pair| pair.strip_prefix("token=").filter(|t| !t.is_empty()))
    })?;
    Some(format!("token:{}", hash_token(token)))
}

fn rate_limited(window: Duration) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, window.as_secs().max(1).to_string())],
        Json(json!({
            "code": "RATE_LIMITED",
            "msg": "Rate limit exceeded. Please slow down.",
        })),
    )
        .into_response()
}

pub async fn rate_limit_middleware(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(ref rate_limiter) = config.rate_limiter {
        if let Some(key) = get_rate_limit_key(&request) {
            if !rate_limiter.check(&key).await {
                tracing::warn!(path = %request.uri().path(), "Rate limited");
                return rate_limited(rate_limiter.window());
            }
        }
    }

    next.run(request).await
}

/// Periodically drop stale rate limit windows
pub fn spawn_cleanup(config: Arc<RateLimitConfig>) {
    let Some(rate_limiter) = config.rate_limiter.clone() else {
        return;
    };
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(rate_limiter.window() * 6);
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_allows_normal_traffic() {
        let limiter = RateLimiter::new(5, Duration::from_secs(1));

        for _ in 0..5 {
            assert!(limiter.check("test-key").await);
        }

        // 6th should be blocked
        assert!(!limiter.check("test-key").await);
    }

    #[tokio::test]
    async fn test_rate_limiter_different_keys() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1));

        assert!(limiter.check("key1").await);
        assert!(limiter.check("key1").await);
        assert!(!limiter.check("key1").await);

        assert!(limiter.check("key2").await);
        assert!(limiter.check("key2").await);
        assert!(!limiter.check("key2").await);
    }

    #[tokio::test]
    async fn test_rate_limiter_window_reset() {
        let limiter = RateLimiter::new(2, Duration::from_millis(50));

        assert!(limiter.check("key").await);
        assert!(limiter.check("key").await);
        assert!(!limiter.check("key").await);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(limiter.check("key").await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_stale_windows() {
        let limiter = RateLimiter::new(2, Duration::from_millis(10));
        limiter.check("a").await;
        assert_eq!(limiter.tracked_keys().await, 1);

        tokio::time::sleep(Duration::from_millis(30)).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked_keys().await, 0);
    }

    #[test]
    fn test_rate_limit_key() {
        let req = Request::builder()
            .uri("/api/rooms")
            .header(header::AUTHORIZATION, "Bearer abc")
            .body(Body::empty())
            .unwrap();
        let key = get_rate_limit_key(&req).unwrap();
        assert_eq!(key, format!("token:{}", hash_token("abc")));
        assert_ne!(key, "token:abc");

        let req = Request::builder()
            .uri("/ws?room=r1&token=xyz")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            get_rate_limit_key(&req),
            Some(format!("token:{}", hash_token("xyz")))
        );

        let req = Request::builder()
            .uri("/api/routes")
            .body(Body::empty())
            .unwrap();
        assert_eq!(get_rate_limit_key(&req), None);
    }

    #[test]
    fn test_config_default() {
        assert!(RateLimitConfig::default().rate_limiter.is_some());
        assert!(RateLimitConfig::disabled().rate_limiter.is_none());
    }
}
