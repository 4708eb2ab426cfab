//! Server configuration from environment variables

use std::path::PathBuf;

use crate::types::GameConfig;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Snapshot file restored at startup and written on shutdown
    pub data_file: Option<PathBuf>,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_file: None,
            game: GameConfig::default(),
        }
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| {
            let v = v.trim().to_lowercase();
            !(v == "0" || v == "false" || v == "no" || v == "off")
        })
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("GEOQUEST_PORT")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.port);

        let data_file = std::env::var("GEOQUEST_DATA_FILE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let unlock_radius_m = std::env::var("GEOQUEST_UNLOCK_RADIUS_M")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(defaults.game.unlock_radius_m);

        let default_max_players = std::env::var("GEOQUEST_MAX_PLAYERS")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|n| (1..=crate::state::MAX_PLAYERS_LIMIT).contains(n))
            .unwrap_or(defaults.game.default_max_players);

        let config = Self {
            port,
            data_file,
            game: GameConfig {
                default_max_players,
                enforce_proximity: env_flag("GEOQUEST_ENFORCE_PROXIMITY", false),
                unlock_radius_m,
            },
        };

        tracing::info!(
            port = config.port,
            data_file = ?config.data_file,
            enforce_proximity = config.game.enforce_proximity,
            unlock_radius_m = config.game.unlock_radius_m,
            "Server config loaded"
        );
        config
    }
}
