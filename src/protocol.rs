use crate::state::RoomStats;
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    UpdatePosition {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        accuracy: Option<f64>,
    },
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        player_id: UserId,
        room: Room,
        stats: RoomStats,
        server_now: String,
    },
    /// A game event for the connected room
    Event { event: GameEvent },
    RoomStats { stats: RoomStats },
    /// Ack for a position update
    PositionAccepted { position: PlayerPosition },
    Pong { server_now: String },
    Error { code: String, msg: String },
}

impl ServerMessage {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }
}

impl From<&crate::error::GameError> for ServerMessage {
    fn from(err: &crate::error::GameError) -> Self {
        ServerMessage::error(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tags() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"t":"update_position","latitude":48.85,"longitude":2.29}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::UpdatePosition {
                latitude, accuracy, ..
            } => {
                assert_eq!(latitude, 48.85);
                assert!(accuracy.is_none());
            }
            _ => panic!("Expected update_position"),
        }

        let ping: ClientMessage = serde_json::from_str(r#"{"t":"ping"}"#).unwrap();
        assert!(matches!(ping, ClientMessage::Ping));

        assert!(serde_json::from_str::<ClientMessage>(r#"{"t":"vote"}"#).is_err());
    }

    #[test]
    fn test_server_error_from_game_error() {
        let msg = ServerMessage::from(&crate::error::GameError::NotInRoom);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["t"], "error");
        assert_eq!(json["code"], "NOT_IN_ROOM");
        assert_eq!(json["msg"], "Player is not in this room");
    }
}
