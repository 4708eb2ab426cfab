use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type UserId = String;
pub type RouteId = String;
pub type CheckpointId = String;
pub type RoomId = String;
pub type SubmissionId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Player,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: String,
    pub total_points: u32,
    pub games_played: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Points range an authored (or generated) checkpoint should fall into
    pub fn points_range(self) -> (u32, u32) {
        match self {
            Difficulty::Easy => (10, 20),
            Difficulty::Medium => (15, 30),
            Difficulty::Hard => (20, 40),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub description: String,
    pub city: String,
    pub theme: String,
    /// Expected play time in minutes
    pub duration_minutes: u32,
    pub difficulty: Difficulty,
    pub created_by: UserId,
    pub created_at: String,
    pub is_active: bool,
    /// Ordered by `order_index`. Filled in on read; the stored copy keeps this empty.
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    Trivia,
    WordPuzzle,
    PhotoProof,
}

impl ChallengeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChallengeKind::Trivia => "trivia",
            ChallengeKind::WordPuzzle => "word_puzzle",
            ChallengeKind::PhotoProof => "photo_proof",
        }
    }
}

/// The task a player has to solve at a checkpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Challenge {
    Trivia {
        question: String,
        answer: String,
        #[serde(default)]
        options: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
    WordPuzzle {
        question: String,
        answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
    PhotoProof {
        photo_prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
}

impl Challenge {
    pub fn kind(&self) -> ChallengeKind {
        match self {
            Challenge::Trivia { .. } => ChallengeKind::Trivia,
            Challenge::WordPuzzle { .. } => ChallengeKind::WordPuzzle,
            Challenge::PhotoProof { .. } => ChallengeKind::PhotoProof,
        }
    }

    /// Expected answer for text challenges
    pub fn answer(&self) -> Option<&str> {
        match self {
            Challenge::Trivia { answer, .. } | Challenge::WordPuzzle { answer, .. } => {
                Some(answer.as_str())
            }
            Challenge::PhotoProof { .. } => None,
        }
    }

    /// Copy without the answer, safe to hand to players
    pub fn redacted(&self) -> Self {
        match self {
            Challenge::Trivia {
                question,
                options,
                hint,
                ..
            } => Challenge::Trivia {
                question: question.clone(),
                answer: String::new(),
                options: options.clone(),
                hint: hint.clone(),
            },
            Challenge::WordPuzzle { question, hint, .. } => Challenge::WordPuzzle {
                question: question.clone(),
                answer: String::new(),
                hint: hint.clone(),
            },
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub route_id: RouteId,
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub order_index: u32,
    pub points: u32,
    pub challenge: Challenge,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub route_id: RouteId,
    pub code: String,
    pub created_by: UserId,
    pub status: RoomStatus,
    pub max_players: u32,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    /// Join order is preserved
    pub players: Vec<UserId>,
    /// Set once final points were credited to user stats
    #[serde(default)]
    pub stats_applied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub room_id: RoomId,
    pub player_id: UserId,
    pub checkpoint_id: CheckpointId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub is_correct: bool,
    pub points: u32,
    pub feedback: String,
    pub submitted_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerPosition {
    pub player_id: UserId,
    pub room_id: RoomId,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub username: String,
    pub total_points: u32,
    pub games_played: u32,
    pub average_score: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameEventKind {
    PlayerJoined,
    PlayerLeft,
    CheckpointReached,
    ChallengeCompleted,
    GameStarted,
    GameEnded,
    PositionUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub kind: GameEventKind,
    pub room_id: RoomId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    pub timestamp: String,
}

/// Tunables for room play
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub default_max_players: u32,
    /// Reject submissions from players that are not near the checkpoint
    pub enforce_proximity: bool,
    pub unlock_radius_m: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_max_players: 10,
            enforce_proximity: false,
            unlock_radius_m: 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_wire_format() {
        let challenge = Challenge::WordPuzzle {
            question: "Unscramble: EGDIRB".to_string(),
            answer: "bridge".to_string(),
            hint: None,
        };
        let json = serde_json::to_value(&challenge).unwrap();
        assert_eq!(json["type"], "word_puzzle");
        assert_eq!(json["answer"], "bridge");
        assert!(json.get("hint").is_none());

        let parsed: Challenge = serde_json::from_str(
            r#"{"type":"photo_proof","photo_prompt":"The clock tower"}"#,
        )
        .unwrap();
        assert_eq!(parsed.kind(), ChallengeKind::PhotoProof);
        assert!(parsed.answer().is_none());
    }

    #[test]
    fn test_redacted_hides_answer() {
        let challenge = Challenge::Trivia {
            question: "Year the bridge opened?".to_string(),
            answer: "1937".to_string(),
            options: vec!["1937".to_string(), "1951".to_string()],
            hint: Some("Art deco era".to_string()),
        };
        let redacted = challenge.redacted();
        assert_eq!(redacted.answer(), Some(""));
        match redacted {
            Challenge::Trivia { options, hint, .. } => {
                assert_eq!(options.len(), 2);
                assert_eq!(hint.as_deref(), Some("Art deco era"));
            }
            _ => panic!("Expected trivia"),
        }
    }

    #[test]
    fn test_points_range() {
        assert_eq!(Difficulty::Easy.points_range(), (10, 20));
        assert_eq!(Difficulty::Hard.points_range(), (20, 40));
    }
}
