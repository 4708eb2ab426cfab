//! AI-authored routes and challenges
//!
//! Builds prompts, runs them through the configured [`LlmManager`], and turns
//! the model's JSON into checked domain types. Generated routes are only
//! drafts until an admin imports them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GameError, GameResult};
use crate::llm::{LlmError, LlmManager, LlmResult};
use crate::state::{AppState, CheckpointInput, RouteInput};
use crate::types::*;

const ROUTE_SYSTEM_PROMPT: &str = "You are an expert location-based game designer. \
    Create engaging routes with checkpoints and challenges for players to explore cities. \
    Always reply with a single JSON object.";

const CHALLENGE_SYSTEM_PROMPT: &str = "You are an expert game designer creating engaging \
    challenges for location-based games. Always reply with a single JSON object.";

const MIN_CHECKPOINTS: u32 = 3;
const MAX_CHECKPOINTS: u32 = 8;

/// Parameters for a generated route
#[derive(Debug, Clone, Deserialize)]
pub struct RouteRequest {
    pub city: String,
    pub theme: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// "provider:model" to pin a model
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedCheckpoint {
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub challenge: Challenge,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedRoute {
    pub name: String,
    pub description: String,
    pub checkpoints: Vec<GeneratedCheckpoint>,
}

/// One checkpoint per ten minutes, within 3..=8
pub fn checkpoint_count(duration_minutes: u32) -> u32 {
    (duration_minutes / 10).clamp(MIN_CHECKPOINTS, MAX_CHECKPOINTS)
}

pub fn build_route_prompt(request: &RouteRequest) -> String {
    let (min_points, max_points) = request.difficulty.points_range();
    let city = request.city.trim();
    let theme = request.theme.trim();

    format!(
        r#"Create a location-based gaming route for {city} with a {theme} theme.

Requirements:
- Duration: {duration} minutes
- Difficulty: {difficulty}
- Number of checkpoints: {count}
- Each checkpoint should be a real, accessible location in {city}

For each checkpoint, provide:
1. Name (attractive, descriptive)
2. Description (what makes this location special)
3. Approximate coordinates (latitude, longitude)
4. Challenge type and details:
   - Trivia: question, correct answer, 3 wrong options, hint
   - Word puzzle: puzzle description, answer, hint
   - Photo proof: what the player needs to photograph, hint
5. Points value ({min_points}-{max_points})

Format your response as JSON with this structure:
{{
  "name": "Route Name",
  "description": "Route description",
  "checkpoints": [
    {{
      "name": "Checkpoint Name",
      "description": "Checkpoint description",
      "latitude": 37.7749,
      "longitude": -122.4194,
      "challenge": {{
        "type": "trivia|word_puzzle|photo_proof",
        "question": "Question text (for trivia and word_puzzle)",
        "answer": "Correct answer",
        "options": ["Option 1", "Option 2", "Option 3", "Option 4"],
        "hint": "Helpful hint",
        "photo_prompt": "What to photograph (for photo_proof)"
      }},
      "points": {max_points}
    }}
  ]
}}

Make sure the route flows logically and includes diverse challenge types. Focus on the {theme} theme throughout."#,
        duration = request.duration_minutes,
        difficulty = request.difficulty.as_str(),
        count = checkpoint_count(request.duration_minutes),
    )
}

pub fn build_challenge_prompt(location: &str, theme: &str, kind: ChallengeKind) -> String {
    let base = format!(
        "Create a {} challenge for a location-based game at {} with a {} theme.",
        kind.as_str(),
        location.trim(),
        theme.trim()
    );

    let details = match kind {
        ChallengeKind::Trivia => format!(
            r#"Create a trivia question about this location or the {theme} theme. Include:
- A clear, engaging question
- The correct answer
- 3 plausible wrong answers
- A helpful hint

Format as JSON:
{{
  "question": "Question text",
  "answer": "Correct answer",
  "options": ["Correct answer", "Wrong 1", "Wrong 2", "Wrong 3"],
  "hint": "Helpful hint"
}}"#
        ),
        ChallengeKind::WordPuzzle => format!(
            r#"Create a word puzzle related to this location or the {theme} theme. Include:
- Puzzle description (anagram, crossword clue, etc.)
- The answer
- A helpful hint

Format as JSON:
{{
  "question": "Puzzle description",
  "answer": "Answer",
  "hint": "Helpful hint"
}}"#
        ),
        ChallengeKind::PhotoProof => r#"Create a photo challenge where players must photograph something specific at this location. Include:
- What they need to photograph
- A helpful hint about where to find it

Format as JSON:
{
  "photo_prompt": "What to photograph",
  "hint": "Helpful hint"
}"#
        .to_string(),
    };

    format!("{}\n\n{}", base, details)
}

/// The outermost `{ ... }` block of a model reply
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_object(text: &str) -> LlmResult<Value> {
    let json = extract_json(text)
        .ok_or_else(|| LlmError::ParseError("No JSON found in AI response".to_string()))?;
    serde_json::from_str(json).map_err(|e| LlmError::ParseError(e.to_string()))
}

fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn challenge_kind_from(value: &str) -> Option<ChallengeKind> {
    match value.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
        "trivia" => Some(ChallengeKind::Trivia),
        "word_puzzle" | "wordpuzzle" => Some(ChallengeKind::WordPuzzle),
        "photo_proof" | "photoproof" | "photo" => Some(ChallengeKind::PhotoProof),
        _ => None,
    }
}

/// Build a challenge of `kind` out of loosely shaped model JSON
fn challenge_from_value(kind: ChallengeKind, value: &Value) -> LlmResult<Challenge> {
    let invalid = |what: &str| {
        LlmError::ParseError(format!("Invalid {} challenge: missing {}", kind.as_str(), what))
    };
    let hint = str_field(value, &["hint"]);

    Ok(match kind {
        ChallengeKind::Trivia => Challenge::Trivia {
            question: str_field(value, &["question"]).ok_or_else(|| invalid("question"))?,
            answer: str_field(value, &["answer"]).ok_or_else(|| invalid("answer"))?,
            options: value
                .get("options")
                .and_then(Value::as_array)
                .map(|opts| {
                    opts.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            hint,
        },
        ChallengeKind::WordPuzzle => Challenge::WordPuzzle {
            question: str_field(value, &["question"]).ok_or_else(|| invalid("question"))?,
            answer: str_field(value, &["answer"]).ok_or_else(|| invalid("answer"))?,
            hint,
        },
        ChallengeKind::PhotoProof => Challenge::PhotoProof {
            photo_prompt: str_field(value, &["photo_prompt", "photoPrompt"])
                .ok_or_else(|| invalid("photo prompt"))?,
            hint,
        },
    })
}

fn checkpoint_from_value(index: usize, value: &Value) -> LlmResult<GeneratedCheckpoint> {
    let invalid = |what: &str| {
        LlmError::ParseError(format!("Invalid checkpoint {}: {}", index + 1, what))
    };

    let name = str_field(value, &["name"]).ok_or_else(|| invalid("missing name"))?;
    let description =
        str_field(value, &["description"]).ok_or_else(|| invalid("missing description"))?;
    let latitude = value
        .get("latitude")
        .and_then(Value::as_f64)
        .ok_or_else(|| invalid("latitude must be a number"))?;
    let longitude = value
        .get("longitude")
        .and_then(Value::as_f64)
        .ok_or_else(|| invalid("longitude must be a number"))?;
    let points = value
        .get("points")
        .and_then(Value::as_f64)
        .filter(|p| *p >= 1.0)
        .ok_or_else(|| invalid("points must be positive"))?;

    let challenge_value = value
        .get("challenge")
        .filter(|c| c.is_object())
        .ok_or_else(|| invalid("missing challenge"))?;
    let kind = challenge_value
        .get("type")
        .and_then(Value::as_str)
        .and_then(challenge_kind_from)
        .ok_or_else(|| invalid("unknown challenge type"))?;

    Ok(GeneratedCheckpoint {
        name,
        description,
        latitude,
        longitude,
        challenge: challenge_from_value(kind, challenge_value)?,
        points: points.round() as u32,
    })
}

pub fn parse_route_response(text: &str) -> LlmResult<GeneratedRoute> {
    let value = parse_object(text)?;

    let name = str_field(&value, &["name"]);
    let description = str_field(&value, &["description"]);
    let checkpoints = value.get("checkpoints").and_then(Value::as_array);
    let (Some(name), Some(description), Some(checkpoints)) = (name, description, checkpoints)
    else {
        return Err(LlmError::ParseError(
            "Invalid route structure from AI".to_string(),
        ));
    };

    let checkpoints = checkpoints
        .iter()
        .enumerate()
        .map(|(i, cp)| checkpoint_from_value(i, cp))
        .collect::<LlmResult<Vec<_>>>()?;

    Ok(GeneratedRoute {
        name,
        description,
        checkpoints,
    })
}

pub fn parse_challenge_response(text: &str, kind: ChallengeKind) -> LlmResult<Challenge> {
    challenge_from_value(kind, &parse_object(text)?)
}

async fn run(
    llm: &LlmManager,
    system: &str,
    prompt: String,
    model: Option<&str>,
) -> LlmResult<String> {
    let request = llm.request(system, prompt);
    let response = match model {
        Some(model_id) => llm.generate_from_model(model_id, request).await?,
        None => llm.generate_first(request).await?,
    };
    Ok(response.text)
}

/// Ask the model for a full route draft
pub async fn generate_route(llm: &LlmManager, request: &RouteRequest) -> GameResult<GeneratedRoute> {
    if request.city.trim().is_empty() {
        return Err(GameError::InvalidInput("City is required".to_string()));
    }
    if request.duration_minutes == 0 {
        return Err(GameError::InvalidInput(
            "Duration must be greater than zero".to_string(),
        ));
    }

    let text = run(
        llm,
        ROUTE_SYSTEM_PROMPT,
        build_route_prompt(request),
        request.model.as_deref(),
    )
    .await?;
    let mut route = parse_route_response(&text)?;

    let (min_points, max_points) = request.difficulty.points_range();
    for cp in &mut route.checkpoints {
        cp.points = cp.points.clamp(min_points, max_points);
    }

    tracing::info!(
        "Generated route '{}' with {} checkpoints for {}",
        route.name,
        route.checkpoints.len(),
        request.city
    );
    Ok(route)
}

/// Ask the model for a single challenge at a location
pub async fn generate_challenge(
    llm: &LlmManager,
    location: &str,
    theme: &str,
    kind: ChallengeKind,
    model: Option<&str>,
) -> GameResult<Challenge> {
    if location.trim().is_empty() {
        return Err(GameError::InvalidInput("Location is required".to_string()));
    }

    let text = run(
        llm,
        CHALLENGE_SYSTEM_PROMPT,
        build_challenge_prompt(location, theme, kind),
        model,
    )
    .await?;
    Ok(parse_challenge_response(&text, kind)?)
}

impl AppState {
    /// Store a generated draft as a route with its checkpoints in order
    pub async fn import_generated_route(
        &self,
        generated: GeneratedRoute,
        request: &RouteRequest,
        created_by: &str,
    ) -> GameResult<Route> {
        if generated.checkpoints.is_empty() {
            return Err(GameError::InvalidInput(
                "Generated route has no checkpoints".to_string(),
            ));
        }
        // Reject the whole draft before anything is stored
        for cp in &generated.checkpoints {
            crate::geo::validate_coordinates(cp.latitude, cp.longitude)?;
        }

        let route = self
            .create_route(
                RouteInput {
                    name: generated.name,
                    description: generated.description,
                    city: request.city.clone(),
                    theme: request.theme.clone(),
                    duration_minutes: request.duration_minutes,
                    difficulty: request.difficulty,
                    is_active: true,
                },
                created_by,
            )
            .await?;

        for (i, cp) in generated.checkpoints.into_iter().enumerate() {
            self.create_checkpoint(
                &route.id,
                CheckpointInput {
                    name: cp.name,
                    description: cp.description,
                    latitude: cp.latitude,
                    longitude: cp.longitude,
                    order_index: Some(i as u32),
                    points: cp.points,
                    challenge: cp.challenge,
                },
            )
            .await?;
        }

        self.get_route(&route.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::manager_replying;

    const ROUTE_REPLY: &str = r#"Sure! Here is your route:
{
  "name": "Old Town Secrets",
  "description": "A walk through history",
  "checkpoints": [
    {
      "name": "Town Hall",
      "description": "Gothic town hall",
      "latitude": 50.0517,
      "longitude": 14.4045,
      "challenge": {"type": "trivia", "question": "When was it built?", "answer": "1338",
                    "options": ["1338", "1500", "1700", "1900"], "hint": "14th century"},
      "points": 25
    },
    {
      "name": "Astronomical Clock",
      "description": "Medieval clock",
      "latitude": 50.087,
      "longitude": 14.4207,
      "challenge": {"type": "photo_proof", "photoPrompt": "The apostles"},
      "points": 99
    }
  ]
}
Enjoy!"#;

    fn request(duration: u32, difficulty: Difficulty) -> RouteRequest {
        RouteRequest {
            city: "Prague".to_string(),
            theme: "history".to_string(),
            duration_minutes: duration,
            difficulty,
            model: None,
        }
    }

    #[test]
    fn test_checkpoint_count() {
        assert_eq!(checkpoint_count(10), 3);
        assert_eq!(checkpoint_count(45), 4);
        assert_eq!(checkpoint_count(60), 6);
        assert_eq!(checkpoint_count(240), 8);
    }

    #[test]
    fn test_route_prompt() {
        let prompt = build_route_prompt(&request(60, Difficulty::Hard));
        assert!(prompt.contains("for Prague with a history theme"));
        assert!(prompt.contains("Number of checkpoints: 6"));
        assert!(prompt.contains("Points value (20-40)"));
        assert!(prompt.contains("Difficulty: hard"));
    }

    #[test]
    fn test_challenge_prompt() {
        let prompt = build_challenge_prompt("Charles Bridge", "legends", ChallengeKind::WordPuzzle);
        assert!(prompt.starts_with("Create a word_puzzle challenge"));
        assert!(prompt.contains("legends theme"));
        assert!(prompt.contains("\"answer\""));
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(extract_json("x {\"a\": {\"b\": 1}} y"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} {"), None);
    }

    #[test]
    fn test_parse_route_response() {
        let route = parse_route_response(ROUTE_REPLY).unwrap();
        assert_eq!(route.name, "Old Town Secrets");
        assert_eq!(route.checkpoints.len(), 2);
        assert_eq!(route.checkpoints[0].challenge.answer(), Some("1338"));
        assert_eq!(
            route.checkpoints[1].challenge,
            Challenge::PhotoProof {
                photo_prompt: "The apostles".to_string(),
                hint: None,
            }
        );
    }

    #[test]
    fn test_parse_route_rejects_bad_structure() {
        assert!(parse_route_response("nothing").is_err());
        assert!(parse_route_response(r#"{"name": "x", "checkpoints": []}"#).is_err());

        let bad_lat = r#"{"name": "x", "description": "y", "checkpoints": [
            {"name": "a", "description": "b", "latitude": "50", "longitude": 1.0,
             "challenge": {"type": "trivia", "question": "q", "answer": "a"}, "points": 10}]}"#;
        let err = parse_route_response(bad_lat).unwrap_err();
        assert!(err.to_string().contains("latitude"));

        let no_points = r#"{"name": "x", "description": "y", "checkpoints": [
            {"name": "a", "description": "b", "latitude": 50.0, "longitude": 1.0,
             "challenge": {"type": "trivia", "question": "q", "answer": "a"}, "points": 0}]}"#;
        assert!(parse_route_response(no_points).is_err());

        let bad_type = r#"{"name": "x", "description": "y", "checkpoints": [
            {"name": "a", "description": "b", "latitude": 50.0, "longitude": 1.0,
             "challenge": {"type": "dance"}, "points": 10}]}"#;
        assert!(parse_route_response(bad_type).is_err());
    }

    #[test]
    fn test_parse_challenge_response() {
        let challenge = parse_challenge_response(
            r#"{"question": "Unscramble: GDIREB", "answer": "Bridge", "hint": "Crosses a river"}"#,
            ChallengeKind::WordPuzzle,
        )
        .unwrap();
        assert_eq!(challenge.kind(), ChallengeKind::WordPuzzle);
        assert_eq!(challenge.answer(), Some("Bridge"));

        assert!(parse_challenge_response(r#"{"hint": "x"}"#, ChallengeKind::Trivia).is_err());
    }

    #[tokio::test]
    async fn test_generate_route_clamps_points() {
        let llm = manager_replying(ROUTE_REPLY);
        let route = generate_route(&llm, &request(30, Difficulty::Easy)).await.unwrap();

        // easy is 10-20
        assert_eq!(route.checkpoints[0].points, 20);
        assert_eq!(route.checkpoints[1].points, 20);
    }

    #[tokio::test]
    async fn test_generate_route_validates_request() {
        let llm = manager_replying(ROUTE_REPLY);
        let mut bad = request(30, Difficulty::Easy);
        bad.city = " ".to_string();
        assert!(matches!(
            generate_route(&llm, &bad).await,
            Err(GameError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_route_bad_reply_is_ai_error() {
        let llm = manager_replying("I cannot help with that.");
        assert!(matches!(
            generate_route(&llm, &request(30, Difficulty::Easy)).await,
            Err(GameError::Ai(LlmError::ParseError(_)))
        ));
    }

    #[tokio::test]
    async fn test_generate_challenge() {
        let llm = manager_replying(r#"{"photo_prompt": "The golden sign", "hint": "Look up"}"#);
        let challenge = generate_challenge(&llm, "Golden Lane", "alchemy", ChallengeKind::PhotoProof, None)
            .await
            .unwrap();
        assert_eq!(challenge.kind(), ChallengeKind::PhotoProof);
    }

    #[tokio::test]
    async fn test_import_generated_route() {
        let state = AppState::new();
        let generated = parse_route_response(ROUTE_REPLY).unwrap();

        let route = state
            .import_generated_route(generated, &request(30, Difficulty::Medium), "admin1")
            .await
            .unwrap();

        assert_eq!(route.city, "Prague");
        assert_eq!(route.checkpoints.len(), 2);
        assert_eq!(route.checkpoints[0].name, "Town Hall");
        assert_eq!(route.checkpoints[1].order_index, 1);
        assert!(route.is_active);
    }

    #[tokio::test]
    async fn test_import_rejects_bad_coordinates() {
        let state = AppState::new();
        let mut generated = parse_route_response(ROUTE_REPLY).unwrap();
        generated.checkpoints[1].latitude = 120.0;

        assert!(state
            .import_generated_route(generated, &request(30, Difficulty::Medium), "admin1")
            .await
            .is_err());
        assert!(state.get_routes_by_user("admin1").await.is_empty());
    }
}
