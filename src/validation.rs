//! Answer checking for checkpoint challenges
//!
//! Trivia needs an exact (case/whitespace-insensitive) answer, word puzzles
//! accept near misses via Levenshtein similarity, and photo proofs only need
//! a photo to be present.

use serde::Serialize;

use crate::types::Challenge;

/// Similarity a word puzzle answer needs to count as correct
pub const WORD_PUZZLE_THRESHOLD: f64 = 0.9;
/// Similarity at which a wrong answer is reported as "close"
pub const CLOSE_MATCH_THRESHOLD: f64 = 0.8;

/// Bonus is capped at this share of the checkpoint's points
const MAX_TIME_BONUS_RATIO: f64 = 0.2;

const QUICK_ANSWER_SECS: u64 = 30;
const SLOW_ANSWER_SECS: u64 = 120;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationResult {
    pub is_correct: bool,
    /// 0 or 100
    pub score: u32,
    pub feedback: String,
    pub details: ValidationDetails,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationDetails {
    Answer {
        correct_answer: String,
        user_answer: String,
        /// Word puzzles only: wrong but within the close-match threshold
        #[serde(skip_serializing_if = "Option::is_none")]
        close_match: Option<bool>,
    },
    Photo {
        has_photo: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        photo_url: Option<String>,
    },
}

/// Validate a submission against its challenge
pub fn validate_submission(
    challenge: &Challenge,
    answer: Option<&str>,
    photo_url: Option<&str>,
) -> ValidationResult {
    match challenge {
        Challenge::Trivia { answer: correct, .. } => {
            validate_trivia(correct, answer.unwrap_or_default())
        }
        Challenge::WordPuzzle { answer: correct, .. } => {
            validate_word_puzzle(correct, answer.unwrap_or_default())
        }
        Challenge::PhotoProof { .. } => validate_photo_proof(photo_url),
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn validate_trivia(correct: &str, answer: &str) -> ValidationResult {
    let is_correct = normalize(correct) == normalize(answer);

    ValidationResult {
        is_correct,
        score: if is_correct { 100 } else { 0 },
        feedback: if is_correct {
            "Correct! Well done!".to_string()
        } else {
            format!("Incorrect. The correct answer was: {}", correct)
        },
        details: ValidationDetails::Answer {
            correct_answer: correct.to_string(),
            user_answer: answer.to_string(),
            close_match: None,
        },
    }
}

fn validate_word_puzzle(correct: &str, answer: &str) -> ValidationResult {
    let expected = normalize(correct);
    let given = normalize(answer);

    let is_correct = fuzzy_match(&expected, &given, WORD_PUZZLE_THRESHOLD);
    let close_match = !is_correct && fuzzy_match(&expected, &given, CLOSE_MATCH_THRESHOLD);

    ValidationResult {
        is_correct,
        score: if is_correct { 100 } else { 0 },
        feedback: if is_correct {
            "Correct! Great job!".to_string()
        } else {
            format!("Incorrect. The answer was: {}", correct)
        },
        details: ValidationDetails::Answer {
            correct_answer: correct.to_string(),
            user_answer: answer.to_string(),
            close_match: Some(close_match),
        },
    }
}

fn validate_photo_proof(photo_url: Option<&str>) -> ValidationResult {
    let photo_url = photo_url.map(str::trim).filter(|u| !u.is_empty());
    let has_photo = photo_url.is_some();

    ValidationResult {
        is_correct: has_photo,
        score: if has_photo { 100 } else { 0 },
        feedback: if has_photo {
            "Photo submitted successfully!".to_string()
        } else {
            "Please upload a photo to complete this challenge".to_string()
        },
        details: ValidationDetails::Photo {
            has_photo,
            photo_url: photo_url.map(str::to_string),
        },
    }
}

/// True when `a` and `b` are at least `threshold` similar.
///
/// Similarity is `(longer - distance) / longer`, measured in chars.
pub fn fuzzy_match(a: &str, b: &str, threshold: f64) -> bool {
    if a == b {
        return true;
    }

    let longer = a.chars().count().max(b.chars().count());
    if longer == 0 {
        return true;
    }

    let distance = levenshtein(a, b);
    let similarity = (longer - distance) as f64 / longer as f64;
    similarity >= threshold
}

/// Edit distance (insertions, deletions, substitutions all cost 1)
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Single-row DP
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let cost = usize::from(ca != cb);
            row[j + 1] = (above + 1).min(row[j] + 1).min(diag + cost);
            diag = above;
        }
    }
    row[b.len()]
}

/// Points awarded for a validated submission.
///
/// `time_bonus` is in points and capped at 20% of the checkpoint's value.
pub fn calculate_score(points: u32, result: &ValidationResult, time_bonus: f64) -> u32 {
    let base = f64::from(points);
    let validation_score = f64::from(result.score) / 100.0 * base;
    let bonus = if time_bonus > 0.0 {
        time_bonus.min(base * MAX_TIME_BONUS_RATIO)
    } else {
        0.0
    };

    (validation_score + bonus).round() as u32
}

/// Feedback text with a remark on how long the player took
pub fn generate_feedback(result: &ValidationResult, seconds_taken: u64) -> String {
    let mut feedback = result.feedback.clone();

    if result.is_correct && seconds_taken < QUICK_ANSWER_SECS {
        feedback.push_str(" Quick thinking!");
    } else if result.is_correct && seconds_taken > SLOW_ANSWER_SECS {
        feedback.push_str(" Took your time, but got it right!");
    }

    feedback
}
