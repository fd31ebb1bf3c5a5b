//! Diagnosis score derivation.
//!
//! Category scores are a pure function of the 38 raw ratings:
//! `round((sum / count) * 25)`, rounding half away from zero. They are always
//! recomputed from the whole detail map, never adjusted incrementally.
use crate::catalog::{indicator_count, indicators_in, Category};
use crate::document::{DiagnosisDetails, DiagnosisScore};
use serde_json::Value;

/// Upper bound of the raw rating scale.
pub const MAX_RAW_SCORE: f64 = 4.0;

/// Three normalized category scores, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryScores {
    pub environment: u8,
    pub social: u8,
    pub governance: u8,
}

/// Recompute all three category scores from a full detail map.
pub fn recompute_diagnosis_score(details: &DiagnosisDetails) -> CategoryScores {
    CategoryScores {
        environment: category_score(details, Category::Environment),
        social: category_score(details, Category::Social),
        governance: category_score(details, Category::Governance),
    }
}

fn category_score(details: &DiagnosisDetails, category: Category) -> u8 {
    let count = indicator_count(category);
    let sum: f64 = indicators_in(category)
        .map(|indicator| finite_or_zero(details.get(indicator.key)))
        .sum();
    if count == 0 {
        return 0;
    }
    // f64::round rounds half away from zero.
    let normalized = ((sum / count as f64) * 25.0).round();
    normalized.clamp(0.0, 100.0) as u8
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Clamp a rating into `[0, 4]`; non-finite input becomes 0.
pub fn clamp_score(value: f64) -> f64 {
    finite_or_zero(value).clamp(0.0, MAX_RAW_SCORE)
}

/// Coerce free-form user input into a rating.
///
/// Tries a full float parse first, then the longest leading numeric prefix
/// (`"3.5점"` -> 3.5). Anything else counts as 0 so a half-filled form never
/// blocks. The result is not clamped; see [`clamp_score`].
pub fn coerce_score_input(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<f64>() {
        if value.is_finite() {
            return value;
        }
    }
    let value = leading_number(trimmed).unwrap_or(0.0);
    tracing::debug!(raw = trimmed, value, "coerced non-numeric score input");
    value
}

fn leading_number(text: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (idx, ch) in text.char_indices() {
        match ch {
            '+' | '-' if idx == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = idx + ch.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    text[..end]
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Coerce a loosely typed JSON value into a rating (numbers, numeric strings, else 0).
pub fn coerce_json_score(raw: &Value) -> f64 {
    match raw {
        Value::Number(number) => number.as_f64().map(finite_or_zero).unwrap_or(0.0),
        Value::String(text) => coerce_score_input(text),
        _ => 0.0,
    }
}

/// New detail map with `key` set to the clamped `value`; `None` for unknown keys.
pub fn set_detail(details: &DiagnosisDetails, key: &str, value: f64) -> Option<DiagnosisDetails> {
    details.with_value(key, clamp_score(value))
}

impl DiagnosisScore {
    /// Replace one rating and recompute every category from the whole map.
    ///
    /// Returns `None` when `key` is not a catalog key. The value is clamped.
    pub fn with_detail(&self, key: &str, value: f64) -> Option<DiagnosisScore> {
        let details = set_detail(&self.details, key, value)?;
        Some(DiagnosisScore::from_details(details))
    }
}

/// Report status for a raw rating: 80% and 60% of the 4.0 scale.
pub fn indicator_status(value: f64) -> &'static str {
    if value >= 3.2 {
        "양호"
    } else if value >= 2.4 {
        "보통"
    } else {
        "미흡"
    }
}
