//! Parsing of judge outputs.
//!
//! Judges are asked for JSON but frequently answer in prose. Parsing never
//! fails: it reports how the value was obtained so callers can decide what
//! to do with weak or missing results.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::executors::parse_json_output;
use crate::types::{PairwiseComparison, RankingSubmission, Winner};

/// Confidence assigned to anything recovered heuristically.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

const FALLBACK_REASONING: &str = "Fallback parsing";

static RESPONSE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Response ([A-Z])\b").expect("label pattern is valid"));

/// How a judge output was interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    /// Well-formed JSON.
    Structured(T),
    /// Recovered from free text.
    Heuristic(T),
    /// Nothing usable.
    Empty,
}

impl<T> Parsed<T> {
    /// The parsed value, if any.
    pub fn into_option(self) -> Option<T> {
        match self {
            Parsed::Structured(value) | Parsed::Heuristic(value) => Some(value),
            Parsed::Empty => None,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Parsed::Structured(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Parsed::Empty)
    }

    /// Returns the value, or `fallback()` for [`Parsed::Empty`].
    pub fn unwrap_or_else<F: FnOnce() -> T>(self, fallback: F) -> T {
        self.into_option().unwrap_or_else(fallback)
    }
}

#[derive(Debug, Deserialize)]
struct RankingPayload {
    #[serde(alias = "ranking")]
    rankings: Vec<String>,
    #[serde(default = "fallback_confidence")]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    dissent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PairwisePayload {
    winner: Winner,
    #[serde(default = "fallback_confidence")]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

fn fallback_confidence() -> f64 {
    FALLBACK_CONFIDENCE
}

/// Every distinct "Response X" label in `text`, in first-seen order.
pub fn extract_response_labels(text: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for caps in RESPONSE_LABEL.captures_iter(text) {
        let label = format!("Response {}", &caps[1]);
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// Parses a ranking from `judge`.
pub fn parse_ranking(output: &str, judge: &str) -> Parsed<RankingSubmission> {
    match parse_json_output::<RankingPayload>(output, judge) {
        Ok(payload) if !payload.rankings.is_empty() => {
            let mut submission = RankingSubmission::new(judge, payload.rankings)
                .with_confidence(payload.confidence)
                .with_reasoning(payload.reasoning);
            if let Some(dissent) = payload.dissent.filter(|d| !d.trim().is_empty()) {
                submission = submission.with_dissent(dissent);
            }
            return Parsed::Structured(submission);
        }
        Ok(_) => tracing::debug!(judge, "Ranking JSON has no entries, scanning text"),
        Err(e) => tracing::debug!(judge, "Falling back to label extraction: {}", e),
    }

    let labels = extract_response_labels(output);
    if labels.is_empty() {
        return Parsed::Empty;
    }

    Parsed::Heuristic(
        RankingSubmission::new(judge, labels)
            .with_confidence(FALLBACK_CONFIDENCE)
            .with_reasoning(FALLBACK_REASONING),
    )
}

/// Parses a pairwise verdict on `response_a_id` vs `response_b_id`.
pub fn parse_pairwise(
    output: &str,
    judge: &str,
    response_a_id: &str,
    response_b_id: &str,
) -> Parsed<PairwiseComparison> {
    if output.trim().is_empty() {
        return Parsed::Empty;
    }

    match parse_json_output::<PairwisePayload>(output, judge) {
        Ok(payload) => {
            return Parsed::Structured(
                PairwiseComparison::new(
                    response_a_id,
                    response_b_id,
                    payload.winner,
                    payload.confidence,
                )
                .with_reasoning(payload.reasoning),
            )
        }
        Err(e) => tracing::debug!(judge, "Falling back to text verdict: {}", e),
    }

    let lower = output.to_lowercase();
    let winner = if lower.contains("response a") && lower.contains("better") {
        Winner::A
    } else if lower.contains("response b") && lower.contains("better") {
        Winner::B
    } else {
        Winner::Tie
    };

    Parsed::Heuristic(
        PairwiseComparison::new(response_a_id, response_b_id, winner, FALLBACK_CONFIDENCE)
            .with_reasoning(FALLBACK_REASONING),
    )
}
