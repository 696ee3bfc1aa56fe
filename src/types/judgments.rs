//! Judge outputs and the aggregates derived from them.

use serde::{Deserialize, Deserializer, Serialize};

/// Winner of a pairwise comparison.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Winner {
    #[serde(rename = "A", alias = "a")]
    A,
    #[serde(rename = "B", alias = "b")]
    B,
    #[serde(rename = "tie", alias = "TIE", alias = "Tie")]
    Tie,
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Winner::A => write!(f, "A"),
            Winner::B => write!(f, "B"),
            Winner::Tie => write!(f, "tie"),
        }
    }
}

/// A judge's verdict on two responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseComparison {
    /// Label of the first response.
    pub response_a_id: String,

    /// Label of the second response.
    pub response_b_id: String,

    pub winner: Winner,

    /// 0.5 = uncertain, 1.0 = certain.
    #[serde(deserialize_with = "deserialize_unit")]
    pub confidence: f64,

    #[serde(default)]
    pub reasoning: String,
}

impl PairwiseComparison {
    /// Creates a new comparison; confidence is clamped into [0, 1].
    pub fn new(
        response_a_id: impl Into<String>,
        response_b_id: impl Into<String>,
        winner: Winner,
        confidence: f64,
    ) -> Self {
        Self {
            response_a_id: response_a_id.into(),
            response_b_id: response_b_id.into(),
            winner,
            confidence: clamp_unit(confidence),
            reasoning: String::new(),
        }
    }

    /// Adds reasoning.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}

/// A judge's ordering of the candidate responses, best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingSubmission {
    /// Model that produced the ranking.
    pub judge_model: String,

    /// Response labels, best to worst.
    pub ranking: Vec<String>,

    #[serde(default = "default_confidence", deserialize_with = "deserialize_unit")]
    pub confidence: f64,

    #[serde(default)]
    pub reasoning: String,

    /// Set when the judge thinks one response fundamentally differs.
    #[serde(default)]
    pub dissent: Option<String>,
}

fn default_confidence() -> f64 {
    1.0
}

impl RankingSubmission {
    /// Creates a ranking with full confidence.
    pub fn new<I, S>(judge_model: impl Into<String>, ranking: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            judge_model: judge_model.into(),
            ranking: ranking.into_iter().map(Into::into).collect(),
            confidence: default_confidence(),
            reasoning: String::new(),
            dissent: None,
        }
    }

    /// Sets the judge confidence, clamped into [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_unit(confidence);
        self
    }

    /// Adds reasoning.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Adds a dissent note.
    pub fn with_dissent(mut self, dissent: impl Into<String>) -> Self {
        self.dissent = Some(dissent.into());
        self
    }

    /// The judge's top choice, if any.
    pub fn top_choice(&self) -> Option<&str> {
        self.ranking.first().map(String::as_str)
    }
}

/// Final score for a response after domain-weighted aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedScore {
    pub response_id: String,
    pub model_name: String,

    /// Weighted sum of rank points.
    pub raw_score: f64,

    /// Weighted sum divided by total weight.
    pub weighted_score: f64,

    /// 1-based position after sorting.
    pub rank: usize,

    pub votes_first: usize,
    pub votes_last: usize,
}

/// Judges sharing the same top choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    /// The response this faction ranked first.
    pub position: String,

    /// Judges in this faction, in submission order.
    pub members: Vec<String>,
}

/// Outcome of disagreement detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisagreementResult {
    pub has_consensus: bool,

    /// Kendall's W.
    pub agreement_score: f64,

    /// Empty when consensus was reached.
    pub factions: Vec<Faction>,

    pub recommendation: String,
}

/// Clamps a confidence-like value into [0, 1]; NaN becomes 0.5.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.5
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn deserialize_unit<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_unit)
}
