//! Query domain classification and judge expertise weights.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConcordError;

/// Subject area of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Code,
    Math,
    Creative,
    Reasoning,
    #[default]
    Factual,
}

impl Domain {
    /// All domains, in classification priority order.
    pub const ALL: [Domain; 5] = [
        Domain::Code,
        Domain::Math,
        Domain::Creative,
        Domain::Reasoning,
        Domain::Factual,
    ];

    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Code => "code",
            Domain::Math => "math",
            Domain::Creative => "creative",
            Domain::Reasoning => "reasoning",
            Domain::Factual => "factual",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Domain::Code => &[
                "code",
                "program",
                "function",
                "bug",
                "error",
                "python",
                "javascript",
            ],
            Domain::Math => &["math", "calculate", "equation", "prove", "theorem"],
            Domain::Creative => &["write", "story", "poem", "creative", "imagine"],
            Domain::Reasoning => &["why", "how", "explain", "reason", "logic"],
            Domain::Factual => &[],
        }
    }

    /// Weights per model family, in match order.
    fn weights(&self) -> [(&'static str, f64); 7] {
        match self {
            Domain::Math => [
                ("deepseek", 0.9),
                ("gemini", 0.7),
                ("llama", 0.5),
                ("gemma", 0.4),
                ("gpt", 0.8),
                ("claude", 0.7),
                ("mistral", 0.5),
            ],
            Domain::Code => [
                ("deepseek", 0.85),
                ("gemini", 0.7),
                ("llama", 0.7),
                ("gemma", 0.5),
                ("gpt", 0.9),
                ("claude", 0.85),
                ("mistral", 0.6),
            ],
            Domain::Creative => [
                ("deepseek", 0.4),
                ("gemini", 0.8),
                ("llama", 0.7),
                ("gemma", 0.6),
                ("gpt", 0.85),
                ("claude", 0.9),
                ("mistral", 0.6),
            ],
            Domain::Factual => [
                ("deepseek", 0.7),
                ("gemini", 0.8),
                ("llama", 0.6),
                ("gemma", 0.6),
                ("gpt", 0.8),
                ("claude", 0.75),
                ("mistral", 0.5),
            ],
            Domain::Reasoning => [
                ("deepseek", 0.9),
                ("gemini", 0.75),
                ("llama", 0.6),
                ("gemma", 0.5),
                ("gpt", 0.85),
                ("claude", 0.8),
                ("mistral", 0.5),
            ],
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Domain {
    type Err = ConcordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Domain::ALL
            .into_iter()
            .find(|d| d.as_str() == lower)
            .ok_or_else(|| ConcordError::other(format!("Unknown domain: {}", s)))
    }
}

/// Weight used when a model matches no known family.
pub const DEFAULT_EXPERTISE_WEIGHT: f64 = 0.5;

/// Classifies a query by keyword; the first matching family wins.
pub fn classify_domain(query: &str) -> Domain {
    let query_lower = query.to_lowercase();

    Domain::ALL
        .into_iter()
        .find(|domain| {
            domain
                .keywords()
                .iter()
                .any(|kw| query_lower.contains(kw))
        })
        .unwrap_or(Domain::Factual)
}

/// Expertise weight of `model_id` as a judge in `domain`.
///
/// Families are matched as case-insensitive substrings in a fixed order, so
/// an id containing both "gemini" and "gpt" gets the gemini weight.
pub fn expertise_weight(model_id: &str, domain: Domain) -> f64 {
    let model_lower = model_id.to_lowercase();

    domain
        .weights()
        .iter()
        .find(|(family, _)| model_lower.contains(family))
        .map(|(_, weight)| *weight)
        .unwrap_or(DEFAULT_EXPERTISE_WEIGHT)
}
