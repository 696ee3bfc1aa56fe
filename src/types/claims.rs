//! Atomic claims extracted from council responses.

use serde::{Deserialize, Serialize};

/// Verification status of a claim.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    VerifiedTrue,
    VerifiedFalse,
    Contested,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Unverified => write!(f, "unverified"),
            VerificationStatus::VerifiedTrue => write!(f, "verified_true"),
            VerificationStatus::VerifiedFalse => write!(f, "verified_false"),
            VerificationStatus::Contested => write!(f, "contested"),
        }
    }
}

/// A single factual claim with the responses backing or contradicting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedClaim {
    #[serde(alias = "claim")]
    pub text: String,

    #[serde(default, alias = "supporting_models")]
    pub supporting_labels: Vec<String>,

    #[serde(default, alias = "contradicting_models")]
    pub contradicting_labels: Vec<String>,

    #[serde(default = "default_claim_confidence")]
    pub confidence: f64,

    #[serde(default)]
    pub verification_status: VerificationStatus,

    #[serde(default)]
    pub source: Option<String>,
}

fn default_claim_confidence() -> f64 {
    0.5
}

impl ExtractedClaim {
    /// Creates an unverified claim with no votes.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            supporting_labels: Vec::new(),
            contradicting_labels: Vec::new(),
            confidence: default_claim_confidence(),
            verification_status: VerificationStatus::Unverified,
            source: None,
        }
    }

    /// Sets the supporting response labels.
    pub fn supported_by<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supporting_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the contradicting response labels.
    pub fn contradicted_by<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contradicting_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the claim confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = super::judgments::clamp_unit(confidence);
        self
    }

    /// True when at least one response supports and one contradicts the claim.
    pub fn is_contested(&self) -> bool {
        !self.supporting_labels.is_empty() && !self.contradicting_labels.is_empty()
    }
}

/// Everything the extractor model reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimExtraction {
    pub claims: Vec<ExtractedClaim>,

    /// Extractor's overall agreement estimate.
    pub agreement_score: f64,

    /// Claim texts the extractor flagged as highly disputed.
    pub contested_texts: Vec<String>,
}

impl ClaimExtraction {
    /// Neutral result used whenever extraction cannot be trusted.
    pub fn neutral() -> Self {
        Self {
            claims: Vec::new(),
            agreement_score: 0.5,
            contested_texts: Vec::new(),
        }
    }
}

/// A claim with response labels resolved to model names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimView {
    pub claim: String,
    pub supporting: Vec<String>,
    pub contradicting: Vec<String>,
    pub confidence: f64,
    pub status: VerificationStatus,
    pub source: Option<String>,
}
