//! Result of a council run.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consensus::Domain;
use crate::types::{AggregatedScore, ClaimView, DisagreementResult, RankingSubmission, Response};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Completed,
    /// Every council member failed.
    NoResponses,
    /// The whole-run timeout expired.
    TimedOut,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Completed => write!(f, "completed"),
            OutcomeStatus::NoResponses => write!(f, "no responses received"),
            OutcomeStatus::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Per-run measurements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilMetrics {
    pub query_hash: String,
    pub total_time_ms: u64,
    pub models_queried: usize,
    pub models_succeeded: usize,
    pub agreement_score: f64,
    /// Mean judge confidence.
    pub confidence_mean: f64,
    pub confidence_std: f64,
    /// Summed cost the members reported for their answers, in USD.
    #[serde(default)]
    pub total_cost: f64,
}

/// The chairman's final answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synthesis {
    pub model: String,
    pub content: String,
}

/// Everything a council run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilOutcome {
    pub run_id: Uuid,
    pub status: OutcomeStatus,
    pub query: String,
    pub domain: Domain,

    /// Stage-1 answers, in council order.
    pub responses: Vec<Response>,
    pub failed_models: Vec<String>,
    /// Members not asked because their circuit was open.
    pub skipped_models: Vec<String>,

    pub rankings: Vec<RankingSubmission>,
    pub label_to_model: HashMap<String, String>,
    /// Best first.
    pub aggregate: Vec<AggregatedScore>,
    pub agreement_score: f64,
    pub disagreement: Option<DisagreementResult>,
    pub bradley_terry: Option<BTreeMap<String, f64>>,

    pub claims: Vec<ClaimView>,
    pub contested_claims: Vec<ClaimView>,
    pub claim_agreement: f64,

    pub synthesis: Option<Synthesis>,
    pub metrics: CouncilMetrics,
    pub timestamp: DateTime<Utc>,
}

impl CouncilOutcome {
    /// Outcome for a run that ended before any judgment happened.
    pub(crate) fn terminal(
        run_id: Uuid,
        status: OutcomeStatus,
        query: &str,
        domain: Domain,
        metrics: CouncilMetrics,
    ) -> Self {
        Self {
            run_id,
            status,
            query: query.to_string(),
            domain,
            responses: Vec::new(),
            failed_models: Vec::new(),
            skipped_models: Vec::new(),
            rankings: Vec::new(),
            label_to_model: HashMap::new(),
            aggregate: Vec::new(),
            agreement_score: metrics.agreement_score,
            disagreement: None,
            bradley_terry: None,
            claims: Vec::new(),
            contested_claims: Vec::new(),
            claim_agreement: 1.0,
            synthesis: None,
            metrics,
            timestamp: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == OutcomeStatus::Completed
    }

    /// Model whose response ranked first.
    pub fn winner(&self) -> Option<&str> {
        self.aggregate.first().map(|s| s.model_name.as_str())
    }

    /// The synthesized answer, falling back to the top-ranked response.
    pub fn final_answer(&self) -> Option<&str> {
        if let Some(synthesis) = &self.synthesis {
            return Some(&synthesis.content);
        }
        let winner = self.winner()?;
        self.responses
            .iter()
            .find(|r| r.model_id == winner)
            .map(|r| r.content.as_str())
    }
}
