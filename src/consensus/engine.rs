//! Preference aggregation engine.
//!
//! Bundles the aggregation algorithms behind one configured object so the
//! orchestrator and the CLI apply the same thresholds and iteration limits.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::config::AggregationConfig;
use crate::types::{AggregatedScore, DisagreementResult, PairwiseComparison, RankingSubmission};

use super::aggregator::RankingAggregator;
use super::bradley_terry::{bradley_terry_scores_with, BradleyTerryOptions};
use super::concordance::{detect_disagreement, kendalls_w};
use super::domain::{classify_domain, Domain};

/// Agreement score reported when no judge produced a usable ranking.
pub const NEUTRAL_AGREEMENT: f64 = 0.5;

/// Everything derived from one set of rankings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceReport {
    pub domain: Domain,

    /// Kendall's W, or [`NEUTRAL_AGREEMENT`] without rankings.
    pub agreement_score: f64,

    pub disagreement: DisagreementResult,

    /// Best first.
    pub scores: Vec<AggregatedScore>,

    /// Mean of judge confidences.
    pub confidence_mean: f64,

    /// Population standard deviation of judge confidences.
    pub confidence_std: f64,
}

/// Preference aggregator.
///
/// Responsible for:
/// - Classifying queries into domains
/// - Measuring judge agreement and splitting judges into factions
/// - Domain-weighted rank aggregation
/// - Bradley–Terry scoring of pairwise comparisons
pub struct PreferenceAggregator {
    config: AggregationConfig,
}

impl PreferenceAggregator {
    /// Creates a new aggregator.
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    /// Kendall's W threshold for consensus.
    pub fn disagreement_threshold(&self) -> f64 {
        self.config.disagreement_threshold
    }

    /// Whether pairwise comparisons should be collected.
    pub fn pairwise_enabled(&self) -> bool {
        self.config.pairwise
    }

    pub fn classify_domain(&self, query: &str) -> Domain {
        classify_domain(query)
    }

    pub fn compute_agreement(&self, rankings: &[RankingSubmission]) -> f64 {
        kendalls_w(rankings)
    }

    pub fn detect_disagreement(&self, rankings: &[RankingSubmission]) -> DisagreementResult {
        detect_disagreement(rankings, self.config.disagreement_threshold)
    }

    pub fn aggregate_rankings(
        &self,
        rankings: &[RankingSubmission],
        label_to_model: &HashMap<String, String>,
        domain: Domain,
    ) -> Vec<AggregatedScore> {
        RankingAggregator::aggregate(rankings, label_to_model, domain)
    }

    /// Bradley–Terry scores using the configured iteration limits.
    pub fn bradley_terry_scores(&self, comparisons: &[PairwiseComparison]) -> BTreeMap<String, f64> {
        let options = BradleyTerryOptions {
            iterations: self.config.bt_iterations,
            tolerance: self.config.bt_tolerance,
        };
        bradley_terry_scores_with(comparisons, options)
    }

    /// Runs agreement, disagreement and aggregation over `rankings`.
    pub fn evaluate(
        &self,
        rankings: &[RankingSubmission],
        label_to_model: &HashMap<String, String>,
        domain: Domain,
    ) -> PreferenceReport {
        let agreement_score = if rankings.is_empty() {
            NEUTRAL_AGREEMENT
        } else {
            self.compute_agreement(rankings)
        };

        let (confidence_mean, confidence_std) =
            Self::confidence_stats(rankings.iter().map(|r| r.confidence));

        PreferenceReport {
            domain,
            agreement_score,
            disagreement: self.detect_disagreement(rankings),
            scores: self.aggregate_rankings(rankings, label_to_model, domain),
            confidence_mean,
            confidence_std,
        }
    }

    /// Mean and population standard deviation; zeros for no input.
    pub fn confidence_stats<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
        let values: Vec<f64> = values.into_iter().collect();
        if values.is_empty() {
            return (0.0, 0.0);
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        (mean, variance.sqrt())
    }
}

impl Default for PreferenceAggregator {
    fn default() -> Self {
        Self::new(AggregationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Winner;

    fn labels() -> HashMap<String, String> {
        HashMap::from([
            ("Response A".to_string(), "model-a".to_string()),
            ("Response B".to_string(), "model-b".to_string()),
        ])
    }

    #[test]
    fn test_evaluate_without_rankings() {
        let aggregator = PreferenceAggregator::default();
        let report = aggregator.evaluate(&[], &labels(), Domain::Factual);

        assert_eq!(report.agreement_score, NEUTRAL_AGREEMENT);
        assert!(report.scores.is_empty());
        assert!(report.disagreement.has_consensus);
        assert_eq!(report.confidence_mean, 0.0);
    }

    #[test]
    fn test_evaluate_with_consensus() {
        let aggregator = PreferenceAggregator::default();
        let rankings = vec![
            RankingSubmission::new("j1", ["Response A", "Response B"]).with_confidence(0.9),
            RankingSubmission::new("j2", ["Response A", "Response B"]).with_confidence(0.7),
        ];

        let report = aggregator.evaluate(&rankings, &labels(), Domain::Reasoning);

        assert_eq!(report.agreement_score, 1.0);
        assert!(report.disagreement.has_consensus);
        assert_eq!(report.scores[0].model_name, "model-a");
        assert!((report.confidence_mean - 0.8).abs() < 1e-9);
        assert!((report.confidence_std - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_configured_threshold() {
        let config = AggregationConfig {
            disagreement_threshold: 1.1,
            ..AggregationConfig::default()
        };
        let aggregator = PreferenceAggregator::new(config);
        let rankings = vec![
            RankingSubmission::new("j1", ["Response A", "Response B"]),
            RankingSubmission::new("j2", ["Response A", "Response B"]),
        ];

        let result = aggregator.detect_disagreement(&rankings);
        assert!(!result.has_consensus);
        assert_eq!(result.factions.len(), 1);
    }

    #[test]
    fn test_bradley_terry_uses_config() {
        let aggregator = PreferenceAggregator::default();
        let comparisons = vec![PairwiseComparison::new(
            "Response A",
            "Response B",
            Winner::A,
            1.0,
        )];

        let scores = aggregator.bradley_terry_scores(&comparisons);
        assert!(scores["Response A"] > scores["Response B"]);
    }
}
