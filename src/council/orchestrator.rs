//! The council pipeline.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use uuid::Uuid;

use crate::calibration::CalibrationTracker;
use crate::claims::{
    compute_claim_agreement, format_claims_for_display, identify_contested_claims, ClaimEngine,
};
use crate::consensus::{
    parse_pairwise, parse_ranking, Domain, Parsed, PreferenceAggregator, PreferenceReport,
    RankingAggregator, FALLBACK_CONFIDENCE, NEUTRAL_AGREEMENT,
};
use crate::executors::ModelClient;
use crate::prompts;
use crate::resilience::{Quorum, ResilientDispatcher};
use crate::types::config::Config;
use crate::types::{
    response_labels, PairwiseComparison, RankingSubmission, Response, Winner,
};
use crate::ConcordResult;

use super::context::CouncilContext;
use super::outcome::{CouncilMetrics, CouncilOutcome, OutcomeStatus, Synthesis};

/// Runs queries through the full council pipeline.
///
/// Stages, in order:
/// 1. Classify the query domain
/// 2. Collect one answer per council member
/// 3. Collect anonymous rankings (and pairwise verdicts when enabled)
/// 4. Aggregate preferences
/// 5. Extract and optionally verify claims
/// 6. Synthesize a final answer with the chairman
/// 7. Record calibration predictions
pub struct Council {
    config: Config,
    dispatcher: Arc<ResilientDispatcher>,
    aggregator: PreferenceAggregator,
    claims: ClaimEngine,
    calibration: Option<Arc<CalibrationTracker>>,
    timeout: Duration,
}

impl Council {
    /// Creates a council over `client` sharing the state in `context`.
    pub fn new(config: Config, client: Arc<dyn ModelClient>, context: CouncilContext) -> Self {
        let mut dispatcher =
            ResilientDispatcher::from_config(client, context.breaker, &config.dispatch);
        if let Some(cache) = context.cache {
            dispatcher = dispatcher.with_cache(cache);
        }
        let dispatcher = Arc::new(dispatcher);

        Self {
            aggregator: PreferenceAggregator::new(config.aggregation.clone()),
            claims: ClaimEngine::from_config(Arc::clone(&dispatcher), &config.claims),
            calibration: context.calibration,
            timeout: config.general.timeout(),
            dispatcher,
            config,
        }
    }

    /// Overrides the whole-run timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn models(&self) -> &[String] {
        &self.config.council.models
    }

    /// Runs `query` through every stage.
    ///
    /// A run where every member fails, or that exceeds the whole-run timeout,
    /// still returns an outcome with the matching status. Errors are reserved
    /// for an unmet quorum with partial results disallowed and for
    /// calibration store failures.
    pub async fn run(&self, query: &str) -> ConcordResult<CouncilOutcome> {
        let run_id = Uuid::new_v4();
        let start = Instant::now();
        let domain = self.aggregator.classify_domain(query);

        info!(run_id = %run_id, domain = %domain, "Council run started");

        match tokio::time::timeout(self.timeout, self.run_stages(run_id, query, domain, start))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    run_id = %run_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Council run timed out"
                );
                Ok(CouncilOutcome::terminal(
                    run_id,
                    OutcomeStatus::TimedOut,
                    query,
                    domain,
                    self.empty_metrics(query, start, 0),
                ))
            }
        }
    }

    async fn run_stages(
        &self,
        run_id: Uuid,
        query: &str,
        domain: Domain,
        start: Instant,
    ) -> ConcordResult<CouncilOutcome> {
        // Stage 1: answers
        let stage1 = self
            .dispatcher
            .query_all(self.models(), query, false, Quorum::best_effort())
            .await?;

        if stage1.successes.is_empty() {
            warn!(run_id = %run_id, "All models failed to respond");
            let mut outcome = CouncilOutcome::terminal(
                run_id,
                OutcomeStatus::NoResponses,
                query,
                domain,
                self.empty_metrics(query, start, 0),
            );
            outcome.failed_models = stage1.failed;
            outcome.skipped_models = stage1.skipped;
            return Ok(outcome);
        }

        let stage1 = stage1.enforce(Quorum::from_config(&self.config.dispatch))?;
        let responses = stage1.successes;
        let labels = response_labels(responses.len());
        let label_to_model: HashMap<String, String> = labels
            .iter()
            .cloned()
            .zip(responses.iter().map(|r| r.model_id.clone()))
            .collect();

        info!(
            run_id = %run_id,
            succeeded = responses.len(),
            failed = stage1.failed.len(),
            "Stage 1 complete"
        );

        // Stage 2: judgments
        let rankings = self.collect_rankings(query, &responses, &labels).await;
        let bradley_terry = if self.aggregator.pairwise_enabled() {
            let comparisons = self.collect_pairwise(query, &responses, &labels).await;
            Some(self.aggregator.bradley_terry_scores(&comparisons))
        } else {
            None
        };

        let report = self.aggregator.evaluate(&rankings, &label_to_model, domain);
        info!(
            run_id = %run_id,
            judges = rankings.len(),
            agreement = report.agreement_score,
            "Stage 2 complete"
        );

        // Claims
        let (claims, contested_claims, claim_agreement) = if self.config.claims.enabled {
            let extraction = self
                .claims
                .extract_claims(query, &responses, self.config.council.extractor())
                .await;
            let mut claims = extraction.claims;
            if self.config.claims.verify {
                claims = self
                    .claims
                    .verify_all(claims, self.config.council.verifier())
                    .await;
            }
            (
                format_claims_for_display(&claims, &label_to_model),
                format_claims_for_display(&identify_contested_claims(&claims), &label_to_model),
                compute_claim_agreement(&claims),
            )
        } else {
            (Vec::new(), Vec::new(), 1.0)
        };

        // Stage 3: synthesis
        let synthesis = self.synthesize(query, &responses, &report).await;

        // Calibration
        if let Some(tracker) = &self.calibration {
            let chars = self.config.calibration.prediction_chars;
            for response in &responses {
                let prediction: String = response.content.chars().take(chars).collect();
                tracker.record_prediction(
                    &response.model_id,
                    query,
                    report.agreement_score,
                    &prediction,
                )?;
            }
        }

        let metrics = CouncilMetrics {
            query_hash: CalibrationTracker::query_hash(query),
            total_time_ms: start.elapsed().as_millis() as u64,
            models_queried: self.models().len(),
            models_succeeded: responses.len(),
            agreement_score: report.agreement_score,
            confidence_mean: report.confidence_mean,
            confidence_std: report.confidence_std,
            total_cost: responses.iter().filter_map(|r| r.cost).sum(),
        };

        info!(run_id = %run_id, elapsed_ms = metrics.total_time_ms, "Council run complete");

        Ok(CouncilOutcome {
            run_id,
            status: OutcomeStatus::Completed,
            query: query.to_string(),
            domain,
            responses,
            failed_models: stage1.failed,
            skipped_models: stage1.skipped,
            rankings,
            label_to_model,
            aggregate: report.scores,
            agreement_score: report.agreement_score,
            disagreement: Some(report.disagreement),
            bradley_terry,
            claims,
            contested_claims,
            claim_agreement,
            synthesis,
            metrics,
            timestamp: chrono::Utc::now(),
        })
    }

    /// One ranking per responding judge; unusable output ranks in presentation order.
    async fn collect_rankings(
        &self,
        query: &str,
        responses: &[Response],
        labels: &[String],
    ) -> Vec<RankingSubmission> {
        let prompt = prompts::ranking_prompt(query, responses);

        let judged = match self
            .dispatcher
            .query_all(self.models(), &prompt, true, Quorum::best_effort())
            .await
        {
            Ok(fan_out) => fan_out.successes,
            Err(e) => {
                warn!("Ranking stage failed: {}", e);
                return Vec::new();
            }
        };

        judged
            .into_iter()
            .map(
                |reply| match parse_ranking(&reply.content, &reply.model_id) {
                    Parsed::Structured(submission) | Parsed::Heuristic(submission) => submission,
                    Parsed::Empty => {
                        warn!(judge = %reply.model_id, "No ranking found, using presentation order");
                        RankingSubmission::new(reply.model_id, labels.iter().cloned())
                            .with_confidence(FALLBACK_CONFIDENCE)
                    }
                },
            )
            .collect()
    }

    /// Every judge's verdict on every unordered pair of responses.
    async fn collect_pairwise(
        &self,
        query: &str,
        responses: &[Response],
        labels: &[String],
    ) -> Vec<PairwiseComparison> {
        let mut comparisons = Vec::new();

        for i in 0..responses.len() {
            for j in (i + 1)..responses.len() {
                let prompt =
                    prompts::pairwise_prompt(query, &responses[i].content, &responses[j].content);

                let judged = match self
                    .dispatcher
                    .query_all(self.models(), &prompt, true, Quorum::best_effort())
                    .await
                {
                    Ok(fan_out) => fan_out.successes,
                    Err(e) => {
                        warn!("Pairwise comparison failed: {}", e);
                        continue;
                    }
                };

                for reply in judged {
                    let comparison =
                        parse_pairwise(&reply.content, &reply.model_id, &labels[i], &labels[j])
                            .unwrap_or_else(|| {
                                PairwiseComparison::new(
                                    labels[i].as_str(),
                                    labels[j].as_str(),
                                    Winner::Tie,
                                    FALLBACK_CONFIDENCE,
                                )
                            });
                    comparisons.push(comparison);
                }
            }
        }

        comparisons
    }

    async fn synthesize(
        &self,
        query: &str,
        responses: &[Response],
        report: &PreferenceReport,
    ) -> Option<Synthesis> {
        let chairman = &self.config.council.chairman;
        let ranking = RankingAggregator::format_scores(&report.scores);
        let prompt = prompts::synthesis_prompt(query, responses, &ranking);

        match self.dispatcher.query_one(chairman, &prompt, false).await {
            Ok(reply) => Some(Synthesis {
                model: chairman.clone(),
                content: reply.content,
            }),
            Err(e) => {
                warn!(chairman = %chairman, "Synthesis failed: {}", e);
                None
            }
        }
    }

    fn empty_metrics(&self, query: &str, start: Instant, succeeded: usize) -> CouncilMetrics {
        CouncilMetrics {
            query_hash: CalibrationTracker::query_hash(query),
            total_time_ms: start.elapsed().as_millis() as u64,
            models_queried: self.models().len(),
            models_succeeded: succeeded,
            agreement_score: NEUTRAL_AGREEMENT,
            confidence_mean: 0.0,
            confidence_std: 0.0,
            total_cost: 0.0,
        }
    }
}

/// Bradley–Terry scores keyed by model rather than label.
pub fn scores_by_model(
    scores: &BTreeMap<String, f64>,
    label_to_model: &HashMap<String, String>,
) -> BTreeMap<String, f64> {
    scores
        .iter()
        .map(|(label, score)| {
            (
                RankingAggregator::model_name(label_to_model, label),
                *score,
            )
        })
        .collect()
}
