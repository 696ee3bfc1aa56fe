//! Claim extraction and verification through the council's models.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::executors::parse_json_output;
use crate::prompts;
use crate::resilience::ResilientDispatcher;
use crate::types::config::ClaimsConfig;
use crate::types::{ClaimExtraction, ExtractedClaim, Response, VerificationStatus};
use crate::{ConcordError, ConcordResult};

/// Default number of verifications in flight.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    #[serde(default)]
    claims: Vec<ExtractedClaim>,
    #[serde(default = "neutral_agreement")]
    agreement_score: f64,
    #[serde(default, alias = "contested_texts")]
    high_disagreement_claims: Vec<String>,
}

fn neutral_agreement() -> f64 {
    0.5
}

/// A verifier's verdict on one claim.
#[derive(Debug, Clone, Deserialize)]
struct Verdict {
    #[serde(default)]
    status: VerificationStatus,
    #[serde(default)]
    source: Option<String>,
}

type VerificationResult = (usize, ConcordResult<Verdict>);

/// Extracts atomic claims from responses and cross-checks them.
pub struct ClaimEngine {
    dispatcher: Arc<ResilientDispatcher>,
    max_concurrent: usize,
    verify_timeout: Option<Duration>,
}

impl ClaimEngine {
    /// Creates an engine with default concurrency and no batch deadline.
    pub fn new(dispatcher: Arc<ResilientDispatcher>) -> Self {
        Self {
            dispatcher,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            verify_timeout: None,
        }
    }

    /// Creates an engine from configuration.
    pub fn from_config(dispatcher: Arc<ResilientDispatcher>, config: &ClaimsConfig) -> Self {
        Self {
            dispatcher,
            max_concurrent: config.max_concurrent.max(1),
            verify_timeout: config.verify_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Limits verifications in flight.
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Cancels outstanding verifications after `timeout`.
    #[must_use]
    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = Some(timeout);
        self
    }

    /// Asks `extractor_model` for the claims made across `responses`.
    ///
    /// Never fails: an unreachable extractor or unparsable output yields
    /// [`ClaimExtraction::neutral`].
    pub async fn extract_claims(
        &self,
        question: &str,
        responses: &[Response],
        extractor_model: &str,
    ) -> ClaimExtraction {
        if responses.is_empty() {
            return ClaimExtraction::neutral();
        }

        let prompt = prompts::claim_extraction_prompt(question, responses);

        let reply = match self.dispatcher.query_one(extractor_model, &prompt, true).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(extractor = extractor_model, "Claim extraction failed: {}", e);
                return ClaimExtraction::neutral();
            }
        };

        match parse_json_output::<ExtractionPayload>(&reply.content, extractor_model) {
            Ok(payload) => {
                let claims: Vec<ExtractedClaim> = payload
                    .claims
                    .into_iter()
                    .map(|c| {
                        let confidence = c.confidence;
                        c.with_confidence(confidence)
                    })
                    .collect();
                info!(count = claims.len(), "Claims extracted");

                ClaimExtraction {
                    claims,
                    agreement_score: crate::types::judgments::clamp_unit(payload.agreement_score),
                    contested_texts: payload.high_disagreement_claims,
                }
            }
            Err(e) => {
                warn!(extractor = extractor_model, "Discarding claim output: {}", e);
                ClaimExtraction::neutral()
            }
        }
    }

    /// Re-checks one claim; on failure the claim is returned unchanged.
    pub async fn verify_claim(&self, claim: ExtractedClaim, verifier_model: &str) -> ExtractedClaim {
        let result = request_verification(&self.dispatcher, &claim.text, verifier_model).await;
        apply_verdict(claim, result)
    }

    /// Verifies every claim with bounded concurrency.
    ///
    /// Output order matches input order. Claims whose verification fails or
    /// is still running at the batch deadline keep their previous status.
    pub async fn verify_all(
        &self,
        claims: Vec<ExtractedClaim>,
        verifier_model: &str,
    ) -> Vec<ExtractedClaim> {
        if claims.is_empty() {
            return claims;
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut join_set: JoinSet<VerificationResult> = JoinSet::new();

        for (index, claim) in claims.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let dispatcher = Arc::clone(&self.dispatcher);
            let verifier = verifier_model.to_string();
            let text = claim.text.clone();

            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, Err(ConcordError::other("verification gate closed")));
                };
                (index, request_verification(&dispatcher, &text, &verifier).await)
            });
        }

        let mut slots: Vec<Option<ConcordResult<Verdict>>> = claims.iter().map(|_| None).collect();
        let collect = collect_verdicts(&mut join_set, &mut slots);

        match self.verify_timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, collect).await.is_err() {
                    warn!(
                        pending = join_set.len(),
                        "Claim verification deadline reached, cancelling"
                    );
                    join_set.abort_all();
                }
            }
            None => collect.await,
        }

        claims
            .into_iter()
            .zip(slots)
            .map(|(claim, slot)| match slot {
                Some(result) => apply_verdict(claim, result),
                None => claim,
            })
            .collect()
    }
}

async fn collect_verdicts(
    join_set: &mut JoinSet<VerificationResult>,
    slots: &mut [Option<ConcordResult<Verdict>>],
) {
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => warn!("Verification task failed to join: {}", e),
        }
    }
}

async fn request_verification(
    dispatcher: &ResilientDispatcher,
    claim: &str,
    verifier_model: &str,
) -> ConcordResult<Verdict> {
    let prompt = prompts::verification_prompt(claim);

    let reply = dispatcher
        .query_one(verifier_model, &prompt, true)
        .await
        .map_err(|e| ConcordError::VerificationFailure {
            claim: claim.to_string(),
            reason: e.to_string(),
        })?;

    parse_json_output::<Verdict>(&reply.content, verifier_model).map_err(|e| {
        ConcordError::VerificationFailure {
            claim: claim.to_string(),
            reason: e.to_string(),
        }
    })
}

fn apply_verdict(mut claim: ExtractedClaim, result: ConcordResult<Verdict>) -> ExtractedClaim {
    match result {
        Ok(verdict) => {
            debug!(claim = %claim.text, status = %verdict.status, "Claim verified");
            claim.verification_status = verdict.status;
            if let Some(source) = verdict.source.filter(|s| !s.trim().is_empty()) {
                claim.source = Some(source);
            }
        }
        Err(e) => warn!("{}", e),
    }
    claim
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::ModelClient;
    use crate::resilience::{CircuitBreaker, RetryPolicy};
    use crate::types::ModelReply;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Extractor/verifier double keyed on prompt content.
    struct ScriptedClient {
        extraction: String,
        verify_delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(extraction: &str) -> Self {
            Self {
                extraction: extraction.to_string(),
                verify_delay: Duration::from_millis(20),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn query(&self, _model: &str, prompt: &str, _json: bool) -> ConcordResult<ModelReply> {
            if !prompt.starts_with("Verify this claim") {
                return Ok(ModelReply::new(self.extraction.clone()));
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.verify_delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let claim_line = prompt.lines().next().unwrap_or_default();
            if claim_line.contains("broken") {
                Ok(ModelReply::new("no idea"))
            } else if claim_line.contains("false") {
                Ok(ModelReply::new(r#"{"status": "verified_false"}"#))
            } else {
                Ok(ModelReply::new(
                    r#"{"status": "verified_true", "explanation": "ok", "source": "textbook"}"#,
                ))
            }
        }
    }

    fn engine(client: Arc<ScriptedClient>) -> ClaimEngine {
        let dispatcher = ResilientDispatcher::new(
            client,
            Arc::new(CircuitBreaker::new(100, Duration::from_secs(60))),
            RetryPolicy::none(),
            Duration::from_secs(5),
        );
        ClaimEngine::new(Arc::new(dispatcher))
    }

    fn responses() -> Vec<Response> {
        vec![Response::new("m1", "Paris"), Response::new("m2", "Lyon")]
    }

    #[tokio::test]
    async fn test_extract_claims() {
        let output = r#"{
            "claims": [
                {"claim": "The capital is Paris", "supporting_models": ["Response A"],
                 "contradicting_models": ["Response B"], "confidence": 0.8}
            ],
            "agreement_score": 0.4,
            "high_disagreement_claims": ["The capital is Paris"]
        }"#;
        let engine = engine(Arc::new(ScriptedClient::new(output)));

        let result = engine.extract_claims("Capital?", &responses(), "extractor").await;

        assert_eq!(result.claims.len(), 1);
        assert!(result.claims[0].is_contested());
        assert_eq!(result.agreement_score, 0.4);
        assert_eq!(result.contested_texts, vec!["The capital is Paris"]);
    }

    #[tokio::test]
    async fn test_extract_claims_degrades_to_neutral() {
        let engine = engine(Arc::new(ScriptedClient::new("I refuse to answer in JSON")));

        let result = engine.extract_claims("Capital?", &responses(), "extractor").await;

        assert!(result.claims.is_empty());
        assert_eq!(result.agreement_score, 0.5);
    }

    #[tokio::test]
    async fn test_verify_all_is_bounded_and_ordered() {
        let client = Arc::new(ScriptedClient::new("{}"));
        let engine = engine(Arc::clone(&client)).with_max_concurrent(2);

        let claims: Vec<ExtractedClaim> = ["a true one", "a false one", "broken", "another"]
            .iter()
            .map(|t| ExtractedClaim::new(*t))
            .collect();

        let verified = engine.verify_all(claims, "verifier").await;

        assert_eq!(verified[0].verification_status, VerificationStatus::VerifiedTrue);
        assert_eq!(verified[0].source.as_deref(), Some("textbook"));
        assert_eq!(verified[1].verification_status, VerificationStatus::VerifiedFalse);
        // malformed verdict leaves the claim untouched
        assert_eq!(verified[2].verification_status, VerificationStatus::Unverified);
        assert_eq!(verified[3].text, "another");
        assert!(client.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_verify_all_deadline_keeps_prior_status() {
        let mut client = ScriptedClient::new("{}");
        client.verify_delay = Duration::from_millis(500);
        let engine = engine(Arc::new(client)).with_verify_timeout(Duration::from_millis(30));

        let mut claim = ExtractedClaim::new("slow claim");
        claim.verification_status = VerificationStatus::Contested;

        let verified = engine.verify_all(vec![claim], "verifier").await;
        assert_eq!(verified[0].verification_status, VerificationStatus::Contested);
    }
}
