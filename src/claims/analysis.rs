//! Claim-level agreement and display helpers.

use std::collections::HashMap;

use crate::types::{ClaimView, ExtractedClaim};

/// Claims with at least one supporting and one contradicting response.
pub fn identify_contested_claims(claims: &[ExtractedClaim]) -> Vec<ExtractedClaim> {
    claims.iter().filter(|c| c.is_contested()).cloned().collect()
}

/// Mean support ratio over claims that received any vote.
///
/// Returns 1.0 when there is nothing to disagree about.
pub fn compute_claim_agreement(claims: &[ExtractedClaim]) -> f64 {
    let ratios: Vec<f64> = claims
        .iter()
        .filter_map(|claim| {
            let supports = claim.supporting_labels.len();
            let total = supports + claim.contradicting_labels.len();
            (total > 0).then(|| supports as f64 / total as f64)
        })
        .collect();

    if ratios.is_empty() {
        1.0
    } else {
        ratios.iter().sum::<f64>() / ratios.len() as f64
    }
}

/// Resolves response labels to model names for display.
pub fn format_claims_for_display(
    claims: &[ExtractedClaim],
    label_to_model: &HashMap<String, String>,
) -> Vec<ClaimView> {
    let resolve = |labels: &[String]| -> Vec<String> {
        labels
            .iter()
            .map(|label| label_to_model.get(label).unwrap_or(label).clone())
            .collect()
    };

    claims
        .iter()
        .map(|claim| ClaimView {
            claim: claim.text.clone(),
            supporting: resolve(&claim.supporting_labels),
            contradicting: resolve(&claim.contradicting_labels),
            confidence: claim.confidence,
            status: claim.verification_status,
            source: claim.source.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VerificationStatus;

    fn sample_claims() -> Vec<ExtractedClaim> {
        vec![
            ExtractedClaim::new("Paris is the capital").supported_by(["Response A", "Response B"]),
            ExtractedClaim::new("Population is 3M")
                .supported_by(["Response A"])
                .contradicted_by(["Response B"]),
            ExtractedClaim::new("Founded in 300 BC").contradicted_by(["Response C"]),
            ExtractedClaim::new("Nobody voted"),
        ]
    }

    #[test]
    fn test_identify_contested_claims() {
        let contested = identify_contested_claims(&sample_claims());
        assert_eq!(contested.len(), 1);
        assert_eq!(contested[0].text, "Population is 3M");
    }

    #[test]
    fn test_compute_claim_agreement() {
        // (1.0 + 0.5 + 0.0) / 3; the unvoted claim is ignored
        let agreement = compute_claim_agreement(&sample_claims());
        assert!((agreement - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_compute_claim_agreement_edge_cases() {
        assert_eq!(compute_claim_agreement(&[]), 1.0);
        assert_eq!(compute_claim_agreement(&[ExtractedClaim::new("x")]), 1.0);
    }

    #[test]
    fn test_format_claims_for_display() {
        let labels = HashMap::from([
            ("Response A".to_string(), "openai/gpt-4o".to_string()),
            ("Response B".to_string(), "anthropic/claude".to_string()),
        ]);

        let views = format_claims_for_display(&sample_claims(), &labels);

        assert_eq!(views[1].supporting, vec!["openai/gpt-4o"]);
        assert_eq!(views[1].contradicting, vec!["anthropic/claude"]);
        // unknown labels pass through
        assert_eq!(views[2].contradicting, vec!["Response C"]);
        assert_eq!(views[0].status, VerificationStatus::Unverified);
    }
}
