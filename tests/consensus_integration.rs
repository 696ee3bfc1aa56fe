//! Integration tests for preference aggregation.

use std::collections::HashMap;

use concord::consensus::{
    aggregate_rankings, bradley_terry_scores, bradley_terry_scores_with, classify_domain,
    compute_agreement, detect_disagreement, parse_pairwise, parse_ranking, BradleyTerryOptions,
    Domain, Parsed, PreferenceAggregator,
};
use concord::types::config::AggregationConfig;
use concord::types::{PairwiseComparison, RankingSubmission, Winner};

fn ranking(judge: &str, items: &[&str]) -> RankingSubmission {
    RankingSubmission::new(judge, items.iter().copied())
}

fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(l, m)| (l.to_string(), m.to_string()))
        .collect()
}

mod domain_tests {
    use super::*;

    #[test]
    fn test_classification_by_keyword() {
        assert_eq!(classify_domain("Fix this Python function"), Domain::Code);
        assert_eq!(classify_domain("Prove the theorem"), Domain::Math);
        assert_eq!(classify_domain("Write a poem about rain"), Domain::Creative);
        assert_eq!(classify_domain("Explain tides"), Domain::Reasoning);
        assert_eq!(classify_domain("Capital of Peru?"), Domain::Factual);
    }

    #[test]
    fn test_code_wins_over_later_families() {
        // "explain" is a reasoning keyword, "bug" a code keyword
        assert_eq!(classify_domain("Explain this bug"), Domain::Code);
    }
}

mod agreement_tests {
    use super::*;

    #[test]
    fn test_unanimous_council_has_consensus() {
        let rankings = vec![
            ranking("gpt-4o", &["Response A", "Response B", "Response C"]),
            ranking("claude-3", &["Response A", "Response B", "Response C"]),
            ranking("gemini-pro", &["Response A", "Response B", "Response C"]),
        ];

        let result = detect_disagreement(&rankings, 0.5);

        assert!(result.has_consensus);
        assert!((result.agreement_score - 1.0).abs() < 1e-9);
        assert!(result.factions.is_empty());
    }

    #[test]
    fn test_split_council_forms_factions() {
        let rankings = vec![
            ranking("j1", &["A", "B", "C"]),
            ranking("j2", &["B", "A", "C"]),
            ranking("j3", &["C", "B", "A"]),
        ];

        let w = compute_agreement(&rankings);
        assert!((w - 2.0 / 18.0).abs() < 1e-9);

        let result = detect_disagreement(&rankings, 0.5);
        assert!(!result.has_consensus);
        let positions: Vec<&str> = result.factions.iter().map(|f| f.position.as_str()).collect();
        assert_eq!(positions, vec!["A", "B", "C"]);
        assert_eq!(result.factions[0].members, vec!["j1"]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let rankings = vec![ranking("j1", &["A", "B"]), ranking("j2", &["B", "A"])];
        assert!(detect_disagreement(&rankings, 0.0).has_consensus);
    }
}

mod aggregation_tests {
    use super::*;

    #[test]
    fn test_expert_judge_outweighs_weaker_one() {
        let rankings = vec![
            ranking("openai/gpt-4o", &["Response A", "Response B"]),
            ranking("google/gemma-2", &["Response B", "Response A"]),
        ];
        let map = labels(&[("Response A", "alpha"), ("Response B", "beta")]);

        let scores = aggregate_rankings(&rankings, &map, Domain::Code);

        assert_eq!(scores[0].response_id, "Response A");
        assert_eq!(scores[0].model_name, "alpha");
        assert!((scores[0].weighted_score - 2.3 / 1.4).abs() < 1e-9);
        assert!((scores[1].weighted_score - 1.9 / 1.4).abs() < 1e-9);
        assert_eq!(scores[0].votes_first, 1);
        assert_eq!(scores[0].votes_last, 1);
        assert_eq!(scores[1].rank, 2);
    }

    #[test]
    fn test_ties_keep_first_appearance_order() {
        let rankings = vec![ranking("j1", &["X", "Y"]), ranking("j2", &["Y", "X"])];

        let scores = aggregate_rankings(&rankings, &HashMap::new(), Domain::Factual);

        assert_eq!(scores[0].response_id, "X");
        assert_eq!(scores[1].response_id, "Y");
        assert_eq!(scores[0].weighted_score, scores[1].weighted_score);
    }

    #[test]
    fn test_evaluate_without_rankings_is_neutral() {
        let aggregator = PreferenceAggregator::new(AggregationConfig::default());

        let report = aggregator.evaluate(&[], &HashMap::new(), Domain::Factual);

        assert_eq!(report.agreement_score, 0.5);
        assert!(report.scores.is_empty());
        assert_eq!(report.confidence_mean, 0.0);
    }
}

mod bradley_terry_tests {
    use super::*;

    #[test]
    fn test_consistent_winner_scores_highest() {
        let mut comparisons = vec![
            PairwiseComparison::new("A", "B", Winner::A, 1.0),
            PairwiseComparison::new("A", "B", Winner::A, 1.0),
            PairwiseComparison::new("A", "B", Winner::A, 1.0),
            PairwiseComparison::new("A", "B", Winner::B, 1.0),
        ];
        comparisons.push(PairwiseComparison::new("B", "C", Winner::B, 0.8));

        let scores = bradley_terry_scores(&comparisons);

        assert!(scores["A"] > scores["B"]);
        assert!(scores["B"] > scores["C"]);
        let total: f64 = scores.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tolerance_stops_early_with_same_ordering() {
        let comparisons = vec![
            PairwiseComparison::new("A", "B", Winner::A, 0.9),
            PairwiseComparison::new("B", "A", Winner::B, 0.6),
        ];
        let options = BradleyTerryOptions {
            iterations: 500,
            tolerance: Some(1e-6),
        };

        let scores = bradley_terry_scores_with(&comparisons, options);
        assert!(scores["A"] > scores["B"]);
    }

    #[test]
    fn test_all_ties_are_uniform() {
        let comparisons = vec![PairwiseComparison::new("A", "B", Winner::Tie, 0.0)];
        let scores = bradley_terry_scores(&comparisons);
        assert_eq!(scores["A"], 0.5);
        assert_eq!(scores["B"], 0.5);
    }
}

mod judge_parsing_tests {
    use super::*;

    #[test]
    fn test_ranking_from_prose() {
        let parsed = parse_ranking(
            "Response C is clearly best, followed by Response A. Response C again.",
            "judge",
        );

        match parsed {
            Parsed::Heuristic(submission) => {
                assert_eq!(submission.ranking, vec!["Response C", "Response A"]);
                assert_eq!(submission.confidence, 0.5);
            }
            other => panic!("expected heuristic ranking, got {:?}", other),
        }
    }

    #[test]
    fn test_ranking_from_json_with_chatter() {
        let output = r#"Sure! {"rankings": ["Response B", "Response A"], "confidence": 0.9,
            "reasoning": "B is precise", "dissent": "A misreads the question"} Hope that helps."#;

        let submission = parse_ranking(output, "judge").into_option().unwrap();

        assert_eq!(submission.top_choice(), Some("Response B"));
        assert_eq!(submission.confidence, 0.9);
        assert_eq!(submission.dissent.as_deref(), Some("A misreads the question"));
    }

    #[test]
    fn test_pairwise_prose_and_blank() {
        let parsed = parse_pairwise("Response B is better overall", "judge", "R1", "R2");
        let comparison = parsed.into_option().unwrap();
        assert_eq!(comparison.winner, Winner::B);
        assert_eq!(comparison.response_a_id, "R1");

        assert!(parse_pairwise("   ", "judge", "R1", "R2").is_empty());
    }
}
