//! Domain-weighted rank aggregation.
//!
//! Responsible for:
//! - Turning each judge's ordering into rank points
//! - Weighting points by judge expertise and stated confidence
//! - Counting first- and last-place votes
//! - Producing the final ordered scores

use std::collections::HashMap;

use crate::types::{AggregatedScore, RankingSubmission};

use super::domain::{expertise_weight, Domain};

const MIN_WEIGHT_TOTAL: f64 = 0.001;

#[derive(Debug, Default)]
struct Tally {
    weighted_sum: f64,
    weight_total: f64,
    first: usize,
    last: usize,
}

/// Rank aggregator.
pub struct RankingAggregator;

impl RankingAggregator {
    /// Aggregates rankings into scores ordered best first.
    ///
    /// # Arguments
    ///
    /// * `rankings` - One submission per judge
    /// * `label_to_model` - Maps response labels to the models that wrote them
    /// * `domain` - Domain used to look up judge expertise
    pub fn aggregate(
        rankings: &[RankingSubmission],
        label_to_model: &HashMap<String, String>,
        domain: Domain,
    ) -> Vec<AggregatedScore> {
        let mut order: Vec<&str> = Vec::new();
        let mut tallies: HashMap<&str, Tally> = HashMap::new();

        for submission in rankings {
            let weight = expertise_weight(&submission.judge_model, domain) * submission.confidence;
            let n = submission.ranking.len();

            for (rank_idx, response) in submission.ranking.iter().enumerate() {
                let tally = tallies.entry(response.as_str()).or_insert_with(|| {
                    order.push(response.as_str());
                    Tally::default()
                });

                // 1st place earns n points, last place earns 1
                let points = (n - rank_idx) as f64;
                tally.weighted_sum += points * weight;
                tally.weight_total += weight;

                if rank_idx == 0 {
                    tally.first += 1;
                }
                if rank_idx == n - 1 {
                    tally.last += 1;
                }
            }
        }

        let mut results: Vec<AggregatedScore> = order
            .into_iter()
            .map(|response| {
                let tally = &tallies[response];
                AggregatedScore {
                    response_id: response.to_string(),
                    model_name: Self::model_name(label_to_model, response),
                    raw_score: tally.weighted_sum,
                    weighted_score: tally.weighted_sum / tally.weight_total.max(MIN_WEIGHT_TOTAL),
                    rank: 0,
                    votes_first: tally.first,
                    votes_last: tally.last,
                }
            })
            .collect();

        // Stable sort keeps first-appearance order for ties.
        results.sort_by(|a, b| b.weighted_score.total_cmp(&a.weighted_score));
        for (i, score) in results.iter_mut().enumerate() {
            score.rank = i + 1;
        }

        results
    }

    /// Resolves a response label, falling back to the label itself.
    pub fn model_name(label_to_model: &HashMap<String, String>, label: &str) -> String {
        label_to_model
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }

    /// The winning response, if any ranking was submitted.
    pub fn winner(scores: &[AggregatedScore]) -> Option<&AggregatedScore> {
        scores.first()
    }

    /// Renders scores as a short text table.
    pub fn format_scores(scores: &[AggregatedScore]) -> String {
        let mut out = String::new();
        for score in scores {
            out.push_str(&format!(
                "{}. {} ({}) score {:.3} | first {} | last {}\n",
                score.rank,
                score.model_name,
                score.response_id,
                score.weighted_score,
                score.votes_first,
                score.votes_last
            ));
        }
        out
    }
}

/// Aggregates rankings into scores ordered best first.
pub fn aggregate_rankings(
    rankings: &[RankingSubmission],
    label_to_model: &HashMap<String, String>,
    domain: Domain,
) -> Vec<AggregatedScore> {
    RankingAggregator::aggregate(rankings, label_to_model, domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> HashMap<String, String> {
        [
            ("Response A", "openai/gpt-4o"),
            ("Response B", "anthropic/claude"),
            ("Response C", "meta/llama"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_single_judge_order() {
        let rankings = vec![RankingSubmission::new(
            "judge",
            ["Response A", "Response B", "Response C"],
        )];

        let scores = aggregate_rankings(&rankings, &labels(), Domain::Factual);

        assert_eq!(scores.len(), 3);
        assert!(scores[0].weighted_score > scores[1].weighted_score);
        assert!(scores[1].weighted_score > scores[2].weighted_score);
        assert_eq!(
            scores.iter().map(|s| s.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(scores[0].model_name, "openai/gpt-4o");
        assert_eq!(scores[0].weighted_score, 3.0);
        assert_eq!(scores[0].votes_first, 1);
        assert_eq!(scores[2].votes_last, 1);
    }

    #[test]
    fn test_expertise_shifts_outcome() {
        // In math, deepseek (0.9) outweighs gemma (0.4)
        let rankings = vec![
            RankingSubmission::new("deepseek-r1", ["Response B", "Response A"]),
            RankingSubmission::new("gemma-2", ["Response A", "Response B"]),
        ];

        let scores = aggregate_rankings(&rankings, &labels(), Domain::Math);

        assert_eq!(scores[0].response_id, "Response B");
        assert_eq!(scores[0].votes_first, 1);
        assert_eq!(scores[1].votes_first, 1);
        let expected_raw = 2.0 * 0.9 + 1.0 * 0.4;
        assert!((scores[0].raw_score - expected_raw).abs() < 1e-9);
    }

    #[test]
    fn test_ties_keep_first_appearance() {
        let rankings = vec![
            RankingSubmission::new("j1", ["Response B", "Response A"]),
            RankingSubmission::new("j2", ["Response A", "Response B"]),
        ];

        let scores = aggregate_rankings(&rankings, &HashMap::new(), Domain::Factual);

        assert_eq!(scores[0].response_id, "Response B");
        assert_eq!(scores[1].response_id, "Response A");
        assert_eq!(scores[0].model_name, "Response B");
    }

    #[test]
    fn test_zero_confidence_does_not_divide_by_zero() {
        let rankings =
            vec![RankingSubmission::new("judge", ["Response A", "Response B"]).with_confidence(0.0)];

        let scores = aggregate_rankings(&rankings, &labels(), Domain::Code);

        assert!(scores.iter().all(|s| s.weighted_score == 0.0));
        assert_eq!(scores[0].rank, 1);
    }

    #[test]
    fn test_format_scores() {
        let rankings = vec![RankingSubmission::new("judge", ["Response A", "Response B"])];
        let scores = aggregate_rankings(&rankings, &labels(), Domain::Factual);

        let text = RankingAggregator::format_scores(&scores);
        assert!(text.starts_with("1. openai/gpt-4o (Response A)"));
        assert_eq!(RankingAggregator::winner(&scores).unwrap().rank, 1);
    }
}
