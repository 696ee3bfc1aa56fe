//! Kendall's W and disagreement detection.

use std::collections::HashMap;

use crate::types::{DisagreementResult, Faction, RankingSubmission};

/// Default Kendall's W threshold for consensus.
pub const DEFAULT_DISAGREEMENT_THRESHOLD: f64 = 0.5;

/// Faction key for judges that submitted an empty ranking.
pub const UNKNOWN_POSITION: &str = "unknown";

/// Kendall's coefficient of concordance over the judges' rankings.
///
/// Returns a value in [0, 1]; 1.0 when there are fewer than two judges or
/// fewer than two items. The item set is the union of every judge's
/// ranking, and an item a judge left out counts as that judge's worst rank.
pub fn kendalls_w(rankings: &[RankingSubmission]) -> f64 {
    if rankings.len() < 2 {
        return 1.0;
    }

    let mut items: Vec<&str> = Vec::new();
    for submission in rankings {
        for item in &submission.ranking {
            if !items.contains(&item.as_str()) {
                items.push(item);
            }
        }
    }

    let n_items = items.len();
    if n_items < 2 {
        return 1.0;
    }
    let n_judges = rankings.len() as f64;

    let mut rank_sums = vec![0.0_f64; n_items];
    for submission in rankings {
        let mut ranks: HashMap<&str, usize> = HashMap::new();
        for (i, item) in submission.ranking.iter().enumerate() {
            ranks.entry(item.as_str()).or_insert(i + 1);
        }
        for (sum, item) in rank_sums.iter_mut().zip(&items) {
            *sum += ranks.get(item).copied().unwrap_or(n_items) as f64;
        }
    }

    let mean = rank_sums.iter().sum::<f64>() / n_items as f64;
    let s: f64 = rank_sums.iter().map(|rs| (rs - mean).powi(2)).sum();

    let n = n_items as f64;
    let s_max = n_judges.powi(2) * (n.powi(3) - n) / 12.0;

    if s_max > 0.0 {
        (s / s_max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Agreement among judges; alias for [`kendalls_w`].
pub fn compute_agreement(rankings: &[RankingSubmission]) -> f64 {
    kendalls_w(rankings)
}

/// Checks for consensus and, failing that, groups judges by top choice.
pub fn detect_disagreement(rankings: &[RankingSubmission], threshold: f64) -> DisagreementResult {
    let w = kendalls_w(rankings);

    if w >= threshold {
        return DisagreementResult {
            has_consensus: true,
            agreement_score: w,
            factions: Vec::new(),
            recommendation: "Council reached consensus".to_string(),
        };
    }

    let mut factions: Vec<Faction> = Vec::new();
    for submission in rankings {
        let position = submission.top_choice().unwrap_or(UNKNOWN_POSITION);
        match factions.iter_mut().find(|f| f.position == position) {
            Some(faction) => faction.members.push(submission.judge_model.clone()),
            None => factions.push(Faction {
                position: position.to_string(),
                members: vec![submission.judge_model.clone()],
            }),
        }
    }

    tracing::info!(
        agreement = w,
        factions = factions.len(),
        "Council disagrees"
    );

    DisagreementResult {
        has_consensus: false,
        agreement_score: w,
        factions,
        recommendation: "Council disagrees. Review competing positions.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranking(judge: &str, items: &[&str]) -> RankingSubmission {
        RankingSubmission::new(judge, items.iter().copied())
    }

    #[test]
    fn test_trivial_cases() {
        assert_eq!(kendalls_w(&[]), 1.0);
        assert_eq!(kendalls_w(&[ranking("j1", &["A", "B", "C"])]), 1.0);
        assert_eq!(
            kendalls_w(&[ranking("j1", &["A"]), ranking("j2", &["A"])]),
            1.0
        );
    }

    #[test]
    fn test_perfect_agreement() {
        let rankings = vec![
            ranking("j1", &["A", "B", "C"]),
            ranking("j2", &["A", "B", "C"]),
            ranking("j3", &["A", "B", "C"]),
        ];
        assert!((kendalls_w(&rankings) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_complete_disagreement() {
        let rankings = vec![ranking("j1", &["A", "B"]), ranking("j2", &["B", "A"])];
        assert!(kendalls_w(&rankings).abs() < 1e-9);
    }

    #[test]
    fn test_judge_order_invariance() {
        let rankings = vec![
            ranking("j1", &["A", "B", "C", "D"]),
            ranking("j2", &["B", "A", "D"]),
            ranking("j3", &["C", "A", "B", "D"]),
        ];
        let mut reversed = rankings.clone();
        reversed.reverse();

        let w = kendalls_w(&rankings);
        assert!((w - kendalls_w(&reversed)).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&w));
    }

    #[test]
    fn test_union_of_items() {
        // j2 omits C and the first judge's list does not contain D
        let rankings = vec![ranking("j1", &["A", "B", "C"]), ranking("j2", &["D", "A"])];
        let w = kendalls_w(&rankings);
        assert!((0.0..=1.0).contains(&w));
    }

    #[test]
    fn test_consensus() {
        let rankings = vec![ranking("j1", &["A", "B"]), ranking("j2", &["A", "B"])];
        let result = detect_disagreement(&rankings, DEFAULT_DISAGREEMENT_THRESHOLD);

        assert!(result.has_consensus);
        assert!(result.factions.is_empty());
        assert_eq!(result.recommendation, "Council reached consensus");
    }

    #[test]
    fn test_factions() {
        let rankings = vec![
            ranking("j1", &["A", "B"]),
            ranking("j2", &["B", "A"]),
            ranking("j3", &["A", "B"]),
            ranking("j4", &[]),
        ];
        let result = detect_disagreement(&rankings, 0.99);

        assert!(!result.has_consensus);
        assert_eq!(
            result.factions,
            vec![
                Faction {
                    position: "A".into(),
                    members: vec!["j1".into(), "j3".into()],
                },
                Faction {
                    position: "B".into(),
                    members: vec!["j2".into()],
                },
                Faction {
                    position: "unknown".into(),
                    members: vec!["j4".into()],
                },
            ]
        );
        assert_eq!(
            result.recommendation,
            "Council disagrees. Review competing positions."
        );
    }
}
