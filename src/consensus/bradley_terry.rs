//! Bradley–Terry preference scores.

use std::collections::BTreeMap;

use crate::types::{PairwiseComparison, Winner};

/// Default number of fixed-point iterations.
pub const DEFAULT_ITERATIONS: usize = 20;

const MIN_DENOMINATOR: f64 = 0.001;

/// Iteration settings for [`bradley_terry_scores_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BradleyTerryOptions {
    pub iterations: usize,

    /// Stop once the largest score change falls below this.
    pub tolerance: Option<f64>,
}

impl Default for BradleyTerryOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            tolerance: None,
        }
    }
}

/// Scores with default options.
pub fn bradley_terry_scores(comparisons: &[PairwiseComparison]) -> BTreeMap<String, f64> {
    bradley_terry_scores_with(comparisons, BradleyTerryOptions::default())
}

/// Scores every response mentioned in `comparisons`; the result sums to 1.
///
/// Each comparison adds its confidence as win weight for the winner; a tie
/// adds half of it in both directions.
pub fn bradley_terry_scores_with(
    comparisons: &[PairwiseComparison],
    options: BradleyTerryOptions,
) -> BTreeMap<String, f64> {
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    for c in comparisons {
        index.insert(c.response_a_id.as_str(), 0);
        index.insert(c.response_b_id.as_str(), 0);
    }
    if index.is_empty() {
        return BTreeMap::new();
    }
    for (i, slot) in index.values_mut().enumerate() {
        *slot = i;
    }

    let n = index.len();
    let mut wins = vec![vec![0.0_f64; n]; n];
    for c in comparisons {
        let a = index[c.response_a_id.as_str()];
        let b = index[c.response_b_id.as_str()];
        match c.winner {
            Winner::A => wins[a][b] += c.confidence,
            Winner::B => wins[b][a] += c.confidence,
            Winner::Tie => {
                wins[a][b] += 0.5 * c.confidence;
                wins[b][a] += 0.5 * c.confidence;
            }
        }
    }

    let uniform = 1.0 / n as f64;
    let mut scores = vec![1.0_f64; n];

    for iteration in 0..options.iterations {
        let mut next: Vec<f64> = (0..n)
            .map(|r| {
                let numerator: f64 = wins[r].iter().sum();
                let denominator: f64 = (0..n)
                    .filter(|&s| s != r)
                    .map(|s| (wins[r][s] + wins[s][r]) / (scores[r] + scores[s]))
                    .sum();
                numerator / denominator.max(MIN_DENOMINATOR)
            })
            .collect();

        let total: f64 = next.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            tracing::debug!("No win weight in comparisons, using uniform scores");
            scores = vec![uniform; n];
            break;
        }
        for s in &mut next {
            *s /= total;
        }

        let max_change = next
            .iter()
            .zip(&scores)
            .map(|(new, old)| (new - old).abs())
            .fold(0.0_f64, f64::max);
        scores = next;

        if let Some(tolerance) = options.tolerance {
            if max_change < tolerance {
                tracing::debug!(iteration, "Bradley-Terry converged");
                break;
            }
        }
    }

    // Zero iterations leaves the unnormalized start values.
    if options.iterations == 0 {
        scores = vec![uniform; n];
    }

    index
        .into_iter()
        .map(|(id, i)| (id.to_string(), scores[i]))
        .collect()
}
