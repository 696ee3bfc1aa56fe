//! Preference aggregation.
//!
//! Turns the judgments of the council into an ordered, weighted verdict:
//!
//! - **Kendall's W** measures how much the judges' rankings agree
//! - **Disagreement detection** splits judges into factions by top choice
//!   when W falls below the threshold
//! - **Domain-weighted aggregation** converts rankings into scores, weighting
//!   each judge by its expertise in the query's domain
//! - **Bradley–Terry** scores responses from pairwise comparisons
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use concord::consensus::{aggregate_rankings, compute_agreement, Domain};
//! use concord::types::RankingSubmission;
//!
//! let rankings = vec![
//!     RankingSubmission::new("judge-1", ["Response A", "Response B"]),
//!     RankingSubmission::new("judge-2", ["Response A", "Response B"]),
//! ];
//!
//! assert_eq!(compute_agreement(&rankings), 1.0);
//!
//! let scores = aggregate_rankings(&rankings, &HashMap::new(), Domain::Factual);
//! assert_eq!(scores[0].response_id, "Response A");
//! ```

mod aggregator;
mod bradley_terry;
mod concordance;
mod domain;
mod engine;
mod judge;

pub use aggregator::{aggregate_rankings, RankingAggregator};
pub use bradley_terry::{
    bradley_terry_scores, bradley_terry_scores_with, BradleyTerryOptions, DEFAULT_ITERATIONS,
};
pub use concordance::{
    compute_agreement, detect_disagreement, kendalls_w, DEFAULT_DISAGREEMENT_THRESHOLD,
    UNKNOWN_POSITION,
};
pub use domain::{classify_domain, expertise_weight, Domain, DEFAULT_EXPERTISE_WEIGHT};
pub use engine::{PreferenceAggregator, PreferenceReport, NEUTRAL_AGREEMENT};
pub use judge::{
    extract_response_labels, parse_pairwise, parse_ranking, Parsed, FALLBACK_CONFIDENCE,
};
