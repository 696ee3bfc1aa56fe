//! Shared types.

pub mod claims;
pub mod config;
pub mod errors;
pub mod judgments;
pub mod responses;

pub use claims::{ClaimExtraction, ClaimView, ExtractedClaim, VerificationStatus};
pub use judgments::{
    AggregatedScore, DisagreementResult, Faction, PairwiseComparison, RankingSubmission, Winner,
};
pub use responses::{response_label, response_labels, ModelReply, Response};
