//! Atomic claim extraction and cross-verification.
//!
//! An extractor model lists the factual claims made across the council's
//! responses together with which responses support or contradict each one.
//! Claims can then be re-checked independently by a verifier model.
//! Every model failure in this module degrades to a conservative result
//! instead of an error.

mod analysis;
mod engine;

pub use analysis::{compute_claim_agreement, format_claims_for_display, identify_contested_claims};
pub use engine::{ClaimEngine, DEFAULT_MAX_CONCURRENT};
