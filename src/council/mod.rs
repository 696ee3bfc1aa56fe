//! Council orchestration.
//!
//! A [`Council`] composes dispatch, preference aggregation, claim analysis
//! and calibration tracking into one run per query. Long-lived state lives
//! in a [`CouncilContext`] so that several councils (or tests) can share or
//! isolate it explicitly.

mod context;
mod orchestrator;
mod outcome;

pub use context::CouncilContext;
pub use orchestrator::{scores_by_model, Council};
pub use outcome::{CouncilMetrics, CouncilOutcome, OutcomeStatus, Synthesis};
