//! # Concord
//!
//! A council of language models that answers a question together.
//!
//! Every member answers independently, then ranks the anonymized answers of
//! its peers. Concord measures how much the judges agree, aggregates their
//! preferences into a single ranking, cross-checks the factual claims the
//! answers make and asks a chairman model to synthesize a final answer.
//! Predictions are stored so that each model's stated confidence can later
//! be compared with how often it was actually right.
//!
//! ## Modules
//!
//! - [`resilience`] - Fan-out dispatch with timeouts, retries, quorum and circuit breaking
//! - [`consensus`] - Domain classification, Kendall's W, factions, Bradley–Terry
//! - [`claims`] - Claim extraction, verification and contested-claim analysis
//! - [`calibration`] - SQLite-backed confidence calibration tracking
//! - [`council`] - The end-to-end council pipeline
//! - [`executors`] - The model client seam and a command-line client
//! - [`cache`] - LRU cache for model replies
//! - [`prompts`] - Prompt templates
//! - [`cli`] - Command line interface
//! - [`types`] - Shared types

pub mod cache;
pub mod calibration;
pub mod claims;
#[cfg(feature = "cli")]
pub mod cli;
pub mod consensus;
pub mod council;
pub mod executors;
pub mod prompts;
pub mod resilience;
pub mod types;

pub use types::config::Config;
pub use types::errors::{ConcordError, ConcordResult};
