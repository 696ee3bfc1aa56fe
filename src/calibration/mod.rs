//! Calibration tracking.
//!
//! Every council run records each member's answer together with a stated
//! confidence. Once the true answer is known, [`CalibrationTracker::record_outcome`]
//! grades the stored answers, and calibration curves compare confidence
//! with observed accuracy.

mod correctness;
mod tracker;

pub use correctness::is_correct;
pub use tracker::{bucket_key, CalibrationCurve, CalibrationRecord, CalibrationTracker};
