//! Integration tests for calibration tracking.

use concord::calibration::{bucket_key, CalibrationTracker};
use tempfile::TempDir;

fn tracker_in(dir: &TempDir) -> CalibrationTracker {
    CalibrationTracker::new(&dir.path().join("nested").join("calibration.db"))
        .expect("Failed to open calibration store")
}

#[test]
fn test_predictions_survive_reopen() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    {
        let tracker = tracker_in(&dir);
        tracker
            .record_prediction("gpt-4o", "Capital of France?", 0.9, "Paris")
            .unwrap();
        tracker
            .record_prediction("llama-3", "Capital of France?", 0.7, "Lyon")
            .unwrap();
    }

    let tracker = tracker_in(&dir);
    assert_eq!(tracker.count().unwrap(), 2);

    let graded = tracker
        .record_outcome("Capital of France?", "Paris")
        .unwrap();
    assert_eq!(graded, 2);

    assert_eq!(tracker.get_model_accuracy("gpt-4o").unwrap(), Some(1.0));
    assert_eq!(tracker.get_model_accuracy("llama-3").unwrap(), Some(0.0));
}

#[test]
fn test_curve_buckets_and_brier() {
    let tracker = CalibrationTracker::in_memory().unwrap();

    tracker.record_prediction("m", "q1", 0.9, "yes").unwrap();
    tracker.record_prediction("m", "q2", 0.9, "no").unwrap();
    tracker.record_prediction("m", "q3", 0.6, "blue").unwrap();
    tracker.record_prediction("m", "q4", 0.6, "ungraded").unwrap();

    tracker.record_outcome("q1", "yes").unwrap();
    tracker.record_outcome("q2", "yes").unwrap();
    tracker.record_outcome("q3", "blue").unwrap();

    let curve = tracker.get_calibration_curve("m").unwrap();

    assert_eq!(curve.total_predictions, 3);
    assert_eq!(curve.buckets["0.9"], 0.5);
    assert_eq!(curve.buckets["0.6"], 1.0);

    // (0.1² + 0.9² + 0.4²) / 3
    let expected = (0.01 + 0.81 + 0.16) / 3.0;
    assert!((curve.brier_score.unwrap() - expected).abs() < 1e-9);
}

#[test]
fn test_repeat_prediction_replaces_and_clears_outcome() {
    let tracker = CalibrationTracker::in_memory().unwrap();

    tracker.record_prediction("m", "q", 0.8, "Paris").unwrap();
    tracker.record_outcome("q", "Paris").unwrap();
    tracker.record_prediction("m", "q", 0.55, "Rome").unwrap();

    let records = tracker.records("m").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].prediction, "Rome");
    assert!(records[0].correct.is_none());
    assert_eq!(tracker.get_model_accuracy("m").unwrap(), None);
}

#[test]
fn test_outcome_for_unknown_query_grades_nothing() {
    let tracker = CalibrationTracker::in_memory().unwrap();
    tracker.record_prediction("m", "q", 0.8, "Paris").unwrap();

    assert_eq!(tracker.record_outcome("other", "Paris").unwrap(), 0);
    assert_eq!(tracker.get_calibration_curve("m").unwrap().total_predictions, 0);
}

#[test]
fn test_all_models_are_listed_in_order() {
    let tracker = CalibrationTracker::in_memory().unwrap();
    tracker.record_prediction("zeta", "q", 0.7, "a").unwrap();
    tracker.record_prediction("alpha", "q", 0.7, "a").unwrap();
    tracker.record_outcome("q", "a").unwrap();

    let curves = tracker.get_all_models_calibration().unwrap();
    let models: Vec<&String> = curves.keys().collect();
    assert_eq!(models, vec!["alpha", "zeta"]);
    assert_eq!(curves["alpha"].buckets["0.7"], 1.0);
}

#[test]
fn test_bucket_edges() {
    assert_eq!(bucket_key(0.1), "0.5");
    assert_eq!(bucket_key(0.94), "0.9");
    assert_eq!(bucket_key(0.96), "1.0");
    assert_eq!(bucket_key(3.0), "1.0");
}
