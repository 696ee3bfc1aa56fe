//! Lenient answer matching.

/// Whether `prediction` counts as matching `ground_truth`.
///
/// Both sides are trimmed and lower-cased, then accepted on an exact match,
/// containment in either direction, or a shared first word longer than two
/// characters. An empty side is contained in anything.
pub fn is_correct(prediction: &str, ground_truth: &str) -> bool {
    let pred = prediction.trim().to_lowercase();
    let truth = ground_truth.trim().to_lowercase();

    if pred == truth {
        return true;
    }

    if pred.contains(&truth) || truth.contains(&pred) {
        return true;
    }

    match (pred.split_whitespace().next(), truth.split_whitespace().next()) {
        (Some(p), Some(t)) => p == t && t.chars().count() > 2,
        _ => false,
    }
}
