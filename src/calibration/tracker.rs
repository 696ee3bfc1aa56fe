//! Persistent calibration tracking.
//!
//! Stores each model's stated confidence next to what it predicted, back-fills
//! correctness once the true answer is known, and reports how well stated
//! confidence matched reality.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::config::CalibrationConfig;
use crate::types::judgments::clamp_unit;
use crate::ConcordResult;

use super::correctness::is_correct;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS predictions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        model TEXT NOT NULL,
        query_hash TEXT NOT NULL,
        stated_confidence REAL NOT NULL,
        prediction TEXT NOT NULL,
        ground_truth TEXT,
        correct INTEGER,
        timestamp TEXT NOT NULL,
        UNIQUE(model, query_hash)
    );

    CREATE INDEX IF NOT EXISTS idx_model ON predictions(model);
    CREATE INDEX IF NOT EXISTS idx_query_hash ON predictions(query_hash);
"#;

/// One stored prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub model: String,
    pub query_hash: String,
    pub stated_confidence: f64,
    pub prediction: String,
    pub ground_truth: Option<String>,
    /// Set once an outcome has been recorded.
    pub correct: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

/// Stated confidence against observed accuracy for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationCurve {
    pub model: String,

    /// Confidence bucket ("0.5".."1.0") to accuracy; only non-empty buckets.
    pub buckets: BTreeMap<String, f64>,

    /// Predictions with a known outcome.
    pub total_predictions: usize,

    /// Mean squared error of confidence vs. correctness; lower is better.
    pub brier_score: Option<f64>,
}

impl CalibrationCurve {
    fn empty(model: &str) -> Self {
        Self {
            model: model.to_string(),
            buckets: BTreeMap::new(),
            total_predictions: 0,
            brier_score: None,
        }
    }
}

/// SQLite-backed calibration store.
pub struct CalibrationTracker {
    conn: Mutex<Connection>,
}

impl CalibrationTracker {
    /// Opens or creates the store at `db_path`, creating parent directories.
    pub fn new(db_path: &Path) -> ConcordResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::with_connection(Connection::open(db_path)?)
    }

    /// Opens the store configured in `config`.
    pub fn from_config(config: &CalibrationConfig) -> ConcordResult<Self> {
        Self::new(&config.db_path)
    }

    /// Creates a throwaway in-memory store.
    pub fn in_memory() -> ConcordResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> ConcordResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// First 16 hex characters of the SHA-256 of `query`.
    pub fn query_hash(query: &str) -> String {
        let digest = Sha256::digest(query.as_bytes());
        hex::encode(digest)[..16].to_string()
    }

    /// Stores a prediction, replacing any earlier one by `model` for `query`.
    ///
    /// Replacing also clears a previously recorded outcome.
    pub fn record_prediction(
        &self,
        model: &str,
        query: &str,
        stated_confidence: f64,
        prediction: &str,
    ) -> ConcordResult<()> {
        let query_hash = Self::query_hash(query);
        let timestamp = Utc::now().to_rfc3339();

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO predictions
             (model, query_hash, stated_confidence, prediction, timestamp)
             VALUES (?, ?, ?, ?, ?)",
            params![
                model,
                query_hash,
                clamp_unit(stated_confidence),
                prediction,
                timestamp
            ],
        )?;
        tx.commit()?;

        tracing::debug!(model, query_hash = %query_hash, "Prediction recorded");
        Ok(())
    }

    /// Records the true answer for `query`, grading every stored prediction.
    ///
    /// Returns the number of rows updated.
    pub fn record_outcome(&self, query: &str, ground_truth: &str) -> ConcordResult<usize> {
        let query_hash = Self::query_hash(query);

        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let rows: Vec<(i64, String)> = {
            let mut stmt = tx.prepare("SELECT id, prediction FROM predictions WHERE query_hash = ?")?;
            let rows = stmt
                .query_map(params![query_hash], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut updated = 0;
        for (id, prediction) in &rows {
            let correct = is_correct(prediction, ground_truth);
            updated += tx.execute(
                "UPDATE predictions SET ground_truth = ?, correct = ? WHERE id = ?",
                params![ground_truth, correct, id],
            )?;
        }
        tx.commit()?;

        tracing::info!(query_hash = %query_hash, updated, "Outcome recorded");
        Ok(updated)
    }

    /// Bucketed accuracy and Brier score over graded predictions of `model`.
    pub fn get_calibration_curve(&self, model: &str) -> ConcordResult<CalibrationCurve> {
        let rows: Vec<(f64, bool)> = {
            let conn = self.lock();
            let mut stmt = conn.prepare(
                "SELECT stated_confidence, correct FROM predictions
                 WHERE model = ? AND correct IS NOT NULL",
            )?;
            let rows = stmt
                .query_map(params![model], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        if rows.is_empty() {
            return Ok(CalibrationCurve::empty(model));
        }

        let mut tallies: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        let mut brier_sum = 0.0;

        for (confidence, correct) in &rows {
            let tally = tallies.entry(bucket_key(*confidence)).or_insert((0, 0));
            tally.1 += 1;
            if *correct {
                tally.0 += 1;
            }

            let outcome = if *correct { 1.0 } else { 0.0 };
            brier_sum += (confidence - outcome).powi(2);
        }

        let buckets = tallies
            .into_iter()
            .map(|(key, (correct, total))| (key, correct as f64 / total as f64))
            .collect();

        Ok(CalibrationCurve {
            model: model.to_string(),
            buckets,
            total_predictions: rows.len(),
            brier_score: Some(brier_sum / rows.len() as f64),
        })
    }

    /// Curves for every model with stored predictions.
    pub fn get_all_models_calibration(&self) -> ConcordResult<BTreeMap<String, CalibrationCurve>> {
        let models: Vec<String> = {
            let conn = self.lock();
            let mut stmt = conn.prepare("SELECT DISTINCT model FROM predictions ORDER BY model")?;
            let models = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            models
        };

        models
            .into_iter()
            .map(|model| -> ConcordResult<(String, CalibrationCurve)> {
                let curve = self.get_calibration_curve(&model)?;
                Ok((model, curve))
            })
            .collect()
    }

    /// Fraction of graded predictions that were correct.
    pub fn get_model_accuracy(&self, model: &str) -> ConcordResult<Option<f64>> {
        let conn = self.lock();
        let accuracy: Option<f64> = conn.query_row(
            "SELECT AVG(correct) FROM predictions WHERE model = ? AND correct IS NOT NULL",
            params![model],
            |row| row.get(0),
        )?;
        Ok(accuracy)
    }

    /// Stored predictions of `model`, newest first.
    pub fn records(&self, model: &str) -> ConcordResult<Vec<CalibrationRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT model, query_hash, stated_confidence, prediction, ground_truth, correct, timestamp
             FROM predictions WHERE model = ?
             ORDER BY timestamp DESC, id DESC",
        )?;

        let records = stmt
            .query_map(params![model], |row| {
                Ok(CalibrationRecord {
                    model: row.get(0)?,
                    query_hash: row.get(1)?,
                    stated_confidence: row.get(2)?,
                    prediction: row.get(3)?,
                    ground_truth: row.get(4)?,
                    correct: row.get(5)?,
                    timestamp: row.get::<_, String>(6)?.parse::<DateTime<Utc>>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e))
                    })?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Total stored predictions.
    pub fn count(&self) -> ConcordResult<usize> {
        let count: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Confidence bucket label: rounded to one decimal and clamped to [0.5, 1.0].
///
/// Rounding works on the exact binary value, so 0.85 (stored as 0.8499...)
/// lands in "0.8".
pub fn bucket_key(confidence: f64) -> String {
    let rounded: f64 = format!("{:.1}", confidence).parse().unwrap_or(confidence);
    format!("{:.1}", rounded.clamp(0.5, 1.0))
}
