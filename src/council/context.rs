//! Shared state handed to every council run.

use std::sync::Arc;

use crate::cache::QueryCache;
use crate::calibration::CalibrationTracker;
use crate::resilience::CircuitBreaker;
use crate::types::config::Config;
use crate::ConcordResult;

/// Cache, circuit breaker and calibration store shared across runs.
///
/// Build one per process (or per test) and clone it into each [`Council`](super::Council);
/// clones share the same underlying state.
#[derive(Clone)]
pub struct CouncilContext {
    pub cache: Option<Arc<QueryCache>>,
    pub breaker: Arc<CircuitBreaker>,
    pub calibration: Option<Arc<CalibrationTracker>>,
}

impl CouncilContext {
    /// Context with a default breaker and neither cache nor calibration.
    pub fn new() -> Self {
        Self {
            cache: None,
            breaker: Arc::new(CircuitBreaker::default()),
            calibration: None,
        }
    }

    /// Builds the context described by `config`, opening the calibration store.
    pub fn from_config(config: &Config) -> ConcordResult<Self> {
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(QueryCache::new(config.cache.capacity, config.cache.ttl())));

        let calibration = if config.calibration.enabled {
            Some(Arc::new(CalibrationTracker::from_config(&config.calibration)?))
        } else {
            None
        };

        Ok(Self {
            cache,
            breaker: Arc::new(CircuitBreaker::from_config(&config.circuit_breaker)),
            calibration,
        })
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    #[must_use]
    pub fn with_calibration(mut self, tracker: Arc<CalibrationTracker>) -> Self {
        self.calibration = Some(tracker);
        self
    }
}

impl Default for CouncilContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_respects_switches() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.calibration.db_path = dir.path().join("nested").join("calibration.db");

        let context = CouncilContext::from_config(&config).unwrap();
        assert!(context.cache.is_some());
        assert!(context.calibration.is_some());
        assert!(config.calibration.db_path.exists());

        config.cache.enabled = false;
        config.calibration.enabled = false;
        let context = CouncilContext::from_config(&config).unwrap();
        assert!(context.cache.is_none());
        assert!(context.calibration.is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let context = CouncilContext::new();
        let clone = context.clone();

        context.breaker.record_failure("m");
        assert_eq!(clone.breaker.failure_count("m"), 1);
    }
}
