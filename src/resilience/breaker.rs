//! Per-model circuit breaker.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::types::config::CircuitBreakerConfig;

/// Failure bookkeeping for one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircuitState {
    /// Failures since the last success or recovery.
    pub consecutive_failures: u32,

    /// Set while the model is excluded.
    pub open_until: Option<Instant>,
}

/// Excludes models that keep failing.
///
/// After `failure_threshold` consecutive failures a model is excluded for
/// `recovery_timeout`. Once the cooldown has elapsed the model is admitted
/// again with a fresh counter; there is no half-open trial call.
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    states: Mutex<HashMap<String, CircuitState>>,
}

impl CircuitBreaker {
    /// Creates a new circuit breaker.
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a circuit breaker from configuration.
    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.failure_threshold, config.recovery_timeout())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CircuitState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Checks whether `model` is currently excluded.
    ///
    /// An elapsed cooldown closes the circuit and resets the counter.
    pub fn is_open(&self, model: &str) -> bool {
        let mut states = self.lock();
        let Some(state) = states.get_mut(model) else {
            return false;
        };

        match state.open_until {
            Some(until) if Instant::now() >= until => {
                state.open_until = None;
                state.consecutive_failures = 0;
                tracing::info!(model, "Circuit closed after recovery timeout");
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Records a successful call.
    pub fn record_success(&self, model: &str) {
        let mut states = self.lock();
        if let Some(state) = states.get_mut(model) {
            state.consecutive_failures = 0;
        }
    }

    /// Records a failed call, opening the circuit at the threshold.
    pub fn record_failure(&self, model: &str) {
        let mut states = self.lock();
        let state = states.entry(model.to_string()).or_default();
        state.consecutive_failures += 1;

        if state.consecutive_failures >= self.failure_threshold && state.open_until.is_none() {
            state.open_until = Some(Instant::now() + self.recovery_timeout);
            tracing::warn!(
                model,
                failures = state.consecutive_failures,
                recovery_secs = self.recovery_timeout.as_secs_f64(),
                "Circuit opened"
            );
        }
    }

    /// Filters out models with open circuits, preserving order.
    pub fn available_models(&self, models: &[String]) -> Vec<String> {
        models
            .iter()
            .filter(|m| !self.is_open(m))
            .cloned()
            .collect()
    }

    /// Current consecutive failure count for `model`.
    pub fn failure_count(&self, model: &str) -> u32 {
        self.lock()
            .get(model)
            .map(|s| s.consecutive_failures)
            .unwrap_or(0)
    }

    /// Snapshot of the state for `model`.
    pub fn state(&self, model: &str) -> CircuitState {
        self.lock().get(model).cloned().unwrap_or_default()
    }

    /// Forgets everything known about `model`.
    pub fn reset(&self, model: &str) {
        self.lock().remove(model);
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::from_config(&CircuitBreakerConfig::default())
    }
}
