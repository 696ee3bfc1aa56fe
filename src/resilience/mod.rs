//! Fault-tolerant model dispatch.
//!
//! Every model call goes through the same layers, outermost first:
//! circuit breaker, per-model timeout, cache lookup, retry with backoff,
//! and finally the [`ModelClient`](crate::executors::ModelClient) itself.
//! Fan-out results come back in input order together with the failed and
//! skipped model ids.

mod breaker;
mod dispatcher;
mod retry;

pub use breaker::{CircuitBreaker, CircuitState};
pub use dispatcher::{collect_fan_out, run_fan_out, FanOut, Quorum, ResilientDispatcher};
pub use retry::{with_retry, with_timeout, Backoff, RetryPolicy};
