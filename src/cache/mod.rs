//! Query cache for model answers.
//!
//! Entries are keyed by a hash of (model, query), expire by age from
//! insertion (checked lazily on read or by an explicit sweep) and are
//! additionally bounded by an LRU capacity.

mod query;

pub use query::{CacheEntry, CacheStats, QueryCache};
