// ── Query cache ──
//
// Keyed storage for API reads with stale marking, per-key request
// coalescing and push-based change notification.

mod entry;
mod query_cache;

pub use query_cache::{CacheEvent, QueryCache};
