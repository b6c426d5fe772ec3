// ── Single cache slot ──
//
// One entry per `QueryKey`. Values are type-erased so a single map can
// hold every query's payload; the typed view is restored on read.

use std::any::Any;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, Shared};

use crate::error::CoreError;

pub(crate) type CachedValue = Arc<dyn Any + Send + Sync>;

/// A fetch that any number of readers can await; all of them observe the
/// same result.
pub(crate) type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue, CoreError>>>;

/// Identifies one started fetch. Drawn from a cache-wide counter, so a
/// ticket is never reused, even by an entry recreated after `clear()`.
pub(crate) type FetchTicket = u64;

#[derive(Default)]
pub(crate) struct CacheEntry {
    pub value: Option<CachedValue>,
    pub stale: bool,
    /// The fetch allowed to write back. Cleared on invalidation, so an
    /// older fetch may still answer its own callers but never stores.
    pub in_flight: Option<(FetchTicket, SharedFetch)>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// A value is present and has not been invalidated since it was stored.
    pub(crate) fn fresh_value(&self) -> Option<CachedValue> {
        if self.stale {
            return None;
        }
        self.value.clone()
    }

    pub(crate) fn mark_stale(&mut self) {
        self.stale = true;
        self.in_flight = None;
    }

    /// Record the outcome of the fetch holding `ticket`.
    ///
    /// Returns `true` if a new value was stored. Errors are never cached:
    /// the previous value (if any) stays, still marked stale if it was.
    pub(crate) fn settle(
        &mut self,
        ticket: FetchTicket,
        result: &Result<CachedValue, CoreError>,
    ) -> bool {
        let ours = matches!(self.in_flight, Some((t, _)) if t == ticket);
        if !ours {
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(value) => {
                self.value = Some(Arc::clone(value));
                self.stale = false;
                self.updated_at = Some(Utc::now());
                true
            }
            Err(_) => false,
        }
    }
}
