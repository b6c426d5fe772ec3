// ── Current-entity subscriptions ──
//
// Observable view of the resolved current entity, independent of any UI
// framework's scheduling.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use orgscope_api::EntityWithRole;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

type Current = Option<Arc<EntityWithRole>>;

/// A subscription to the current entity.
///
/// Provides both point-in-time access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct CurrentEntityStream {
    current: Current,
    receiver: watch::Receiver<Current>,
}

impl CurrentEntityStream {
    pub(crate) fn new(receiver: watch::Receiver<Current>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The value seen at creation or at the last `changed()`.
    pub fn current(&self) -> Option<&EntityWithRole> {
        self.current.as_deref()
    }

    /// The latest value (may have changed since the last `changed()`).
    pub fn latest(&self) -> Current {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new value.
    /// Returns `None` if the controller has been dropped.
    pub async fn changed(&mut self) -> Option<Current> {
        self.receiver.changed().await.ok()?;
        let value = self.receiver.borrow_and_update().clone();
        self.current.clone_from(&value);
        Some(value)
    }

    /// Convert into a `Stream` yielding the current value first, then
    /// every change.
    pub fn into_stream(self) -> CurrentEntityWatchStream {
        CurrentEntityWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct CurrentEntityWatchStream {
    inner: WatchStream<Current>,
}

impl Stream for CurrentEntityWatchStream {
    type Item = Current;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use orgscope_api::EntityType;
    use tokio_stream::StreamExt;
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;
    use crate::test_support::entity;

    fn some(slug: &str) -> Current {
        Some(Arc::new(entity(slug, EntityType::Organization)))
    }

    #[test]
    fn changed_waits_for_a_new_value() {
        let (tx, rx) = watch::channel(None);
        let mut stream = CurrentEntityStream::new(rx);
        assert!(stream.current().is_none());

        {
            let mut changed = task::spawn(stream.changed());
            assert_pending!(changed.poll());
            tx.send_replace(some("acme"));
            assert!(changed.is_woken());
            let value = assert_ready!(changed.poll()).unwrap();
            assert_eq!(value.as_deref().map(EntityWithRole::slug), Some("acme"));
        }
        assert_eq!(stream.current().map(EntityWithRole::slug), Some("acme"));

        drop(tx);
        assert!(tokio_test::block_on(stream.changed()).is_none());
    }

    #[test]
    fn latest_reads_past_the_snapshot() {
        let (tx, rx) = watch::channel(some("acme"));
        let stream = CurrentEntityStream::new(rx);
        tx.send_replace(some("globex"));

        assert_eq!(stream.current().map(EntityWithRole::slug), Some("acme"));
        assert_eq!(
            stream.latest().as_deref().map(EntityWithRole::slug),
            Some("globex")
        );
    }

    #[tokio::test]
    async fn stream_yields_current_then_changes() {
        let (tx, rx) = watch::channel(some("acme"));
        let mut stream = CurrentEntityStream::new(rx).into_stream();

        let first = stream.next().await.unwrap();
        assert_eq!(first.as_deref().map(EntityWithRole::slug), Some("acme"));

        tx.send_replace(None);
        assert_eq!(stream.next().await, Some(None));
    }
}
