// ── Entity context ──
//
// Composition root tying the API client, the query cache and the
// selection controller together. Owns the one background task: a
// watcher that reloads the entity list whenever it is invalidated.

use std::sync::{Arc, Weak};

use orgscope_api::{ApiClient, EntityWithRole};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::keys::{QueryKey, entity_keys};
use crate::queries::Queries;
use crate::selection::{AuthTransition, SelectionController};
use crate::store::{CacheEvent, QueryCache};
use crate::stream::CurrentEntityStream;

/// Shared handle to the entity layer.
///
/// Cheaply cloneable; clones share the same cache, selection and
/// background task. Call [`start()`](Self::start) to begin following
/// cache invalidations and [`shutdown()`](Self::shutdown) to stop.
/// Dropping the last clone also stops the watcher, which only holds a
/// weak reference.
#[derive(Clone)]
pub struct EntityContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    queries: Queries,
    selection: SelectionController,
    cancel: CancellationToken,
    /// Token for the running watcher, replaced on every `start()`.
    cancel_child: Mutex<CancellationToken>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl EntityContext {
    pub fn new(
        client: Arc<ApiClient>,
        cache: Arc<QueryCache>,
        selection: SelectionController,
    ) -> Self {
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();
        Self {
            inner: Arc::new(ContextInner {
                queries: Queries::new(client, cache),
                selection,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                watcher: Mutex::new(None),
            }),
        }
    }

    pub fn queries(&self) -> &Queries {
        &self.inner.queries
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        self.inner.queries.cache()
    }

    pub fn selection(&self) -> &SelectionController {
        &self.inner.selection
    }

    /// The resolved current entity.
    pub fn current_entity(&self) -> Option<Arc<EntityWithRole>> {
        self.inner.selection.current()
    }

    pub fn subscribe(&self) -> CurrentEntityStream {
        self.inner.selection.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the invalidation watcher. No-op if it is already running.
    pub async fn start(&self) {
        let mut watcher = self.inner.watcher.lock().await;
        if watcher.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        // Subscribe before spawning so no invalidation slips through.
        let events = self.cache().subscribe();
        *watcher = Some(tokio::spawn(list_watcher_task(
            Arc::downgrade(&self.inner),
            events,
            child,
        )));
        debug!("entity list watcher started");
    }

    /// Stop the watcher and wait for it to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel_child.lock().await.cancel();
        if let Some(handle) = self.inner.watcher.lock().await.take() {
            let _ = handle.await;
        }
        debug!("entity context shut down");
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Report a signed-in user and load its entities.
    ///
    /// Signing in as a different user first drops everything cached for
    /// the previous one.
    pub async fn sign_in(&self, user_id: &str) -> Result<AuthTransition, CoreError> {
        let transition = self.inner.selection.set_user(Some(user_id));
        if transition == AuthTransition::SignedIn {
            self.cache().clear();
            info!(user_id, "loading entities for new session");
            self.refresh().await?;
        }
        Ok(transition)
    }

    /// Forget the user, its selection and every cached read.
    pub fn sign_out(&self) -> AuthTransition {
        let transition = self.inner.selection.set_user(None);
        self.cache().clear();
        transition
    }

    /// Fetch the entity list and feed it to the selection controller.
    ///
    /// The result is applied only if the session that started the fetch is
    /// still current when it completes.
    pub async fn refresh(&self) -> Result<Arc<Vec<EntityWithRole>>, CoreError> {
        let selection = &self.inner.selection;
        if !selection.is_authenticated() {
            debug!("refresh skipped, not signed in");
            return Err(CoreError::NotAuthenticated);
        }
        let session = selection.session();
        let result = self.inner.queries.entities().await;
        selection.apply_entities_for(session, &result);
        result
    }
}

/// `true` when invalidating `prefix` makes the entity list stale.
fn touches_list(prefix: &QueryKey) -> bool {
    entity_keys::list().starts_with(prefix)
}

/// Reload the entity list whenever an invalidation covers it.
///
/// Exits once every `EntityContext` clone is gone.
async fn list_watcher_task(
    context: Weak<ContextInner>,
    mut events: broadcast::Receiver<CacheEvent>,
    cancel: CancellationToken,
) {
    loop {
        let needs_refresh = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(CacheEvent::Invalidated(prefix)) => touches_list(&prefix),
                Ok(_) => false,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "cache events lagged, reloading entity list");
                    true
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        if !needs_refresh {
            continue;
        }
        let Some(inner) = context.upgrade() else { break };
        let ctx = EntityContext { inner };
        if ctx.selection().is_authenticated() {
            if let Err(e) = ctx.refresh().await {
                warn!(error = %e, "entity list reload failed");
            }
        }
    }
    debug!("entity list watcher stopped");
}
