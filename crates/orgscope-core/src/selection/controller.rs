// ── Current-entity selection controller ──
//
// Owns which entity is "current" for the signed-in user. Seeds the
// choice from storage, auto-selects a default once the entity list is
// known, persists every resolved choice and wipes it all on sign-out.

use std::sync::Arc;

use orgscope_api::EntityWithRole;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::resolve::{default_entity, find_by_slug, personal_entity, resolve_current};
use super::storage::{NoopStorage, SELECTED_ENTITY_KEY, SelectionStorage};
use crate::error::CoreError;
use crate::stream::CurrentEntityStream;

/// Invoked with the new current entity whenever it changes.
pub type ChangeCallback = Box<dyn Fn(Option<&EntityWithRole>) + Send + Sync>;

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPhase {
    #[default]
    Unauthenticated,
    /// Signed in, entity list not loaded yet.
    Loading,
    /// The entity list finished its first load attempt (success or failure).
    Resolved,
}

/// What a call to [`SelectionController::set_user`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTransition {
    /// A user appeared (or replaced another). The entity list must be refetched.
    SignedIn,
    /// The user disappeared. Selection and persisted state were cleared.
    SignedOut,
    Unchanged,
}

/// Point-in-time copy of the controller state.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    pub user: Option<String>,
    /// Bumped on every sign-in and sign-out. Entity lists fetched under an
    /// older session are discarded.
    pub session: u64,
    pub selected_slug: Option<String>,
    pub initialized: bool,
    pub phase: SelectionPhase,
    pub entities: Arc<Vec<EntityWithRole>>,
    /// Last slug written to storage.
    persisted: Option<String>,
}

pub struct SelectionOptions {
    pub storage: Arc<dyn SelectionStorage>,
    /// Used when storage holds no previous selection.
    pub default_slug: Option<String>,
    pub on_change: Option<ChangeCallback>,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            storage: Arc::new(NoopStorage),
            default_slug: None,
            on_change: None,
        }
    }
}

impl SelectionOptions {
    pub fn with_storage(mut self, storage: Arc<dyn SelectionStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_default_slug(mut self, slug: impl Into<String>) -> Self {
        self.default_slug = Some(slug.into());
        self
    }

    pub fn on_change(
        mut self,
        callback: impl Fn(Option<&EntityWithRole>) + Send + Sync + 'static,
    ) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }
}

/// The current-entity state machine.
///
/// All operations are synchronous and cheap; fetching the entity list is
/// the caller's job (see [`EntityContext`](crate::EntityContext)). State
/// lives in `watch` channels so readers never block writers.
pub struct SelectionController {
    state: watch::Sender<SelectionState>,
    current: watch::Sender<Option<Arc<EntityWithRole>>>,
    storage: Arc<dyn SelectionStorage>,
    on_change: Option<ChangeCallback>,
}

impl SelectionController {
    /// Build the controller, seeding the selection from storage, then from
    /// `default_slug`.
    pub fn new(options: SelectionOptions) -> Self {
        let stored = options
            .storage
            .get(SELECTED_ENTITY_KEY)
            .unwrap_or_else(|e| {
                warn!(error = %e, "could not read persisted selection");
                None
            });
        debug!(stored = ?stored, default = ?options.default_slug, "seeding selection");

        let state = SelectionState {
            selected_slug: stored.clone().or(options.default_slug),
            persisted: stored,
            ..SelectionState::default()
        };
        let (state, _) = watch::channel(state);
        let (current, _) = watch::channel(None);

        Self {
            state,
            current,
            storage: options.storage,
            on_change: options.on_change,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SelectionState {
        self.state.borrow().clone()
    }

    /// The resolved current entity.
    pub fn current(&self) -> Option<Arc<EntityWithRole>> {
        self.current.borrow().clone()
    }

    pub fn selected_slug(&self) -> Option<String> {
        self.state.borrow().selected_slug.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.borrow().initialized
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().user.is_some()
    }

    pub fn phase(&self) -> SelectionPhase {
        self.state.borrow().phase
    }

    pub fn session(&self) -> u64 {
        self.state.borrow().session
    }

    /// The most recently applied entity list.
    pub fn entities(&self) -> Arc<Vec<EntityWithRole>> {
        Arc::clone(&self.state.borrow().entities)
    }

    pub fn personal_entity(&self) -> Option<EntityWithRole> {
        personal_entity(&self.state.borrow().entities).cloned()
    }

    pub fn subscribe(&self) -> CurrentEntityStream {
        CurrentEntityStream::new(self.current.subscribe())
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Report the authenticated user (or its absence).
    pub fn set_user(&self, user: Option<&str>) -> AuthTransition {
        let previous = self.state.borrow().user.clone();
        match (previous.as_deref(), user) {
            (None, None) => AuthTransition::Unchanged,
            (Some(prev), Some(next)) if prev == next => AuthTransition::Unchanged,
            (Some(_), None) => {
                self.sign_out();
                AuthTransition::SignedOut
            }
            (prev, Some(next)) => {
                if prev.is_some() {
                    self.sign_out();
                }
                self.sign_in(next);
                AuthTransition::SignedIn
            }
        }
    }

    fn sign_in(&self, user: &str) {
        self.state.send_modify(|s| {
            s.user = Some(user.to_owned());
            s.session += 1;
            s.initialized = false;
            s.phase = SelectionPhase::Loading;
        });
        info!(user, "signed in, loading entities");
    }

    fn sign_out(&self) {
        self.state.send_modify(|s| {
            s.user = None;
            s.session += 1;
            s.selected_slug = None;
            s.initialized = false;
            s.phase = SelectionPhase::Unauthenticated;
            s.entities = Arc::default();
            s.persisted = None;
        });
        if let Err(e) = self.storage.remove(SELECTED_ENTITY_KEY) {
            warn!(error = %e, "could not clear persisted selection");
        }
        info!("signed out, selection cleared");
        self.reconcile();
    }

    /// Apply the outcome of an entity list load for the current session.
    pub fn apply_entities(&self, result: &Result<Arc<Vec<EntityWithRole>>, CoreError>) -> bool {
        self.apply_entities_for(self.session(), result)
    }

    /// Apply the outcome of an entity list load started under `session`.
    ///
    /// Returns `false` (and changes nothing) when signed out or when the
    /// session moved on while the load was in flight. A failed load still
    /// marks the controller initialized and keeps the previous list.
    pub fn apply_entities_for(
        &self,
        session: u64,
        result: &Result<Arc<Vec<EntityWithRole>>, CoreError>,
    ) -> bool {
        let applied = self.state.send_if_modified(|s| {
            if s.user.is_none() || s.session != session {
                return false;
            }
            s.initialized = true;
            s.phase = SelectionPhase::Resolved;

            if let Ok(list) = result {
                s.entities = Arc::clone(list);
                let still_listed = s
                    .selected_slug
                    .as_deref()
                    .is_some_and(|slug| find_by_slug(list, slug).is_some());
                if !still_listed {
                    if let Some(fallback) = default_entity(list) {
                        s.selected_slug = Some(fallback.slug().to_owned());
                    }
                }
            }
            true
        });

        if !applied {
            debug!(session, "ignoring entity list outside its session");
            return false;
        }
        match result {
            Ok(list) => debug!(count = list.len(), "entity list applied"),
            Err(e) => warn!(error = %e, "entity list failed to load"),
        }
        self.reconcile();
        true
    }

    /// Make `slug` the current entity.
    ///
    /// Before the list has loaded any slug is accepted (it is validated on
    /// load). Afterwards, a slug missing from the list is rejected and
    /// `false` is returned.
    pub fn select(&self, slug: &str) -> bool {
        let accepted = self.state.send_if_modified(|s| {
            let known = s.phase != SelectionPhase::Resolved
                || find_by_slug(&s.entities, slug).is_some();
            if known {
                s.selected_slug = Some(slug.to_owned());
            }
            known
        });
        if accepted {
            debug!(slug, "entity selected");
            self.reconcile();
        } else {
            warn!(slug, "cannot select an entity outside the current list");
        }
        accepted
    }

    /// Forget the explicit selection; resolution falls back to the default.
    pub fn clear_selection(&self) {
        self.state.send_modify(|s| s.selected_slug = None);
        self.reconcile();
    }

    // ── Resolution ───────────────────────────────────────────────────

    /// Recompute the current entity, persist it and notify on change.
    fn reconcile(&self) {
        let next = {
            let state = self.state.borrow();
            resolve_current(&state.entities, state.selected_slug.as_deref())
                .cloned()
                .map(Arc::new)
        };

        if let Some(ref entity) = next {
            self.persist(entity.slug());
        }

        let changed = self.current.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                current.clone_from(&next);
                true
            }
        });

        if changed {
            info!(slug = ?next.as_ref().map(|e| e.slug()), "current entity changed");
            if let Some(ref callback) = self.on_change {
                callback(next.as_deref());
            }
        }
    }

    fn persist(&self, slug: &str) {
        let needs_write = self.state.send_if_modified(|s| {
            if s.persisted.as_deref() == Some(slug) {
                false
            } else {
                s.persisted = Some(slug.to_owned());
                true
            }
        });
        if !needs_write {
            return;
        }
        if let Err(e) = self.storage.set(SELECTED_ENTITY_KEY, slug) {
            warn!(slug, error = %e, "could not persist selection");
            self.state.send_modify(|s| s.persisted = None);
        }
    }
}
