//! Cached data layer and current-entity selection on top of `orgscope-api`.
//!
//! - **[`QueryCache`]**: keyed cache for API reads (`DashMap` + `broadcast`
//!   notifications). Concurrent reads of one key share a single request;
//!   invalidation marks a whole key namespace stale.
//!
//! - **[`Queries`]**: one method per API operation. Reads go through the
//!   cache under the keys in [`keys`]; writes call the API and invalidate
//!   the affected namespaces on success.
//!
//! - **[`SelectionController`]**: tracks which entity is current for the
//!   signed-in user, persists the choice through a [`SelectionStorage`] and
//!   publishes changes via [`CurrentEntityStream`].
//!
//! - **[`EntityContext`]**: explicitly constructed composition root. Drives
//!   sign-in / sign-out and keeps the selection in step with the entity list.

pub mod context;
pub mod error;
pub mod keys;
pub mod queries;
pub mod selection;
pub mod store;
pub mod stream;

#[cfg(test)]
mod test_support;

// ── Primary re-exports ──────────────────────────────────────────────
pub use context::EntityContext;
pub use error::CoreError;
pub use keys::{QueryKey, entity_keys, invitation_keys};
pub use queries::Queries;
pub use selection::{
    AuthTransition, FileStorage, MemoryStorage, NoopStorage, SELECTED_ENTITY_KEY,
    SelectionController, SelectionOptions, SelectionPhase, SelectionState, SelectionStorage,
};
pub use store::{CacheEvent, QueryCache};
pub use stream::{CurrentEntityStream, CurrentEntityWatchStream};
