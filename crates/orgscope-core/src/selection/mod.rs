// ── Current-entity selection ──
//
// Which entity the signed-in user is working in, how that choice is
// resolved against the entity list and where it is persisted.

mod controller;
mod resolve;
mod storage;

pub use controller::{
    AuthTransition, ChangeCallback, SelectionController, SelectionOptions, SelectionPhase,
    SelectionState,
};
pub use resolve::{default_entity, find_by_slug, personal_entity, resolve_current};
pub use storage::{FileStorage, MemoryStorage, NoopStorage, SELECTED_ENTITY_KEY, SelectionStorage};
