// ── Current-entity resolution ──
//
// Pure functions over an entity list. Priority: explicit selection if it
// is still in the list, then the personal entity, then the first entity.

use orgscope_api::EntityWithRole;

/// The first entity of type `PERSONAL`, if any.
pub fn personal_entity(entities: &[EntityWithRole]) -> Option<&EntityWithRole> {
    entities.iter().find(|e| e.is_personal())
}

/// What to select when nothing valid is selected.
pub fn default_entity(entities: &[EntityWithRole]) -> Option<&EntityWithRole> {
    personal_entity(entities).or_else(|| entities.first())
}

pub fn find_by_slug<'a>(entities: &'a [EntityWithRole], slug: &str) -> Option<&'a EntityWithRole> {
    entities.iter().find(|e| e.slug() == slug)
}

/// Resolve the current entity. `None` only when the list is empty.
pub fn resolve_current<'a>(
    entities: &'a [EntityWithRole],
    selected: Option<&str>,
) -> Option<&'a EntityWithRole> {
    selected
        .and_then(|slug| find_by_slug(entities, slug))
        .or_else(|| default_entity(entities))
}
