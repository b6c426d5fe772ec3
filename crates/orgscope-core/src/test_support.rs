// Shared fixtures for unit tests.

use orgscope_api::{Entity, EntityType, EntityWithRole, Role};

pub(crate) fn entity(slug: &str, entity_type: EntityType) -> EntityWithRole {
    EntityWithRole {
        entity: Entity {
            id: format!("id-{slug}"),
            slug: slug.into(),
            name: slug.into(),
            entity_type,
            description: None,
            avatar_url: None,
            created_at: None,
            updated_at: None,
        },
        role: Role::Owner,
    }
}

/// `[a-personal (PERSONAL), b-org (ORGANIZATION)]`
pub(crate) fn personal_and_org() -> Vec<EntityWithRole> {
    vec![
        entity("a-personal", EntityType::Personal),
        entity("b-org", EntityType::Organization),
    ]
}
