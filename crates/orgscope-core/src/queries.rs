// ── Query / mutation bindings ──
//
// Each read goes through the `QueryCache` under its namespace key; each
// write calls the API directly and, on success only, invalidates the
// namespaces that could now be stale. Bindings never write results into
// the cache themselves: the next read refetches.

use std::sync::Arc;

use orgscope_api::{
    ApiClient, CreateEntityRequest, CreateInvitationRequest, EntityInvitation, EntityMember,
    EntityWithRole, Role, UpdateEntityRequest,
};
use tracing::{debug, trace};

use crate::error::CoreError;
use crate::keys::{QueryKey, entity_keys, invitation_keys};
use crate::store::QueryCache;

/// Cache-backed access to every API operation.
///
/// Cheaply cloneable; clones share the client and the cache.
#[derive(Clone)]
pub struct Queries {
    client: Arc<ApiClient>,
    cache: Arc<QueryCache>,
}

/// A slug-scoped query is only active when the slug is present and non-empty.
fn active(slug: Option<&str>) -> Option<&str> {
    slug.filter(|s| !s.is_empty())
}

impl Queries {
    pub fn new(client: Arc<ApiClient>, cache: Arc<QueryCache>) -> Self {
        Self { client, cache }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    fn invalidate(&self, keys: &[QueryKey]) {
        for key in keys {
            self.cache.invalidate(key);
        }
    }

    // ── Entities ─────────────────────────────────────────────────────

    /// Every entity the caller belongs to.
    pub async fn entities(&self) -> Result<Arc<Vec<EntityWithRole>>, CoreError> {
        let client = Arc::clone(&self.client);
        self.cache
            .fetch(entity_keys::list(), move || async move {
                Ok(client.list_entities().await.into_result()?)
            })
            .await
    }

    /// One entity by slug. `None` slug resolves to `Ok(None)` without a request.
    pub async fn entity(
        &self,
        slug: Option<&str>,
    ) -> Result<Option<Arc<EntityWithRole>>, CoreError> {
        let Some(slug) = active(slug) else {
            trace!("entity query inactive");
            return Ok(None);
        };
        let client = Arc::clone(&self.client);
        let owned = slug.to_owned();
        self.cache
            .fetch(entity_keys::detail(slug), move || async move {
                Ok(client.get_entity(&owned).await.into_result()?)
            })
            .await
            .map(Some)
    }

    pub async fn create_entity(
        &self,
        req: &CreateEntityRequest,
    ) -> Result<EntityWithRole, CoreError> {
        let created = self.client.create_entity(req).await.into_result()?;
        debug!(slug = %created.slug(), "entity created");
        self.invalidate(&[entity_keys::list()]);
        Ok(created)
    }

    pub async fn update_entity(
        &self,
        slug: &str,
        req: &UpdateEntityRequest,
    ) -> Result<EntityWithRole, CoreError> {
        let updated = self.client.update_entity(slug, req).await.into_result()?;
        self.invalidate(&[entity_keys::list(), entity_keys::detail(slug)]);
        Ok(updated)
    }

    pub async fn delete_entity(&self, slug: &str) -> Result<(), CoreError> {
        self.client.delete_entity(slug).await.into_result()?;
        debug!(slug, "entity deleted");
        self.invalidate(&[entity_keys::list(), entity_keys::detail(slug)]);
        Ok(())
    }

    // ── Members ──────────────────────────────────────────────────────

    pub async fn members(&self, slug: Option<&str>) -> Result<Arc<Vec<EntityMember>>, CoreError> {
        let Some(slug) = active(slug) else {
            trace!("members query inactive");
            return Ok(Arc::default());
        };
        let client = Arc::clone(&self.client);
        let owned = slug.to_owned();
        self.cache
            .fetch(entity_keys::members(slug), move || async move {
                Ok(client.list_members(&owned).await.into_result()?)
            })
            .await
    }

    pub async fn update_member_role(
        &self,
        slug: &str,
        member_id: &str,
        role: Role,
    ) -> Result<EntityMember, CoreError> {
        let member = self
            .client
            .update_member_role(slug, member_id, role)
            .await
            .into_result()?;
        self.invalidate(&[entity_keys::members(slug)]);
        Ok(member)
    }

    pub async fn remove_member(&self, slug: &str, member_id: &str) -> Result<(), CoreError> {
        self.client
            .remove_member(slug, member_id)
            .await
            .into_result()?;
        self.invalidate(&[entity_keys::members(slug)]);
        Ok(())
    }

    // ── Invitations ──────────────────────────────────────────────────

    /// Invitations issued by one entity.
    pub async fn entity_invitations(
        &self,
        slug: Option<&str>,
    ) -> Result<Arc<Vec<EntityInvitation>>, CoreError> {
        let Some(slug) = active(slug) else {
            trace!("entity invitations query inactive");
            return Ok(Arc::default());
        };
        let client = Arc::clone(&self.client);
        let owned = slug.to_owned();
        self.cache
            .fetch(entity_keys::invitations(slug), move || async move {
                Ok(client.list_entity_invitations(&owned).await.into_result()?)
            })
            .await
    }

    /// Invitations addressed to the signed-in user.
    pub async fn my_invitations(&self) -> Result<Arc<Vec<EntityInvitation>>, CoreError> {
        let client = Arc::clone(&self.client);
        self.cache
            .fetch(invitation_keys::my(), move || async move {
                Ok(client.list_my_invitations().await.into_result()?)
            })
            .await
    }

    pub async fn create_invitation(
        &self,
        slug: &str,
        req: &CreateInvitationRequest,
    ) -> Result<EntityInvitation, CoreError> {
        let invitation = self.client.create_invitation(slug, req).await.into_result()?;
        self.invalidate(&[
            entity_keys::invitations(slug),
            invitation_keys::entity(slug),
        ]);
        Ok(invitation)
    }

    pub async fn cancel_invitation(
        &self,
        slug: &str,
        invitation_id: &str,
    ) -> Result<EntityInvitation, CoreError> {
        let invitation = self
            .client
            .cancel_invitation(slug, invitation_id)
            .await
            .into_result()?;
        self.invalidate(&[
            entity_keys::invitations(slug),
            invitation_keys::entity(slug),
        ]);
        Ok(invitation)
    }

    /// Accept an invitation addressed to the caller.
    ///
    /// Joining grants membership in an entity that has no detail entry
    /// cached yet, so only the entity list is invalidated.
    pub async fn accept_invitation(&self, token: &str) -> Result<EntityWithRole, CoreError> {
        let joined = self.client.accept_invitation(token).await.into_result()?;
        debug!(slug = %joined.slug(), "invitation accepted");
        self.invalidate(&[invitation_keys::my(), entity_keys::list()]);
        Ok(joined)
    }

    pub async fn decline_invitation(&self, token: &str) -> Result<EntityInvitation, CoreError> {
        let invitation = self.client.decline_invitation(token).await.into_result()?;
        self.invalidate(&[invitation_keys::my()]);
        Ok(invitation)
    }
}
