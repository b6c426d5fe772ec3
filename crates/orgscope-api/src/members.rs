// Entity member endpoints
//
// Members are always scoped to an entity: `/entities/{slug}/members`.

use tracing::debug;

use crate::client::{ApiClient, resource_path};
use crate::envelope::ApiResponse;
use crate::models::{EntityMember, Role, UpdateMemberRoleRequest};

impl ApiClient {
    /// `GET /entities/{slug}/members`
    pub async fn list_members(&self, slug: &str) -> ApiResponse<Vec<EntityMember>> {
        self.get(&resource_path(&["entities", slug, "members"])).await
    }

    /// Change a member's role.
    ///
    /// `PUT /entities/{slug}/members/{id}` with `{"role": "..."}`
    pub async fn update_member_role(
        &self,
        slug: &str,
        member_id: &str,
        role: Role,
    ) -> ApiResponse<EntityMember> {
        debug!(slug, member_id, %role, "updating member role");
        self.put(
            &resource_path(&["entities", slug, "members", member_id]),
            &UpdateMemberRoleRequest { role },
        )
        .await
    }

    /// Remove a member from an entity. Only pass/fail is reported.
    ///
    /// `DELETE /entities/{slug}/members/{id}`
    pub async fn remove_member(&self, slug: &str, member_id: &str) -> ApiResponse<()> {
        debug!(slug, member_id, "removing member");
        self.delete::<serde::de::IgnoredAny>(&resource_path(&[
            "entities", slug, "members", member_id,
        ]))
        .await
        .ignored()
    }
}
