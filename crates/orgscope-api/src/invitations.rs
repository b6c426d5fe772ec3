// Invitation endpoints
//
// Two surfaces: entity-scoped management (`/entities/{slug}/invitations`)
// and the caller's own inbox (`/invitations`), where the invitation token
// is embedded in the path for accept/decline.

use tracing::debug;

use crate::client::{ApiClient, resource_path};
use crate::envelope::ApiResponse;
use crate::models::{CreateInvitationRequest, EntityInvitation, EntityWithRole};

impl ApiClient {
    // ── Entity-scoped ────────────────────────────────────────────────

    /// `GET /entities/{slug}/invitations`
    pub async fn list_entity_invitations(&self, slug: &str) -> ApiResponse<Vec<EntityInvitation>> {
        self.get(&resource_path(&["entities", slug, "invitations"]))
            .await
    }

    /// `POST /entities/{slug}/invitations` with `{"email": "...", "role": "..."}`
    pub async fn create_invitation(
        &self,
        slug: &str,
        req: &CreateInvitationRequest,
    ) -> ApiResponse<EntityInvitation> {
        debug!(slug, email = %req.email, role = %req.role, "creating invitation");
        self.post(&resource_path(&["entities", slug, "invitations"]), req)
            .await
    }

    /// `DELETE /entities/{slug}/invitations/{id}`
    pub async fn cancel_invitation(
        &self,
        slug: &str,
        invitation_id: &str,
    ) -> ApiResponse<EntityInvitation> {
        debug!(slug, invitation_id, "cancelling invitation");
        self.delete(&resource_path(&[
            "entities",
            slug,
            "invitations",
            invitation_id,
        ]))
        .await
    }

    // ── Caller's inbox ───────────────────────────────────────────────

    /// Pending invitations addressed to the caller.
    ///
    /// `GET /invitations`
    pub async fn list_my_invitations(&self) -> ApiResponse<Vec<EntityInvitation>> {
        self.get("/invitations").await
    }

    /// Accept an invitation. The payload is the entity just joined.
    ///
    /// `POST /invitations/{token}/accept`
    pub async fn accept_invitation(&self, token: &str) -> ApiResponse<EntityWithRole> {
        debug!("accepting invitation");
        self.post_empty(&resource_path(&["invitations", token, "accept"]))
            .await
    }

    /// `POST /invitations/{token}/decline`
    pub async fn decline_invitation(&self, token: &str) -> ApiResponse<EntityInvitation> {
        debug!("declining invitation");
        self.post_empty(&resource_path(&["invitations", token, "decline"]))
            .await
    }
}
