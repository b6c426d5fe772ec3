// Entity endpoints
//
// `/entities` and `/entities/{slug}`. The slug, not the internal id,
// addresses an entity everywhere.

use tracing::debug;

use crate::client::{ApiClient, resource_path};
use crate::envelope::ApiResponse;
use crate::models::{CreateEntityRequest, EntityWithRole, UpdateEntityRequest};

impl ApiClient {
    /// List every entity the caller belongs to, with the caller's role.
    ///
    /// `GET /entities`
    pub async fn list_entities(&self) -> ApiResponse<Vec<EntityWithRole>> {
        self.get("/entities").await
    }

    /// `POST /entities`
    pub async fn create_entity(&self, req: &CreateEntityRequest) -> ApiResponse<EntityWithRole> {
        debug!(name = %req.name, "creating entity");
        self.post("/entities", req).await
    }

    /// `GET /entities/{slug}`
    pub async fn get_entity(&self, slug: &str) -> ApiResponse<EntityWithRole> {
        self.get(&resource_path(&["entities", slug])).await
    }

    /// `PUT /entities/{slug}`
    pub async fn update_entity(
        &self,
        slug: &str,
        req: &UpdateEntityRequest,
    ) -> ApiResponse<EntityWithRole> {
        debug!(slug, "updating entity");
        self.put(&resource_path(&["entities", slug]), req).await
    }

    /// Delete an entity. Only pass/fail is reported.
    ///
    /// `DELETE /entities/{slug}`
    pub async fn delete_entity(&self, slug: &str) -> ApiResponse<()> {
        debug!(slug, "deleting entity");
        self.delete::<serde::de::IgnoredAny>(&resource_path(&["entities", slug]))
            .await
            .ignored()
    }
}
