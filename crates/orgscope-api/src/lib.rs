// orgscope-api: Async Rust client for the entity / organization management API

pub mod auth;
pub mod client;
mod entities;
pub mod envelope;
pub mod error;
mod invitations;
mod members;
pub mod models;
pub mod transport;

pub use auth::{NoToken, StaticToken, TokenFn, TokenProvider};
pub use client::{ApiClient, RequestOptions};
pub use envelope::{ApiResponse, NOT_AUTHENTICATED};
pub use error::Error;
pub use models::{
    CreateEntityRequest, CreateInvitationRequest, Entity, EntityInvitation, EntityMember,
    EntityType, EntityWithRole, InvitationEntity, InvitationStatus, Role, UpdateEntityRequest,
    UpdateMemberRoleRequest,
};
pub use transport::{ClientConfig, TlsMode, TransportConfig};
