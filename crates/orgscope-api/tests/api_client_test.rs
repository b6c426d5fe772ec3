#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use orgscope_api::{
    ApiClient, CreateEntityRequest, CreateInvitationRequest, EntityType, InvitationStatus,
    NoToken, RequestOptions, Role, StaticToken, UpdateEntityRequest,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let client = ApiClient::with_client(
        reqwest::Client::new(),
        base_url,
        Arc::new(StaticToken::new("test-token".to_owned())),
    );
    (server, client)
}

fn entity_json(slug: &str, kind: &str, role: &str) -> serde_json::Value {
    json!({
        "id": format!("id-{slug}"),
        "slug": slug,
        "name": slug.to_uppercase(),
        "type": kind,
        "role": role
    })
}

fn invitation_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "email": "dev@example.com",
        "token": "tok-1",
        "role": "MEMBER",
        "status": "PENDING"
    })
}

/// Mount a mock that only matches the exact verb + path with the bearer header.
async fn expect_call(server: &MockServer, verb: &str, at: &str, data: serde_json::Value) {
    Mock::given(method(verb))
        .and(path(at))
        .and(header("authorization", "Bearer test-token"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": data
        })))
        .expect(1)
        .mount(server)
        .await;
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_token_short_circuits() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = ApiClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        Arc::new(NoToken),
    );

    let resp = client.list_entities().await;
    assert!(!resp.success);
    assert_eq!(resp.error.as_deref(), Some("Not authenticated"));
    assert!(resp.data.is_none());

    let resp = client.delete_entity("acme").await;
    assert_eq!(resp.error.as_deref(), Some("Not authenticated"));
}

// ── Transport ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_non_json_body_becomes_failure_envelope() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/entities"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let resp = client.list_entities().await;
    assert!(!resp.success);
    let message = resp.error.unwrap();
    assert!(message.contains("HTTP 502"), "unexpected message: {message}");
}

#[tokio::test]
async fn test_connection_failure_becomes_failure_envelope() {
    // Nothing listens on port 9 (discard) on the loopback interface.
    let client = ApiClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:9").unwrap(),
        Arc::new(StaticToken::new("test-token".to_owned())),
    );

    let resp = client.list_my_invitations().await;
    assert!(!resp.success);
    assert!(resp.error.unwrap().starts_with("HTTP transport error"));
}

#[tokio::test]
async fn test_application_error_passes_through() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/entities"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "success": false,
            "error": "Slug already taken"
        })))
        .mount(&server)
        .await;

    let resp = client
        .create_entity(&CreateEntityRequest {
            name: "Acme".into(),
            slug: Some("acme".into()),
            description: None,
        })
        .await;

    assert!(!resp.success);
    assert_eq!(resp.error.as_deref(), Some("Slug already taken"));
}

#[tokio::test]
async fn test_caller_headers_are_merged() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/entities"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("x-request-id", "req-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let options = RequestOptions::default().header(
        reqwest::header::HeaderName::from_static("x-request-id"),
        reqwest::header::HeaderValue::from_static("req-42"),
    );
    let resp: orgscope_api::ApiResponse<Vec<serde_json::Value>> =
        client.request("/entities", options).await;
    assert!(resp.success);
}

// ── Entities ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_entities() {
    let (server, client) = setup().await;
    expect_call(
        &server,
        "GET",
        "/api/entities",
        json!([
            entity_json("a-personal", "PERSONAL", "OWNER"),
            entity_json("b-org", "ORGANIZATION", "MEMBER"),
        ]),
    )
    .await;

    let entities = client.list_entities().await.into_result().unwrap();
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0].slug(), "a-personal");
    assert_eq!(entities[0].entity.entity_type, EntityType::Personal);
    assert_eq!(entities[1].role, Role::Member);
}

#[tokio::test]
async fn test_create_entity_sends_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/entities"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({ "name": "Acme", "slug": "acme" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": entity_json("acme", "ORGANIZATION", "OWNER")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .create_entity(&CreateEntityRequest {
            name: "Acme".into(),
            slug: Some("acme".into()),
            description: None,
        })
        .await
        .into_result()
        .unwrap();
    assert_eq!(created.role, Role::Owner);
}

#[tokio::test]
async fn test_get_and_update_entity() {
    let (server, client) = setup().await;
    expect_call(
        &server,
        "GET",
        "/api/entities/acme",
        entity_json("acme", "ORGANIZATION", "ADMIN"),
    )
    .await;

    Mock::given(method("PUT"))
        .and(path("/api/entities/acme"))
        .and(body_json(json!({ "description": "Widgets" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": entity_json("acme", "ORGANIZATION", "ADMIN")
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.get_entity("acme").await.success);
    let updated = client
        .update_entity(
            "acme",
            &UpdateEntityRequest {
                description: Some("Widgets".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(updated.success);
}

#[tokio::test]
async fn test_delete_entity_discards_data() {
    let (server, client) = setup().await;
    expect_call(
        &server,
        "DELETE",
        "/api/entities/acme",
        json!({ "id": "id-acme", "deleted": true }),
    )
    .await;

    let resp = client.delete_entity("acme").await;
    assert!(resp.success);
    assert!(resp.data.is_none());
    assert!(resp.error.is_none());
}

// ── Members ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_member_endpoints() {
    let (server, client) = setup().await;
    let member = json!({ "id": "m1", "userId": "u1", "role": "MEMBER" });

    expect_call(&server, "GET", "/api/entities/acme/members", json!([member])).await;

    Mock::given(method("PUT"))
        .and(path("/api/entities/acme/members/m1"))
        .and(body_json(json!({ "role": "ADMIN" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "id": "m1", "userId": "u1", "role": "ADMIN" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    expect_call(&server, "DELETE", "/api/entities/acme/members/m1", json!(null)).await;

    let members = client.list_members("acme").await.into_result().unwrap();
    assert_eq!(members[0].user_id, "u1");

    let updated = client
        .update_member_role("acme", "m1", Role::Admin)
        .await
        .into_result()
        .unwrap();
    assert_eq!(updated.role, Role::Admin);

    assert!(client.remove_member("acme", "m1").await.success);
}

// ── Invitations ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_entity_invitation_endpoints() {
    let (server, client) = setup().await;

    expect_call(
        &server,
        "GET",
        "/api/entities/acme/invitations",
        json!([invitation_json("inv1")]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/entities/acme/invitations"))
        .and(body_json(json!({ "email": "dev@example.com", "role": "MEMBER" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": invitation_json("inv2")
        })))
        .expect(1)
        .mount(&server)
        .await;

    expect_call(
        &server,
        "DELETE",
        "/api/entities/acme/invitations/inv1",
        invitation_json("inv1"),
    )
    .await;

    let list = client
        .list_entity_invitations("acme")
        .await
        .into_result()
        .unwrap();
    assert_eq!(list[0].status, InvitationStatus::Pending);

    let created = client
        .create_invitation(
            "acme",
            &CreateInvitationRequest {
                email: "dev@example.com".into(),
                role: Role::Member,
            },
        )
        .await
        .into_result()
        .unwrap();
    assert_eq!(created.id, "inv2");

    assert!(client.cancel_invitation("acme", "inv1").await.success);
}

#[tokio::test]
async fn test_my_invitation_endpoints() {
    let (server, client) = setup().await;

    expect_call(&server, "GET", "/api/invitations", json!([invitation_json("inv1")])).await;
    expect_call(
        &server,
        "POST",
        "/api/invitations/tok-1/accept",
        entity_json("acme", "ORGANIZATION", "MEMBER"),
    )
    .await;
    expect_call(
        &server,
        "POST",
        "/api/invitations/tok-2/decline",
        invitation_json("inv2"),
    )
    .await;

    let mine = client.list_my_invitations().await.into_result().unwrap();
    assert_eq!(mine[0].token.as_deref(), Some("tok-1"));

    let joined = client.accept_invitation("tok-1").await.into_result().unwrap();
    assert_eq!(joined.slug(), "acme");

    assert!(client.decline_invitation("tok-2").await.success);
}
