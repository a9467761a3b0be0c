use std::sync::Arc;

use rg_cleanup_application::RoleAssignmentRepository;
use rg_cleanup_core::{AppError, SubscriptionId};
use rg_cleanup_domain::PrincipalType;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::azure_endpoints::AzureEndpoints;
use crate::test_support::StaticTokenSource;

use super::ArmRoleAssignmentRepository;

const SUBSCRIPTION: &str = "0b1f6471-1bf0-4dda-aec3-cb9272f09590";

fn assignments_path() -> String {
    format!("/subscriptions/{SUBSCRIPTION}/providers/Microsoft.Authorization/roleAssignments")
}

fn repository(server: &MockServer) -> ArmRoleAssignmentRepository {
    let endpoints = match AzureEndpoints::new(&server.uri(), &server.uri()) {
        Ok(endpoints) => endpoints,
        Err(error) => panic!("mock server uri should be a valid endpoint: {error}"),
    };

    ArmRoleAssignmentRepository::new(
        reqwest::Client::new(),
        Arc::new(StaticTokenSource),
        &endpoints,
    )
}

fn subscription_id() -> SubscriptionId {
    match SubscriptionId::new(SUBSCRIPTION) {
        Ok(subscription_id) => subscription_id,
        Err(error) => panic!("subscription id should be valid: {error}"),
    }
}

#[tokio::test]
async fn list_page_requests_at_scope_and_maps_properties() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(assignments_path()))
        .and(query_param("api-version", "2022-04-01"))
        .and(query_param("$filter", "atScope()"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {
                    "id": format!("{}/a1", assignments_path()),
                    "properties": {
                        "principalId": "p1",
                        "principalType": "ServicePrincipal",
                        "scope": format!("/subscriptions/{SUBSCRIPTION}")
                    }
                },
                {
                    "id": format!("{}/a2", assignments_path()),
                    "properties": { "principalId": "p2", "principalType": "DirectoryRoleTemplate" }
                },
                { "id": format!("{}/a3", assignments_path()) }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = match repository(&server).list_page(&subscription_id(), None).await {
        Ok(page) => page,
        Err(error) => panic!("role assignments should load: {error}"),
    };

    assert_eq!(page.items.len(), 3);
    assert!(page.next_cursor.is_none());

    let first = &page.items[0];
    assert_eq!(first.principal_id.as_deref(), Some("p1"));
    assert_eq!(first.principal_type, Some(PrincipalType::ServicePrincipal));
    assert_eq!(
        first.scope.as_deref(),
        Some(format!("/subscriptions/{SUBSCRIPTION}").as_str())
    );

    assert_eq!(
        page.items[1].principal_type,
        Some(PrincipalType::Other("DirectoryRoleTemplate".to_owned()))
    );
    assert!(page.items[1].scope.is_none());

    assert!(page.items[2].principal_id.is_none());
    assert!(page.items[2].principal_type.is_none());
}

#[tokio::test]
async fn delete_by_id_uses_the_assignment_path() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/a1", assignments_path())))
        .and(query_param("api-version", "2022-04-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let result = repository(&server)
        .delete_by_id(&format!("{}/a1", assignments_path()))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn delete_by_id_maps_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/gone", assignments_path())))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = repository(&server)
        .delete_by_id(&format!("{}/gone", assignments_path()))
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn server_errors_surface_as_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(assignments_path()))
        .respond_with(ResponseTemplate::new(500).set_body_string("InternalServerError"))
        .mount(&server)
        .await;

    let result = repository(&server).list_page(&subscription_id(), None).await;

    assert!(matches!(result, Err(AppError::Upstream(message)) if message.contains("500")));
}
