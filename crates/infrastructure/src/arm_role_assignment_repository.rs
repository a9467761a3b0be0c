use std::sync::Arc;

use async_trait::async_trait;
use rg_cleanup_application::{Page, RoleAssignmentRepository};
use rg_cleanup_core::{AppResult, SubscriptionId};
use rg_cleanup_domain::{PrincipalType, RoleAssignment};
use serde::Deserialize;

use crate::azure_endpoints::AzureEndpoints;
use crate::azure_rest_client::AzureRestClient;
use crate::azure_token_source::AccessTokenSource;

const ROLE_ASSIGNMENTS_API_VERSION: &str = "2022-04-01";

#[derive(Debug, Deserialize)]
struct RoleAssignmentListResponse {
    #[serde(default)]
    value: Vec<RoleAssignmentPayload>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoleAssignmentPayload {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    properties: Option<RoleAssignmentProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleAssignmentProperties {
    #[serde(default)]
    principal_id: Option<String>,
    #[serde(default)]
    principal_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl From<RoleAssignmentPayload> for RoleAssignment {
    fn from(payload: RoleAssignmentPayload) -> Self {
        let properties = payload.properties.unwrap_or_default();
        Self {
            id: payload.id,
            principal_id: properties.principal_id,
            principal_type: properties
                .principal_type
                .and_then(|value| value.parse::<PrincipalType>().ok()),
            scope: properties.scope,
        }
    }
}

/// Azure Resource Manager implementation of [`RoleAssignmentRepository`].
#[derive(Clone)]
pub struct ArmRoleAssignmentRepository {
    client: AzureRestClient,
}

impl ArmRoleAssignmentRepository {
    /// Creates a repository talking to the configured resource manager.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        token_source: Arc<dyn AccessTokenSource>,
        endpoints: &AzureEndpoints,
    ) -> Self {
        Self {
            client: AzureRestClient::new(
                http_client,
                token_source,
                endpoints.resource_manager().clone(),
                endpoints.resource_manager_scope(),
            ),
        }
    }
}

#[async_trait]
impl RoleAssignmentRepository for ArmRoleAssignmentRepository {
    async fn list_page(
        &self,
        subscription_id: &SubscriptionId,
        cursor: Option<&str>,
    ) -> AppResult<Page<RoleAssignment>> {
        let url = match cursor {
            Some(link) => self.client.continuation(link)?,
            None => self.client.endpoint(
                &[
                    "subscriptions",
                    subscription_id.as_str(),
                    "providers",
                    "Microsoft.Authorization",
                    "roleAssignments",
                ],
                &[
                    ("api-version", ROLE_ASSIGNMENTS_API_VERSION),
                    ("$filter", "atScope()"),
                ],
            )?,
        };

        let response: RoleAssignmentListResponse = self.client.get_json(url).await?;

        Ok(Page {
            items: response.value.into_iter().map(RoleAssignment::from).collect(),
            next_cursor: response.next_link.filter(|link| !link.is_empty()),
        })
    }

    async fn delete_by_id(&self, assignment_id: &str) -> AppResult<()> {
        let url = self
            .client
            .resource_id_endpoint(assignment_id, &[("api-version", ROLE_ASSIGNMENTS_API_VERSION)])?;

        self.client.delete(url).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
