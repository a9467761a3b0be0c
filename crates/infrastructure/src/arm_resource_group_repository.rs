use std::sync::Arc;

use async_trait::async_trait;
use rg_cleanup_application::{Page, ResourceGroupRepository};
use rg_cleanup_core::{AppResult, SubscriptionId};
use rg_cleanup_domain::{ResourceGroup, ResourceTags};
use serde::Deserialize;
use tracing::warn;

use crate::azure_endpoints::AzureEndpoints;
use crate::azure_rest_client::AzureRestClient;
use crate::azure_token_source::AccessTokenSource;

const RESOURCE_GROUPS_API_VERSION: &str = "2021-04-01";

#[derive(Debug, Deserialize)]
struct ResourceGroupListResponse {
    #[serde(default)]
    value: Vec<ResourceGroupPayload>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceGroupPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tags: Option<ResourceTags>,
}

/// Azure Resource Manager implementation of [`ResourceGroupRepository`].
#[derive(Clone)]
pub struct ArmResourceGroupRepository {
    client: AzureRestClient,
    subscription_id: SubscriptionId,
}

impl ArmResourceGroupRepository {
    /// Creates a repository for the resource groups of `subscription_id`.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        token_source: Arc<dyn AccessTokenSource>,
        endpoints: &AzureEndpoints,
        subscription_id: SubscriptionId,
    ) -> Self {
        Self {
            client: AzureRestClient::new(
                http_client,
                token_source,
                endpoints.resource_manager().clone(),
                endpoints.resource_manager_scope(),
            ),
            subscription_id,
        }
    }
}

#[async_trait]
impl ResourceGroupRepository for ArmResourceGroupRepository {
    async fn list_page(&self, cursor: Option<&str>) -> AppResult<Page<ResourceGroup>> {
        let url = match cursor {
            Some(link) => self.client.continuation(link)?,
            None => self.client.endpoint(
                &[
                    "subscriptions",
                    self.subscription_id.as_str(),
                    "resourcegroups",
                ],
                &[("api-version", RESOURCE_GROUPS_API_VERSION)],
            )?,
        };

        let response: ResourceGroupListResponse = self.client.get_json(url).await?;

        let mut items = Vec::with_capacity(response.value.len());
        for payload in response.value {
            let Some(name) = payload.name else {
                warn!("skipping resource group without a name");
                continue;
            };
            match ResourceGroup::new(name, payload.tags) {
                Ok(group) => items.push(group),
                Err(error) => warn!(error = %error, "skipping malformed resource group"),
            }
        }

        Ok(Page {
            items,
            next_cursor: response.next_link.filter(|link| !link.is_empty()),
        })
    }

    async fn begin_delete(&self, name: &str) -> AppResult<()> {
        let url = self.client.endpoint(
            &[
                "subscriptions",
                self.subscription_id.as_str(),
                "resourcegroups",
                name,
            ],
            &[("api-version", RESOURCE_GROUPS_API_VERSION)],
        )?;

        self.client.delete(url).await?;
        Ok(())
    }
}
