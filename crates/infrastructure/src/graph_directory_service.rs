use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rg_cleanup_application::DirectoryService;
use rg_cleanup_core::AppResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::azure_endpoints::AzureEndpoints;
use crate::azure_rest_client::AzureRestClient;
use crate::azure_token_source::AccessTokenSource;

/// Largest id batch Microsoft Graph accepts in one `getByIds` call.
pub const GET_BY_IDS_BATCH_SIZE: usize = 1000;

#[derive(Debug, Serialize)]
struct GetByIdsRequest<'a> {
    ids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct GetByIdsResponse {
    #[serde(default)]
    value: Vec<DirectoryObject>,
}

#[derive(Debug, Deserialize)]
struct DirectoryObject {
    #[serde(default)]
    id: Option<String>,
}

/// Microsoft Graph implementation of [`DirectoryService`] for service principals.
#[derive(Clone)]
pub struct GraphDirectoryService {
    client: AzureRestClient,
}

impl GraphDirectoryService {
    /// Creates a directory service talking to the configured Graph endpoint.
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
                endpoints.graph().clone(),
                endpoints.graph_scope(),
            ),
        }
    }
}

#[async_trait]
impl DirectoryService for GraphDirectoryService {
    async fn existing_principal_ids(
        &self,
        principal_ids: &[String],
    ) -> AppResult<HashSet<String>> {
        let mut existing = HashSet::new();

        for batch in principal_ids.chunks(GET_BY_IDS_BATCH_SIZE) {
            let url = self
                .client
                .endpoint(&["v1.0", "servicePrincipals", "getByIds"], &[])?;
            let response: GetByIdsResponse = self
                .client
                .post_json(url, &GetByIdsRequest { ids: batch })
                .await?;

            debug!(
                requested = batch.len(),
                found = response.value.len(),
                "queried service principals"
            );
            existing.extend(response.value.into_iter().filter_map(|object| object.id));
        }

        Ok(existing)
    }
}
