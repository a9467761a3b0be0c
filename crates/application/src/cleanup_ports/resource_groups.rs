use async_trait::async_trait;
use rg_cleanup_core::AppResult;
use rg_cleanup_domain::ResourceGroup;

use super::Page;

/// Port for listing and deleting the resource groups of one subscription.
#[async_trait]
pub trait ResourceGroupRepository: Send + Sync {
    /// Fetches one page of resource groups. `cursor` is `None` for the first page.
    async fn list_page(&self, cursor: Option<&str>) -> AppResult<Page<ResourceGroup>>;

    /// Submits deletion of one resource group.
    ///
    /// Returns once the request is accepted; completion is not awaited.
    async fn begin_delete(&self, name: &str) -> AppResult<()>;
}
