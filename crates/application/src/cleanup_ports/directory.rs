use std::collections::HashSet;

use async_trait::async_trait;
use rg_cleanup_core::AppResult;

/// Port for the identity directory.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Returns the subset of `principal_ids` that still exist.
    async fn existing_principal_ids(&self, principal_ids: &[String])
    -> AppResult<HashSet<String>>;
}
