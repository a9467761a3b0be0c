use async_trait::async_trait;
use rg_cleanup_core::{AppResult, SubscriptionId};
use rg_cleanup_domain::RoleAssignment;

use super::Page;

/// Port for role assignments scoped to a subscription.
#[async_trait]
pub trait RoleAssignmentRepository: Send + Sync {
    /// Fetches one page of role assignments requested at subscription scope.
    ///
    /// Implementations may return assignments at broader scopes too; callers
    /// filter on the exact scope.
    async fn list_page(
        &self,
        subscription_id: &SubscriptionId,
        cursor: Option<&str>,
    ) -> AppResult<Page<RoleAssignment>>;

    /// Deletes one role assignment by its fully qualified id.
    async fn delete_by_id(&self, assignment_id: &str) -> AppResult<()>;
}
