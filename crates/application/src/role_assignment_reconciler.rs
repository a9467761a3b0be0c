use std::sync::Arc;

use rg_cleanup_core::{AppResult, SubscriptionId};
use rg_cleanup_domain::PrincipalCandidateSet;
use tracing::{debug, info, warn};

use crate::cleanup_ports::{DirectoryService, RoleAssignmentRepository};

/// Counters for one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Role assignments listed for the subscription.
    pub listed: u32,
    /// Service principals with at least one at-scope assignment.
    pub candidate_principals: u32,
    /// Candidate principals the directory still knows.
    pub existing_principals: u32,
    /// Assignments whose principal no longer exists.
    pub orphaned: u32,
    /// Assignments deleted.
    pub deleted: u32,
    /// Orphaned assignments left alone because of dry run.
    pub dry_run_skipped: u32,
    /// Deletes that failed.
    pub failed: u32,
}

/// Deletes role assignments whose service principal was removed from the directory.
#[derive(Clone)]
pub struct RoleAssignmentReconciler {
    repository: Arc<dyn RoleAssignmentRepository>,
    directory: Arc<dyn DirectoryService>,
    continue_on_error: bool,
}

impl RoleAssignmentReconciler {
    /// Creates a reconciler that stops at the first failed delete.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RoleAssignmentRepository>,
        directory: Arc<dyn DirectoryService>,
    ) -> Self {
        Self {
            repository,
            directory,
            continue_on_error: false,
        }
    }

    /// Keeps deleting after a failed delete instead of returning the error.
    #[must_use]
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Runs collection, directory correlation and deletion for one subscription.
    pub async fn reconcile(
        &self,
        subscription_id: &SubscriptionId,
        dry_run: bool,
    ) -> AppResult<ReconcileReport> {
        info!(subscription_id = %subscription_id, dry_run, "scanning for stale role assignments");

        let mut report = ReconcileReport::default();
        let mut candidates = self.collect(subscription_id, &mut report).await?;
        report.candidate_principals = count(candidates.principal_count());

        if candidates.is_empty() {
            info!("No role assignments found");
            return Ok(report);
        }

        let existing = self
            .directory
            .existing_principal_ids(&candidates.principal_ids())
            .await
            .inspect_err(|error| warn!(error = %error, "failed to query directory"))?;
        report.existing_principals = count(candidates.remove_existing(&existing));

        if candidates.is_empty() {
            info!("No unattached role assignments found");
            return Ok(report);
        }
        report.orphaned = count(candidates.assignment_count());

        for (principal_id, assignment_ids) in candidates {
            for assignment_id in assignment_ids {
                if dry_run {
                    report.dry_run_skipped = report.dry_run_skipped.saturating_add(1);
                    info!(
                        principal_id = %principal_id,
                        role_assignment = %assignment_id,
                        "Dry-run: skip deletion of eligible role assignment"
                    );
                    continue;
                }

                match self.repository.delete_by_id(assignment_id.as_str()).await {
                    Ok(()) => {
                        report.deleted = report.deleted.saturating_add(1);
                        info!(
                            principal_id = %principal_id,
                            role_assignment = %assignment_id,
                            "Deleted role assignment"
                        );
                    }
                    Err(error) => {
                        report.failed = report.failed.saturating_add(1);
                        warn!(
                            principal_id = %principal_id,
                            role_assignment = %assignment_id,
                            error = %error,
                            "failed to delete role assignment"
                        );

                        if !self.continue_on_error {
                            return Err(error);
                        }
                    }
                }
            }
        }

        info!(
            listed = report.listed,
            candidate_principals = report.candidate_principals,
            existing_principals = report.existing_principals,
            orphaned = report.orphaned,
            deleted = report.deleted,
            dry_run_skipped = report.dry_run_skipped,
            failed = report.failed,
            "role assignment reconciliation finished"
        );

        Ok(report)
    }

    async fn collect(
        &self,
        subscription_id: &SubscriptionId,
        report: &mut ReconcileReport,
    ) -> AppResult<PrincipalCandidateSet> {
        let scope = subscription_id.scope();
        let mut candidates = PrincipalCandidateSet::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .repository
                .list_page(subscription_id, cursor.as_deref())
                .await
                .inspect_err(|error| warn!(error = %error, "failed to list role assignments"))?;

            for assignment in page.items {
                report.listed = report.listed.saturating_add(1);
                let assignment_id = assignment.id.clone();
                if let Err(rejection) = candidates.admit(scope.as_str(), assignment) {
                    debug!(
                        role_assignment = assignment_id.as_deref().unwrap_or("<missing>"),
                        reason = ?rejection,
                        "role assignment is not a candidate"
                    );
                }
            }

            match page.next_cursor {
                Some(next_cursor) => cursor = Some(next_cursor),
                None => break,
            }
        }

        Ok(candidates)
    }
}

fn count(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
