use std::sync::Arc;

use chrono::{DateTime, Utc};
use rg_cleanup_core::AppResult;
use rg_cleanup_domain::{
    CREATION_TIMESTAMP_TAG, NameFilter, ResourceGroup, RetentionPolicy, VerdictReason,
};
use tracing::{debug, info, warn};

use crate::cleanup_ports::ResourceGroupRepository;

/// Behavior switches for one resource group sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOptions {
    /// Log eligible groups without deleting them.
    pub dry_run: bool,
    /// Keep going after a delete submission fails.
    pub continue_on_error: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            continue_on_error: true,
        }
    }
}

/// Counters for one completed sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Resource groups evaluated.
    pub scanned: u32,
    /// Resource groups found eligible.
    pub eligible: u32,
    /// Delete requests accepted upstream.
    pub submitted: u32,
    /// Eligible groups left alone because of dry run.
    pub dry_run_skipped: u32,
    /// Delete submissions that failed.
    pub failed: u32,
}

/// Deletes stale resource groups according to a retention policy.
#[derive(Clone)]
pub struct ResourceGroupSweeper {
    repository: Arc<dyn ResourceGroupRepository>,
    policy: RetentionPolicy,
    options: SweepOptions,
}

impl ResourceGroupSweeper {
    /// Creates a sweeper.
    #[must_use]
    pub fn new(
        repository: Arc<dyn ResourceGroupRepository>,
        policy: RetentionPolicy,
        options: SweepOptions,
    ) -> Self {
        Self {
            repository,
            policy,
            options,
        }
    }

    /// Sweeps every resource group, measuring ages against the current time.
    pub async fn sweep(&self) -> AppResult<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Sweeps every resource group, measuring ages against `now`.
    ///
    /// A failed page fetch aborts the sweep. A failed delete submission is
    /// logged and, unless `continue_on_error` is off, the sweep goes on.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        info!(
            ttl_hours = self.policy.ttl().num_hours(),
            name_pattern = %self.policy.name_filter().source(),
            dry_run = self.options.dry_run,
            "scanning for stale resource groups"
        );

        if let NameFilter::Invalid { source, error } = self.policy.name_filter() {
            warn!(
                name_pattern = %source,
                error = %error,
                "name pattern does not compile; no resource group will be deleted"
            );
        }

        let mut report = SweepReport::default();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .repository
                .list_page(cursor.as_deref())
                .await
                .inspect_err(|error| warn!(error = %error, "failed to list resource groups"))?;

            for resource_group in &page.items {
                self.process(resource_group, now, &mut report).await?;
            }

            match page.next_cursor {
                Some(next_cursor) => cursor = Some(next_cursor),
                None => break,
            }
        }

        info!(
            scanned = report.scanned,
            eligible = report.eligible,
            submitted = report.submitted,
            dry_run_skipped = report.dry_run_skipped,
            failed = report.failed,
            "resource group sweep finished"
        );

        Ok(report)
    }

    async fn process(
        &self,
        resource_group: &ResourceGroup,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> AppResult<()> {
        let name = resource_group.name();
        let verdict = resource_group.evaluate(&self.policy, now);
        report.scanned = report.scanned.saturating_add(1);

        match verdict.reason() {
            VerdictReason::InvalidNamePattern => {
                warn!(
                    resource_group = %name,
                    name_pattern = %self.policy.name_filter().source(),
                    "failed to match resource group name against invalid pattern"
                );
            }
            VerdictReason::NameMismatch => {
                debug!(resource_group = %name, "resource group did not match name pattern");
            }
            VerdictReason::UnparsableCreationTimestamp => {
                let raw = resource_group
                    .tags()
                    .and_then(|tags| tags.get(CREATION_TIMESTAMP_TAG))
                    .and_then(|value| value.as_deref())
                    .unwrap_or("null");
                warn!(
                    resource_group = %name,
                    creation_timestamp = %raw,
                    "failed to parse creation timestamp; keeping resource group"
                );
            }
            VerdictReason::OptOutTag | VerdictReason::BelowTtl => {
                debug!(
                    resource_group = %name,
                    reason = ?verdict.reason(),
                    age = %verdict.age_description(),
                    "resource group is not eligible"
                );
            }
            VerdictReason::MissingCreationTimestamp | VerdictReason::Expired => {}
        }

        if !verdict.is_eligible() {
            return Ok(());
        }
        report.eligible = report.eligible.saturating_add(1);

        if self.options.dry_run {
            report.dry_run_skipped = report.dry_run_skipped.saturating_add(1);
            info!(
                resource_group = %name,
                age = %verdict.age_description(),
                "Dry-run: skip deletion of eligible resource group"
            );
            return Ok(());
        }

        info!(
            resource_group = %name,
            age = %verdict.age_description(),
            "Beginning to delete resource group"
        );

        match self.repository.begin_delete(name).await {
            Ok(()) => {
                report.submitted = report.submitted.saturating_add(1);
                Ok(())
            }
            Err(error) => {
                report.failed = report.failed.saturating_add(1);
                warn!(
                    resource_group = %name,
                    error = %error,
                    "failed to delete resource group"
                );

                if self.options.continue_on_error {
                    Ok(())
                } else {
                    Err(error)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
