//! Resource group eligibility decisions.
//!
//! Gates run in a fixed order and the first one that decides wins:
//! opt-out tag, name filter, creation timestamp presence, timestamp parsing,
//! then the age threshold.

use chrono::{DateTime, Utc};

use crate::resource_group::{
    CREATION_TIMESTAMP_TAG, DO_NOT_DELETE_TAG, ResourceGroup, ResourceTags, format_tags,
};
use crate::retention::{NameFilter, RetentionPolicy};
use crate::timestamp::resolve_creation_timestamp;

/// Which gate produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictReason {
    /// The opt-out tag is present.
    OptOutTag,
    /// The name does not fully match the configured pattern.
    NameMismatch,
    /// The configured pattern does not compile.
    InvalidNamePattern,
    /// No creation timestamp tag; treated as old.
    MissingCreationTimestamp,
    /// The creation timestamp tag cannot be parsed.
    UnparsableCreationTimestamp,
    /// The group is younger than the TTL.
    BelowTtl,
    /// The group is at least as old as the TTL.
    Expired,
}

/// Outcome of evaluating one resource group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityVerdict {
    age_description: String,
    eligible: bool,
    reason: VerdictReason,
}

impl EligibilityVerdict {
    fn rejected(reason: VerdictReason) -> Self {
        Self {
            age_description: String::new(),
            eligible: false,
            reason,
        }
    }

    /// Returns the human readable age explanation.
    ///
    /// Empty when the group is ineligible for any reason other than its age.
    #[must_use]
    pub fn age_description(&self) -> &str {
        self.age_description.as_str()
    }

    /// Returns whether the group should be deleted.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.eligible
    }

    /// Returns the gate that decided the verdict.
    #[must_use]
    pub fn reason(&self) -> VerdictReason {
        self.reason
    }
}

/// Decides whether a resource group with `name` and `tags` is stale at `now`.
#[must_use]
pub fn evaluate(
    name: &str,
    tags: Option<&ResourceTags>,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> EligibilityVerdict {
    if tags.is_some_and(|tags| tags.contains_key(DO_NOT_DELETE_TAG)) {
        return EligibilityVerdict::rejected(VerdictReason::OptOutTag);
    }

    match policy.name_filter() {
        NameFilter::MatchAll => {}
        NameFilter::Pattern { regex, .. } => {
            if !regex.is_match(name) {
                return EligibilityVerdict::rejected(VerdictReason::NameMismatch);
            }
        }
        NameFilter::Invalid { .. } => {
            return EligibilityVerdict::rejected(VerdictReason::InvalidNamePattern);
        }
    }

    let Some(creation_timestamp) = tags.and_then(|tags| tags.get(CREATION_TIMESTAMP_TAG)) else {
        return EligibilityVerdict {
            age_description: format!(
                "probably a long time because it does not have a '{CREATION_TIMESTAMP_TAG}' tag. Found tags: {}",
                format_tags(tags)
            ),
            eligible: true,
            reason: VerdictReason::MissingCreationTimestamp,
        };
    };

    let Some(created_at) = creation_timestamp
        .as_deref()
        .and_then(|raw| resolve_creation_timestamp(raw).ok())
    else {
        return EligibilityVerdict::rejected(VerdictReason::UnparsableCreationTimestamp);
    };

    let age = now - created_at;
    let eligible = age >= policy.ttl();

    EligibilityVerdict {
        age_description: format!("{} days ({} hours)", age.num_days(), age.num_hours()),
        eligible,
        reason: if eligible {
            VerdictReason::Expired
        } else {
            VerdictReason::BelowTtl
        },
    }
}

impl ResourceGroup {
    /// Evaluates this group against `policy` at `now`.
    #[must_use]
    pub fn evaluate(&self, policy: &RetentionPolicy, now: DateTime<Utc>) -> EligibilityVerdict {
        evaluate(self.name(), self.tags(), policy, now)
    }
}
