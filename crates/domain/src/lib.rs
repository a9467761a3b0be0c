//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod eligibility;
mod resource_group;
mod retention;
mod role_assignment;
mod timestamp;

pub use eligibility::{EligibilityVerdict, VerdictReason, evaluate};
pub use resource_group::{
    CREATION_TIMESTAMP_TAG, DO_NOT_DELETE_TAG, ResourceGroup, ResourceTags, format_tags,
};
pub use retention::{DEFAULT_TTL_HOURS, NameFilter, RetentionPolicy, parse_ttl};
pub use role_assignment::{
    CandidateRejection, PrincipalCandidateSet, PrincipalType, RoleAssignment,
};
pub use timestamp::{
    ACCEPTED_TIMESTAMP_LAYOUTS, TimestampLayout, TimestampParseError, resolve_creation_timestamp,
    resolve_timestamp,
};
