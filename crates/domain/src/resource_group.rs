use std::collections::BTreeMap;

use rg_cleanup_core::{AppResult, NonEmptyString};

/// Tag holding the point in time a resource group was created.
pub const CREATION_TIMESTAMP_TAG: &str = "creationTimestamp";

/// Tag whose presence exempts a resource group from cleanup.
pub const DO_NOT_DELETE_TAG: &str = "DO-NOT-DELETE";

/// Resource tags as returned by the resource manager. Values may be null.
pub type ResourceTags = BTreeMap<String, Option<String>>;

/// Snapshot of one resource group read from the subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroup {
    name: NonEmptyString,
    tags: Option<ResourceTags>,
}

impl ResourceGroup {
    /// Creates a resource group snapshot. The name must not be empty.
    pub fn new(name: impl Into<String>, tags: Option<ResourceTags>) -> AppResult<Self> {
        Ok(Self {
            name: NonEmptyString::new(name)?,
            tags,
        })
    }

    /// Returns the resource group name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the tag mapping, if the group carries one at all.
    #[must_use]
    pub fn tags(&self) -> Option<&ResourceTags> {
        self.tags.as_ref()
    }
}

/// Renders a tag mapping for log and verdict messages, e.g. `{env: dev, owner: null}`.
#[must_use]
pub fn format_tags(tags: Option<&ResourceTags>) -> String {
    let entries = tags
        .map(|tags| {
            tags.iter()
                .map(|(key, value)| format!("{key}: {}", value.as_deref().unwrap_or("null")))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    format!("{{{}}}", entries.join(", "))
}
