use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use rg_cleanup_core::AppError;

/// Kind of principal a role assignment grants access to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrincipalType {
    /// Directory user.
    User,
    /// Directory group.
    Group,
    /// Application or managed identity service principal.
    ServicePrincipal,
    /// Group from a foreign directory.
    ForeignGroup,
    /// Device identity.
    Device,
    /// Value this tool does not know about.
    Other(String),
}

impl PrincipalType {
    /// Returns the resource manager wire value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
            Self::ServicePrincipal => "ServicePrincipal",
            Self::ForeignGroup => "ForeignGroup",
            Self::Device => "Device",
            Self::Other(value) => value.as_str(),
        }
    }
}

impl FromStr for PrincipalType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "User" => Self::User,
            "Group" => Self::Group,
            "ServicePrincipal" => Self::ServicePrincipal,
            "ForeignGroup" => Self::ForeignGroup,
            "Device" => Self::Device,
            other => Self::Other(other.to_owned()),
        })
    }
}

/// Role assignment record as listed for a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    /// Fully qualified assignment resource id.
    pub id: Option<String>,
    /// Object id of the principal the role is granted to.
    pub principal_id: Option<String>,
    /// Kind of principal, when reported.
    pub principal_type: Option<PrincipalType>,
    /// Scope the assignment applies to.
    pub scope: Option<String>,
}

/// Why a role assignment was left out of the candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateRejection {
    /// The principal is not a service principal.
    NotServicePrincipal,
    /// The scope is not exactly the subscription root.
    OutOfScope,
    /// The assignment id or principal id is missing.
    MissingIdentifiers,
}

/// Role assignment ids grouped by the principal they reference.
///
/// Built during collection, shrunk by removing principals that still exist,
/// then drained for deletion. Iteration is ordered by principal id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalCandidateSet {
    assignments_by_principal: BTreeMap<String, Vec<String>>,
}

impl PrincipalCandidateSet {
    /// Creates an empty candidate set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `assignment` when it targets a service principal at exactly
    /// `subscription_scope` and carries both ids.
    pub fn admit(
        &mut self,
        subscription_scope: &str,
        assignment: RoleAssignment,
    ) -> Result<(), CandidateRejection> {
        if assignment.principal_type != Some(PrincipalType::ServicePrincipal) {
            return Err(CandidateRejection::NotServicePrincipal);
        }

        if assignment.scope.as_deref() != Some(subscription_scope) {
            return Err(CandidateRejection::OutOfScope);
        }

        let (Some(principal_id), Some(assignment_id)) = (assignment.principal_id, assignment.id)
        else {
            return Err(CandidateRejection::MissingIdentifiers);
        };

        self.assignments_by_principal
            .entry(principal_id)
            .or_default()
            .push(assignment_id);

        Ok(())
    }

    /// Returns the candidate principal ids in order.
    #[must_use]
    pub fn principal_ids(&self) -> Vec<String> {
        self.assignments_by_principal.keys().cloned().collect()
    }

    /// Drops every principal in `existing` along with its assignments.
    /// Returns how many principals were dropped.
    pub fn remove_existing(&mut self, existing: &HashSet<String>) -> usize {
        let before = self.assignments_by_principal.len();
        self.assignments_by_principal
            .retain(|principal_id, _| !existing.contains(principal_id));
        before - self.assignments_by_principal.len()
    }

    /// Returns the assignment ids recorded for `principal_id`.
    #[must_use]
    pub fn assignments_for(&self, principal_id: &str) -> Option<&[String]> {
        self.assignments_by_principal
            .get(principal_id)
            .map(Vec::as_slice)
    }

    /// Returns whether no candidates remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments_by_principal.is_empty()
    }

    /// Returns the number of candidate principals.
    #[must_use]
    pub fn principal_count(&self) -> usize {
        self.assignments_by_principal.len()
    }

    /// Returns the number of assignments across all principals.
    #[must_use]
    pub fn assignment_count(&self) -> usize {
        self.assignments_by_principal.values().map(Vec::len).sum()
    }
}

impl IntoIterator for PrincipalCandidateSet {
    type Item = (String, Vec<String>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.assignments_by_principal.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOPE: &str = "/subscriptions/0b1f6471-1bf0-4dda-aec3-cb9272f09590";

    fn assignment(id: &str, principal_id: &str) -> RoleAssignment {
        RoleAssignment {
            id: Some(id.to_owned()),
            principal_id: Some(principal_id.to_owned()),
            principal_type: Some(PrincipalType::ServicePrincipal),
            scope: Some(SCOPE.to_owned()),
        }
    }

    #[test]
    fn admit_groups_assignments_by_principal() {
        let mut candidates = PrincipalCandidateSet::new();
        assert!(candidates.admit(SCOPE, assignment("a2", "p2")).is_ok());
        assert!(candidates.admit(SCOPE, assignment("a1", "p1")).is_ok());
        assert!(candidates.admit(SCOPE, assignment("a3", "p2")).is_ok());

        assert_eq!(candidates.principal_ids(), vec!["p1", "p2"]);
        assert_eq!(
            candidates.assignments_for("p2"),
            Some(["a2".to_owned(), "a3".to_owned()].as_slice())
        );
        assert_eq!(candidates.assignment_count(), 3);
    }

    #[test]
    fn admit_rejects_other_principal_types() {
        let mut candidates = PrincipalCandidateSet::new();
        for principal_type in [
            None,
            Some(PrincipalType::User),
            Some(PrincipalType::Other("Unknown".to_owned())),
        ] {
            let result = candidates.admit(
                SCOPE,
                RoleAssignment {
                    principal_type,
                    ..assignment("a1", "p1")
                },
            );
            assert_eq!(result, Err(CandidateRejection::NotServicePrincipal));
        }
        assert!(candidates.is_empty());
    }

    #[test]
    fn admit_requires_exact_subscription_scope() {
        let mut candidates = PrincipalCandidateSet::new();
        for scope in [
            None,
            Some("/".to_owned()),
            Some("/providers/Microsoft.Management/managementGroups/root".to_owned()),
            Some(format!("{SCOPE}/resourceGroups/rg-1")),
        ] {
            let result = candidates.admit(
                SCOPE,
                RoleAssignment {
                    scope,
                    ..assignment("a1", "p1")
                },
            );
            assert_eq!(result, Err(CandidateRejection::OutOfScope));
        }
        assert!(candidates.is_empty());
    }

    #[test]
    fn admit_requires_both_ids() {
        let mut candidates = PrincipalCandidateSet::new();
        let missing_id = RoleAssignment {
            id: None,
            ..assignment("a1", "p1")
        };
        let missing_principal = RoleAssignment {
            principal_id: None,
            ..assignment("a1", "p1")
        };

        assert_eq!(
            candidates.admit(SCOPE, missing_id),
            Err(CandidateRejection::MissingIdentifiers)
        );
        assert_eq!(
            candidates.admit(SCOPE, missing_principal),
            Err(CandidateRejection::MissingIdentifiers)
        );
    }

    #[test]
    fn remove_existing_drops_whole_principals() {
        let mut candidates = PrincipalCandidateSet::new();
        let _ = candidates.admit(SCOPE, assignment("a1", "p1"));
        let _ = candidates.admit(SCOPE, assignment("a2", "p2"));
        let _ = candidates.admit(SCOPE, assignment("a3", "p2"));

        let removed = candidates.remove_existing(&HashSet::from([
            "p1".to_owned(),
            "p-unknown".to_owned(),
        ]));

        assert_eq!(removed, 1);
        let remaining: Vec<_> = candidates.into_iter().collect();
        assert_eq!(
            remaining,
            vec![("p2".to_owned(), vec!["a2".to_owned(), "a3".to_owned()])]
        );
    }

    #[test]
    fn principal_type_round_trips_unknown_values() {
        let parsed = PrincipalType::from_str("DirectoryRoleTemplate");
        assert_eq!(
            parsed.ok(),
            Some(PrincipalType::Other("DirectoryRoleTemplate".to_owned()))
        );
        assert_eq!(
            PrincipalType::from_str("ServicePrincipal").ok(),
            Some(PrincipalType::ServicePrincipal)
        );
    }
}
