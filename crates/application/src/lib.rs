//! Application services and ports.

#![forbid(unsafe_code)]

mod cleanup_ports;
mod resource_group_sweeper;
mod role_assignment_reconciler;

pub use cleanup_ports::{DirectoryService, Page, ResourceGroupRepository, RoleAssignmentRepository};
pub use resource_group_sweeper::{ResourceGroupSweeper, SweepOptions, SweepReport};
pub use role_assignment_reconciler::{ReconcileReport, RoleAssignmentReconciler};
