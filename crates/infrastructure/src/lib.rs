//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod arm_resource_group_repository;
mod arm_role_assignment_repository;
mod azure_endpoints;
mod azure_rest_client;
mod azure_token_source;
mod graph_directory_service;

pub use arm_resource_group_repository::ArmResourceGroupRepository;
pub use arm_role_assignment_repository::ArmRoleAssignmentRepository;
pub use azure_endpoints::{AzureEndpoints, PUBLIC_GRAPH_ENDPOINT, PUBLIC_RESOURCE_MANAGER_ENDPOINT};
pub use azure_token_source::{AccessTokenSource, AzureIdentityTokenSource, CredentialMode};
pub use graph_directory_service::{GET_BY_IDS_BATCH_SIZE, GraphDirectoryService};
