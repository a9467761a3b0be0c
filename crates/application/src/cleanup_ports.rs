mod directory;
mod page;
mod resource_groups;
mod role_assignments;

pub use directory::DirectoryService;
pub use page::Page;
pub use resource_groups::ResourceGroupRepository;
pub use role_assignments::RoleAssignmentRepository;
