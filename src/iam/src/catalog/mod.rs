//! Static catalogs built once at startup
//!
//! - [`PermissionCatalog`]: permission definitions keyed by id
//! - [`RoleCatalog`]: system roles, their permission sets and the role hierarchy
//!
//! Both are immutable after construction and cheap to share behind an `Arc`.

pub mod hierarchy;
pub mod permissions;
pub mod roles;

pub use hierarchy::RoleHierarchy;
pub use permissions::PermissionCatalog;
pub use roles::{system_roles, CustomRoleLookup, InMemoryCustomRoles, RoleCatalog};
