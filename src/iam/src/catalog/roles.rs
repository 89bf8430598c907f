//! System role catalog and the custom-role lookup seam

use super::hierarchy::RoleHierarchy;
use super::permissions::PermissionCatalog;
use crate::error::{AuthzError, Result};
use crate::types::{Condition, ConditionType, Permission, Role, RoleId};
use std::collections::{BTreeMap, HashMap};

/// Ids of the built-in system roles
pub mod system_roles {
    pub const ORGANIZATION_ADMIN: &str = "roles/organization.admin";
    pub const ORGANIZATION_VIEWER: &str = "roles/organization.viewer";
    pub const USER_ADMIN: &str = "roles/user.admin";
    pub const USER_MANAGER: &str = "roles/user.manager";
    pub const USER_VIEWER: &str = "roles/user.viewer";
    pub const PROJECT_ADMIN: &str = "roles/project.admin";
    pub const PROJECT_EDITOR: &str = "roles/project.editor";
    pub const PROJECT_VIEWER: &str = "roles/project.viewer";
    pub const BILLING_ADMIN: &str = "roles/billing.admin";
    pub const AUTHENTICATED_USER: &str = "roles/authenticated.user";
}

use system_roles::*;

const PROFILE: &[&str] = &["profile.read", "profile.update"];

/// (id, name, description, permission ids); profile permissions are added to every role
const STANDARD_ROLES: &[(&str, &str, &str, &[&str])] = &[
    (AUTHENTICATED_USER, "Authenticated User", "Baseline access for any signed-in user", &[]),
    (USER_VIEWER, "User Viewer", "View users", &["user.read"]),
    (
        USER_MANAGER,
        "User Manager",
        "Manage users within a department",
        &["user.read", "user.create", "user.update", "user.invite"],
    ),
    (
        USER_ADMIN,
        "User Admin",
        "Full control of users and role assignment",
        &[
            "user.read",
            "user.create",
            "user.update",
            "user.delete",
            "user.invite",
            "role.read",
            "role.assign",
        ],
    ),
    (PROJECT_VIEWER, "Project Viewer", "View projects", &["project.read"]),
    (
        PROJECT_EDITOR,
        "Project Editor",
        "Create and edit projects",
        &["project.read", "project.create", "project.update"],
    ),
    (
        PROJECT_ADMIN,
        "Project Admin",
        "Full control of projects",
        &[
            "project.read",
            "project.create",
            "project.update",
            "project.delete",
            "project.admin",
        ],
    ),
    (
        BILLING_ADMIN,
        "Billing Admin",
        "Manage billing",
        &["organization.read", "billing.read", "billing.update"],
    ),
    (
        ORGANIZATION_VIEWER,
        "Organization Viewer",
        "Read-only access across the organization",
        &[
            "organization.read",
            "user.read",
            "project.read",
            "role.read",
            "billing.read",
        ],
    ),
];

/// Grants that only apply under a condition: (role, permission, type, value)
const CONDITIONED_GRANTS: &[(&str, &str, ConditionType, &str)] = &[
    (AUTHENTICATED_USER, "profile.update", ConditionType::ResourceOwner, "self"),
    (USER_VIEWER, "profile.update", ConditionType::ResourceOwner, "self"),
    (USER_MANAGER, "profile.update", ConditionType::ResourceOwner, "self"),
    (USER_MANAGER, "user.invite", ConditionType::DepartmentMember, "same_department"),
    (PROJECT_VIEWER, "profile.update", ConditionType::ResourceOwner, "self"),
    (PROJECT_EDITOR, "profile.update", ConditionType::ResourceOwner, "self"),
    (BILLING_ADMIN, "profile.update", ConditionType::ResourceOwner, "self"),
    (ORGANIZATION_VIEWER, "profile.update", ConditionType::ResourceOwner, "self"),
];

/// Parent -> subordinate roles
const STANDARD_HIERARCHY: &[(&str, &[&str])] = &[
    (
        ORGANIZATION_ADMIN,
        &[USER_ADMIN, PROJECT_ADMIN, BILLING_ADMIN, ORGANIZATION_VIEWER],
    ),
    (ORGANIZATION_VIEWER, &[USER_VIEWER, PROJECT_VIEWER]),
    (USER_ADMIN, &[USER_MANAGER]),
    (USER_MANAGER, &[USER_VIEWER]),
    (USER_VIEWER, &[AUTHENTICATED_USER]),
    (PROJECT_ADMIN, &[PROJECT_EDITOR]),
    (PROJECT_EDITOR, &[PROJECT_VIEWER]),
    (PROJECT_VIEWER, &[AUTHENTICATED_USER]),
    (BILLING_ADMIN, &[AUTHENTICATED_USER]),
];

/// Immutable mapping from system role id to its permissions, plus the hierarchy
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    roles: HashMap<RoleId, Role>,
    hierarchy: RoleHierarchy,
}

impl RoleCatalog {
    /// The built-in system roles
    pub fn standard(permissions: &PermissionCatalog) -> Result<Self> {
        let lookup = |id: &str| -> Result<Permission> {
            permissions
                .get(id)
                .cloned()
                .ok_or_else(|| AuthzError::InvalidCatalog(format!("unknown permission '{}'", id)))
        };

        let mut roles = Vec::with_capacity(STANDARD_ROLES.len() + 1);
        for (id, name, description, grants) in STANDARD_ROLES {
            let mut role_permissions = Vec::with_capacity(PROFILE.len() + grants.len());
            for permission_id in PROFILE.iter().chain(grants.iter()) {
                let mut permission = lookup(*permission_id)?;
                for (role, granted, condition_type, value) in CONDITIONED_GRANTS {
                    if role == id && *granted == permission.id {
                        permission = permission.with_condition(Condition::new(condition_type.clone()).with_value(*value));
                    }
                }
                role_permissions.push(permission);
            }
            roles.push(Role::system(*id, *name, *description, role_permissions));
        }

        roles.push(Role::system(
            ORGANIZATION_ADMIN,
            "Organization Admin",
            "Full control of the organization",
            permissions.list().into_iter().cloned().collect(),
        ));

        let hierarchy = STANDARD_HIERARCHY
            .iter()
            .map(|(parent, children)| {
                (
                    parent.to_string(),
                    children.iter().map(|c| c.to_string()).collect(),
                )
            })
            .collect();

        Self::from_parts(roles, hierarchy, permissions)
    }

    /// Build a catalog from explicit roles and hierarchy
    ///
    /// Every role must be a system role whose permissions exist in
    /// `permissions`, and the hierarchy may only mention known roles.
    pub fn from_parts(
        roles: Vec<Role>,
        hierarchy: BTreeMap<RoleId, Vec<RoleId>>,
        permissions: &PermissionCatalog,
    ) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(roles.len());
        for role in roles {
            if !role.is_system_role {
                return Err(AuthzError::InvalidCatalog(format!(
                    "role '{}' is not a system role",
                    role.id
                )));
            }
            if let Some(missing) = role.permissions.iter().find(|p| !permissions.contains(&p.id)) {
                return Err(AuthzError::InvalidCatalog(format!(
                    "role '{}' references unknown permission '{}'",
                    role.id, missing.id
                )));
            }
            if by_id.contains_key(&role.id) {
                return Err(AuthzError::InvalidCatalog(format!("duplicate role id '{}'", role.id)));
            }
            by_id.insert(role.id.clone(), role);
        }

        for (parent, children) in &hierarchy {
            if let Some(unknown) = std::iter::once(parent).chain(children).find(|r| !by_id.contains_key(*r)) {
                return Err(AuthzError::InvalidCatalog(format!(
                    "hierarchy references unknown role '{}'",
                    unknown
                )));
            }
        }

        Ok(Self {
            roles: by_id,
            hierarchy: RoleHierarchy::new(hierarchy)?,
        })
    }

    /// Permissions of a system role; empty for unknown and custom role ids
    pub fn system_role_permissions(&self, role_id: &str) -> &[Permission] {
        self.roles
            .get(role_id)
            .map(|role| role.permissions.as_slice())
            .unwrap_or(&[])
    }

    pub fn system_role(&self, role_id: &str) -> Option<&Role> {
        self.roles.get(role_id)
    }

    pub fn is_system_role(&self, role_id: &str) -> bool {
        self.roles.contains_key(role_id)
    }

    /// All system role ids, sorted
    pub fn system_role_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.roles.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn role_hierarchy(&self) -> &BTreeMap<RoleId, Vec<RoleId>> {
        self.hierarchy.as_map()
    }

    pub fn hierarchy(&self) -> &RoleHierarchy {
        &self.hierarchy
    }

    pub fn inherits_from(&self, child_id: &str, parent_id: &str) -> bool {
        self.hierarchy.inherits_from(child_id, parent_id)
    }

    pub fn subordinates(&self, role_id: &str) -> Vec<RoleId> {
        self.hierarchy.subordinates(role_id)
    }
}

/// Resolves permissions of organization-defined custom roles
///
/// Implementations own their own timeouts and cancellation.
pub trait CustomRoleLookup: Send + Sync {
    fn lookup_custom_role_permissions(&self, role_id: &str) -> Result<Vec<Permission>>;
}

/// In-memory custom role store
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomRoles {
    roles: HashMap<RoleId, Vec<Permission>>,
}

impl InMemoryCustomRoles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: &Role) {
        self.roles.insert(role.id.clone(), role.permissions.clone());
    }

    pub fn with_role(mut self, role: &Role) -> Self {
        self.insert(role);
        self
    }

    pub fn remove(&mut self, role_id: &str) -> bool {
        self.roles.remove(role_id).is_some()
    }
}

impl CustomRoleLookup for InMemoryCustomRoles {
    fn lookup_custom_role_permissions(&self, role_id: &str) -> Result<Vec<Permission>> {
        Ok(self.roles.get(role_id).cloned().unwrap_or_default())
    }
}
