//! Permission definitions

use crate::error::{AuthzError, Result};
use crate::types::{Permission, PermissionId};
use std::collections::BTreeMap;

/// (resource, action, description) rows of the standard catalog
const STANDARD_PERMISSIONS: &[(&str, &str, &str)] = &[
    ("organization", "read", "View organization settings"),
    ("organization", "update", "Change organization settings"),
    ("organization", "delete", "Delete the organization"),
    ("organization", "admin", "Full control of the organization"),
    ("user", "read", "View users"),
    ("user", "create", "Create users"),
    ("user", "update", "Edit users"),
    ("user", "delete", "Delete users"),
    ("user", "invite", "Invite users"),
    ("user", "admin", "Full control of users"),
    ("role", "read", "View roles"),
    ("role", "create", "Create custom roles"),
    ("role", "update", "Edit custom roles"),
    ("role", "delete", "Delete custom roles"),
    ("role", "assign", "Assign roles to users"),
    ("project", "read", "View projects"),
    ("project", "create", "Create projects"),
    ("project", "update", "Edit projects"),
    ("project", "delete", "Delete projects"),
    ("project", "admin", "Full control of projects"),
    ("billing", "read", "View billing"),
    ("billing", "update", "Manage billing"),
    ("profile", "read", "View own profile"),
    ("profile", "update", "Edit own profile"),
    ("audit", "read", "View audit logs"),
];

/// Read-only registry of permission definitions
#[derive(Debug, Clone)]
pub struct PermissionCatalog {
    permissions: BTreeMap<PermissionId, Permission>,
}

impl PermissionCatalog {
    /// The built-in catalog
    pub fn standard() -> Self {
        let permissions = STANDARD_PERMISSIONS
            .iter()
            .map(|(resource, action, description)| {
                let permission = Permission::new(*resource, *action).with_description(*description);
                (permission.id.clone(), permission)
            })
            .collect();

        Self { permissions }
    }

    /// Build a catalog from explicit definitions; ids must be unique
    pub fn from_permissions(permissions: impl IntoIterator<Item = Permission>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for permission in permissions {
            if map.contains_key(&permission.id) {
                return Err(AuthzError::InvalidCatalog(format!(
                    "duplicate permission id '{}'",
                    permission.id
                )));
            }
            map.insert(permission.id.clone(), permission);
        }
        Ok(Self { permissions: map })
    }

    pub fn get(&self, id: &str) -> Option<&Permission> {
        self.permissions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.permissions.contains_key(id)
    }

    /// All permissions ordered by id
    pub fn list(&self) -> Vec<&Permission> {
        self.permissions.values().collect()
    }

    pub fn by_resource(&self, resource: &str) -> Vec<&Permission> {
        self.permissions
            .values()
            .filter(|p| p.resource == resource)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl Default for PermissionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
