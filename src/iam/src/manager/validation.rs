//! Permission-set validation for roles
//!
//! Problems come back as data; nothing here returns an error.

use crate::catalog::PermissionCatalog;
use crate::types::{Permission, RoleType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const EMPTY_ROLE_ERROR: &str = "Role must have at least one permission";
pub const MIXED_ADMIN_ERROR: &str = "Role cannot mix admin permissions with non-admin permissions";

/// Outcome of [`validate_role_permissions`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl RoleValidation {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Check a permission list before it becomes a role
///
/// An empty list short-circuits with a single error.
pub fn validate_role_permissions(
    permissions: &[Permission],
    role_type: RoleType,
    catalog: &PermissionCatalog,
) -> RoleValidation {
    if permissions.is_empty() {
        return RoleValidation::from_errors(vec![EMPTY_ROLE_ERROR.to_string()]);
    }

    let mut errors = Vec::new();

    let admin = permissions.iter().filter(|p| p.is_admin()).count();
    if admin > 0 && admin < permissions.len() {
        errors.push(MIXED_ADMIN_ERROR.to_string());
    }

    if role_type == RoleType::Custom {
        for permission in permissions.iter().filter(|p| is_organization_level(p)) {
            errors.push(format!(
                "Custom roles cannot include organization permission: {}",
                permission.id
            ));
        }
    }

    let mut seen = HashSet::new();
    for permission in permissions {
        if !catalog.contains(&permission.id) {
            errors.push(format!("Unknown permission: {}", permission.id));
        }
        if !seen.insert(permission.id.as_str()) {
            errors.push(format!("Duplicate permission: {}", permission.id));
        }
    }

    RoleValidation::from_errors(errors)
}

fn is_organization_level(permission: &Permission) -> bool {
    permission.resource == "organization"
        || permission.id.contains("organization")
        || permission.name.contains("organization")
}
