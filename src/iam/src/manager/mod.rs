//! Role administration
//!
//! Custom role lifecycle, template roles, binding creation, delegation and
//! policy synthesis. System roles never change: any attempt to update or
//! delete one fails before anything is touched.

pub mod delegation;
pub mod policy;
pub mod validation;

pub use delegation::{can_assign_role, AssignScope, DelegationRule, DELEGATION_RULES};
pub use policy::{create_iam_policy, PolicyBindingRequest};
pub use validation::{validate_role_permissions, RoleValidation};

use crate::bindings::active_bindings;
use crate::catalog::{PermissionCatalog, RoleCatalog};
use crate::clock::{Clock, SystemClock};
use crate::error::{AuthzError, Result};
use crate::types::{Permission, Policy, ResourceType, Role, RoleBinding, RoleId, RoleType, User};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{error, info};

/// Prefix for generated custom role ids
pub const CUSTOM_ROLE_PREFIX: &str = "custom/";

/// Changes to a custom role; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RolePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<Permission>>,
}

impl RolePatch {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = Some(permissions);
        self
    }
}

/// Stateless role administration service
#[derive(Clone)]
pub struct RoleManager {
    roles: Arc<RoleCatalog>,
    permissions: Arc<PermissionCatalog>,
    clock: Arc<dyn Clock>,
    slug_separator: Regex,
}

impl RoleManager {
    pub fn new(roles: Arc<RoleCatalog>, permissions: Arc<PermissionCatalog>) -> Result<Self> {
        let slug_separator = Regex::new(r"[^a-z0-9]+")
            .map_err(|e| AuthzError::Config(format!("invalid slug pattern: {}", e)))?;

        Ok(Self {
            roles,
            permissions,
            clock: Arc::new(SystemClock),
            slug_separator,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ===== Custom role lifecycle =====

    /// Create an organization-defined role
    ///
    /// The permission list is taken as is; call
    /// [`validate_role_permissions`](Self::validate_role_permissions) first
    /// when it must be checked.
    pub fn create_custom_role(
        &self,
        name: &str,
        description: &str,
        permissions: Vec<Permission>,
        organization_id: Option<&str>,
        created_by: Option<&str>,
    ) -> Role {
        let now = self.clock.now();
        let role = Role {
            id: format!("{}{}-{}", CUSTOM_ROLE_PREFIX, self.slugify(name), now.timestamp_millis()),
            name: name.to_string(),
            description: description.to_string(),
            role_type: RoleType::Custom,
            permissions,
            is_system_role: false,
            organization_id: organization_id.map(str::to_string),
            created_by: created_by.map(str::to_string),
            created_at: Some(now),
            updated_at: Some(now),
        };

        info!(
            role_id = %role.id,
            organization_id = ?role.organization_id,
            created_by = ?role.created_by,
            permissions = role.permissions.len(),
            "custom role created"
        );

        role
    }

    /// Return an updated copy of a custom role
    pub fn update_custom_role(&self, role: &Role, patch: RolePatch, updated_by: &str) -> Result<Role> {
        self.ensure_mutable(role, updated_by, "updated")?;

        let mut updated = role.clone();
        if let Some(name) = patch.name {
            updated.name = name;
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(permissions) = patch.permissions {
            updated.permissions = permissions;
        }
        updated.updated_at = Some(self.clock.now());

        info!(role_id = %role.id, updated_by, "custom role updated");
        Ok(updated)
    }

    /// Check that a custom role may be deleted by `deleted_by`
    ///
    /// Removal from storage is the caller's job once this returns `Ok`.
    pub fn delete_custom_role(&self, role: &Role, deleted_by: &str) -> Result<()> {
        self.ensure_mutable(role, deleted_by, "deleted")?;

        info!(role_id = %role.id, deleted_by, "custom role deleted");
        Ok(())
    }

    fn ensure_mutable(&self, role: &Role, actor: &str, operation: &str) -> Result<()> {
        if role.is_system_role || self.roles.is_system_role(&role.id) {
            error!(role_id = %role.id, actor, operation, "attempted to modify a system role");
            return Err(AuthzError::SystemRoleImmutable {
                role_id: role.id.clone(),
                operation: operation.to_string(),
            });
        }

        // Roles without a recorded creator are open to any administrator
        if let Some(creator) = role.created_by.as_deref() {
            if creator != actor {
                return Err(AuthzError::NotRoleCreator {
                    role_id: role.id.clone(),
                    actor: actor.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Create a custom role seeded with a system role's permissions
    pub fn create_role_from_template(
        &self,
        template_role_id: &str,
        name: &str,
        description: &str,
        organization_id: Option<&str>,
        created_by: Option<&str>,
    ) -> Result<Role> {
        let template = self
            .roles
            .system_role(template_role_id)
            .ok_or_else(|| AuthzError::RoleNotFound(template_role_id.to_string()))?;

        Ok(self.create_custom_role(
            name,
            description,
            template.permissions.clone(),
            organization_id,
            created_by,
        ))
    }

    fn slugify(&self, name: &str) -> String {
        let lowered = name.to_lowercase();
        let slug = self.slug_separator.replace_all(&lowered, "-");
        let slug = slug.trim_matches('-');
        if slug.is_empty() {
            "role".to_string()
        } else {
            slug.to_string()
        }
    }

    // ===== Bindings and delegation =====

    /// Create a binding for a role assignment
    pub fn create_role_binding(
        &self,
        role_id: &str,
        assigned_by: &str,
        scope: Option<(ResourceType, &str)>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<RoleBinding> {
        if role_id.trim().is_empty() {
            return Err(AuthzError::InvalidInput("role id must not be empty".to_string()));
        }

        let now = self.clock.now();
        if let Some(expires_at) = expires_at {
            if expires_at <= now {
                return Err(AuthzError::InvalidInput(format!(
                    "binding for '{}' would already be expired at {}",
                    role_id, expires_at
                )));
            }
        }

        let mut binding = RoleBinding::new(role_id, assigned_by, now);
        if let Some((resource_type, resource_id)) = scope {
            binding = binding.with_scope(resource_type, resource_id);
        }
        binding.expires_at = expires_at;

        info!(binding_id = %binding.id, role_id, assigned_by, "role binding created");
        Ok(binding)
    }

    pub fn can_assign_role<S: AsRef<str>>(&self, assigner_role_ids: &[S], target_role_id: &str) -> bool {
        can_assign_role(assigner_role_ids, target_role_id)
    }

    /// System roles the user may assign, judged by their effective bindings
    pub fn available_roles(&self, user: &User) -> Vec<RoleId> {
        let assigner_roles: BTreeSet<&str> = active_bindings(&user.role_bindings, self.clock.now())
            .into_iter()
            .map(|binding| binding.role_id.as_str())
            .collect();
        let assigner_roles: Vec<&str> = assigner_roles.into_iter().collect();

        self.roles
            .system_role_ids()
            .into_iter()
            .filter(|target| can_assign_role(assigner_roles.as_slice(), target))
            .map(str::to_string)
            .collect()
    }

    // ===== Validation, policy and hierarchy =====

    pub fn validate_role_permissions(&self, permissions: &[Permission], role_type: RoleType) -> RoleValidation {
        validate_role_permissions(permissions, role_type, &self.permissions)
    }

    pub fn create_iam_policy(&self, requests: &[PolicyBindingRequest]) -> Policy {
        create_iam_policy(requests)
    }

    pub fn role_hierarchy(&self) -> &BTreeMap<RoleId, Vec<RoleId>> {
        self.roles.role_hierarchy()
    }

    pub fn inherits_from(&self, child_id: &str, parent_id: &str) -> bool {
        self.roles.inherits_from(child_id, parent_id)
    }
}

impl std::fmt::Debug for RoleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleManager")
            .field("system_roles", &self.roles.system_role_ids().len())
            .field("permissions", &self.permissions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::system_roles;
    use crate::clock::FixedClock;
    use chrono::{Duration, TimeZone};

    fn manager() -> RoleManager {
        let permissions = PermissionCatalog::standard();
        let roles = RoleCatalog::standard(&permissions).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        RoleManager::new(Arc::new(roles), Arc::new(permissions))
            .unwrap()
            .with_clock(Arc::new(FixedClock(now)))
    }

    #[test]
    fn test_custom_role_id_from_slug_and_time() {
        let manager = manager();
        let role = manager.create_custom_role("Support Team (EU)", "d", vec![], Some("acme"), Some("alice"));

        assert_eq!(role.id, "custom/support-team-eu-1704067200000");
        assert_eq!(role.role_type, RoleType::Custom);
        assert!(!role.is_system_role);
        assert_eq!(role.organization_id.as_deref(), Some("acme"));
    }

    #[test]
    fn test_blank_name_slug() {
        let role = manager().create_custom_role("!!!", "", vec![], None, None);
        assert!(role.id.starts_with("custom/role-"));
    }

    #[test]
    fn test_system_role_immutable() {
        let manager = manager();
        let viewer = manager.roles.system_role(system_roles::USER_VIEWER).unwrap().clone();

        let update = manager.update_custom_role(&viewer, RolePatch::default().with_name("Hacked"), "alice");
        assert!(matches!(update, Err(AuthzError::SystemRoleImmutable { .. })));

        let delete = manager.delete_custom_role(&viewer, "alice");
        assert!(matches!(delete, Err(AuthzError::SystemRoleImmutable { .. })));

        assert_eq!(manager.roles.system_role(system_roles::USER_VIEWER).unwrap().name, "User Viewer");
    }

    #[test]
    fn test_spoofed_system_role_id_rejected() {
        let manager = manager();
        let mut spoof = manager.create_custom_role("x", "", vec![], None, Some("alice"));
        spoof.id = system_roles::ORGANIZATION_ADMIN.to_string();

        let result = manager.update_custom_role(&spoof, RolePatch::default(), "alice");
        assert!(matches!(result, Err(AuthzError::SystemRoleImmutable { .. })));
    }

    #[test]
    fn test_only_creator_may_modify() {
        let manager = manager();
        let role = manager.create_custom_role("Editors", "", vec![], None, Some("alice"));

        let by_bob = manager.update_custom_role(&role, RolePatch::default().with_name("Renamed"), "bob");
        assert!(matches!(by_bob, Err(AuthzError::NotRoleCreator { .. })));
        assert!(matches!(manager.delete_custom_role(&role, "bob"), Err(AuthzError::NotRoleCreator { .. })));

        let by_alice = manager
            .update_custom_role(&role, RolePatch::default().with_description("Edits projects"), "alice")
            .unwrap();
        assert_eq!(by_alice.name, "Editors");
        assert_eq!(by_alice.description, "Edits projects");
        assert!(manager.delete_custom_role(&role, "alice").is_ok());
    }

    #[test]
    fn test_template_copies_permissions() {
        let manager = manager();
        let role = manager
            .create_role_from_template(system_roles::PROJECT_EDITOR, "Editors", "", Some("acme"), None)
            .unwrap();

        assert_eq!(role.permissions, manager.roles.system_role_permissions(system_roles::PROJECT_EDITOR));
        assert!(matches!(
            manager.create_role_from_template("roles/missing", "x", "", None, None),
            Err(AuthzError::RoleNotFound(_))
        ));
    }

    #[test]
    fn test_create_role_binding() {
        let manager = manager();
        let now = manager.clock.now();

        let binding = manager
            .create_role_binding(system_roles::PROJECT_VIEWER, "alice", Some((ResourceType::Project, "p1")), Some(now + Duration::days(1)))
            .unwrap();
        assert_eq!(binding.resource_id.as_deref(), Some("p1"));
        assert_eq!(binding.created_at, now);

        let expired = manager.create_role_binding(system_roles::PROJECT_VIEWER, "alice", None, Some(now));
        assert!(matches!(expired, Err(AuthzError::InvalidInput(_))));
    }

    #[test]
    fn test_available_roles_for_manager() {
        let manager = manager();
        let now = manager.clock.now();
        let user = User::new("u1").with_binding(RoleBinding::new(system_roles::USER_MANAGER, "admin", now));

        assert_eq!(
            manager.available_roles(&user),
            vec![system_roles::AUTHENTICATED_USER.to_string(), system_roles::USER_VIEWER.to_string()]
        );
    }

    #[test]
    fn test_available_roles_ignore_expired_bindings() {
        let manager = manager();
        let now = manager.clock.now();
        let user = User::new("u1").with_binding(
            RoleBinding::new(system_roles::ORGANIZATION_ADMIN, "root", now - Duration::days(2))
                .with_expiry(now - Duration::days(1)),
        );

        assert!(manager.available_roles(&user).is_empty());
    }
}
