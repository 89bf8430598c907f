//! Engine facade
//!
//! Builds the catalogs once and wires the resolver and role manager from an
//! [`EngineConfig`]. Every component is shared read-only, so one engine can
//! serve any number of threads.

use crate::bindings;
use crate::catalog::{CustomRoleLookup, PermissionCatalog, RoleCatalog};
use crate::clock::{Clock, SystemClock};
use crate::conditions::ConditionEvaluator;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::manager::RoleManager;
use crate::resolver::PermissionResolver;
use crate::types::{
    Permission, PermissionCheckRequest, PermissionCheckResponse, RoleBinding,
    UpdateRoleBindingRequest, User,
};
use std::sync::Arc;
use tracing::info;

/// Role and permission engine
#[derive(Clone)]
pub struct IamEngine {
    config: EngineConfig,
    permissions: Arc<PermissionCatalog>,
    roles: Arc<RoleCatalog>,
    resolver: PermissionResolver,
    manager: RoleManager,
    clock: Arc<dyn Clock>,
}

impl IamEngine {
    /// Engine over the standard catalogs
    pub fn new(config: EngineConfig) -> Result<Self> {
        let permissions = PermissionCatalog::standard();
        let roles = RoleCatalog::standard(&permissions)?;
        Self::with_catalogs(config, permissions, roles)
    }

    /// Engine over caller-supplied catalogs
    pub fn with_catalogs(config: EngineConfig, permissions: PermissionCatalog, roles: RoleCatalog) -> Result<Self> {
        let permissions = Arc::new(permissions);
        let roles = Arc::new(roles);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let evaluator = ConditionEvaluator::new(config.unresolved_conditions);
        let resolver = PermissionResolver::new(roles.clone(), evaluator, config.scope_mode);
        let manager = RoleManager::new(roles.clone(), permissions.clone())?;

        info!(
            permissions = permissions.len(),
            system_roles = roles.system_role_ids().len(),
            scope_mode = ?config.scope_mode,
            unresolved_conditions = ?config.unresolved_conditions,
            "IAM engine initialized"
        );

        Ok(Self {
            config,
            permissions,
            roles,
            resolver,
            manager,
            clock,
        })
    }

    pub fn with_custom_roles(mut self, lookup: Arc<dyn CustomRoleLookup>) -> Self {
        self.resolver = self.resolver.with_custom_roles(lookup);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.resolver = self.resolver.with_clock(clock.clone());
        self.manager = self.manager.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn permissions(&self) -> &PermissionCatalog {
        &self.permissions
    }

    pub fn roles(&self) -> &RoleCatalog {
        &self.roles
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    pub fn manager(&self) -> &RoleManager {
        &self.manager
    }

    pub fn check_permission(&self, user: &User, request: &PermissionCheckRequest) -> PermissionCheckResponse {
        self.resolver.check_permission(user, request)
    }

    pub fn effective_permissions(&self, user: &User) -> Vec<Permission> {
        self.resolver.effective_permissions(user)
    }

    /// Apply binding updates at the engine's current time
    pub fn update_user_role_bindings(
        &self,
        user: &User,
        updates: &[UpdateRoleBindingRequest],
        updated_by: &str,
    ) -> Vec<RoleBinding> {
        bindings::update_user_role_bindings(user, updates, updated_by, self.clock.now())
    }
}

impl std::fmt::Debug for IamEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IamEngine")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .field("manager", &self.manager)
            .finish()
    }
}
