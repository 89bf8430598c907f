//! Permission resolution
//!
//! Answers point-in-time checks and lists effective permissions. The clock is
//! sampled once per call so every binding is judged against the same instant,
//! and each custom role is looked up at most once per call.

use crate::bindings::active_bindings;
use crate::catalog::{CustomRoleLookup, RoleCatalog};
use crate::clock::{Clock, SystemClock};
use crate::conditions::ConditionEvaluator;
use crate::config::ScopeMode;
use crate::types::{
    CheckReason, Permission, PermissionCheckRequest, PermissionCheckResponse, RoleBinding, RoleId,
    User,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves a user's permissions from direct grants and role bindings
#[derive(Clone)]
pub struct PermissionResolver {
    catalog: Arc<RoleCatalog>,
    evaluator: ConditionEvaluator,
    custom_roles: Option<Arc<dyn CustomRoleLookup>>,
    clock: Arc<dyn Clock>,
    scope_mode: ScopeMode,
}

impl PermissionResolver {
    pub fn new(catalog: Arc<RoleCatalog>, evaluator: ConditionEvaluator, scope_mode: ScopeMode) -> Self {
        Self {
            catalog,
            evaluator,
            custom_roles: None,
            clock: Arc::new(SystemClock),
            scope_mode,
        }
    }

    pub fn with_custom_roles(mut self, lookup: Arc<dyn CustomRoleLookup>) -> Self {
        self.custom_roles = Some(lookup);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn scope_mode(&self) -> ScopeMode {
        self.scope_mode
    }

    /// Decide whether `user` holds `request.permission`
    pub fn check_permission(&self, user: &User, request: &PermissionCheckRequest) -> PermissionCheckResponse {
        self.check_permission_at(user, request, self.clock.now())
    }

    /// [`check_permission`](Self::check_permission) against an explicit instant
    pub fn check_permission_at(
        &self,
        user: &User,
        request: &PermissionCheckRequest,
        now: DateTime<Utc>,
    ) -> PermissionCheckResponse {
        if request.user_id != user.id {
            debug!(user_id = %user.id, request_user_id = %request.user_id, "request issued for another user");
            return PermissionCheckResponse::denied(CheckReason::UserMismatch);
        }

        let context = request.context.as_ref();

        // Step 1: direct permissions
        for permission in user.direct_permissions.iter().filter(|p| p.name == request.permission) {
            if self.evaluator.evaluate(user, &permission.conditions, context, now) {
                debug!(user_id = %user.id, permission = %request.permission, "granted by direct permission");
                return PermissionCheckResponse::granted(CheckReason::Direct).with_conditions(&permission.conditions);
            }
        }

        // Step 2-3: candidates from effective bindings
        let mut custom: HashMap<RoleId, Vec<Permission>> = HashMap::new();
        for binding in active_bindings(&user.role_bindings, now) {
            if !self.scope_matches(binding, request) {
                continue;
            }

            let permissions = self.role_permissions(&binding.role_id, &mut custom);
            let mut candidates = permissions.iter().filter(|p| p.name == request.permission).peekable();
            if candidates.peek().is_none() {
                continue;
            }

            if !self.evaluator.evaluate(user, &binding.conditions, context, now) {
                debug!(user_id = %user.id, role_id = %binding.role_id, "binding conditions not met");
                continue;
            }

            for permission in candidates {
                if !self.evaluator.evaluate(user, &permission.conditions, context, now) {
                    debug!(
                        user_id = %user.id,
                        role_id = %binding.role_id,
                        permission_id = %permission.id,
                        "permission conditions not met"
                    );
                    continue;
                }

                debug!(
                    user_id = %user.id,
                    permission = %request.permission,
                    role_id = %binding.role_id,
                    binding_id = %binding.id,
                    "granted by role binding"
                );

                let required: Vec<_> = binding.conditions.iter().chain(&permission.conditions).cloned().collect();
                return PermissionCheckResponse::granted(CheckReason::RoleBased).with_conditions(&required);
            }
        }

        // Step 4: default deny
        debug!(user_id = %user.id, permission = %request.permission, "no supporting permission");
        PermissionCheckResponse::denied(CheckReason::NotFound)
    }

    /// Direct and role-based permissions, deduplicated by id
    ///
    /// Scope and conditions are ignored. Use for listing only, never for
    /// enforcement.
    pub fn effective_permissions(&self, user: &User) -> Vec<Permission> {
        self.effective_permissions_at(user, self.clock.now())
    }

    pub fn effective_permissions_at(&self, user: &User, now: DateTime<Utc>) -> Vec<Permission> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut result = Vec::new();

        for permission in &user.direct_permissions {
            if seen.insert(permission.id.clone()) {
                result.push(permission.clone());
            }
        }

        let mut custom: HashMap<RoleId, Vec<Permission>> = HashMap::new();
        for binding in active_bindings(&user.role_bindings, now) {
            for permission in self.role_permissions(&binding.role_id, &mut custom) {
                if seen.insert(permission.id.clone()) {
                    result.push(permission.clone());
                }
            }
        }

        result
    }

    /// Permissions carried by a role: catalog for system roles, the lookup
    /// (memoized in `custom`) for everything else
    fn role_permissions<'a>(
        &'a self,
        role_id: &str,
        custom: &'a mut HashMap<RoleId, Vec<Permission>>,
    ) -> &'a [Permission] {
        if self.catalog.is_system_role(role_id) {
            return self.catalog.system_role_permissions(role_id);
        }

        custom
            .entry(role_id.to_string())
            .or_insert_with(|| self.lookup_custom(role_id))
            .as_slice()
    }

    fn lookup_custom(&self, role_id: &str) -> Vec<Permission> {
        let Some(lookup) = &self.custom_roles else {
            debug!(role_id, "no custom role lookup configured");
            return Vec::new();
        };

        match lookup.lookup_custom_role_permissions(role_id) {
            Ok(permissions) => permissions,
            Err(e) => {
                warn!(role_id, error = %e, "custom role lookup failed, contributing no permissions");
                Vec::new()
            }
        }
    }

    /// Resource-scope compatibility of a binding with the request
    ///
    /// Only applies when the request names a resource type. Global bindings
    /// always match; a binding with only half a scope never does.
    fn scope_matches(&self, binding: &RoleBinding, request: &PermissionCheckRequest) -> bool {
        let Some(requested_type) = request.resource_type else {
            return true;
        };

        if binding.has_partial_scope() {
            warn!(binding_id = %binding.id, role_id = %binding.role_id, "binding has a partial scope, ignored");
            return false;
        }

        match binding.resource_type {
            None => true,
            Some(bound_type) if bound_type != requested_type => false,
            Some(_) => match self.scope_mode {
                ScopeMode::TypeFallback => true,
                ScopeMode::Exact => binding.resource_id == request.resource_id,
            },
        }
    }
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("evaluator", &self.evaluator)
            .field("custom_roles", &self.custom_roles.is_some())
            .field("scope_mode", &self.scope_mode)
            .finish()
    }
}
