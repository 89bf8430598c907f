//! Pure transformations over a user's role bindings
//!
//! Nothing here mutates its input. Expiry is never purged; expired bindings
//! simply stop being returned by [`active_bindings`].

use crate::types::{
    BindingAction, FieldPatch, ResourceType, RoleBinding, UpdateRoleBindingRequest, User,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Apply `updates` in order to the user's bindings and return the new collection
pub fn update_user_role_bindings(
    user: &User,
    updates: &[UpdateRoleBindingRequest],
    updated_by: &str,
    now: DateTime<Utc>,
) -> Vec<RoleBinding> {
    let mut bindings = user.role_bindings.clone();

    for update in updates {
        match update.action {
            BindingAction::Add => add_binding(&mut bindings, update, updated_by, now),
            BindingAction::Remove => {
                let before = bindings.len();
                bindings.retain(|binding| !targets(binding, update));
                if bindings.len() == before {
                    warn!(user_id = %user.id, role_id = %update.role_id, "remove matched no binding");
                }
            }
            BindingAction::Update => {
                let mut matched = false;
                for binding in bindings.iter_mut().filter(|b| targets(b, update)) {
                    if let Some(updated) = apply_update(binding, update, updated_by) {
                        *binding = updated;
                    }
                    matched = true;
                }
                if !matched {
                    warn!(user_id = %user.id, role_id = %update.role_id, "update matched no binding");
                }
            }
        }
    }

    info!(
        user_id = %user.id,
        updated_by,
        updates = updates.len(),
        bindings = bindings.len(),
        "role bindings updated"
    );

    bindings
}

fn add_binding(bindings: &mut Vec<RoleBinding>, update: &UpdateRoleBindingRequest, updated_by: &str, now: DateTime<Utc>) {
    if let Some(id) = &update.id {
        if bindings.iter().any(|b| &b.id == id) {
            warn!(binding_id = %id, "binding id already present, add skipped");
            return;
        }
    }

    let binding = RoleBinding {
        id: update.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
        role_id: update.role_id.clone(),
        resource_type: update.resource_type.clone().into_option(),
        resource_id: update.resource_id.clone().into_option(),
        conditions: update.conditions.clone().into_option().unwrap_or_default(),
        expires_at: update.expires_at.clone().into_option(),
        created_at: now,
        assigned_by: updated_by.to_string(),
    };

    if binding.has_partial_scope() {
        warn!(role_id = %binding.role_id, "binding scope needs both resource type and id, add skipped");
        return;
    }

    let duplicate = bindings.iter().any(|existing| {
        existing.role_id == binding.role_id
            && existing.resource_type == binding.resource_type
            && existing.resource_id == binding.resource_id
            && existing.conditions == binding.conditions
            && existing.expires_at == binding.expires_at
    });
    if duplicate {
        debug!(role_id = %binding.role_id, "identical binding already present, add skipped");
        return;
    }

    bindings.push(binding);
}

/// The patched binding, or `None` when the patch would leave half a scope
fn apply_update(binding: &RoleBinding, update: &UpdateRoleBindingRequest, updated_by: &str) -> Option<RoleBinding> {
    let mut updated = binding.clone();
    if update.id.is_some() {
        updated.role_id = update.role_id.clone();
    }
    updated.resource_type = update.resource_type.clone().apply(updated.resource_type.take());
    updated.resource_id = update.resource_id.clone().apply(updated.resource_id.take());

    if updated.has_partial_scope() {
        warn!(binding_id = %binding.id, "binding scope needs both resource type and id, update skipped");
        return None;
    }

    updated.conditions = match update.conditions.clone() {
        FieldPatch::Keep => std::mem::take(&mut updated.conditions),
        FieldPatch::Clear => Vec::new(),
        FieldPatch::Set(conditions) => conditions,
    };
    updated.expires_at = update.expires_at.clone().apply(updated.expires_at.take());
    updated.assigned_by = updated_by.to_string();
    Some(updated)
}

/// Target by id when given, otherwise by role id and scope
///
/// Without an id the scope patch selects: `Keep` matches any scope, `Clear`
/// matches only unscoped bindings and `Set` matches that exact value.
fn targets(binding: &RoleBinding, update: &UpdateRoleBindingRequest) -> bool {
    if let Some(id) = &update.id {
        return &binding.id == id;
    }

    binding.role_id == update.role_id
        && patch_selects(&update.resource_type, binding.resource_type.as_ref())
        && patch_selects(&update.resource_id, binding.resource_id.as_ref())
}

fn patch_selects<T: PartialEq>(patch: &FieldPatch<T>, value: Option<&T>) -> bool {
    match patch {
        FieldPatch::Keep => true,
        FieldPatch::Clear => value.is_none(),
        FieldPatch::Set(expected) => value == Some(expected),
    }
}

/// Bindings still effective at `now`
pub fn active_bindings(bindings: &[RoleBinding], now: DateTime<Utc>) -> Vec<&RoleBinding> {
    bindings.iter().filter(|b| b.is_effective_at(now)).collect()
}

/// Bindings whose expiry has passed at `now`
pub fn expired_bindings(bindings: &[RoleBinding], now: DateTime<Utc>) -> Vec<&RoleBinding> {
    bindings.iter().filter(|b| !b.is_effective_at(now)).collect()
}

/// Bindings scoped exactly to the given resource
pub fn bindings_for_resource<'a>(
    bindings: &'a [RoleBinding],
    resource_type: ResourceType,
    resource_id: &str,
) -> Vec<&'a RoleBinding> {
    bindings
        .iter()
        .filter(|b| b.resource_type == Some(resource_type) && b.resource_id.as_deref() == Some(resource_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Condition, ConditionType};
    use chrono::Duration;

    fn user_with(bindings: Vec<RoleBinding>) -> User {
        let mut user = User::new("u1");
        user.role_bindings = bindings;
        user
    }

    #[test]
    fn test_add_binding() {
        let now = Utc::now();
        let user = User::new("u1");
        let updates = vec![UpdateRoleBindingRequest::add("roles/project.viewer").with_scope(ResourceType::Project, "p1")];

        let result = update_user_role_bindings(&user, &updates, "admin", now);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].role_id, "roles/project.viewer");
        assert_eq!(result[0].resource_type, Some(ResourceType::Project));
        assert_eq!(result[0].resource_id.as_deref(), Some("p1"));
        assert_eq!(result[0].assigned_by, "admin");
        assert_eq!(result[0].created_at, now);
        assert!(user.role_bindings.is_empty(), "input must not be mutated");
    }

    #[test]
    fn test_add_identical_binding_is_skipped() {
        let now = Utc::now();
        let user = user_with(vec![RoleBinding::new("roles/user.viewer", "admin", now)]);
        let result = update_user_role_bindings(&user, &[UpdateRoleBindingRequest::add("roles/user.viewer")], "admin", now);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_remove_by_id() {
        let now = Utc::now();
        let keep = RoleBinding::new("roles/user.viewer", "admin", now);
        let drop = RoleBinding::new("roles/user.viewer", "admin", now).with_scope(ResourceType::Project, "p1");
        let user = user_with(vec![keep.clone(), drop.clone()]);

        let updates = vec![UpdateRoleBindingRequest::remove("roles/user.viewer").with_id(drop.id.clone())];
        let result = update_user_role_bindings(&user, &updates, "admin", now);

        assert_eq!(result, vec![keep]);
    }

    #[test]
    fn test_remove_by_role_respects_scope_patch() {
        let now = Utc::now();
        let global = RoleBinding::new("roles/project.viewer", "admin", now);
        let scoped = RoleBinding::new("roles/project.viewer", "admin", now).with_scope(ResourceType::Project, "p1");
        let user = user_with(vec![global.clone(), scoped.clone()]);

        let mut only_global = UpdateRoleBindingRequest::remove("roles/project.viewer");
        only_global.resource_type = FieldPatch::Clear;
        let result = update_user_role_bindings(&user, &[only_global], "admin", now);
        assert_eq!(result, vec![scoped.clone()]);

        let any_scope = UpdateRoleBindingRequest::remove("roles/project.viewer");
        let result = update_user_role_bindings(&user, &[any_scope], "admin", now);
        assert!(result.is_empty());
    }

    #[test]
    fn test_update_distinguishes_keep_and_clear() {
        let now = Utc::now();
        let expiry = now + Duration::days(7);
        let binding = RoleBinding::new("roles/user.manager", "admin", now)
            .with_scope(ResourceType::Organization, "acme")
            .with_expiry(expiry)
            .with_condition(Condition::new(ConditionType::DepartmentMember));
        let user = user_with(vec![binding.clone()]);

        // Omitted fields are kept
        let keep = UpdateRoleBindingRequest::update("roles/user.manager").with_id(binding.id.clone());
        let kept = update_user_role_bindings(&user, &[keep], "auditor", now);
        assert_eq!(kept[0].expires_at, Some(expiry));
        assert_eq!(kept[0].conditions.len(), 1);
        assert_eq!(kept[0].resource_id.as_deref(), Some("acme"));
        assert_eq!(kept[0].assigned_by, "auditor");

        // Explicit clears remove the values
        let clear = UpdateRoleBindingRequest::update("roles/user.manager")
            .with_id(binding.id.clone())
            .with_expiry(FieldPatch::Clear)
            .with_conditions(FieldPatch::Clear);
        let cleared = update_user_role_bindings(&user, &[clear], "admin", now);
        assert_eq!(cleared[0].expires_at, None);
        assert!(cleared[0].conditions.is_empty());
        assert_eq!(cleared[0].resource_type, Some(ResourceType::Organization));
    }

    #[test]
    fn test_add_with_half_scope_is_skipped() {
        let now = Utc::now();
        let user = User::new("u1");

        let mut id_only = UpdateRoleBindingRequest::add("roles/project.admin");
        id_only.resource_id = FieldPatch::Set("p1".to_string());
        let mut type_only = UpdateRoleBindingRequest::add("roles/project.admin");
        type_only.resource_type = FieldPatch::Set(ResourceType::Project);

        let result = update_user_role_bindings(&user, &[id_only, type_only], "admin", now);
        assert!(result.is_empty());
    }

    #[test]
    fn test_update_leaving_half_scope_is_skipped() {
        let now = Utc::now();
        let binding = RoleBinding::new("roles/project.editor", "admin", now).with_scope(ResourceType::Project, "p1");
        let user = user_with(vec![binding.clone()]);

        let mut clear_type = UpdateRoleBindingRequest::update("roles/project.editor")
            .with_id(binding.id.clone())
            .with_expiry(FieldPatch::Set(now + Duration::hours(1)));
        clear_type.resource_type = FieldPatch::Clear;

        let result = update_user_role_bindings(&user, &[clear_type], "auditor", now);
        assert_eq!(result, vec![binding.clone()]);

        // Clearing both halves makes the binding global
        let mut clear_both = UpdateRoleBindingRequest::update("roles/project.editor").with_id(binding.id.clone());
        clear_both.resource_type = FieldPatch::Clear;
        clear_both.resource_id = FieldPatch::Clear;

        let result = update_user_role_bindings(&user, &[clear_both], "auditor", now);
        assert!(result[0].is_global());
        assert_eq!(result[0].assigned_by, "auditor");
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let now = Utc::now();
        let user = user_with(vec![RoleBinding::new("roles/user.viewer", "admin", now)]);
        let update = UpdateRoleBindingRequest::update("roles/user.admin").with_id("missing");

        let result = update_user_role_bindings(&user, &[update], "admin", now);
        assert_eq!(result, user.role_bindings);
    }

    #[test]
    fn test_updates_apply_in_order() {
        let now = Utc::now();
        let user = User::new("u1");
        let updates = vec![
            UpdateRoleBindingRequest::add("roles/user.viewer").with_id("b1"),
            UpdateRoleBindingRequest::update("roles/user.manager").with_id("b1"),
            UpdateRoleBindingRequest::add("roles/project.viewer").with_id("b2"),
            UpdateRoleBindingRequest::remove("roles/project.viewer").with_id("b2"),
        ];

        let result = update_user_role_bindings(&user, &updates, "admin", now);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "b1");
        assert_eq!(result[0].role_id, "roles/user.manager");
    }

    #[test]
    fn test_active_and_expired_partition() {
        let now = Utc::now();
        let bindings = vec![
            RoleBinding::new("roles/user.viewer", "admin", now),
            RoleBinding::new("roles/user.manager", "admin", now).with_expiry(now),
            RoleBinding::new("roles/user.admin", "admin", now).with_expiry(now + Duration::seconds(1)),
        ];

        let active: Vec<&str> = active_bindings(&bindings, now).iter().map(|b| b.role_id.as_str()).collect();
        let expired: Vec<&str> = expired_bindings(&bindings, now).iter().map(|b| b.role_id.as_str()).collect();

        assert_eq!(active, vec!["roles/user.viewer", "roles/user.admin"]);
        assert_eq!(expired, vec!["roles/user.manager"]);
    }

    #[test]
    fn test_bindings_for_resource() {
        let now = Utc::now();
        let bindings = vec![
            RoleBinding::new("roles/project.viewer", "admin", now).with_scope(ResourceType::Project, "p1"),
            RoleBinding::new("roles/project.editor", "admin", now).with_scope(ResourceType::Project, "p2"),
            RoleBinding::new("roles/user.viewer", "admin", now),
        ];

        let p1 = bindings_for_resource(&bindings, ResourceType::Project, "p1");
        assert_eq!(p1.len(), 1);
        assert_eq!(p1[0].role_id, "roles/project.viewer");
    }
}
