//! Role administration tests
//!
//! Delegation table, custom role lifecycle, validation and policy synthesis.

use chrono::{Duration, TimeZone, Utc};
use iam_authz::catalog::system_roles::*;
use iam_authz::manager::validation::EMPTY_ROLE_ERROR;
use iam_authz::{
    AuthzError, EngineConfig, FixedClock, IamEngine, PolicyBindingRequest, ResourceType, RoleBinding,
    RolePatch, RoleType, User,
};
use std::sync::Arc;
use test_case::test_case;

fn engine() -> IamEngine {
    let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap();
    IamEngine::new(EngineConfig::default()).unwrap().with_clock(Arc::new(FixedClock(now)))
}

// ============================================================================
// DELEGATION TABLE
// ============================================================================

#[test_case(ORGANIZATION_ADMIN, ORGANIZATION_ADMIN => true ; "org admin assigns org admin")]
#[test_case(ORGANIZATION_ADMIN, "custom/auditors-1" => true ; "org admin assigns custom role")]
#[test_case(USER_ADMIN, USER_MANAGER => true ; "user admin assigns manager")]
#[test_case(USER_ADMIN, PROJECT_ADMIN => true ; "user admin assigns project admin")]
#[test_case(USER_ADMIN, ORGANIZATION_VIEWER => false ; "user admin cannot assign org viewer")]
#[test_case(USER_ADMIN, ORGANIZATION_ADMIN => false ; "user admin cannot assign org admin")]
#[test_case(USER_MANAGER, USER_VIEWER => true ; "manager assigns viewer")]
#[test_case(USER_MANAGER, AUTHENTICATED_USER => true ; "manager assigns authenticated")]
#[test_case(USER_MANAGER, USER_MANAGER => false ; "manager cannot assign manager")]
#[test_case(USER_MANAGER, ORGANIZATION_ADMIN => false ; "manager cannot assign org admin")]
#[test_case(PROJECT_ADMIN, PROJECT_VIEWER => false ; "project admin assigns nothing")]
#[test_case(USER_VIEWER, AUTHENTICATED_USER => false ; "viewer assigns nothing")]
fn test_can_assign_role(assigner: &str, target: &str) -> bool {
    engine().manager().can_assign_role(&[assigner], target)
}

#[test]
fn test_org_admin_sees_every_system_role() {
    let engine = engine();
    let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap();
    let user = User::new("root").with_binding(RoleBinding::new(ORGANIZATION_ADMIN, "bootstrap", now));

    let available = engine.manager().available_roles(&user);
    assert_eq!(available.len(), 10);
}

#[test]
fn test_user_admin_available_roles_exclude_organization() {
    let engine = engine();
    let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap();
    let user = User::new("ops").with_binding(RoleBinding::new(USER_ADMIN, "root", now));

    let available = engine.manager().available_roles(&user);
    assert_eq!(available.len(), 8);
    assert!(available.iter().all(|id| !id.contains("organization")));
}

#[test]
fn test_user_without_bindings_assigns_nothing() {
    assert!(engine().manager().available_roles(&User::new("nobody")).is_empty());
}

// ============================================================================
// CUSTOM ROLE LIFECYCLE
// ============================================================================

#[test]
fn test_empty_custom_role_then_validation() {
    let engine = engine();
    let manager = engine.manager();

    let role = manager.create_custom_role("X", "d", vec![], None, None);
    assert!(role.id.starts_with("custom/x-"));
    assert!(role.permissions.is_empty());

    let validation = manager.validate_role_permissions(&[], RoleType::Custom);
    assert!(!validation.is_valid);
    assert_eq!(validation.errors, vec![EMPTY_ROLE_ERROR.to_string()]);
}

#[test]
fn test_every_system_role_rejects_mutation() {
    let engine = engine();
    let manager = engine.manager();

    for role_id in engine.roles().system_role_ids() {
        let role = engine.roles().system_role(role_id).unwrap();

        let update = manager.update_custom_role(role, RolePatch::default().with_name("renamed"), "root");
        assert!(
            matches!(update, Err(AuthzError::SystemRoleImmutable { ref operation, .. }) if operation == "updated"),
            "{} must reject update",
            role_id
        );

        let delete = manager.delete_custom_role(role, "root");
        assert!(matches!(delete, Err(AuthzError::SystemRoleImmutable { .. })));
    }

    // Catalog untouched
    assert_eq!(engine.roles().system_role(USER_VIEWER).unwrap().name, "User Viewer");
}

#[test]
fn test_custom_role_update_by_creator() {
    let engine = engine();
    let manager = engine.manager();
    let read = engine.permissions().get("project.read").cloned().unwrap();
    let update = engine.permissions().get("project.update").cloned().unwrap();

    let role = manager.create_custom_role("Editors", "", vec![read.clone()], Some("acme"), Some("alice"));
    let updated = manager
        .update_custom_role(&role, RolePatch::default().with_permissions(vec![read, update]), "alice")
        .unwrap();

    assert_eq!(updated.id, role.id);
    assert_eq!(updated.permissions.len(), 2);
    assert_eq!(role.permissions.len(), 1, "original role is not mutated");

    let by_other = manager.update_custom_role(&role, RolePatch::default(), "mallory");
    assert!(matches!(by_other, Err(AuthzError::NotRoleCreator { .. })));
}

#[test]
fn test_template_role_validates_like_its_source() {
    let engine = engine();
    let manager = engine.manager();

    let editor = manager
        .create_role_from_template(PROJECT_EDITOR, "Project Editors", "", Some("acme"), Some("alice"))
        .unwrap();
    assert_eq!(editor.role_type, RoleType::Custom);
    assert!(manager.validate_role_permissions(&editor.permissions, RoleType::Custom).is_valid);

    // Org admin's set mixes admin actions and organization permissions
    let org = manager
        .create_role_from_template(ORGANIZATION_ADMIN, "Copy", "", Some("acme"), Some("alice"))
        .unwrap();
    let validation = manager.validate_role_permissions(&org.permissions, RoleType::Custom);
    assert!(!validation.is_valid);
    assert!(validation.errors.len() > 1);
}

#[test]
fn test_create_role_binding_with_expiry() {
    let engine = engine();
    let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap();

    let binding = engine
        .manager()
        .create_role_binding(PROJECT_VIEWER, "alice", Some((ResourceType::Project, "p1")), Some(now + Duration::hours(8)))
        .unwrap();

    assert_eq!(binding.assigned_by, "alice");
    assert!(binding.is_effective_at(now + Duration::hours(7)));
    assert!(!binding.is_effective_at(now + Duration::hours(8)));

    let empty = engine.manager().create_role_binding("  ", "alice", None, None);
    assert!(matches!(empty, Err(AuthzError::InvalidInput(_))));
}

// ============================================================================
// POLICY AND HIERARCHY
// ============================================================================

#[test]
fn test_policy_from_bindings() {
    let engine = engine();
    let policy = engine.manager().create_iam_policy(&[
        PolicyBindingRequest::new(USER_VIEWER, ["user:bob", "user:alice"]),
        PolicyBindingRequest::new(PROJECT_EDITOR, ["group:eng"]).on_resource(ResourceType::Project, "p1"),
    ]);

    assert_eq!(policy.version, 3);
    assert_eq!(policy.bindings[0].role, USER_VIEWER);
    assert_eq!(policy.bindings[0].members, vec!["user:alice", "user:bob"]);
    assert!(policy.bindings[0].condition.is_none());
    assert!(policy.bindings[1].condition.is_some());

    let json = serde_json::to_value(&policy).unwrap();
    assert_eq!(json["bindings"][1]["condition"]["expression"], r#"resource.type == "project" && resource.id == "p1""#);
}

#[test]
fn test_hierarchy_pass_through() {
    let engine = engine();
    let manager = engine.manager();

    assert!(manager.inherits_from(AUTHENTICATED_USER, ORGANIZATION_ADMIN));
    assert!(manager.inherits_from(PROJECT_VIEWER, PROJECT_VIEWER));
    assert!(!manager.inherits_from(PROJECT_ADMIN, USER_ADMIN));
    assert_eq!(
        manager.role_hierarchy()[ORGANIZATION_ADMIN],
        vec![USER_ADMIN, PROJECT_ADMIN, BILLING_ADMIN, ORGANIZATION_VIEWER]
    );
}
