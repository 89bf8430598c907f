//! # IAM Authorization Engine
//!
//! Role and permission resolution for an organization, modelled on cloud IAM.
//!
//! ## Features
//!
//! - **Immutable catalogs** of permissions and system roles, with an acyclic role hierarchy
//! - **Scoped, time-limited role bindings** checked lazily against a single clock sample
//! - **Contextual conditions** on permissions and bindings, failing closed
//! - **Custom roles** with creator-only mutation and least-privilege delegation
//! - **IAM-style policies** synthesized from role bindings
//!
//! ## Example
//!
//! ```rust
//! use iam_authz::{EngineConfig, IamEngine, PermissionCheckRequest, RoleBinding, User};
//! use iam_authz::catalog::system_roles;
//!
//! fn main() -> iam_authz::Result<()> {
//!     let engine = IamEngine::new(EngineConfig::default())?;
//!
//!     let user = User::new("alice")
//!         .with_binding(RoleBinding::new(system_roles::USER_VIEWER, "admin", chrono::Utc::now()));
//!
//!     let response = engine.check_permission(&user, &PermissionCheckRequest::new("alice", "user.read"));
//!     assert!(response.granted);
//!
//!     Ok(())
//! }
//! ```

pub mod bindings;
pub mod catalog;
pub mod clock;
pub mod conditions;
pub mod config;
pub mod engine;
pub mod error;
pub mod manager;
pub mod resolver;
pub mod types;

// Re-export commonly used types
pub use catalog::{CustomRoleLookup, InMemoryCustomRoles, PermissionCatalog, RoleCatalog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use conditions::ConditionEvaluator;
pub use config::{EngineConfig, ScopeMode, UnresolvedConditionPolicy};
pub use engine::IamEngine;
pub use error::{AuthzError, Result};
pub use manager::{PolicyBindingRequest, RoleManager, RolePatch, RoleValidation};
pub use resolver::PermissionResolver;
pub use types::{
    BindingAction, CheckReason, Condition, ConditionOperator, ConditionType, FieldPatch, Permission,
    PermissionCheckRequest, PermissionCheckResponse, PermissionContext, Policy, PolicyBinding,
    PolicyCondition, ResourceType, Role, RoleBinding, RoleType, UpdateRoleBindingRequest, User,
    UserProfile,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
