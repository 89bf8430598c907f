//! Core authorization types
//!
//! Every struct here is a caller-supplied snapshot. The engine never mutates
//! them in place; binding updates return new collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Unique role identifier (e.g., "roles/user.viewer")
pub type RoleId = String;

/// Unique permission identifier (e.g., "user.read")
pub type PermissionId = String;

/// Kind of resource a binding or request can be scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Organization,
    Project,
    User,
    Role,
    Billing,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Organization => "organization",
            ResourceType::Project => "project",
            ResourceType::User => "user",
            ResourceType::Role => "role",
            ResourceType::Billing => "billing",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate kinds understood by the condition evaluator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionType {
    /// Resource owner must be the requesting user (value "self")
    ResourceOwner,
    /// Request department must equal the user's department (value "same_department")
    DepartmentMember,
    /// User must hold a binding scoped to the request organization
    OrganizationMember,
    /// Time window restriction
    TimeBased,
    /// Source address restriction
    IpBased,
    /// Anything else on the wire, kept verbatim; always denies
    Unrecognized(String),
}

impl ConditionType {
    pub fn as_str(&self) -> &str {
        match self {
            ConditionType::ResourceOwner => "resource_owner",
            ConditionType::DepartmentMember => "department_member",
            ConditionType::OrganizationMember => "organization_member",
            ConditionType::TimeBased => "time_based",
            ConditionType::IpBased => "ip_based",
            ConditionType::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for ConditionType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "resource_owner" => ConditionType::ResourceOwner,
            "department_member" => ConditionType::DepartmentMember,
            "organization_member" => ConditionType::OrganizationMember,
            "time_based" => ConditionType::TimeBased,
            "ip_based" => ConditionType::IpBased,
            _ => ConditionType::Unrecognized(raw),
        }
    }
}

impl From<ConditionType> for String {
    fn from(condition_type: ConditionType) -> Self {
        match condition_type {
            ConditionType::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// How a condition's predicate result is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    #[default]
    Equals,
    NotEquals,
}

/// Contextual predicate attached to a permission or a role binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<ConditionOperator>,
}

impl Condition {
    pub fn new(condition_type: ConditionType) -> Self {
        Self {
            condition_type,
            value: None,
            operator: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_operator(mut self, operator: ConditionOperator) -> Self {
        self.operator = Some(operator);
        self
    }
}

/// Condition attached to a permission
pub type PermissionCondition = Condition;

/// Condition attached to a role binding
pub type BindingCondition = Condition;

/// An allowed (resource, action) pair, optionally conditioned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Unique id within the permission catalog
    pub id: PermissionId,

    /// Name matched against `PermissionCheckRequest::permission`
    pub name: String,

    pub resource: String,

    pub action: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<PermissionCondition>,
}

impl Permission {
    /// Create a permission named `<resource>.<action>`
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        let resource = resource.into();
        let action = action.into();
        let id = format!("{}.{}", resource, action);

        Self {
            name: id.clone(),
            id,
            resource,
            action,
            description: String::new(),
            conditions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_condition(mut self, condition: PermissionCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// True for permissions on the `admin` action
    pub fn is_admin(&self) -> bool {
        self.action == "admin"
    }
}

/// Role kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    System,
    Predefined,
    Custom,
}

/// Named permission bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "type")]
    pub role_type: RoleType,

    #[serde(default)]
    pub permissions: Vec<Permission>,

    pub is_system_role: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Role {
    /// Create an immutable system role
    pub fn system(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        permissions: Vec<Permission>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            role_type: RoleType::System,
            permissions,
            is_system_role: true,
            organization_id: None,
            created_by: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Assignment of a role to a user, optionally resource-scoped and time-limited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBinding {
    pub id: String,

    pub role_id: RoleId,

    /// Absent means the binding is global
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<BindingCondition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub assigned_by: String,
}

impl RoleBinding {
    /// Create a global, non-expiring binding with a fresh id
    pub fn new(role_id: impl Into<String>, assigned_by: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role_id: role_id.into(),
            resource_type: None,
            resource_id: None,
            conditions: Vec::new(),
            expires_at: None,
            created_at: now,
            assigned_by: assigned_by.into(),
        }
    }

    pub fn with_scope(mut self, resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type);
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_condition(mut self, condition: BindingCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// A binding is effective until `expires_at`, exclusive
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }

    pub fn is_global(&self) -> bool {
        self.resource_type.is_none() && self.resource_id.is_none()
    }

    /// Exactly one of resource type and resource id is set
    pub fn has_partial_scope(&self) -> bool {
        self.resource_type.is_some() != self.resource_id.is_some()
    }
}

/// Profile data consulted by conditions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Fully hydrated principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    #[serde(default)]
    pub profile: UserProfile,

    #[serde(default)]
    pub role_bindings: Vec<RoleBinding>,

    #[serde(default)]
    pub direct_permissions: Vec<Permission>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            profile: UserProfile::default(),
            role_bindings: Vec::new(),
            direct_permissions: Vec::new(),
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.profile.department = Some(department.into());
        self
    }

    pub fn with_binding(mut self, binding: RoleBinding) -> Self {
        self.role_bindings.push(binding);
        self
    }

    pub fn with_direct_permission(mut self, permission: Permission) -> Self {
        self.direct_permissions.push(permission);
        self
    }
}

/// Request context consulted by conditions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_owner_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

/// Point-in-time authorization query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCheckRequest {
    pub user_id: String,

    /// Permission name (e.g., "user.read")
    pub permission: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<PermissionContext>,
}

impl PermissionCheckRequest {
    pub fn new(user_id: impl Into<String>, permission: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            permission: permission.into(),
            resource_type: None,
            resource_id: None,
            context: None,
        }
    }

    pub fn on_resource(mut self, resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type);
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_context(mut self, context: PermissionContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Why a check was granted or denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckReason {
    /// Granted by a direct permission
    Direct,
    /// Granted through an effective role binding
    RoleBased,
    /// No supporting permission
    #[serde(rename = "not found")]
    NotFound,
    /// Request was issued for a different user
    UserMismatch,
}

impl fmt::Display for CheckReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckReason::Direct => "direct",
            CheckReason::RoleBased => "role-based",
            CheckReason::NotFound => "not found",
            CheckReason::UserMismatch => "user-mismatch",
        };
        f.write_str(s)
    }
}

/// Authorization answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCheckResponse {
    pub granted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<CheckReason>,

    /// Condition types that had to pass for the grant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
}

impl PermissionCheckResponse {
    pub fn granted(reason: CheckReason) -> Self {
        Self {
            granted: true,
            reason: Some(reason),
            conditions: None,
        }
    }

    pub fn denied(reason: CheckReason) -> Self {
        Self {
            granted: false,
            reason: Some(reason),
            conditions: None,
        }
    }

    pub fn with_conditions(mut self, conditions: &[Condition]) -> Self {
        if !conditions.is_empty() {
            self.conditions = Some(
                conditions
                    .iter()
                    .map(|c| c.condition_type.as_str().to_string())
                    .collect(),
            );
        }
        self
    }
}

/// IAM-style policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub version: u32,
    pub bindings: Vec<PolicyBinding>,
}

/// Role to members binding inside a [`Policy`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBinding {
    pub role: RoleId,

    pub members: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<PolicyCondition>,
}

/// Opaque condition attached to a policy binding; never evaluated here
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCondition {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub expression: String,
}

/// Binding mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingAction {
    Add,
    Remove,
    Update,
}

/// Per-field patch that tells "omitted" apart from "explicitly cleared"
///
/// On the wire an absent field is `Keep`, `null` is `Clear` and any value is
/// `Set`. Fields must be tagged `#[serde(default)]` for `Keep` to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPatch<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Default for FieldPatch<T> {
    fn default() -> Self {
        FieldPatch::Keep
    }
}

impl<T> FieldPatch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, FieldPatch::Keep)
    }

    /// Apply the patch on top of the current value
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            FieldPatch::Keep => current,
            FieldPatch::Clear => None,
            FieldPatch::Set(value) => Some(value),
        }
    }

    /// Value for a freshly created record (nothing to keep)
    pub fn into_option(self) -> Option<T> {
        self.apply(None)
    }
}

impl<T: Serialize> Serialize for FieldPatch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldPatch::Keep | FieldPatch::Clear => serializer.serialize_none(),
            FieldPatch::Set(value) => serializer.serialize_some(value),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldPatch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => FieldPatch::Set(value),
            None => FieldPatch::Clear,
        })
    }
}

/// One add/remove/update instruction for a user's bindings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleBindingRequest {
    /// Target binding; when absent, targets by `role_id` and scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub role_id: RoleId,

    #[serde(default, skip_serializing_if = "FieldPatch::is_keep")]
    pub resource_type: FieldPatch<ResourceType>,

    #[serde(default, skip_serializing_if = "FieldPatch::is_keep")]
    pub resource_id: FieldPatch<String>,

    #[serde(default, skip_serializing_if = "FieldPatch::is_keep")]
    pub conditions: FieldPatch<Vec<BindingCondition>>,

    #[serde(default, skip_serializing_if = "FieldPatch::is_keep")]
    pub expires_at: FieldPatch<DateTime<Utc>>,

    pub action: BindingAction,
}

impl UpdateRoleBindingRequest {
    fn with_action(role_id: impl Into<String>, action: BindingAction) -> Self {
        Self {
            id: None,
            role_id: role_id.into(),
            resource_type: FieldPatch::Keep,
            resource_id: FieldPatch::Keep,
            conditions: FieldPatch::Keep,
            expires_at: FieldPatch::Keep,
            action,
        }
    }

    pub fn add(role_id: impl Into<String>) -> Self {
        Self::with_action(role_id, BindingAction::Add)
    }

    pub fn remove(role_id: impl Into<String>) -> Self {
        Self::with_action(role_id, BindingAction::Remove)
    }

    pub fn update(role_id: impl Into<String>) -> Self {
        Self::with_action(role_id, BindingAction::Update)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_scope(mut self, resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
        self.resource_type = FieldPatch::Set(resource_type);
        self.resource_id = FieldPatch::Set(resource_id.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: FieldPatch<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn with_conditions(mut self, conditions: FieldPatch<Vec<BindingCondition>>) -> Self {
        self.conditions = conditions;
        self
    }
}
