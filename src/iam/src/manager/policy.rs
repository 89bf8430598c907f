//! IAM-style policy synthesis

use crate::types::{Policy, PolicyBinding, PolicyCondition, ResourceType, RoleId};
use serde::{Deserialize, Serialize};

/// Policy version for documents without conditions
pub const POLICY_VERSION: u32 = 1;

/// Policy version required once any binding carries a condition
pub const CONDITIONAL_POLICY_VERSION: u32 = 3;

/// One role-to-members entry to turn into a [`PolicyBinding`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyBindingRequest {
    pub role_id: RoleId,

    pub members: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl PolicyBindingRequest {
    pub fn new<I, S>(role_id: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role_id: role_id.into(),
            members: members.into_iter().map(Into::into).collect(),
            resource_type: None,
            resource_id: None,
        }
    }

    pub fn on_resource(mut self, resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type);
        self.resource_id = Some(resource_id.into());
        self
    }
}

/// Build a policy document from binding requests
///
/// A condition is attached only when both resource type and id are present.
/// The expression is opaque and never evaluated by this crate.
pub fn create_iam_policy(requests: &[PolicyBindingRequest]) -> Policy {
    let bindings: Vec<PolicyBinding> = requests
        .iter()
        .map(|request| {
            let mut members = request.members.clone();
            members.sort();
            members.dedup();

            let condition = match (request.resource_type, request.resource_id.as_deref()) {
                (Some(resource_type), Some(resource_id)) => Some(resource_condition(resource_type, resource_id)),
                _ => None,
            };

            PolicyBinding {
                role: request.role_id.clone(),
                members,
                condition,
            }
        })
        .collect();

    let version = if bindings.iter().any(|b| b.condition.is_some()) {
        CONDITIONAL_POLICY_VERSION
    } else {
        POLICY_VERSION
    };

    Policy { version, bindings }
}

fn resource_condition(resource_type: ResourceType, resource_id: &str) -> PolicyCondition {
    PolicyCondition {
        title: format!("{} {}", resource_type, resource_id),
        description: Some(format!("Restrict access to {} '{}'", resource_type, resource_id)),
        expression: format!(
            "resource.type == \"{}\" && resource.id == \"{}\"",
            resource_type,
            resource_id.replace('\\', "\\\\").replace('"', "\\\"")
        ),
    }
}
