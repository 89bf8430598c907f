//! Contextual condition evaluation
//!
//! Conditions are conjunctive: every condition in a list must pass. Missing
//! context, unexpected values and unknown condition types all deny.

use crate::config::UnresolvedConditionPolicy;
use crate::types::{Condition, ConditionOperator, ConditionType, PermissionContext, ResourceType, User};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Evaluates permission and binding conditions against a request context
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator {
    unresolved: UnresolvedConditionPolicy,
}

impl ConditionEvaluator {
    pub fn new(unresolved: UnresolvedConditionPolicy) -> Self {
        Self { unresolved }
    }

    /// True iff every condition passes; an empty list passes
    ///
    /// `now` decides which bindings count toward `organization_member`.
    pub fn evaluate(
        &self,
        user: &User,
        conditions: &[Condition],
        context: Option<&PermissionContext>,
        now: DateTime<Utc>,
    ) -> bool {
        conditions.iter().all(|condition| {
            let passed = self.evaluate_one(user, condition, context, now);
            if !passed {
                debug!(
                    user_id = %user.id,
                    condition = condition.condition_type.as_str(),
                    "condition failed"
                );
            }
            passed
        })
    }

    fn evaluate_one(
        &self,
        user: &User,
        condition: &Condition,
        context: Option<&PermissionContext>,
        now: DateTime<Utc>,
    ) -> bool {
        let predicate = match &condition.condition_type {
            ConditionType::ResourceOwner => match condition.value.as_deref() {
                None | Some("self") => context
                    .and_then(|c| c.resource_owner_id.as_deref())
                    .map(|owner| owner == user.id),
                Some(_) => None,
            },
            ConditionType::DepartmentMember => match condition.value.as_deref() {
                None | Some("same_department") => {
                    match (
                        context.and_then(|c| c.department.as_deref()),
                        user.profile.department.as_deref(),
                    ) {
                        (Some(requested), Some(own)) => Some(requested == own),
                        _ => None,
                    }
                }
                Some(_) => None,
            },
            ConditionType::OrganizationMember => context
                .and_then(|c| c.organization_id.as_deref())
                .map(|org| is_organization_member(user, org, now)),
            ConditionType::TimeBased | ConditionType::IpBased => {
                if !self.unresolved.passes() {
                    warn!(
                        condition = condition.condition_type.as_str(),
                        "unresolved condition type, failing closed"
                    );
                }
                return self.unresolved.passes();
            }
            ConditionType::Unrecognized(raw) => {
                warn!(condition = %raw, "unrecognized condition type, failing closed");
                return false;
            }
        };

        // Indeterminate predicates deny regardless of operator
        match (predicate, condition.operator.unwrap_or_default()) {
            (Some(result), ConditionOperator::Equals) => result,
            (Some(result), ConditionOperator::NotEquals) => !result,
            (None, _) => false,
        }
    }
}

fn is_organization_member(user: &User, organization_id: &str, now: DateTime<Utc>) -> bool {
    user.role_bindings.iter().any(|binding| {
        binding.is_effective_at(now)
            && binding.resource_type == Some(ResourceType::Organization)
            && binding.resource_id.as_deref() == Some(organization_id)
    })
}
