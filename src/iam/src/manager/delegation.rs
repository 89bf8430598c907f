//! Role delegation table
//!
//! Which roles a holder of a given role may assign to others. This table is
//! the only place delegation rights are decided.

use crate::catalog::system_roles::{
    AUTHENTICATED_USER, ORGANIZATION_ADMIN, USER_ADMIN, USER_MANAGER, USER_VIEWER,
};

/// Set of roles an assigner may hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignScope {
    /// Any role
    Any,
    /// Any role whose id does not contain the marker
    AnyExcept(&'static str),
    /// Exactly these roles
    Only(&'static [&'static str]),
}

impl AssignScope {
    pub fn permits(&self, target_role_id: &str) -> bool {
        match self {
            AssignScope::Any => true,
            AssignScope::AnyExcept(marker) => !target_role_id.contains(marker),
            AssignScope::Only(roles) => roles.iter().any(|role| *role == target_role_id),
        }
    }
}

/// A single delegation right
#[derive(Debug, Clone, Copy)]
pub struct DelegationRule {
    pub assigner: &'static str,
    pub scope: AssignScope,
}

/// Least-privilege delegation rights; roles not listed may assign nothing
pub const DELEGATION_RULES: &[DelegationRule] = &[
    DelegationRule {
        assigner: ORGANIZATION_ADMIN,
        scope: AssignScope::Any,
    },
    DelegationRule {
        assigner: USER_ADMIN,
        scope: AssignScope::AnyExcept("organization"),
    },
    DelegationRule {
        assigner: USER_MANAGER,
        scope: AssignScope::Only(&[USER_VIEWER, AUTHENTICATED_USER]),
    },
];

/// True iff any of the assigner's roles may assign `target_role_id`
pub fn can_assign_role<S: AsRef<str>>(assigner_role_ids: &[S], target_role_id: &str) -> bool {
    assigner_role_ids.iter().any(|assigner| {
        DELEGATION_RULES
            .iter()
            .filter(|rule| rule.assigner == assigner.as_ref())
            .any(|rule| rule.scope.permits(target_role_id))
    })
}
