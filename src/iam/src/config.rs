//! Engine configuration
//!
//! Environment variables:
//! - `IAM_SCOPE_MODE` - `exact` (default) or `type_fallback`
//! - `IAM_UNRESOLVED_CONDITIONS` - `fail_closed` (default) or `fail_open`

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a scoped binding is matched against a request resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    /// Same resource type, and the binding id is absent or equal
    #[default]
    Exact,
    /// Any binding sharing the resource type matches, whatever its id
    TypeFallback,
}

impl FromStr for ScopeMode {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(ScopeMode::Exact),
            "type_fallback" | "type-fallback" => Ok(ScopeMode::TypeFallback),
            other => Err(AuthzError::Config(format!("unknown scope mode '{}'", other))),
        }
    }
}

/// Outcome for condition types this engine declares but does not resolve
/// (`time_based`, `ip_based`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedConditionPolicy {
    #[default]
    FailClosed,
    FailOpen,
}

impl UnresolvedConditionPolicy {
    pub fn passes(&self) -> bool {
        matches!(self, UnresolvedConditionPolicy::FailOpen)
    }
}

impl FromStr for UnresolvedConditionPolicy {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_closed" | "fail-closed" | "closed" => Ok(UnresolvedConditionPolicy::FailClosed),
            "fail_open" | "fail-open" | "open" => Ok(UnresolvedConditionPolicy::FailOpen),
            other => Err(AuthzError::Config(format!(
                "unknown unresolved-condition policy '{}'",
                other
            ))),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Resource-scope matching for role bindings
    pub scope_mode: ScopeMode,

    /// Outcome for `time_based` / `ip_based` conditions
    pub unresolved_conditions: UnresolvedConditionPolicy,
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(mode) = lookup("IAM_SCOPE_MODE") {
            config.scope_mode = mode.parse()?;
        }
        if let Some(policy) = lookup("IAM_UNRESOLVED_CONDITIONS") {
            config.unresolved_conditions = policy.parse()?;
        }

        Ok(config)
    }
}
