//! Error types for the role and permission engine
//!
//! Validation problems and denials are returned as data
//! ([`RoleValidation`](crate::manager::RoleValidation),
//! [`PermissionCheckResponse`](crate::types::PermissionCheckResponse)).
//! Only caller misuse and broken catalogs surface as [`AuthzError`].

use thiserror::Error;

/// Engine errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// Attempt to mutate or delete a system role
    #[error("System role '{role_id}' is immutable and cannot be {operation}")]
    SystemRoleImmutable { role_id: String, operation: String },

    /// Custom role changed by someone other than its creator
    #[error("Role '{role_id}' can only be modified by its creator (attempted by '{actor}')")]
    NotRoleCreator { role_id: String, actor: String },

    /// Role not found in the catalog
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// Catalog data is inconsistent
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// Role hierarchy contains a cycle
    #[error("Circular role hierarchy detected: {}", cycle.join(" -> "))]
    CircularHierarchy { cycle: Vec<String> },

    /// External custom-role lookup failed
    #[error("Custom role lookup failed for '{role_id}': {message}")]
    CustomRoleLookup { role_id: String, message: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, AuthzError>;
