// Copyright 2025 Cowboy AI, LLC.

//! Error types for compliance operations

use thiserror::Error;

/// Errors that can occur while building contexts, evaluating rules or scoring clients
#[derive(Debug, Clone, Error)]
pub enum ComplianceError {
    /// A referenced transaction, client or alert does not exist
    #[error("Entity not found: {entity_type} with id {id}")]
    EntityNotFound {
        /// Type of entity that wasn't found
        entity_type: String,
        /// ID that was searched for
        id: String,
    },

    /// A rule parameter is missing or malformed
    #[error("Configuration error in {rule}.{key}: {reason}")]
    Configuration {
        /// Rule whose configuration is broken
        rule: String,
        /// Configuration key that failed
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A collaborator failed to read or write
    #[error("Persistence error during {operation}: {message}")]
    Persistence {
        /// Operation that failed (e.g. `save_alert`)
        operation: String,
        /// Error message from the store
        message: String,
    },

    /// An entity constructor rejected its input
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid state transition
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state
        from: String,
        /// Attempted target state
        to: String,
    },

    /// Evaluation aborted before completion
    #[error("Evaluation cancelled: {0}")]
    Cancelled(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for compliance operations
pub type ComplianceResult<T> = Result<T, ComplianceError>;

impl From<serde_json::Error> for ComplianceError {
    fn from(err: serde_json::Error) -> Self {
        ComplianceError::SerializationError(err.to_string())
    }
}

impl ComplianceError {
    /// Shorthand for an [`ComplianceError::EntityNotFound`]
    pub fn not_found(entity_type: impl Into<String>, id: impl ToString) -> Self {
        ComplianceError::EntityNotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`ComplianceError::Configuration`]
    pub fn configuration(
        rule: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ComplianceError::Configuration {
            rule: rule.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`ComplianceError::Persistence`]
    pub fn persistence(operation: impl Into<String>, message: impl ToString) -> Self {
        ComplianceError::Persistence {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ComplianceError::EntityNotFound { .. })
    }

    /// Check if this is a configuration error
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, ComplianceError::Configuration { .. })
    }

    /// Check if this is a persistence error
    pub fn is_persistence_error(&self) -> bool {
        matches!(self, ComplianceError::Persistence { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            ComplianceError::ValidationError(_) | ComplianceError::InvalidStateTransition { .. }
        )
    }
}
