// Copyright 2025 Cowboy AI, LLC.

//! Compliance alerts raised by rules

use crate::entity::{AlertId, ClientId, TransactionId};
use crate::errors::{ComplianceError, ComplianceResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Urgency used to prioritise compliance review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertSeverity {
    /// Informational
    Low,
    /// Needs review
    Medium,
    /// Needs prompt review
    High,
    /// Needs immediate review
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Review state of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertStatus {
    /// Just raised
    New,
    /// Picked up by an analyst
    UnderReview,
    /// Closed (terminal)
    Resolved,
}

impl AlertStatus {
    /// Whether the review workflow allows moving to `target`
    pub fn can_transition_to(&self, target: AlertStatus) -> bool {
        use AlertStatus as S;
        matches!(
            (*self, target),
            (S::New, S::UnderReview) | (S::New, S::Resolved) | (S::UnderReview, S::Resolved)
        )
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A suspicious-activity finding, attributable to exactly one rule and one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    id: AlertId,
    client_id: ClientId,
    transaction_id: TransactionId,
    rule_name: String,
    severity: AlertSeverity,
    status: AlertStatus,
    created_at: DateTime<Utc>,
}

impl Alert {
    /// Raise a new alert in the `New` state
    pub fn raise(
        client_id: ClientId,
        transaction_id: TransactionId,
        rule_name: impl Into<String>,
        severity: AlertSeverity,
    ) -> Self {
        Self {
            id: AlertId::new(),
            client_id,
            transaction_id,
            rule_name: rule_name.into(),
            severity,
            status: AlertStatus::New,
            created_at: Utc::now(),
        }
    }

    /// Alert id
    pub fn id(&self) -> AlertId {
        self.id
    }

    /// Client the alert concerns
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Transaction the alert is attributed to
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Name of the rule that fired
    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    /// Severity
    pub fn severity(&self) -> AlertSeverity {
        self.severity
    }

    /// Review status
    pub fn status(&self) -> AlertStatus {
        self.status
    }

    /// When the alert was raised
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Move the alert through the review workflow
    pub fn transition_to(&mut self, target: AlertStatus) -> ComplianceResult<()> {
        if !self.status.can_transition_to(target) {
            return Err(ComplianceError::InvalidStateTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        Ok(())
    }
}
