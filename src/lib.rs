// Copyright 2025 Cowboy AI, LLC.

//! # CIM Compliance
//!
//! Transaction monitoring and client risk scoring for an anti-money-laundering
//! backend.
//!
//! The crate provides:
//! - **Context**: an immutable per-evaluation snapshot of a transaction, its
//!   parties and the client's recent history
//! - **Rules**: pure, configuration-driven checks (daily limit, structuring,
//!   high-risk country) that each emit at most one alert
//! - **Engine**: runs the rule set once per transaction and persists alerts
//! - **Risk**: sums client-attribute points into a Low/Medium/High level
//! - **Service**: onboarding, submission, reassessment and alert review
//!
//! ## Design Principles
//!
//! 1. **Pure rules**: rules read only their context and never perform I/O
//! 2. **Fail fast on configuration**: missing or malformed thresholds are
//!    startup errors, never silent zeros
//! 3. **Explicit time**: every evaluation carries its own `evaluated_at`
//! 4. **Observable**: structured `tracing` events and in-process metrics;
//!    the library never installs a subscriber
//!
//! ```rust
//! use cim_compliance::{RuleConfigStore, RuleSet};
//!
//! let store = RuleConfigStore::new()
//!     .with("DailyLimitRule", "DailyLimit", "10000")
//!     .with("StructuringRule", "ThresholdAmount", "10000")
//!     .with("StructuringRule", "MinTransactionCount", "3")
//!     .with("StructuringRule", "DaysWindow", "7")
//!     .with("RiskCountryRule", "HighRiskCountries", "IR,KP");
//!
//! let rules = RuleSet::standard(&store).unwrap();
//! assert_eq!(rules.names(), vec!["DailyLimitRule", "StructuringRule", "RiskCountryRule"]);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod domain;
pub mod engine;
mod entity;
mod errors;
pub mod metrics;
pub mod repository;
pub mod risk;
pub mod rules;
pub mod service;

pub use config::{
    ComplianceConfig, DailyLimitConfig, EngineConfig, RiskCountryConfig, RuleConfigStore,
    StructuringConfig,
};
pub use context::{ComplianceContext, ContextBuilder};
pub use domain::{
    Alert, AlertSeverity, AlertStatus, Client, ClientType, CountryRisk, KycStatus, NewClient,
    NewTransaction, RiskLevel, Transaction, TransactionType,
};
pub use engine::{AlertFailure, EvaluationReport, RuleEvaluationEngine};
pub use entity::{AlertId, ClientId, EntityId, TransactionId};
pub use errors::{ComplianceError, ComplianceResult};
pub use metrics::{EvaluationMetrics, MetricsSummary};
pub use repository::{
    AlertRepository, ClientRepository, CountryRiskLookup, InMemoryAlertRepository,
    InMemoryClientRepository, InMemoryTransactionRepository, StaticCountryRiskTable,
    TransactionRepository,
};
pub use risk::{ClientRiskCalculator, ClientRiskRule, RiskAssessment, RiskPolicy};
pub use rules::{ComplianceRule, DailyLimitRule, RiskCountryRule, RuleSet, StructuringRule};
pub use service::{MonitoringService, Repositories, TransactionOutcome};

// Re-export marker types
pub mod markers {
    //! Marker types for phantom type parameters
    pub use crate::entity::{AlertMarker, ClientMarker, TransactionMarker};
}
