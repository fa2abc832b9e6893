// Copyright 2025 Cowboy AI, LLC.

//! Monitoring service
//!
//! Ties onboarding, transaction submission, risk reassessment and alert review
//! together. [`MonitoringService::submit_transaction`] is the one place that
//! invokes evaluation, exactly once per recorded transaction.

use crate::config::{EngineConfig, RiskCountryConfig, RuleConfigStore};
use crate::context::ContextBuilder;
use crate::domain::{Alert, AlertStatus, Client, NewClient, NewTransaction, Transaction};
use crate::engine::{EvaluationReport, RuleEvaluationEngine};
use crate::entity::{AlertId, ClientId};
use crate::errors::{ComplianceError, ComplianceResult};
use crate::repository::{AlertRepository, ClientRepository, CountryRiskLookup, TransactionRepository};
use crate::risk::{ClientRiskCalculator, RiskPolicy};
use crate::rules::{DailyLimitRule, RiskCountryRule, RuleSet, StructuringRule};
use std::sync::Arc;
use tracing::info;

/// A recorded transaction together with its evaluation
#[derive(Debug, Clone)]
pub struct TransactionOutcome {
    /// The persisted transaction
    pub transaction: Transaction,
    /// What the rules found
    pub evaluation: EvaluationReport,
}

/// Collaborators the service reads and writes through
#[derive(Clone)]
pub struct Repositories {
    /// Transaction ledger
    pub transactions: Arc<dyn TransactionRepository>,
    /// Client records
    pub clients: Arc<dyn ClientRepository>,
    /// Alert store
    pub alerts: Arc<dyn AlertRepository>,
    /// Country risk reference data
    pub countries: Arc<dyn CountryRiskLookup>,
}

/// Application service for the monitoring backend
pub struct MonitoringService {
    repositories: Repositories,
    engine: RuleEvaluationEngine,
    risk: ClientRiskCalculator,
}

impl MonitoringService {
    /// Assemble from pre-built parts
    pub fn new(
        repositories: Repositories,
        engine: RuleEvaluationEngine,
        risk: ClientRiskCalculator,
    ) -> Self {
        Self {
            repositories,
            engine,
            risk,
        }
    }

    /// Build the standard rule set, engine and risk calculator from configuration.
    ///
    /// The high-risk country list comes from `RiskCountryRule.HighRiskCountries`
    /// when configured, otherwise from the country lookup's High classifications.
    /// Fails on any missing or malformed threshold.
    pub async fn from_config(
        store: &RuleConfigStore,
        repositories: Repositories,
    ) -> ComplianceResult<Self> {
        let risk_country = if store
            .get(RiskCountryConfig::RULE, RiskCountryConfig::HIGH_RISK_COUNTRIES)
            .is_some()
        {
            RiskCountryRule::from_config(store)?
        } else {
            RiskCountryRule::from_lookup(repositories.countries.as_ref()).await?
        };
        let rules = RuleSet::new()
            .with_rule(DailyLimitRule::from_config(store)?)
            .with_rule(StructuringRule::from_config(store)?)
            .with_rule(risk_country);

        let context_builder = ContextBuilder::new(
            repositories.transactions.clone(),
            repositories.clients.clone(),
            EngineConfig::from_store(store)?,
        );
        let engine =
            RuleEvaluationEngine::new(context_builder, rules, repositories.alerts.clone())?;
        let risk = ClientRiskCalculator::standard(
            repositories.countries.clone(),
            RiskPolicy::from_store(store)?,
        );

        info!(rules = ?engine.rules().names(), "monitoring service configured");
        Ok(Self::new(repositories, engine, risk))
    }

    /// The evaluation engine
    pub fn engine(&self) -> &RuleEvaluationEngine {
        &self.engine
    }

    /// The risk calculator
    pub fn risk_calculator(&self) -> &ClientRiskCalculator {
        &self.risk
    }

    /// Validate, score and store a new client
    pub async fn onboard_client(&self, input: NewClient) -> ComplianceResult<Client> {
        let mut client = Client::new(input)?;
        let assessment = self.risk.assess(&client).await?;
        client.apply_risk_assessment(&assessment);
        self.repositories.clients.save_client(&client).await?;

        info!(
            client_id = %client.id(),
            risk_level = %client.risk_level(),
            points = assessment.points(),
            "client onboarded"
        );
        Ok(client)
    }

    /// Recompute and store a client's risk level
    pub async fn reassess_client(&self, id: ClientId) -> ComplianceResult<Client> {
        let mut client = self.require_client(id, "Client").await?;
        let assessment = self.risk.assess(&client).await?;
        client.apply_risk_assessment(&assessment);
        self.repositories.clients.save_client(&client).await?;
        Ok(client)
    }

    /// Record a transaction and evaluate it once.
    ///
    /// Both parties must exist and the owner must be active; otherwise nothing
    /// is recorded. An evaluation error after recording is returned as is; the
    /// transaction stays in the ledger.
    pub async fn submit_transaction(
        &self,
        input: NewTransaction,
    ) -> ComplianceResult<TransactionOutcome> {
        let transaction = Transaction::new(input)?;

        let owner = self.require_client(transaction.client_id(), "Client").await?;
        if !owner.is_active() {
            return Err(ComplianceError::ValidationError(format!(
                "client {} is inactive",
                owner.id()
            )));
        }
        self.require_client(transaction.counterparty_id(), "Counterparty")
            .await?;

        self.repositories
            .transactions
            .save_transaction(&transaction)
            .await?;
        let evaluation = self.engine.evaluate(transaction.id()).await?;

        Ok(TransactionOutcome {
            transaction,
            evaluation,
        })
    }

    /// Move an alert through the review workflow
    pub async fn review_alert(&self, id: AlertId, status: AlertStatus) -> ComplianceResult<Alert> {
        let mut alert = self
            .repositories
            .alerts
            .get_alert(id)
            .await?
            .ok_or_else(|| ComplianceError::not_found("Alert", id))?;
        alert.transition_to(status)?;
        self.repositories.alerts.save_alert(&alert).await?;

        info!(alert_id = %id, status = %status, "alert reviewed");
        Ok(alert)
    }

    async fn require_client(&self, id: ClientId, role: &str) -> ComplianceResult<Client> {
        self.repositories
            .clients
            .get_client(id)
            .await?
            .ok_or_else(|| ComplianceError::not_found(role, id))
    }
}

impl std::fmt::Debug for MonitoringService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringService")
            .field("engine", &self.engine)
            .field("risk", &self.risk)
            .finish()
    }
}
