// Copyright 2025 Cowboy AI, LLC.

//! Rule evaluation engine
//!
//! Entry point for evaluating one transaction: build the context, run every
//! rule, persist every alert.
//!
//! Evaluation is not idempotent. There is no dedup key per (transaction,
//! rule), so evaluating the same transaction twice stores duplicate alerts.
//! Callers must invoke evaluation at most once per transaction, normally right
//! after the transaction is recorded (see
//! [`MonitoringService::submit_transaction`](crate::MonitoringService::submit_transaction)).
//!
//! Evaluations for the same client are serialized so that two concurrent
//! evaluations never read overlapping history snapshots. Different clients
//! evaluate in parallel.

use crate::config::{EngineConfig, ENGINE_SECTION, MAX_WINDOW_DAYS};
use crate::context::ContextBuilder;
use crate::domain::{Alert, Transaction};
use crate::entity::{AlertId, ClientId, TransactionId};
use crate::errors::{ComplianceError, ComplianceResult};
use crate::metrics::{names, EvaluationMetrics, MetricsTimer};
use crate::repository::AlertRepository;
use crate::rules::RuleSet;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// An alert whose save failed
#[derive(Debug, Clone)]
pub struct AlertFailure {
    /// The alert that was not stored
    pub alert: Alert,
    /// Why the save failed
    pub error: ComplianceError,
}

/// Outcome of one evaluation
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// Transaction evaluated
    pub transaction_id: TransactionId,
    /// Owner of the transaction
    pub client_id: ClientId,
    /// Every alert the rules raised, in rule order
    pub alerts_raised: Vec<Alert>,
    /// Ids of alerts that were persisted
    pub alerts_saved: Vec<AlertId>,
    /// Alerts that could not be persisted
    pub failures: Vec<AlertFailure>,
}

impl EvaluationReport {
    /// True when every raised alert was persisted
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Names of the rules that fired
    pub fn fired_rules(&self) -> Vec<&str> {
        self.alerts_raised
            .iter()
            .map(|alert| alert.rule_name())
            .collect()
    }
}

/// Orchestrates context building, rule execution and alert persistence
pub struct RuleEvaluationEngine {
    context_builder: ContextBuilder,
    rules: RuleSet,
    alerts: Arc<dyn AlertRepository>,
    metrics: EvaluationMetrics,
    client_locks: ClientLocks,
}

type ClientLocks = std::sync::Mutex<HashMap<ClientId, ClientSlot>>;

#[derive(Default)]
struct ClientSlot {
    lock: Arc<Mutex<()>>,
    leases: usize,
}

/// A claim on one client's lock; dropping it, also on cancellation, removes
/// the map entry once no other claim remains
struct ClientLease<'a> {
    locks: &'a ClientLocks,
    client_id: ClientId,
    lock: Arc<Mutex<()>>,
}

impl Drop for ClientLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = locks.get_mut(&self.client_id) {
            slot.leases = slot.leases.saturating_sub(1);
            if slot.leases == 0 {
                locks.remove(&self.client_id);
            }
        }
    }
}

impl RuleEvaluationEngine {
    /// Create an engine.
    ///
    /// Fails when a rule reads more history than the context builder loads.
    pub fn new(
        context_builder: ContextBuilder,
        rules: RuleSet,
        alerts: Arc<dyn AlertRepository>,
    ) -> ComplianceResult<Self> {
        let needed = rules.max_history_days();
        let loaded = context_builder.lookback().num_days();
        if loaded > i64::from(MAX_WINDOW_DAYS) {
            return Err(ComplianceError::configuration(
                ENGINE_SECTION,
                EngineConfig::LOOKBACK_DAYS,
                format!("{loaded} days exceeds the {MAX_WINDOW_DAYS} day maximum"),
            ));
        }
        if i64::from(needed) > loaded {
            return Err(ComplianceError::configuration(
                ENGINE_SECTION,
                EngineConfig::LOOKBACK_DAYS,
                format!("rules read {needed} days of history but only {loaded} are loaded"),
            ));
        }

        Ok(Self {
            context_builder,
            rules,
            alerts,
            metrics: EvaluationMetrics::new(),
            client_locks: ClientLocks::default(),
        })
    }

    /// Share a metrics collector with other components
    pub fn with_metrics(mut self, metrics: EvaluationMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Metrics collector
    pub fn metrics(&self) -> &EvaluationMetrics {
        &self.metrics
    }

    /// Configured rules
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Evaluate a transaction now
    pub async fn evaluate(&self, transaction_id: TransactionId) -> ComplianceResult<EvaluationReport> {
        self.evaluate_at(transaction_id, Utc::now()).await
    }

    /// Evaluate a transaction, aborting with [`ComplianceError::Cancelled`]
    /// if `cancel` resolves first.
    ///
    /// Alerts already persisted before cancellation stay persisted.
    pub async fn evaluate_until<F>(
        &self,
        transaction_id: TransactionId,
        cancel: F,
    ) -> ComplianceResult<EvaluationReport>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.evaluate(transaction_id) => result,
            _ = cancel => {
                self.metrics.increment(names::CANCELLED).await;
                warn!(transaction_id = %transaction_id, "evaluation cancelled");
                Err(ComplianceError::Cancelled(format!("evaluation of transaction {transaction_id}")))
            }
        }
    }

    /// Evaluate a transaction as of `now`.
    ///
    /// A missing transaction, client or counterparty aborts the evaluation
    /// with no alerts. Alert save failures do not abort; they are listed in
    /// [`EvaluationReport::failures`].
    pub async fn evaluate_at(
        &self,
        transaction_id: TransactionId,
        now: DateTime<Utc>,
    ) -> ComplianceResult<EvaluationReport> {
        let timer = MetricsTimer::new(&self.metrics, names::EVALUATE);

        let transaction = match self.context_builder.load_transaction(transaction_id).await {
            Ok(transaction) => transaction,
            Err(e) => return Err(self.aborted(transaction_id, e).await),
        };

        let client_id = transaction.client_id();
        let result = {
            let lease = self.client_lock(client_id);
            let _guard = lease.lock.lock().await;
            self.run(transaction, now).await
        };

        let report = match result {
            Ok(report) => report,
            Err(e) => return Err(self.aborted(transaction_id, e).await),
        };

        timer.record().await;
        self.metrics.increment(names::EVALUATIONS).await;
        info!(
            transaction_id = %transaction_id,
            client_id = %client_id,
            raised = report.alerts_raised.len(),
            saved = report.alerts_saved.len(),
            failed = report.failures.len(),
            "transaction evaluated"
        );
        Ok(report)
    }

    async fn run(
        &self,
        transaction: Transaction,
        now: DateTime<Utc>,
    ) -> ComplianceResult<EvaluationReport> {
        let transaction_id = transaction.id();
        let client_id = transaction.client_id();
        let context = self.context_builder.build_for(transaction, now).await?;

        let alerts_raised = self.rules.evaluate(&context);
        let mut alerts_saved = Vec::with_capacity(alerts_raised.len());
        let mut failures = Vec::new();

        for alert in &alerts_raised {
            self.metrics.record_alert(alert.rule_name()).await;
            match self.alerts.save_alert(alert).await {
                Ok(()) => {
                    self.metrics.increment(names::ALERTS_SAVED).await;
                    debug!(
                        alert_id = %alert.id(),
                        rule = alert.rule_name(),
                        severity = %alert.severity(),
                        "alert persisted"
                    );
                    alerts_saved.push(alert.id());
                }
                Err(error) => {
                    self.metrics.increment(names::ALERTS_FAILED).await;
                    warn!(
                        alert_id = %alert.id(),
                        rule = alert.rule_name(),
                        error = %error,
                        "alert could not be persisted"
                    );
                    failures.push(AlertFailure {
                        alert: alert.clone(),
                        error,
                    });
                }
            }
        }

        Ok(EvaluationReport {
            transaction_id,
            client_id,
            alerts_raised,
            alerts_saved,
            failures,
        })
    }

    async fn aborted(&self, transaction_id: TransactionId, error: ComplianceError) -> ComplianceError {
        if error.is_not_found() {
            self.metrics.increment(names::NOT_FOUND).await;
        }
        warn!(transaction_id = %transaction_id, error = %error, "evaluation aborted");
        error
    }

    fn client_lock(&self, client_id: ClientId) -> ClientLease<'_> {
        let mut locks = self.client_locks.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = locks.entry(client_id).or_default();
        slot.leases += 1;
        ClientLease {
            locks: &self.client_locks,
            client_id,
            lock: slot.lock.clone(),
        }
    }
}

impl std::fmt::Debug for RuleEvaluationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEvaluationEngine")
            .field("rules", &self.rules)
            .field("lookback_days", &self.context_builder.lookback().num_days())
            .finish()
    }
}
