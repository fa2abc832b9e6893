// Copyright 2025 Cowboy AI, LLC.

//! Compliance rules
//!
//! A rule is a pure function of a [`ComplianceContext`] and its own
//! configuration, parsed once at construction. Finding no violation is not an
//! error: [`ComplianceRule::validate`] returns `None`.
//!
//! Rules are independent and commutative. A [`RuleSet`] runs every rule on
//! every evaluation without short-circuiting, so one transaction may raise
//! several alerts.

mod daily_limit;
mod risk_country;
mod structuring;

pub use daily_limit::DailyLimitRule;
pub use risk_country::RiskCountryRule;
pub use structuring::StructuringRule;

use crate::config::RuleConfigStore;
use crate::context::ComplianceContext;
use crate::domain::Alert;
use crate::errors::ComplianceResult;
use tracing::debug;

/// A transaction-monitoring rule
pub trait ComplianceRule: Send + Sync {
    /// Name used for display, alert attribution and configuration scoping
    fn name(&self) -> &str;

    /// Evaluate the rule; at most one alert per call
    fn validate(&self, context: &ComplianceContext) -> Option<Alert>;

    /// Days of history, counted back from the evaluation date, the rule reads
    fn history_days(&self) -> u32 {
        0
    }
}

/// Ordered collection of rules run for every evaluation
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn ComplianceRule>>,
}

impl RuleSet {
    /// Create an empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// The three standard rules, parsed from configuration.
    ///
    /// Any missing or malformed key fails the whole set; a partially
    /// configured rule set is never returned.
    pub fn standard(store: &RuleConfigStore) -> ComplianceResult<Self> {
        Ok(Self::new()
            .with_rule(DailyLimitRule::from_config(store)?)
            .with_rule(StructuringRule::from_config(store)?)
            .with_rule(RiskCountryRule::from_config(store)?))
    }

    /// Builder-style [`RuleSet::push`]
    pub fn with_rule(mut self, rule: impl ComplianceRule + 'static) -> Self {
        self.push(Box::new(rule));
        self
    }

    /// Append a rule
    pub fn push(&mut self, rule: Box<dyn ComplianceRule>) {
        self.rules.push(rule);
    }

    /// Rule names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Longest history any rule reads
    pub fn max_history_days(&self) -> u32 {
        self.rules
            .iter()
            .map(|rule| rule.history_days())
            .max()
            .unwrap_or(0)
    }

    /// Run every rule against the context and collect the alerts
    pub fn evaluate(&self, context: &ComplianceContext) -> Vec<Alert> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let alert = rule.validate(context);
                debug!(
                    rule = rule.name(),
                    transaction_id = %context.transaction().id(),
                    fired = alert.is_some(),
                    "rule evaluated"
                );
                alert
            })
            .collect()
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.names())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::context::ComplianceContext;
    use crate::domain::{NewTransaction, Transaction, TransactionType};
    use crate::entity::ClientId;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    pub fn tx(client_id: ClientId, amount: Decimal, at: DateTime<Utc>) -> Transaction {
        tx_in(client_id, amount, at, "BR")
    }

    pub fn tx_in(client_id: ClientId, amount: Decimal, at: DateTime<Utc>, country: &str) -> Transaction {
        Transaction::new(NewTransaction {
            client_id,
            transaction_type: TransactionType::Deposit,
            amount,
            currency: "USD".to_string(),
            counterparty_id: ClientId::new(),
            timestamp: at,
            country: country.to_string(),
        })
        .unwrap()
    }

    /// Context whose triggering transaction is the last element of `history`
    pub fn context(history: Vec<Transaction>, now: DateTime<Utc>) -> ComplianceContext {
        let trigger = history.last().cloned().unwrap();
        ComplianceContext::new(trigger, "BR", history, now)
    }
}
