// Copyright 2025 Cowboy AI, LLC.

use crate::config::{DailyLimitConfig, RuleConfigStore};
use crate::context::ComplianceContext;
use crate::domain::{Alert, AlertSeverity, Transaction};
use crate::errors::ComplianceResult;
use crate::rules::ComplianceRule;
use rust_decimal::Decimal;
use tracing::debug;

/// Fires when a client's same-day (UTC) total strictly exceeds the limit.
///
/// The alert is attributed to the latest transaction of the day, which is not
/// necessarily the one being evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyLimitRule {
    config: DailyLimitConfig,
}

impl DailyLimitRule {
    /// Build from a typed config
    pub fn new(config: DailyLimitConfig) -> Self {
        Self { config }
    }

    /// Parse `DailyLimitRule.DailyLimit` from a store
    pub fn from_config(store: &RuleConfigStore) -> ComplianceResult<Self> {
        DailyLimitConfig::from_store(store).map(Self::new)
    }

    /// Configured limit
    pub fn daily_limit(&self) -> Decimal {
        self.config.daily_limit
    }
}

impl ComplianceRule for DailyLimitRule {
    fn name(&self) -> &str {
        DailyLimitConfig::RULE
    }

    fn validate(&self, context: &ComplianceContext) -> Option<Alert> {
        let today = context.today();
        let todays: Vec<&Transaction> = context
            .client_transactions()
            .filter(|tx| tx.date() == today)
            .collect();
        let last = *todays.last()?;

        let total: Decimal = todays.iter().map(|tx| tx.amount()).sum();
        if total <= self.config.daily_limit {
            return None;
        }

        debug!(
            client_id = %context.client_id(),
            %total,
            limit = %self.config.daily_limit,
            "daily limit exceeded"
        );
        Some(Alert::raise(
            context.client_id(),
            last.id(),
            self.name(),
            AlertSeverity::High,
        ))
    }

    fn history_days(&self) -> u32 {
        1
    }
}
