// Copyright 2025 Cowboy AI, LLC.

use crate::config::{RuleConfigStore, StructuringConfig};
use crate::context::ComplianceContext;
use crate::domain::{Alert, AlertSeverity, Transaction};
use crate::errors::ComplianceResult;
use crate::rules::ComplianceRule;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing::debug;

/// Detects structuring ("smurfing"): many smaller transactions that together
/// reach a reportable amount inside a short window.
///
/// Fires only when the window holds at least `min_transaction_count`
/// transactions AND their sum is at least `threshold_amount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringRule {
    config: StructuringConfig,
}

impl StructuringRule {
    /// Build from a typed config
    pub fn new(config: StructuringConfig) -> Self {
        Self { config }
    }

    /// Parse the `StructuringRule.*` keys from a store
    pub fn from_config(store: &RuleConfigStore) -> ComplianceResult<Self> {
        StructuringConfig::from_store(store).map(Self::new)
    }

    /// Configured parameters
    pub fn config(&self) -> &StructuringConfig {
        &self.config
    }

    /// Midnight (UTC) `days_window` days before the evaluation date; the
    /// earliest representable instant when that date is out of range
    pub fn window_start(&self, context: &ComplianceContext) -> DateTime<Utc> {
        context
            .today()
            .checked_sub_signed(Duration::days(i64::from(self.config.days_window)))
            .map(|first_day| Utc.from_utc_datetime(&first_day.and_time(NaiveTime::MIN)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl ComplianceRule for StructuringRule {
    fn name(&self) -> &str {
        StructuringConfig::RULE
    }

    fn validate(&self, context: &ComplianceContext) -> Option<Alert> {
        let start = self.window_start(context);
        let end = context.evaluated_at();
        let window: Vec<&Transaction> = context
            .client_transactions()
            .filter(|tx| tx.timestamp() >= start && tx.timestamp() <= end)
            .collect();
        let last = *window.last()?;

        let count = window.len();
        let total: Decimal = window.iter().map(|tx| tx.amount()).sum();
        let enough_transactions = count >= self.config.min_transaction_count as usize;
        let enough_amount = total >= self.config.threshold_amount;
        if !(enough_transactions && enough_amount) {
            return None;
        }

        debug!(
            client_id = %context.client_id(),
            count,
            %total,
            days_window = self.config.days_window,
            "structuring pattern detected"
        );
        Some(Alert::raise(
            context.client_id(),
            last.id(),
            self.name(),
            AlertSeverity::High,
        ))
    }

    fn history_days(&self) -> u32 {
        self.config.days_window.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ClientId;
    use crate::rules::test_support::{context, tx};
    use rust_decimal_macros::dec;

    fn rule() -> StructuringRule {
        StructuringRule::new(StructuringConfig {
            threshold_amount: dec!(10000),
            min_transaction_count: 3,
            days_window: 7,
        })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_four_transactions_of_3000_fire_on_the_fourth() {
        let client = ClientId::new();
        let history: Vec<_> = (0..4)
            .map(|i| tx(client, dec!(3000), now() - Duration::days(3 - i)))
            .collect();
        let fourth = history[3].id();

        let alert = rule().validate(&context(history, now())).unwrap();

        assert_eq!(alert.transaction_id(), fourth);
        assert_eq!(alert.severity(), AlertSeverity::High);
        assert_eq!(alert.rule_name(), "StructuringRule");
    }

    #[test]
    fn test_two_transactions_never_fire_regardless_of_sum() {
        let client = ClientId::new();
        let history = vec![
            tx(client, dec!(50000), now() - Duration::days(1)),
            tx(client, dec!(50000), now()),
        ];

        assert!(rule().validate(&context(history, now())).is_none());
    }

    #[test]
    fn test_many_small_transactions_below_threshold_do_not_fire() {
        let client = ClientId::new();
        let history: Vec<_> = (0..5)
            .map(|i| tx(client, dec!(1000), now() - Duration::hours(5 - i)))
            .collect();

        assert!(rule().validate(&context(history, now())).is_none());
    }

    #[test]
    fn test_window_starts_at_midnight_days_window_ago() {
        let client = ClientId::new();
        let start = rule().window_start(&context(vec![tx(client, dec!(1), now())], now()));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 8, 0, 0, 0).unwrap());

        // one second before the window start is excluded
        let history = vec![
            tx(client, dec!(5000), start - Duration::seconds(1)),
            tx(client, dec!(3000), start),
            tx(client, dec!(3000), now() - Duration::hours(1)),
            tx(client, dec!(3000), now()),
        ];
        assert!(rule().validate(&context(history, now())).is_none());
    }

    #[test]
    fn test_exact_thresholds_fire() {
        let client = ClientId::new();
        let history = vec![
            tx(client, dec!(4000), now() - Duration::days(2)),
            tx(client, dec!(3000), now() - Duration::days(1)),
            tx(client, dec!(3000), now()),
        ];

        assert!(rule().validate(&context(history, now())).is_some());
    }

    #[test]
    fn test_history_covers_window() {
        assert_eq!(rule().history_days(), 8);
    }

    #[test]
    fn test_oversized_window_does_not_overflow() {
        let huge = StructuringRule::new(StructuringConfig {
            threshold_amount: dec!(10000),
            min_transaction_count: 3,
            days_window: u32::MAX,
        });
        assert_eq!(huge.history_days(), u32::MAX);

        let client = ClientId::new();
        let history = vec![
            tx(client, dec!(4000), now() - Duration::days(900)),
            tx(client, dec!(4000), now() - Duration::days(400)),
            tx(client, dec!(4000), now()),
        ];
        let ctx = context(history, now());
        assert_eq!(huge.window_start(&ctx), DateTime::<Utc>::MIN_UTC);
        assert!(huge.validate(&ctx).is_some());
    }
}
