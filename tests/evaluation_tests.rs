//! Integration tests for transaction evaluation

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use cim_compliance::{
    Alert, AlertId, AlertRepository, AlertSeverity, AlertStatus, Client, ClientId, ClientRepository,
    ClientType, ComplianceError, ComplianceResult, ContextBuilder, CountryRisk, EngineConfig,
    InMemoryAlertRepository, InMemoryClientRepository, InMemoryTransactionRepository,
    MonitoringService, NewClient, NewTransaction, Repositories, RuleConfigStore,
    RuleEvaluationEngine, RuleSet, StaticCountryRiskTable, Transaction, TransactionId,
    TransactionRepository, TransactionType,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 20, 17, 0, 0).unwrap()
}

fn store() -> RuleConfigStore {
    RuleConfigStore::new()
        .with("DailyLimitRule", "DailyLimit", "10000")
        .with("StructuringRule", "ThresholdAmount", "10000")
        .with("StructuringRule", "MinTransactionCount", "3")
        .with("StructuringRule", "DaysWindow", "7")
        .with("RiskCountryRule", "HighRiskCountries", "XX, KP")
}

struct Bank {
    transactions: InMemoryTransactionRepository,
    clients: InMemoryClientRepository,
    alerts: InMemoryAlertRepository,
    owner: Client,
    counterparty: Client,
}

impl Bank {
    async fn open() -> Self {
        let bank = Self {
            transactions: InMemoryTransactionRepository::new(),
            clients: InMemoryClientRepository::new(),
            alerts: InMemoryAlertRepository::new(),
            owner: client("Owner", "US"),
            counterparty: client("Counterparty", "BR"),
        };
        bank.clients.save_client(&bank.owner).await.unwrap();
        bank.clients.save_client(&bank.counterparty).await.unwrap();
        bank
    }

    fn engine_with(&self, store: &RuleConfigStore, alerts: Arc<dyn AlertRepository>) -> RuleEvaluationEngine {
        let builder = ContextBuilder::new(
            Arc::new(self.transactions.clone()),
            Arc::new(self.clients.clone()),
            EngineConfig::default(),
        );
        RuleEvaluationEngine::new(builder, RuleSet::standard(store).unwrap(), alerts).unwrap()
    }

    fn engine(&self, store: &RuleConfigStore) -> RuleEvaluationEngine {
        self.engine_with(store, Arc::new(self.alerts.clone()))
    }

    async fn record(&self, amount: Decimal, at: DateTime<Utc>, country: &str) -> Transaction {
        let tx = Transaction::new(NewTransaction {
            client_id: self.owner.id(),
            transaction_type: TransactionType::Withdrawal,
            amount,
            currency: "USD".to_string(),
            counterparty_id: self.counterparty.id(),
            timestamp: at,
            country: country.to_string(),
        })
        .unwrap();
        self.transactions.save_transaction(&tx).await.unwrap();
        tx
    }
}

fn client(name: &str, country: &str) -> Client {
    Client::new(NewClient {
        name: name.to_string(),
        country: country.to_string(),
        government_id: format!("{name}-ID"),
        client_type: ClientType::Individual,
        monthly_income: dec!(4000),
    })
    .unwrap()
}

#[tokio::test]
async fn test_daily_limit_alert_lands_on_last_transaction() {
    let bank = Bank::open().await;
    // structuring threshold out of reach so only the daily limit fires
    let store = store().with("StructuringRule", "ThresholdAmount", "50000");
    let engine = bank.engine(&store);

    bank.record(dec!(4000), now() - Duration::hours(6), "US").await;
    bank.record(dec!(4000), now() - Duration::hours(3), "US").await;
    let last = bank.record(dec!(3000), now(), "US").await;

    let report = engine.evaluate_at(last.id(), now()).await.unwrap();

    assert_eq!(report.fired_rules(), vec!["DailyLimitRule"]);
    let alert = &report.alerts_raised[0];
    assert_eq!(alert.transaction_id(), last.id());
    assert_eq!(alert.severity(), AlertSeverity::High);
    assert_eq!(alert.status(), AlertStatus::New);
    assert_eq!(bank.alerts.alerts_for_transaction(last.id()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_structuring_over_several_days() {
    let bank = Bank::open().await;
    let engine = bank.engine(&store());

    for days_ago in [6, 4, 2] {
        bank.record(dec!(3000), now() - Duration::days(days_ago), "US").await;
    }
    let fourth = bank.record(dec!(3000), now(), "US").await;

    let report = engine.evaluate_at(fourth.id(), now()).await.unwrap();

    assert_eq!(report.fired_rules(), vec!["StructuringRule"]);
    assert_eq!(report.alerts_raised[0].transaction_id(), fourth.id());
    assert_eq!(report.alerts_raised[0].severity(), AlertSeverity::High);
}

#[tokio::test]
async fn test_two_large_transactions_are_not_structuring() {
    let bank = Bank::open().await;
    let store = store().with("DailyLimitRule", "DailyLimit", "100000");
    let engine = bank.engine(&store);

    bank.record(dec!(9000), now() - Duration::days(1), "US").await;
    let second = bank.record(dec!(9000), now(), "US").await;

    let report = engine.evaluate_at(second.id(), now()).await.unwrap();
    assert!(report.alerts_raised.is_empty());
    assert!(bank.alerts.all().await.is_empty());
}

#[tokio::test]
async fn test_high_risk_origin_raises_medium_alert() {
    let bank = Bank::open().await;
    let engine = bank.engine(&store());

    let tx = bank.record(dec!(50), now(), "xx").await;
    let report = engine.evaluate_at(tx.id(), now()).await.unwrap();

    assert_eq!(report.fired_rules(), vec!["RiskCountryRule"]);
    assert_eq!(report.alerts_raised[0].severity(), AlertSeverity::Medium);
    assert_eq!(report.alerts_raised[0].transaction_id(), tx.id());
}

#[tokio::test]
async fn test_trigger_older_than_lookback_is_still_checked() {
    let bank = Bank::open().await;
    let engine = bank.engine(&store());

    let stale = bank.record(dec!(50), now() - Duration::days(40), "XX").await;
    let report = engine.evaluate_at(stale.id(), now()).await.unwrap();

    assert_eq!(report.fired_rules(), vec!["RiskCountryRule"]);
    assert_eq!(report.alerts_raised[0].transaction_id(), stale.id());
}

#[tokio::test]
async fn test_future_dated_trigger_counts_toward_its_day() {
    let bank = Bank::open().await;
    let engine = bank.engine(&store());

    bank.record(dec!(6000), now() - Duration::hours(2), "US").await;
    let ahead = bank.record(dec!(5000), now() + Duration::seconds(1), "XX").await;
    let report = engine.evaluate_at(ahead.id(), now()).await.unwrap();

    assert_eq!(report.fired_rules(), vec!["DailyLimitRule", "RiskCountryRule"]);
    assert!(report
        .alerts_raised
        .iter()
        .all(|alert| alert.transaction_id() == ahead.id()));
}

#[tokio::test]
async fn test_risk_country_alert_lands_on_latest_even_outside_lookback() {
    let bank = Bank::open().await;
    let engine = bank.engine(&store());

    let trigger = bank.record(dec!(75), now() - Duration::days(50), "XX").await;
    let latest = bank.record(dec!(20), now() - Duration::days(35), "US").await;
    let report = engine.evaluate_at(trigger.id(), now()).await.unwrap();

    assert_eq!(report.fired_rules(), vec!["RiskCountryRule"]);
    assert_eq!(report.alerts_raised[0].transaction_id(), latest.id());
    assert!(bank
        .alerts
        .alerts_for_transaction(trigger.id())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_evaluating_twice_duplicates_alerts() {
    let bank = Bank::open().await;
    let engine = bank.engine(&store());
    let tx = bank.record(dec!(50), now(), "XX").await;

    engine.evaluate_at(tx.id(), now()).await.unwrap();
    engine.evaluate_at(tx.id(), now()).await.unwrap();

    let stored = bank.alerts.alerts_for_transaction(tx.id()).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_ne!(stored[0].id(), stored[1].id());
}

#[tokio::test]
async fn test_unknown_transaction_raises_nothing() {
    let bank = Bank::open().await;
    let engine = bank.engine(&store());

    let err = engine.evaluate(TransactionId::new()).await.unwrap_err();

    assert!(matches!(err, ComplianceError::EntityNotFound { .. }));
    assert!(bank.alerts.all().await.is_empty());
}

/// Rejects every other save
#[derive(Default)]
struct FlakyAlertRepository {
    inner: InMemoryAlertRepository,
    calls: AtomicUsize,
}

#[async_trait]
impl AlertRepository for FlakyAlertRepository {
    async fn save_alert(&self, alert: &Alert) -> ComplianceResult<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
            return Err(ComplianceError::persistence("save_alert", "connection reset"));
        }
        self.inner.save_alert(alert).await
    }

    async fn get_alert(&self, id: AlertId) -> ComplianceResult<Option<Alert>> {
        self.inner.get_alert(id).await
    }

    async fn alerts_for_transaction(&self, id: TransactionId) -> ComplianceResult<Vec<Alert>> {
        self.inner.alerts_for_transaction(id).await
    }

    async fn alerts_for_client(&self, id: ClientId) -> ComplianceResult<Vec<Alert>> {
        self.inner.alerts_for_client(id).await
    }
}

#[tokio::test]
async fn test_partial_persistence_is_reported() {
    let bank = Bank::open().await;
    let flaky = Arc::new(FlakyAlertRepository::default());
    let engine = bank.engine_with(&store(), flaky.clone());

    bank.record(dec!(4000), now() - Duration::hours(2), "XX").await;
    bank.record(dec!(4000), now() - Duration::hours(1), "XX").await;
    let last = bank.record(dec!(3000), now(), "XX").await;

    let report = engine.evaluate_at(last.id(), now()).await.unwrap();

    assert_eq!(report.alerts_raised.len(), 3);
    assert_eq!(report.alerts_saved.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].alert.rule_name(), "StructuringRule");
    assert!(report.failures[0].error.is_persistence_error());
    assert!(!report.is_complete());

    let stored: Vec<String> = flaky
        .inner
        .all()
        .await
        .iter()
        .map(|alert| alert.rule_name().to_string())
        .collect();
    assert_eq!(stored, vec!["DailyLimitRule", "RiskCountryRule"]);
}

#[tokio::test]
async fn test_concurrent_evaluations_for_one_client() {
    let bank = Bank::open().await;
    let engine = Arc::new(bank.engine(&store()));
    let first = bank.record(dec!(20), now(), "KP").await;
    let second = bank.record(dec!(30), now(), "KP").await;

    let (a, b) = tokio::join!(
        engine.evaluate_at(first.id(), now()),
        engine.evaluate_at(second.id(), now())
    );

    assert_eq!(a.unwrap().alerts_saved.len(), 1);
    assert_eq!(b.unwrap().alerts_saved.len(), 1);
    assert_eq!(
        bank.alerts.alerts_for_client(bank.owner.id()).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_submit_then_review_through_service() {
    let repositories = Repositories {
        transactions: Arc::new(InMemoryTransactionRepository::new()),
        clients: Arc::new(InMemoryClientRepository::new()),
        alerts: Arc::new(InMemoryAlertRepository::new()),
        countries: Arc::new(StaticCountryRiskTable::new().with("KP", CountryRisk::High)),
    };
    let service = MonitoringService::from_config(&store(), repositories)
        .await
        .unwrap();

    let owner = service
        .onboard_client(NewClient {
            name: "Acme".to_string(),
            country: "US".to_string(),
            government_id: "EIN-1".to_string(),
            client_type: ClientType::Organization,
            monthly_income: dec!(90000),
        })
        .await
        .unwrap();
    let counterparty = service
        .onboard_client(NewClient {
            name: "Receiver".to_string(),
            country: "KP".to_string(),
            government_id: "R-1".to_string(),
            client_type: ClientType::Individual,
            monthly_income: dec!(100),
        })
        .await
        .unwrap();

    let outcome = service
        .submit_transaction(NewTransaction {
            client_id: owner.id(),
            transaction_type: TransactionType::Transfer,
            amount: dec!(700),
            currency: "usd".to_string(),
            counterparty_id: counterparty.id(),
            timestamp: Utc::now(),
            country: "US".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.transaction.currency(), "USD");
    assert_eq!(outcome.evaluation.fired_rules(), vec!["RiskCountryRule"]);

    let alert_id = outcome.evaluation.alerts_saved[0];
    let reviewed = service
        .review_alert(alert_id, AlertStatus::UnderReview)
        .await
        .unwrap();
    assert_eq!(reviewed.status(), AlertStatus::UnderReview);

    let resolved = service
        .review_alert(alert_id, AlertStatus::Resolved)
        .await
        .unwrap();
    assert_eq!(resolved.status(), AlertStatus::Resolved);

    let err = service
        .review_alert(alert_id, AlertStatus::New)
        .await
        .unwrap_err();
    assert!(matches!(err, ComplianceError::InvalidStateTransition { .. }));
}
