// Copyright 2025 Cowboy AI, LLC.

//! Collaborator contracts for persistence and reference data
//!
//! The engine never manages storage itself. It reads through these traits and
//! writes alerts through [`AlertRepository`]. `get_*` methods return `Ok(None)`
//! for absent rows; deciding whether absence is fatal is the caller's job.
//!
//! In-memory implementations are provided for tests and for embedding.

use crate::domain::{normalize_country_code, Alert, Client, CountryRisk, Transaction};
use crate::entity::{AlertId, ClientId, TransactionId};
use crate::errors::{ComplianceError, ComplianceResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Read/append access to the transaction ledger
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Load one transaction
    async fn get_transaction(&self, id: TransactionId) -> ComplianceResult<Option<Transaction>>;

    /// Append a transaction to the ledger
    async fn save_transaction(&self, transaction: &Transaction) -> ComplianceResult<()>;

    /// A client's transactions with `start <= timestamp <= end`, ascending by
    /// timestamp; ties keep insertion order
    async fn client_transactions_in_range(
        &self,
        client_id: ClientId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ComplianceResult<Vec<Transaction>>;

    /// The client's transaction with the greatest timestamp, whatever its age;
    /// ties resolve to the one recorded last
    async fn latest_client_transaction(
        &self,
        client_id: ClientId,
    ) -> ComplianceResult<Option<Transaction>>;
}

/// Access to client records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Load one client
    async fn get_client(&self, id: ClientId) -> ComplianceResult<Option<Client>>;

    /// Insert or update a client
    async fn save_client(&self, client: &Client) -> ComplianceResult<()>;
}

/// Alert persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Insert or update an alert
    async fn save_alert(&self, alert: &Alert) -> ComplianceResult<()>;

    /// Load one alert
    async fn get_alert(&self, id: AlertId) -> ComplianceResult<Option<Alert>>;

    /// Alerts attributed to a transaction, oldest first
    async fn alerts_for_transaction(&self, id: TransactionId) -> ComplianceResult<Vec<Alert>>;

    /// Alerts concerning a client, oldest first
    async fn alerts_for_client(&self, id: ClientId) -> ComplianceResult<Vec<Alert>>;
}

/// Country risk reference data
#[async_trait]
pub trait CountryRiskLookup: Send + Sync {
    /// Classification of one country; `None` when the country is unknown
    async fn risk_for(&self, country: &str) -> ComplianceResult<Option<CountryRisk>>;

    /// Every code classified as [`CountryRisk::High`]
    async fn high_risk_codes(&self) -> ComplianceResult<IndexSet<String>>;
}

/// In-memory ledger; preserves insertion order
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactionRepository {
    storage: Arc<RwLock<Vec<Transaction>>>,
}

impl InMemoryTransactionRepository {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded transactions
    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Whether the ledger is empty
    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn get_transaction(&self, id: TransactionId) -> ComplianceResult<Option<Transaction>> {
        let storage = self.storage.read().await;
        Ok(storage.iter().find(|tx| tx.id() == id).cloned())
    }

    async fn save_transaction(&self, transaction: &Transaction) -> ComplianceResult<()> {
        let mut storage = self.storage.write().await;
        if storage.iter().any(|tx| tx.id() == transaction.id()) {
            return Err(ComplianceError::persistence(
                "save_transaction",
                format!("transaction {} already recorded", transaction.id()),
            ));
        }
        storage.push(transaction.clone());
        Ok(())
    }

    async fn client_transactions_in_range(
        &self,
        client_id: ClientId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ComplianceResult<Vec<Transaction>> {
        let storage = self.storage.read().await;
        let mut found: Vec<Transaction> = storage
            .iter()
            .filter(|tx| tx.client_id() == client_id)
            .filter(|tx| tx.timestamp() >= start && tx.timestamp() <= end)
            .cloned()
            .collect();
        // stable: equal timestamps stay in insertion order
        found.sort_by_key(|tx| tx.timestamp());
        Ok(found)
    }

    async fn latest_client_transaction(
        &self,
        client_id: ClientId,
    ) -> ComplianceResult<Option<Transaction>> {
        let storage = self.storage.read().await;
        // max_by_key keeps the last of equal maxima
        Ok(storage
            .iter()
            .filter(|tx| tx.client_id() == client_id)
            .max_by_key(|tx| tx.timestamp())
            .cloned())
    }
}

/// In-memory client store
#[derive(Debug, Clone, Default)]
pub struct InMemoryClientRepository {
    storage: Arc<RwLock<HashMap<ClientId, Client>>>,
}

impl InMemoryClientRepository {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn get_client(&self, id: ClientId) -> ComplianceResult<Option<Client>> {
        Ok(self.storage.read().await.get(&id).cloned())
    }

    async fn save_client(&self, client: &Client) -> ComplianceResult<()> {
        self.storage
            .write()
            .await
            .insert(client.id(), client.clone());
        Ok(())
    }
}

/// In-memory alert store; keeps raise order
#[derive(Debug, Clone, Default)]
pub struct InMemoryAlertRepository {
    storage: Arc<RwLock<IndexMap<AlertId, Alert>>>,
}

impl InMemoryAlertRepository {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored alert, oldest first
    pub async fn all(&self) -> Vec<Alert> {
        self.storage.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn save_alert(&self, alert: &Alert) -> ComplianceResult<()> {
        self.storage.write().await.insert(alert.id(), alert.clone());
        Ok(())
    }

    async fn get_alert(&self, id: AlertId) -> ComplianceResult<Option<Alert>> {
        Ok(self.storage.read().await.get(&id).cloned())
    }

    async fn alerts_for_transaction(&self, id: TransactionId) -> ComplianceResult<Vec<Alert>> {
        let storage = self.storage.read().await;
        Ok(storage
            .values()
            .filter(|alert| alert.transaction_id() == id)
            .cloned()
            .collect())
    }

    async fn alerts_for_client(&self, id: ClientId) -> ComplianceResult<Vec<Alert>> {
        let storage = self.storage.read().await;
        Ok(storage
            .values()
            .filter(|alert| alert.client_id() == id)
            .cloned()
            .collect())
    }
}

/// Fixed country classification table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticCountryRiskTable {
    table: IndexMap<String, CountryRisk>,
}

impl StaticCountryRiskTable {
    /// Create an empty table (every country unknown)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style classification
    pub fn with(mut self, country: &str, risk: CountryRisk) -> Self {
        self.table.insert(normalize_country_code(country), risk);
        self
    }
}

impl<S: AsRef<str>> FromIterator<(S, CountryRisk)> for StaticCountryRiskTable {
    fn from_iter<I: IntoIterator<Item = (S, CountryRisk)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |table, (code, risk)| table.with(code.as_ref(), risk))
    }
}

#[async_trait]
impl CountryRiskLookup for StaticCountryRiskTable {
    async fn risk_for(&self, country: &str) -> ComplianceResult<Option<CountryRisk>> {
        Ok(self.table.get(&normalize_country_code(country)).copied())
    }

    async fn high_risk_codes(&self) -> ComplianceResult<IndexSet<String>> {
        Ok(self
            .table
            .iter()
            .filter(|(_, risk)| **risk == CountryRisk::High)
            .map(|(code, _)| code.clone())
            .collect())
    }
}
