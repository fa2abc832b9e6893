// Copyright 2025 Cowboy AI, LLC.

//! Compliance context: the per-evaluation snapshot rules read from
//!
//! A context is built fresh for every evaluation and never mutated after
//! construction. Rules receive a shared reference and nothing else, so they
//! cannot issue their own queries with inconsistent windows.

use crate::config::{EngineConfig, ENGINE_SECTION};
use crate::domain::{normalize_country_code, Transaction};
use crate::entity::{ClientId, TransactionId};
use crate::errors::{ComplianceError, ComplianceResult};
use crate::repository::{ClientRepository, TransactionRepository};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::debug;

/// Immutable evaluation snapshot for one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceContext {
    evaluated_at: DateTime<Utc>,
    transaction: Transaction,
    origin_country: String,
    destination_country: String,
    recent_transactions: Vec<Transaction>,
    latest_transaction: Transaction,
}

impl ComplianceContext {
    /// Assemble a context from already-loaded data.
    ///
    /// The triggering transaction is added to `recent_transactions` unless a
    /// transaction with its id is already there. The list is then sorted
    /// ascending by timestamp; the sort is stable so equal timestamps keep the
    /// order they were given in.
    pub fn new(
        transaction: Transaction,
        destination_country: &str,
        mut recent_transactions: Vec<Transaction>,
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        if !recent_transactions.iter().any(|tx| tx.id() == transaction.id()) {
            recent_transactions.push(transaction.clone());
        }
        recent_transactions.sort_by_key(|tx| tx.timestamp());

        let client_id = transaction.client_id();
        let latest_transaction = recent_transactions
            .iter()
            .rev()
            .find(|tx| tx.client_id() == client_id)
            .cloned()
            .unwrap_or_else(|| transaction.clone());

        Self {
            evaluated_at,
            origin_country: transaction.country().to_string(),
            destination_country: normalize_country_code(destination_country),
            transaction,
            recent_transactions,
            latest_transaction,
        }
    }

    /// Replace the client's most recent transaction with one found outside
    /// the look-back window. Ignored when it belongs to another client or is
    /// older than the current one.
    pub fn with_latest_transaction(mut self, candidate: Transaction) -> Self {
        if candidate.client_id() == self.client_id()
            && candidate.timestamp() >= self.latest_transaction.timestamp()
        {
            self.latest_transaction = candidate;
        }
        self
    }

    /// Evaluation time
    pub fn evaluated_at(&self) -> DateTime<Utc> {
        self.evaluated_at
    }

    /// UTC calendar date of the evaluation
    pub fn today(&self) -> NaiveDate {
        self.evaluated_at.date_naive()
    }

    /// The transaction under evaluation
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Owner of the transaction under evaluation
    pub fn client_id(&self) -> ClientId {
        self.transaction.client_id()
    }

    /// Counterparty of the transaction under evaluation
    pub fn counterparty_id(&self) -> ClientId {
        self.transaction.counterparty_id()
    }

    /// Country the transaction originates from
    pub fn origin_country(&self) -> &str {
        &self.origin_country
    }

    /// Country of the counterparty
    pub fn destination_country(&self) -> &str {
        &self.destination_country
    }

    /// The client's transactions inside the look-back window, oldest first
    pub fn recent_transactions(&self) -> &[Transaction] {
        &self.recent_transactions
    }

    /// The client's most recent transaction regardless of window; at worst
    /// the transaction under evaluation
    pub fn latest_transaction(&self) -> &Transaction {
        &self.latest_transaction
    }

    /// Recent transactions owned by the evaluated client, oldest first
    pub fn client_transactions(&self) -> impl Iterator<Item = &Transaction> {
        let client_id = self.client_id();
        self.recent_transactions
            .iter()
            .filter(move |tx| tx.client_id() == client_id)
    }
}

/// Loads the transaction, both parties and the recent history
#[derive(Clone)]
pub struct ContextBuilder {
    transactions: Arc<dyn TransactionRepository>,
    clients: Arc<dyn ClientRepository>,
    lookback: Duration,
}

impl ContextBuilder {
    /// Create a builder with the engine's look-back window
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        clients: Arc<dyn ClientRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            transactions,
            clients,
            lookback: Duration::days(i64::from(config.lookback_days)),
        }
    }

    /// Look-back window applied to history
    pub fn lookback(&self) -> Duration {
        self.lookback
    }

    /// Build a context evaluated now
    pub async fn build(&self, transaction_id: TransactionId) -> ComplianceResult<ComplianceContext> {
        self.build_at(transaction_id, Utc::now()).await
    }

    /// Build a context as of `now`, or as of the transaction's own timestamp
    /// when that is later.
    ///
    /// Fails with [`ComplianceError::EntityNotFound`] when the transaction,
    /// its client or its counterparty is missing.
    pub async fn build_at(
        &self,
        transaction_id: TransactionId,
        now: DateTime<Utc>,
    ) -> ComplianceResult<ComplianceContext> {
        let transaction = self.load_transaction(transaction_id).await?;
        self.build_for(transaction, now).await
    }

    /// Load the transaction under evaluation
    pub async fn load_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> ComplianceResult<Transaction> {
        self.transactions
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| ComplianceError::not_found("Transaction", transaction_id))
    }

    /// Build a context around an already-loaded transaction
    pub async fn build_for(
        &self,
        transaction: Transaction,
        now: DateTime<Utc>,
    ) -> ComplianceResult<ComplianceContext> {
        let transaction_id = transaction.id();
        let client_id = transaction.client_id();
        self.clients
            .get_client(client_id)
            .await?
            .ok_or_else(|| ComplianceError::not_found("Client", client_id))?;

        let counterparty_id = transaction.counterparty_id();
        let counterparty = self
            .clients
            .get_client(counterparty_id)
            .await?
            .ok_or_else(|| ComplianceError::not_found("Counterparty", counterparty_id))?;

        // a future-dated trigger moves the evaluation point forward to it
        let as_of = now.max(transaction.timestamp());
        let start = as_of.checked_sub_signed(self.lookback).ok_or_else(|| {
            ComplianceError::configuration(
                ENGINE_SECTION,
                EngineConfig::LOOKBACK_DAYS,
                format!(
                    "{} days before {as_of} is out of range",
                    self.lookback.num_days()
                ),
            )
        })?;
        let recent = self
            .transactions
            .client_transactions_in_range(client_id, start, as_of)
            .await?;
        let latest = self.transactions.latest_client_transaction(client_id).await?;

        debug!(
            transaction_id = %transaction_id,
            client_id = %client_id,
            recent = recent.len(),
            lookback_days = self.lookback.num_days(),
            %as_of,
            "compliance context built"
        );

        let context = ComplianceContext::new(transaction, counterparty.country(), recent, as_of);
        Ok(match latest {
            Some(latest) => context.with_latest_transaction(latest),
            None => context,
        })
    }
}
