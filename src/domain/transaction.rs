// Copyright 2025 Cowboy AI, LLC.

//! Ledger transactions
//!
//! Transactions are append-only: once constructed they are never updated or
//! deleted, because aggregation rules depend on the full history.

use crate::domain::country::normalize_country_code;
use crate::entity::{ClientId, TransactionId};
use crate::errors::{ComplianceError, ComplianceResult};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money into the client's account
    Deposit,
    /// Money out of the client's account
    Withdrawal,
    /// Movement between the client and a counterparty
    Transfer,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Input for [`Transaction::new`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// Owner of the transaction
    pub client_id: ClientId,
    /// Deposit, withdrawal or transfer
    pub transaction_type: TransactionType,
    /// Amount, must be strictly positive
    pub amount: Decimal,
    /// Currency code, must be non-empty
    pub currency: String,
    /// The other party
    pub counterparty_id: ClientId,
    /// When the transaction happened
    pub timestamp: DateTime<Utc>,
    /// Country the transaction originates from, must be non-empty
    pub country: String,
}

/// A validated, immutable ledger entry
///
/// Deserializing runs the same validation as [`Transaction::with_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransactionRecord")]
pub struct Transaction {
    id: TransactionId,
    client_id: ClientId,
    transaction_type: TransactionType,
    amount: Decimal,
    currency: String,
    counterparty_id: ClientId,
    timestamp: DateTime<Utc>,
    country: String,
}

/// Wire shape of a [`Transaction`] before validation
#[derive(Deserialize)]
struct TransactionRecord {
    id: TransactionId,
    client_id: ClientId,
    transaction_type: TransactionType,
    amount: Decimal,
    currency: String,
    counterparty_id: ClientId,
    timestamp: DateTime<Utc>,
    country: String,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = ComplianceError;

    fn try_from(record: TransactionRecord) -> ComplianceResult<Self> {
        Transaction::with_id(
            record.id,
            NewTransaction {
                client_id: record.client_id,
                transaction_type: record.transaction_type,
                amount: record.amount,
                currency: record.currency,
                counterparty_id: record.counterparty_id,
                timestamp: record.timestamp,
                country: record.country,
            },
        )
    }
}

impl Transaction {
    /// Validate and build a transaction with a fresh id
    pub fn new(input: NewTransaction) -> ComplianceResult<Self> {
        Self::with_id(TransactionId::new(), input)
    }

    /// Validate and build a transaction with a known id
    pub fn with_id(id: TransactionId, input: NewTransaction) -> ComplianceResult<Self> {
        if input.amount <= Decimal::ZERO {
            return Err(ComplianceError::ValidationError(format!(
                "transaction amount must be positive, got {}",
                input.amount
            )));
        }
        let currency = input.currency.trim().to_uppercase();
        if currency.is_empty() {
            return Err(ComplianceError::ValidationError(
                "transaction currency must not be empty".to_string(),
            ));
        }
        let country = normalize_country_code(&input.country);
        if country.is_empty() {
            return Err(ComplianceError::ValidationError(
                "transaction country must not be empty".to_string(),
            ));
        }

        Ok(Self {
            id,
            client_id: input.client_id,
            transaction_type: input.transaction_type,
            amount: input.amount,
            currency,
            counterparty_id: input.counterparty_id,
            timestamp: input.timestamp,
            country,
        })
    }

    /// Transaction id
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Owning client
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Transaction type
    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    /// Amount (always > 0)
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Upper-cased currency code
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Counterparty client
    pub fn counterparty_id(&self) -> ClientId {
        self.counterparty_id
    }

    /// Timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// UTC calendar date of the timestamp
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Upper-cased origin country
    pub fn country(&self) -> &str {
        &self.country
    }
}
