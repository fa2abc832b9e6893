// Copyright 2025 Cowboy AI, LLC.

//! Domain entities: clients, transactions, alerts and country risk

pub mod alert;
pub mod client;
pub mod country;
pub mod transaction;

pub use alert::{Alert, AlertSeverity, AlertStatus};
pub use client::{Client, ClientType, KycStatus, NewClient, RiskLevel};
pub use country::{normalize_country_code, CountryRisk};
pub use transaction::{NewTransaction, Transaction, TransactionType};
