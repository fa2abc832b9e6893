// Copyright 2025 Cowboy AI, LLC.

//! Rule configuration
//!
//! Thresholds arrive as `(rule, key) -> string` entries. Each rule parses the
//! keys it needs once, at construction, into a typed config struct. A missing
//! or unparsable key is a [`ComplianceError::Configuration`]; there are no
//! silent defaults for thresholds.

use crate::domain::normalize_country_code;
use crate::errors::{ComplianceError, ComplianceResult};
use indexmap::{IndexMap, IndexSet};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

/// Rule name used for engine-wide settings
pub const ENGINE_SECTION: &str = "ComplianceEngine";

/// Longest accepted window or look-back, in days (one hundred years)
pub const MAX_WINDOW_DAYS: u32 = 36_500;

fn bounded_days(rule: &str, key: &str, days: u32, min: u32) -> ComplianceResult<u32> {
    if days < min || days > MAX_WINDOW_DAYS {
        return Err(ComplianceError::configuration(
            rule,
            key,
            format!("must be between {min} and {MAX_WINDOW_DAYS} days, got {days}"),
        ));
    }
    Ok(days)
}

/// A single named parameter scoped to a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Rule the parameter belongs to, e.g. `StructuringRule`
    pub rule_name: String,
    /// Parameter key, e.g. `ThresholdAmount`
    pub key: String,
    /// Raw value
    pub value: String,
}

impl ComplianceConfig {
    /// Create a new entry
    pub fn new(
        rule_name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigDocument {
    Entries(Vec<ComplianceConfig>),
    Sections(IndexMap<String, IndexMap<String, serde_json::Value>>),
}

/// Ordered key/value source for rule parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleConfigStore {
    sections: IndexMap<String, IndexMap<String, String>>,
}

impl RuleConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from flat entries; later entries override earlier ones
    pub fn from_entries(entries: impl IntoIterator<Item = ComplianceConfig>) -> Self {
        let mut store = Self::new();
        for entry in entries {
            store.insert(entry.rule_name, entry.key, entry.value);
        }
        store
    }

    /// Parse a JSON document.
    ///
    /// Accepts either an array of `{"rule_name", "key", "value"}` entries or
    /// an object of sections:
    ///
    /// ```rust
    /// use cim_compliance::RuleConfigStore;
    ///
    /// let store = RuleConfigStore::from_json_str(r#"{
    ///     "DailyLimitRule": { "DailyLimit": 10000 },
    ///     "RiskCountryRule": { "HighRiskCountries": ["IR", "KP"] }
    /// }"#).unwrap();
    ///
    /// assert_eq!(store.get("DailyLimitRule", "DailyLimit"), Some("10000"));
    /// assert_eq!(store.get("RiskCountryRule", "HighRiskCountries"), Some("IR,KP"));
    /// ```
    pub fn from_json_str(json: &str) -> ComplianceResult<Self> {
        match serde_json::from_str::<ConfigDocument>(json)? {
            ConfigDocument::Entries(entries) => Ok(Self::from_entries(entries)),
            ConfigDocument::Sections(sections) => {
                let mut store = Self::new();
                for (rule, keys) in sections {
                    for (key, value) in keys {
                        store.insert(rule.clone(), key, json_value_to_string(&value));
                    }
                }
                Ok(store)
            }
        }
    }

    /// Insert or replace a parameter
    pub fn insert(
        &mut self,
        rule: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.sections
            .entry(rule.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Builder-style [`RuleConfigStore::insert`]
    pub fn with(
        mut self,
        rule: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.insert(rule, key, value);
        self
    }

    /// Raw value lookup
    pub fn get(&self, rule: &str, key: &str) -> Option<&str> {
        self.sections
            .get(rule)
            .and_then(|keys| keys.get(key))
            .map(String::as_str)
    }

    /// All entries in insertion order
    pub fn entries(&self) -> Vec<ComplianceConfig> {
        self.sections
            .iter()
            .flat_map(|(rule, keys)| {
                keys.iter()
                    .map(move |(key, value)| ComplianceConfig::new(rule, key, value))
            })
            .collect()
    }

    /// Parse a required parameter
    pub fn require<T>(&self, rule: &str, key: &str) -> ComplianceResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self
            .get(rule, key)
            .ok_or_else(|| ComplianceError::configuration(rule, key, "missing required key"))?;
        parse_value(rule, key, raw)
    }

    /// Parse an optional parameter; present-but-malformed is still an error
    pub fn optional<T>(&self, rule: &str, key: &str) -> ComplianceResult<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get(rule, key)
            .map(|raw| parse_value(rule, key, raw))
            .transpose()
    }
}

fn parse_value<T>(rule: &str, key: &str, raw: &str) -> ComplianceResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        ComplianceError::configuration(rule, key, format!("cannot parse {raw:?}: {e}"))
    })
}

fn json_value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(json_value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Parameters of the daily limit rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLimitConfig {
    /// Same-day total that must be strictly exceeded to alert
    pub daily_limit: Decimal,
}

impl DailyLimitConfig {
    /// Rule name used for configuration scoping
    pub const RULE: &'static str = "DailyLimitRule";
    /// Key holding the limit
    pub const DAILY_LIMIT: &'static str = "DailyLimit";

    /// Parse from a store
    pub fn from_store(store: &RuleConfigStore) -> ComplianceResult<Self> {
        let daily_limit: Decimal = store.require(Self::RULE, Self::DAILY_LIMIT)?;
        if daily_limit <= Decimal::ZERO {
            return Err(ComplianceError::configuration(
                Self::RULE,
                Self::DAILY_LIMIT,
                format!("must be positive, got {daily_limit}"),
            ));
        }
        Ok(Self { daily_limit })
    }
}

/// Parameters of the structuring rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuringConfig {
    /// Aggregate amount that must be reached
    pub threshold_amount: Decimal,
    /// Number of transactions that must be reached
    pub min_transaction_count: u32,
    /// Window length in days, counted back from today (UTC)
    pub days_window: u32,
}

impl StructuringConfig {
    /// Rule name used for configuration scoping
    pub const RULE: &'static str = "StructuringRule";
    /// Key holding the aggregate threshold
    pub const THRESHOLD_AMOUNT: &'static str = "ThresholdAmount";
    /// Key holding the minimum count
    pub const MIN_TRANSACTION_COUNT: &'static str = "MinTransactionCount";
    /// Key holding the window length
    pub const DAYS_WINDOW: &'static str = "DaysWindow";

    /// Parse from a store
    pub fn from_store(store: &RuleConfigStore) -> ComplianceResult<Self> {
        let threshold_amount: Decimal = store.require(Self::RULE, Self::THRESHOLD_AMOUNT)?;
        if threshold_amount <= Decimal::ZERO {
            return Err(ComplianceError::configuration(
                Self::RULE,
                Self::THRESHOLD_AMOUNT,
                format!("must be positive, got {threshold_amount}"),
            ));
        }
        let min_transaction_count: u32 = store.require(Self::RULE, Self::MIN_TRANSACTION_COUNT)?;
        if min_transaction_count == 0 {
            return Err(ComplianceError::configuration(
                Self::RULE,
                Self::MIN_TRANSACTION_COUNT,
                "must be at least 1",
            ));
        }
        let days_window = bounded_days(
            Self::RULE,
            Self::DAYS_WINDOW,
            store.require(Self::RULE, Self::DAYS_WINDOW)?,
            0,
        )?;

        Ok(Self {
            threshold_amount,
            min_transaction_count,
            days_window,
        })
    }
}

/// Parameters of the risk-country rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCountryConfig {
    /// Normalised high-risk country codes
    pub high_risk_countries: IndexSet<String>,
}

impl RiskCountryConfig {
    /// Rule name used for configuration scoping
    pub const RULE: &'static str = "RiskCountryRule";
    /// Key holding the comma-separated list
    pub const HIGH_RISK_COUNTRIES: &'static str = "HighRiskCountries";

    /// Parse from a store
    pub fn from_store(store: &RuleConfigStore) -> ComplianceResult<Self> {
        let raw = store.get(Self::RULE, Self::HIGH_RISK_COUNTRIES).ok_or_else(|| {
            ComplianceError::configuration(
                Self::RULE,
                Self::HIGH_RISK_COUNTRIES,
                "missing required key",
            )
        })?;

        let high_risk_countries: IndexSet<String> = raw
            .split(',')
            .map(normalize_country_code)
            .filter(|code| !code.is_empty())
            .collect();
        if high_risk_countries.is_empty() {
            warn!(rule = Self::RULE, "high-risk country list is empty; rule will never fire");
        }

        Ok(Self {
            high_risk_countries,
        })
    }
}

/// Engine-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Days of history loaded into every context
    pub lookback_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { lookback_days: 30 }
    }
}

impl EngineConfig {
    /// Key holding the look-back window
    pub const LOOKBACK_DAYS: &'static str = "LookbackDays";

    /// Read from the [`ENGINE_SECTION`] of a store, defaulting to 30 days
    pub fn from_store(store: &RuleConfigStore) -> ComplianceResult<Self> {
        let lookback_days = store
            .optional(ENGINE_SECTION, Self::LOOKBACK_DAYS)?
            .unwrap_or(Self::default().lookback_days);
        let lookback_days = bounded_days(ENGINE_SECTION, Self::LOOKBACK_DAYS, lookback_days, 1)?;
        Ok(Self { lookback_days })
    }
}
