// Copyright 2025 Cowboy AI, LLC.

use crate::config::{RiskCountryConfig, RuleConfigStore};
use crate::context::ComplianceContext;
use crate::domain::{normalize_country_code, Alert, AlertSeverity};
use crate::errors::ComplianceResult;
use crate::repository::CountryRiskLookup;
use crate::rules::ComplianceRule;
use indexmap::IndexSet;
use tracing::debug;

/// Fires when the origin or destination country is high risk.
///
/// Matching is case-insensitive. The alert goes to the client's most recent
/// transaction, whether or not it lies inside the look-back window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskCountryRule {
    high_risk_countries: IndexSet<String>,
}

impl RiskCountryRule {
    /// Build from any list of codes
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            high_risk_countries: codes
                .into_iter()
                .map(|code| normalize_country_code(code.as_ref()))
                .filter(|code| !code.is_empty())
                .collect(),
        }
    }

    /// Parse `RiskCountryRule.HighRiskCountries` from a store
    pub fn from_config(store: &RuleConfigStore) -> ComplianceResult<Self> {
        let config = RiskCountryConfig::from_store(store)?;
        Ok(Self {
            high_risk_countries: config.high_risk_countries,
        })
    }

    /// Take every country the lookup classifies as High
    pub async fn from_lookup(lookup: &dyn CountryRiskLookup) -> ComplianceResult<Self> {
        Ok(Self::new(lookup.high_risk_codes().await?))
    }

    /// Whether a country is in the high-risk set
    pub fn is_high_risk(&self, country: &str) -> bool {
        self.high_risk_countries
            .contains(&normalize_country_code(country))
    }

    /// Configured codes
    pub fn high_risk_countries(&self) -> &IndexSet<String> {
        &self.high_risk_countries
    }
}

impl ComplianceRule for RiskCountryRule {
    fn name(&self) -> &str {
        RiskCountryConfig::RULE
    }

    fn validate(&self, context: &ComplianceContext) -> Option<Alert> {
        let origin = self.is_high_risk(context.origin_country());
        let destination = self.is_high_risk(context.destination_country());
        if !(origin || destination) {
            return None;
        }

        let latest = context.latest_transaction();
        debug!(
            client_id = %context.client_id(),
            origin = context.origin_country(),
            destination = context.destination_country(),
            "high-risk country involved"
        );
        Some(Alert::raise(
            context.client_id(),
            latest.id(),
            self.name(),
            AlertSeverity::Medium,
        ))
    }
}
