// Copyright 2025 Cowboy AI, LLC.

//! Client risk scoring
//!
//! The calculator sums point contributions from client-attribute rules and
//! maps the total to a [`RiskLevel`] through an explicit [`RiskPolicy`]. It is
//! side-effect free: applying the result to a client is the caller's job, via
//! [`Client::apply_risk_assessment`].

use crate::config::RuleConfigStore;
use crate::domain::{Client, ClientType, CountryRisk, RiskLevel};
use crate::errors::{ComplianceError, ComplianceResult};
use crate::repository::CountryRiskLookup;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A rule contributing points to a client's risk score
#[async_trait]
pub trait ClientRiskRule: Send + Sync {
    /// Name used in assessment breakdowns
    fn name(&self) -> &str;

    /// Points this rule contributes for the client
    async fn calculate_points(&self, client: &Client) -> ComplianceResult<u32>;
}

/// Organizations score 2, individuals 1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientTypeRule;

#[async_trait]
impl ClientRiskRule for ClientTypeRule {
    fn name(&self) -> &str {
        "ClientTypeRule"
    }

    async fn calculate_points(&self, client: &Client) -> ComplianceResult<u32> {
        Ok(match client.client_type() {
            ClientType::Organization => 2,
            ClientType::Individual => 1,
        })
    }
}

/// Weight of the client's country classification; unknown countries count as Low
#[derive(Clone)]
pub struct CountryRiskRule {
    lookup: Arc<dyn CountryRiskLookup>,
}

impl CountryRiskRule {
    /// Score against a country-risk lookup
    pub fn new(lookup: Arc<dyn CountryRiskLookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl ClientRiskRule for CountryRiskRule {
    fn name(&self) -> &str {
        "CountryRiskRule"
    }

    async fn calculate_points(&self, client: &Client) -> ComplianceResult<u32> {
        let risk = match self.lookup.risk_for(client.country()).await? {
            Some(risk) => risk,
            None => {
                debug!(country = client.country(), "country not classified, scoring as Low");
                CountryRisk::Low
            }
        };
        Ok(risk.weight())
    }
}

/// Points-to-level cutoffs
///
/// | points                     | level  |
/// |----------------------------|--------|
/// | `< medium_from`            | Low    |
/// | `medium_from..high_from`   | Medium |
/// | `>= high_from`             | High   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RiskPolicyRecord")]
pub struct RiskPolicy {
    medium_from: u32,
    high_from: u32,
}

#[derive(Deserialize)]
struct RiskPolicyRecord {
    medium_from: u32,
    high_from: u32,
}

impl TryFrom<RiskPolicyRecord> for RiskPolicy {
    type Error = ComplianceError;

    fn try_from(record: RiskPolicyRecord) -> ComplianceResult<Self> {
        RiskPolicy::new(record.medium_from, record.high_from)
    }
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            medium_from: 2,
            high_from: 3,
        }
    }
}

impl RiskPolicy {
    /// Configuration section for custom cutoffs
    pub const SECTION: &'static str = "ClientRiskPolicy";
    /// Key for the first Medium score
    pub const MEDIUM_FROM: &'static str = "MediumFrom";
    /// Key for the first High score
    pub const HIGH_FROM: &'static str = "HighFrom";

    /// Cutoffs must satisfy `0 < medium_from < high_from`
    pub fn new(medium_from: u32, high_from: u32) -> ComplianceResult<Self> {
        if medium_from == 0 || medium_from >= high_from {
            return Err(ComplianceError::configuration(
                Self::SECTION,
                Self::MEDIUM_FROM,
                format!("cutoffs must satisfy 0 < {medium_from} < {high_from}"),
            ));
        }
        Ok(Self {
            medium_from,
            high_from,
        })
    }

    /// Read cutoffs from a store, falling back to the defaults per key
    pub fn from_store(store: &RuleConfigStore) -> ComplianceResult<Self> {
        let defaults = Self::default();
        let medium_from = store
            .optional(Self::SECTION, Self::MEDIUM_FROM)?
            .unwrap_or(defaults.medium_from);
        let high_from = store
            .optional(Self::SECTION, Self::HIGH_FROM)?
            .unwrap_or(defaults.high_from);
        Self::new(medium_from, high_from)
    }

    /// Map a point total to a level
    pub fn level_for(&self, points: u32) -> RiskLevel {
        if points >= self.high_from {
            RiskLevel::High
        } else if points >= self.medium_from {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Outcome of one risk-rule run; only the calculator can produce one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    points: u32,
    level: RiskLevel,
    contributions: Vec<(String, u32)>,
    assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// Total points
    pub fn points(&self) -> u32 {
        self.points
    }

    /// Level derived through the policy
    pub fn level(&self) -> RiskLevel {
        self.level
    }

    /// Points per rule, in rule order
    pub fn contributions(&self) -> &[(String, u32)] {
        &self.contributions
    }

    /// When the calculation ran
    pub fn assessed_at(&self) -> DateTime<Utc> {
        self.assessed_at
    }
}

/// Sums client-attribute rule contributions
pub struct ClientRiskCalculator {
    rules: Vec<Box<dyn ClientRiskRule>>,
    policy: RiskPolicy,
}

impl ClientRiskCalculator {
    /// Empty calculator with a policy
    pub fn new(policy: RiskPolicy) -> Self {
        Self {
            rules: Vec::new(),
            policy,
        }
    }

    /// Client-type and country rules
    pub fn standard(lookup: Arc<dyn CountryRiskLookup>, policy: RiskPolicy) -> Self {
        Self::new(policy)
            .with_rule(ClientTypeRule)
            .with_rule(CountryRiskRule::new(lookup))
    }

    /// Append a rule
    pub fn with_rule(mut self, rule: impl ClientRiskRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Active policy
    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    /// Total points for a client
    pub async fn calculate(&self, client: &Client) -> ComplianceResult<u32> {
        Ok(self.assess(client).await?.points)
    }

    /// Points, per-rule breakdown and level for a client
    pub async fn assess(&self, client: &Client) -> ComplianceResult<RiskAssessment> {
        let mut contributions = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let points = rule.calculate_points(client).await?;
            contributions.push((rule.name().to_string(), points));
        }
        let points: u32 = contributions.iter().map(|(_, points)| points).sum();
        let level = self.policy.level_for(points);

        debug!(client_id = %client.id(), points, %level, "client risk assessed");
        Ok(RiskAssessment {
            points,
            level,
            contributions,
            assessed_at: Utc::now(),
        })
    }
}

impl std::fmt::Debug for ClientRiskCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.rules.iter().map(|rule| rule.name()).collect();
        f.debug_struct("ClientRiskCalculator")
            .field("rules", &names)
            .field("policy", &self.policy)
            .finish()
    }
}
