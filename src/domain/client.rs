// Copyright 2025 Cowboy AI, LLC.

//! Clients under monitoring
//!
//! A client's risk level is a projection of the most recent risk-rule run.
//! It can only change through [`Client::apply_risk_assessment`], and a
//! [`RiskAssessment`] can only be produced by the risk calculator.

use crate::domain::country::normalize_country_code;
use crate::entity::ClientId;
use crate::errors::{ComplianceError, ComplianceResult};
use crate::risk::RiskAssessment;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientType {
    /// Natural person
    Individual,
    /// Company, trust or other legal entity
    Organization,
}

/// Derived risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Standard monitoring
    Low,
    /// Enhanced monitoring
    Medium,
    /// Enhanced due diligence
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Know-your-client verification state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KycStatus {
    /// Documents not yet checked
    Pending,
    /// Verified
    Approved,
    /// Verification failed
    Rejected,
    /// Under manual compliance review
    UnderReview,
}

/// Input for [`Client::new`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    /// Legal name, must be non-empty
    pub name: String,
    /// Country code or name, must be non-empty
    pub country: String,
    /// Government issued identifier
    pub government_id: String,
    /// Individual or organization
    pub client_type: ClientType,
    /// Declared monthly income, must not be negative
    pub monthly_income: Decimal,
}

/// A monitored client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    id: ClientId,
    name: String,
    country: String,
    government_id: String,
    client_type: ClientType,
    monthly_income: Decimal,
    risk_level: RiskLevel,
    risk_points: Option<u32>,
    kyc_status: KycStatus,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Client {
    /// Validate and onboard a client with a fresh id
    pub fn new(input: NewClient) -> ComplianceResult<Self> {
        Self::with_id(ClientId::new(), input)
    }

    /// Validate and onboard a client with a known id
    pub fn with_id(id: ClientId, input: NewClient) -> ComplianceResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ComplianceError::ValidationError(
                "client name must not be empty".to_string(),
            ));
        }
        let country = normalize_country_code(&input.country);
        if country.is_empty() {
            return Err(ComplianceError::ValidationError(
                "client country must not be empty".to_string(),
            ));
        }
        if input.monthly_income < Decimal::ZERO {
            return Err(ComplianceError::ValidationError(format!(
                "monthly income must not be negative, got {}",
                input.monthly_income
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id,
            name,
            country,
            government_id: input.government_id,
            client_type: input.client_type,
            monthly_income: input.monthly_income,
            risk_level: RiskLevel::Low,
            risk_points: None,
            kyc_status: KycStatus::Pending,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Client id
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Legal name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upper-cased country
    pub fn country(&self) -> &str {
        &self.country
    }

    /// Government id
    pub fn government_id(&self) -> &str {
        &self.government_id
    }

    /// Individual or organization
    pub fn client_type(&self) -> ClientType {
        self.client_type
    }

    /// Declared monthly income
    pub fn monthly_income(&self) -> Decimal {
        self.monthly_income
    }

    /// Risk level from the latest assessment (Low before the first one)
    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// Raw points from the latest assessment, if any ran
    pub fn risk_points(&self) -> Option<u32> {
        self.risk_points
    }

    /// KYC status
    pub fn kyc_status(&self) -> KycStatus {
        self.kyc_status
    }

    /// Soft-delete flag
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Onboarding time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last mutation time
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Project the outcome of a risk-rule run onto this client
    pub fn apply_risk_assessment(&mut self, assessment: &RiskAssessment) {
        self.risk_level = assessment.level();
        self.risk_points = Some(assessment.points());
        self.touch();
    }

    /// Record a manual KYC decision
    pub fn set_kyc_status(&mut self, status: KycStatus) {
        self.kyc_status = status;
        self.touch();
    }

    /// Soft delete; history stays attributable
    pub fn deactivate(&mut self) {
        self.active = false;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
