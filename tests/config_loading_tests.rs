//! Loading rule configuration from JSON documents

use anyhow::Result;
use cim_compliance::{
    ComplianceConfig, DailyLimitConfig, EngineConfig, RiskCountryConfig, RiskPolicy,
    RuleConfigStore, RuleSet, StructuringConfig,
};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

const SECTIONS: &str = r#"{
    "DailyLimitRule": { "DailyLimit": "10000.00" },
    "StructuringRule": {
        "ThresholdAmount": 9500,
        "MinTransactionCount": 3,
        "DaysWindow": 5
    },
    "RiskCountryRule": { "HighRiskCountries": ["ir", " kp ", "SY"] },
    "ComplianceEngine": { "LookbackDays": 14 },
    "ClientRiskPolicy": { "MediumFrom": 2, "HighFrom": 4 }
}"#;

#[test]
fn test_section_document() -> Result<()> {
    let store = RuleConfigStore::from_json_str(SECTIONS)?;

    assert_eq!(DailyLimitConfig::from_store(&store)?.daily_limit, dec!(10000));
    assert_eq!(
        StructuringConfig::from_store(&store)?,
        StructuringConfig {
            threshold_amount: dec!(9500),
            min_transaction_count: 3,
            days_window: 5,
        }
    );
    let countries: Vec<String> = RiskCountryConfig::from_store(&store)?
        .high_risk_countries
        .into_iter()
        .collect();
    assert_eq!(countries, vec!["IR", "KP", "SY"]);
    assert_eq!(EngineConfig::from_store(&store)?.lookback_days, 14);
    assert_eq!(RiskPolicy::from_store(&store)?, RiskPolicy::new(2, 4)?);

    let rules = RuleSet::standard(&store)?;
    assert_eq!(rules.max_history_days(), 6);
    Ok(())
}

#[test]
fn test_entry_document() -> Result<()> {
    let store = RuleConfigStore::from_json_str(
        r#"[
            { "rule_name": "DailyLimitRule", "key": "DailyLimit", "value": "500" },
            { "rule_name": "DailyLimitRule", "key": "DailyLimit", "value": "750" }
        ]"#,
    )?;

    assert_eq!(DailyLimitConfig::from_store(&store)?.daily_limit, dec!(750));
    assert_eq!(
        store.entries(),
        vec![ComplianceConfig::new("DailyLimitRule", "DailyLimit", "750")]
    );
    Ok(())
}

#[test]
fn test_malformed_values_name_the_key() {
    let store = RuleConfigStore::new()
        .with("DailyLimitRule", "DailyLimit", "ten thousand");

    let message = DailyLimitConfig::from_store(&store).unwrap_err().to_string();
    assert!(message.contains("DailyLimitRule"));
    assert!(message.contains("DailyLimit"));
}

#[test]
fn test_invalid_json_is_a_serialization_error() {
    let err = RuleConfigStore::from_json_str("{ not json").unwrap_err();
    assert!(matches!(
        err,
        cim_compliance::ComplianceError::SerializationError(_)
    ));
}
