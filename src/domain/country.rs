// Copyright 2025 Cowboy AI, LLC.

//! Country risk classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk classification of a country as exposed by the reference-data lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CountryRisk {
    /// Ordinary jurisdiction
    Low,
    /// Elevated monitoring
    Medium,
    /// High-risk or sanctioned jurisdiction
    High,
}

impl CountryRisk {
    /// Points contributed to a client's risk score
    pub fn weight(self) -> u32 {
        match self {
            CountryRisk::Low => 0,
            CountryRisk::Medium => 1,
            CountryRisk::High => 2,
        }
    }
}

impl fmt::Display for CountryRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CountryRisk::Low => "Low",
            CountryRisk::Medium => "Medium",
            CountryRisk::High => "High",
        };
        f.write_str(s)
    }
}

/// Canonical form used for every country comparison: trimmed, upper case
pub fn normalize_country_code(code: &str) -> String {
    code.trim().to_uppercase()
}
