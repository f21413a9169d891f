//! Director roles and decisions

use crate::models::event::ImpactAssessment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Every board role the governance model knows about. Six are instantiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectorRole {
    Chair,
    Ceo,
    Strategy,
    Operations,
    Technology,
    Finance,
    Legal,
    Research,
    Security,
    Compliance,
    Risk,
    HumanResources,
    Marketing,
    Product,
    Data,
    Sustainability,
    Innovation,
}

impl DirectorRole {
    pub const ALL: [DirectorRole; 17] = [
        DirectorRole::Chair,
        DirectorRole::Ceo,
        DirectorRole::Strategy,
        DirectorRole::Operations,
        DirectorRole::Technology,
        DirectorRole::Finance,
        DirectorRole::Legal,
        DirectorRole::Research,
        DirectorRole::Security,
        DirectorRole::Compliance,
        DirectorRole::Risk,
        DirectorRole::HumanResources,
        DirectorRole::Marketing,
        DirectorRole::Product,
        DirectorRole::Data,
        DirectorRole::Sustainability,
        DirectorRole::Innovation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectorRole::Chair => "chair",
            DirectorRole::Ceo => "ceo",
            DirectorRole::Strategy => "strategy",
            DirectorRole::Operations => "operations",
            DirectorRole::Technology => "technology",
            DirectorRole::Finance => "finance",
            DirectorRole::Legal => "legal",
            DirectorRole::Research => "research",
            DirectorRole::Security => "security",
            DirectorRole::Compliance => "compliance",
            DirectorRole::Risk => "risk",
            DirectorRole::HumanResources => "human_resources",
            DirectorRole::Marketing => "marketing",
            DirectorRole::Product => "product",
            DirectorRole::Data => "data",
            DirectorRole::Sustainability => "sustainability",
            DirectorRole::Innovation => "innovation",
        }
    }
}

impl fmt::Display for DirectorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DirectorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        DirectorRole::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| format!("Unknown director role '{}'", s))
    }
}

/// Runtime state of a director
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectorSystemState {
    Operational,
    Maintenance,
    Error,
    Degraded,
    Offline,
}

impl DirectorSystemState {
    pub fn as_u8(&self) -> u8 {
        match self {
            DirectorSystemState::Operational => 0,
            DirectorSystemState::Maintenance => 1,
            DirectorSystemState::Error => 2,
            DirectorSystemState::Degraded => 3,
            DirectorSystemState::Offline => 4,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => DirectorSystemState::Operational,
            1 => DirectorSystemState::Maintenance,
            2 => DirectorSystemState::Error,
            3 => DirectorSystemState::Degraded,
            _ => DirectorSystemState::Offline,
        }
    }
}

/// One director's answer to one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorDecision {
    pub id: Uuid,
    pub director_role: DirectorRole,
    /// Set when a backup director decided for an inactive role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_behalf_of: Option<DirectorRole>,
    pub event_id: Uuid,
    pub decision: String,
    pub rationale: String,
    pub impact: ImpactAssessment,
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
    /// Domain figures the decision rests on; read back by the domain gate
    pub signals: BTreeMap<String, f64>,
    /// Outcome of the director's own validation
    pub valid: bool,
}

impl DirectorDecision {
    pub fn signal(&self, key: &str) -> Option<f64> {
        self.signals.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in DirectorRole::ALL {
            assert_eq!(role.as_str().parse::<DirectorRole>(), Ok(role));
        }
        assert_eq!("Human-Resources".parse::<DirectorRole>(), Ok(DirectorRole::HumanResources));
        assert!("cfo".parse::<DirectorRole>().is_err());
    }

    #[test]
    fn test_system_state_codes() {
        for state in [
            DirectorSystemState::Operational,
            DirectorSystemState::Maintenance,
            DirectorSystemState::Error,
            DirectorSystemState::Degraded,
            DirectorSystemState::Offline,
        ] {
            assert_eq!(DirectorSystemState::from_u8(state.as_u8()), state);
        }
    }
}
