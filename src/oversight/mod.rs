//! Oversight Module
//!
//! Three independently refreshed monitors over the shared system state:
//!
//! 1. **Strategic** (hours): vision alignment and long-range direction
//! 2. **Operational** (minutes): system performance and service levels
//! 3. **Tactical** (seconds): alerts, escalation and response protocols
//!
//! Risk scoring follows a single convention across layers: each risk factor
//! carries a negative `score_impact`, the layer's safety score is
//! `100 + Σ impact` clamped to `[0, 100]`.

pub mod hierarchy;
pub mod operational;
pub mod strategic;
pub mod tactical;

pub use hierarchy::{EventOversight, HierarchyStatus, LayerStatus, OversightHierarchy};
pub use operational::{OperationalOversight, SystemPerformanceMetrics};
pub use strategic::{StrategicOversight, VisionAlignmentMetrics};
pub use tactical::{ActionStep, AlertTrigger, ResponseProtocol, TacticalOversight};

use crate::models::{EnvironmentalEvent, Severity, SystemState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::watch;
use uuid::Uuid;

// =============================================================================
// SHARED TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversightTier {
    Strategic,
    Operational,
    Tactical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => RiskLevel::Minimal,
            s if s >= 75.0 => RiskLevel::Low,
            s if s >= 50.0 => RiskLevel::Medium,
            s if s >= 25.0 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

/// Latest metric view of one layer, as streamed by `monitor()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSnapshot {
    pub tier: OversightTier,
    /// Layer health in [0,1]
    pub score: f64,
    pub indicators: BTreeMap<String, f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    /// Stable identifier, e.g. "STR-001"
    pub id: String,
    pub category: String,
    pub description: String,
    pub score_impact: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub tier: OversightTier,
    pub risks: Vec<Risk>,
    pub mitigation_strategies: Vec<String>,
    /// Lowest safety score this layer accepts
    pub tolerance: f64,
    /// Safety score, 100 = no identified risk
    pub score: f64,
    pub level: RiskLevel,
    pub within_tolerance: bool,
}

impl RiskAssessment {
    pub fn from_factors(
        tier: OversightTier,
        risks: Vec<Risk>,
        mitigation_strategies: Vec<String>,
        tolerance: f64,
    ) -> Self {
        let score = safety_score(&risks);
        Self {
            tier,
            risks,
            mitigation_strategies,
            tolerance,
            score,
            level: RiskLevel::from_score(score),
            within_tolerance: score >= tolerance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceStatus {
    pub tier: OversightTier,
    pub compliant: bool,
    pub score: f64,
    pub violations: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

impl ComplianceStatus {
    /// Score is the share of checks that passed
    pub fn from_checks(tier: OversightTier, checks: &[(bool, String)]) -> Self {
        let violations: Vec<String> = checks
            .iter()
            .filter(|(passed, _)| !passed)
            .map(|(_, label)| label.clone())
            .collect();
        let score = if checks.is_empty() {
            1.0
        } else {
            (checks.len() - violations.len()) as f64 / checks.len() as f64
        };
        Self {
            tier,
            compliant: violations.is_empty(),
            score,
            violations,
            checked_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionableInsight {
    pub tier: OversightTier,
    pub title: String,
    pub description: String,
    pub priority: Severity,
    pub actions: Vec<String>,
}

/// A layer's answer to one event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolResponse {
    pub tier: OversightTier,
    pub event_id: Uuid,
    /// False when the event is outside this layer's remit
    pub acknowledged: bool,
    pub actions: Vec<String>,
}

/// Contract shared by the three oversight layers
pub trait OversightLayer: Send + Sync {
    fn tier(&self) -> OversightTier;

    /// Recompute the layer's metrics from a fresh state
    fn refresh(&self, state: &SystemState);

    fn snapshot(&self) -> LayerSnapshot;

    /// Latest-value stream of this layer's metrics
    fn monitor(&self) -> watch::Receiver<LayerSnapshot>;

    fn assess_risks(&self) -> RiskAssessment;

    fn verify_compliance(&self) -> ComplianceStatus;

    fn generate_insights(&self) -> Vec<ActionableInsight>;

    fn process_event(&self, event: &EnvironmentalEvent) -> ProtocolResponse;
}

pub fn safety_score(risks: &[Risk]) -> f64 {
    let total: f64 = risks.iter().map(|r| r.score_impact).sum();
    (100.0 + total).clamp(0.0, 100.0)
}

pub(crate) fn risk(id: &str, category: &str, description: impl Into<String>, score_impact: f64) -> Risk {
    Risk {
        id: id.to_string(),
        category: category.to_string(),
        description: description.into(),
        score_impact,
    }
}

pub(crate) fn indicators(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_score_is_clamped() {
        assert_eq!(safety_score(&[]), 100.0);
        let heavy = vec![
            risk("X-1", "test", "a", -80.0),
            risk("X-2", "test", "b", -50.0),
        ];
        assert_eq!(safety_score(&heavy), 0.0);
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::from_score(95.0), RiskLevel::Minimal);
        assert_eq!(RiskLevel::from_score(60.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(10.0), RiskLevel::Critical);
    }

    #[test]
    fn test_compliance_score_is_pass_ratio() {
        let status = ComplianceStatus::from_checks(
            OversightTier::Operational,
            &[(true, "a".into()), (false, "b".into()), (true, "c".into()), (false, "d".into())],
        );
        assert!(!status.compliant);
        assert_eq!(status.score, 0.5);
        assert_eq!(status.violations, vec!["b", "d"]);
    }
}
