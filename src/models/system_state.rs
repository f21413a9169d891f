//! System state model
//!
//! An immutable snapshot of six weighted domains. A refresh replaces the whole
//! value; the only in-place change is a shallow overlay of entire domain blocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Confidence assigned to a state built from live workspace signals
pub const LIVE_CONFIDENCE: f64 = 0.9;

/// Confidence assigned to the conservative fallback state
pub const FALLBACK_CONFIDENCE: f64 = 0.8;

/// The six governance domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Operational,
    Strategic,
    Financial,
    Research,
    Security,
    Reliability,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::Operational,
        Domain::Strategic,
        Domain::Financial,
        Domain::Research,
        Domain::Security,
        Domain::Reliability,
    ];

    /// Weight of this domain in the overall health score (weights sum to 1.0)
    pub fn weight(&self) -> f64 {
        match self {
            Domain::Operational => 0.20,
            Domain::Strategic => 0.20,
            Domain::Financial => 0.15,
            Domain::Research => 0.15,
            Domain::Security => 0.15,
            Domain::Reliability => 0.15,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Operational => "operational",
            Domain::Strategic => "strategic",
            Domain::Financial => "financial",
            Domain::Research => "research",
            Domain::Security => "security",
            Domain::Reliability => "reliability",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalMetrics {
    pub efficiency: f64,
    pub throughput: f64,
    pub resource_utilization: f64,
    pub capacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicMetrics {
    pub vision_alignment: f64,
    pub goal_progress: f64,
    pub market_position: f64,
    pub innovation_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    pub budget_utilization: f64,
    pub cost_efficiency: f64,
    /// Relative scale: 0.1 means 10% growth
    pub revenue_growth: f64,
    pub runway_months: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchMetrics {
    pub velocity: f64,
    pub knowledge_base_size: f64,
    pub publication_rate: f64,
    pub experiment_success: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityMetrics {
    pub threat_level: f64,
    pub compliance_score: f64,
    /// Absolute count of open vulnerabilities
    pub vulnerability_count: f64,
    pub incident_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReliabilityMetrics {
    pub uptime: f64,
    pub error_rate: f64,
    /// Minutes to recover from the last incident
    pub recovery_time: f64,
    pub system_load: f64,
}

/// Immutable snapshot of the governed system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemState {
    pub operational: OperationalMetrics,
    pub strategic: StrategicMetrics,
    pub financial: FinancialMetrics,
    pub research: ResearchMetrics,
    pub security: SecurityMetrics,
    pub reliability: ReliabilityMetrics,
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
}

/// Partial update that replaces whole domain blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operational: Option<OperationalMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategic: Option<StrategicMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial: Option<FinancialMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<ResearchMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<ReliabilityMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl SystemStateUpdate {
    pub fn is_empty(&self) -> bool {
        self.operational.is_none()
            && self.strategic.is_none()
            && self.financial.is_none()
            && self.research.is_none()
            && self.security.is_none()
            && self.reliability.is_none()
            && self.confidence.is_none()
    }
}

impl From<SystemState> for SystemStateUpdate {
    fn from(state: SystemState) -> Self {
        Self {
            operational: Some(state.operational),
            strategic: Some(state.strategic),
            financial: Some(state.financial),
            research: Some(state.research),
            security: Some(state.security),
            reliability: Some(state.reliability),
            confidence: Some(state.confidence),
        }
    }
}

impl SystemState {
    /// Conservative defaults used whenever collection fails
    pub fn fallback() -> Self {
        Self {
            operational: OperationalMetrics {
                efficiency: 0.75,
                throughput: 0.7,
                resource_utilization: 0.6,
                capacity: 0.7,
            },
            strategic: StrategicMetrics {
                vision_alignment: 0.8,
                goal_progress: 0.6,
                market_position: 0.65,
                innovation_index: 0.6,
            },
            financial: FinancialMetrics {
                budget_utilization: 0.7,
                cost_efficiency: 0.75,
                revenue_growth: 0.05,
                runway_months: 18.0,
            },
            research: ResearchMetrics {
                velocity: 0.5,
                knowledge_base_size: 0.5,
                publication_rate: 0.4,
                experiment_success: 0.6,
            },
            security: SecurityMetrics {
                threat_level: 0.2,
                compliance_score: 0.9,
                vulnerability_count: 0.0,
                incident_rate: 0.05,
            },
            reliability: ReliabilityMetrics {
                uptime: 0.99,
                error_rate: 0.02,
                recovery_time: 15.0,
                system_load: 0.5,
            },
            timestamp: Utc::now(),
            confidence: FALLBACK_CONFIDENCE,
        }
    }

    /// Shallow overlay: every present block replaces the current one wholesale
    pub fn with_update(&self, update: &SystemStateUpdate) -> Self {
        Self {
            operational: update.operational.clone().unwrap_or_else(|| self.operational.clone()),
            strategic: update.strategic.clone().unwrap_or_else(|| self.strategic.clone()),
            financial: update.financial.clone().unwrap_or_else(|| self.financial.clone()),
            research: update.research.clone().unwrap_or_else(|| self.research.clone()),
            security: update.security.clone().unwrap_or_else(|| self.security.clone()),
            reliability: update.reliability.clone().unwrap_or_else(|| self.reliability.clone()),
            timestamp: Utc::now(),
            confidence: update.confidence.map(clamp_unit).unwrap_or(self.confidence),
        }
    }

    /// Normalized [0,1] "goodness" of one domain
    pub fn domain_score(&self, domain: Domain) -> f64 {
        let score = match domain {
            Domain::Operational => {
                let o = &self.operational;
                mean(&[o.efficiency, o.throughput, o.capacity, 1.0 - (o.resource_utilization - 0.7).abs()])
            }
            Domain::Strategic => {
                let s = &self.strategic;
                mean(&[s.vision_alignment, s.goal_progress, s.market_position, s.innovation_index])
            }
            Domain::Financial => {
                let f = &self.financial;
                mean(&[
                    f.cost_efficiency,
                    clamp_unit(0.5 + f.revenue_growth),
                    clamp_unit(f.runway_months / 24.0),
                    1.0 - (f.budget_utilization - 0.8).abs(),
                ])
            }
            Domain::Research => {
                let r = &self.research;
                mean(&[r.velocity, r.knowledge_base_size, r.publication_rate, r.experiment_success])
            }
            Domain::Security => {
                let s = &self.security;
                mean(&[
                    1.0 - s.threat_level,
                    s.compliance_score,
                    1.0 - clamp_unit(s.vulnerability_count / 10.0),
                    1.0 - s.incident_rate,
                ])
            }
            Domain::Reliability => {
                let r = &self.reliability;
                mean(&[
                    r.uptime,
                    1.0 - r.error_rate,
                    1.0 - clamp_unit(r.recovery_time / 120.0),
                    1.0 - r.system_load,
                ])
            }
        };
        clamp_unit(score)
    }

    /// Weighted health across all six domains
    pub fn health_score(&self) -> f64 {
        Domain::ALL
            .iter()
            .map(|d| d.weight() * self.domain_score(*d))
            .sum()
    }

    /// Per-domain scores keyed by domain name
    pub fn domain_scores(&self) -> BTreeMap<String, f64> {
        Domain::ALL
            .iter()
            .map(|d| (d.as_str().to_string(), self.domain_score(*d)))
            .collect()
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::fallback()
    }
}

pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = Domain::ALL.iter().map(|d| d.weight()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_confidence() {
        assert_eq!(SystemState::fallback().confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_update_replaces_whole_block_only() {
        let base = SystemState::fallback();
        let update = SystemStateUpdate {
            security: Some(SecurityMetrics {
                threat_level: 0.9,
                compliance_score: 0.4,
                vulnerability_count: 7.0,
                incident_rate: 0.3,
            }),
            ..Default::default()
        };

        let next = base.with_update(&update);
        assert_eq!(next.security.threat_level, 0.9);
        assert_eq!(next.operational, base.operational);
        assert_eq!(next.financial, base.financial);
        assert_eq!(next.confidence, base.confidence);
        // The source value is never touched
        assert_eq!(base.security.threat_level, 0.2);
    }

    #[test]
    fn test_update_clamps_confidence() {
        let next = SystemState::fallback().with_update(&SystemStateUpdate {
            confidence: Some(1.7),
            ..Default::default()
        });
        assert_eq!(next.confidence, 1.0);
    }

    #[test]
    fn test_security_score_drops_with_threats() {
        let calm = SystemState::fallback();
        let hostile = calm.with_update(&SystemStateUpdate {
            security: Some(SecurityMetrics {
                threat_level: 0.95,
                compliance_score: 0.3,
                vulnerability_count: 12.0,
                incident_rate: 0.6,
            }),
            ..Default::default()
        });
        assert!(hostile.domain_score(Domain::Security) < calm.domain_score(Domain::Security));
        assert!(hostile.health_score() < calm.health_score());
    }

    #[test]
    fn test_scores_stay_in_unit_range() {
        let state = SystemState::fallback();
        for domain in Domain::ALL {
            let score = state.domain_score(domain);
            assert!((0.0..=1.0).contains(&score), "{:?} = {}", domain, score);
        }
        assert_eq!(state.domain_scores().len(), 6);
    }
}
